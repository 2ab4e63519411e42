//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::PlayerInput;
use crate::matchmaking::QueuedPlayer;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler. Sessions are anonymous; each connection
/// gets a fresh identity that lives as long as the socket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let user_id = Uuid::new_v4();
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Uuid, state: AppState) {
    info!(user_id = %user_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        user_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(user_id = %user_id, error = %e, "Failed to send welcome");
        return;
    }

    // Register with matchmaking to get channels
    let (input_tx, session_tx) = state.matchmaking.register_player(user_id).await;

    run_session(user_id, ws_sink, ws_stream, input_tx, session_tx, &state).await;

    // Cleanup on disconnect
    state.matchmaking.unregister_player(user_id).await;

    info!(user_id = %user_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    user_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<PlayerInput>,
    session_tx: broadcast::Sender<ServerMsg>,
    state: &AppState,
) {
    let rate_limiter = PlayerRateLimiter::new();
    let mut session_rx = session_tx.subscribe();

    // Writer task: session broadcast -> WebSocket
    let writer_user_id = user_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match session_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(user_id = %writer_user_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        user_id = %writer_user_id,
                        lagged_count = n,
                        "Client lagged, skipping {} snapshots", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(user_id = %writer_user_id, "Session channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> matchmaking or duel
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(user_id = %user_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::JoinQueue { display_name }) => {
                        match state
                            .matchmaking
                            .join_queue(QueuedPlayer::new(user_id, display_name))
                            .await
                        {
                            Ok(position) => {
                                let _ = session_tx.send(ServerMsg::QueueJoined { position });
                            }
                            Err(message) => {
                                let _ = session_tx.send(ServerMsg::Error {
                                    code: "queue_rejected".to_string(),
                                    message,
                                });
                            }
                        }
                    }
                    Ok(client_msg) => {
                        // Pings are answered in place so queued players can
                        // measure latency too, and only the pinger hears back
                        if let Some(reply) = ping_reply(&client_msg) {
                            let _ = session_tx.send(reply);
                            continue;
                        }

                        if matches!(client_msg, ClientMsg::LeaveMatch) {
                            state.matchmaking.leave_queue(user_id).await;
                        }

                        let input = PlayerInput {
                            user_id,
                            msg: client_msg,
                            received_at: unix_millis(),
                        };

                        if input_tx.send(input).await.is_err() {
                            debug!(user_id = %user_id, "Input channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(user_id = %user_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(user_id = %user_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(user_id = %user_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(user_id = %user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Signal disconnect to the duel loop
    let _ = input_tx
        .send(PlayerInput {
            user_id,
            msg: ClientMsg::LeaveMatch,
            received_at: unix_millis(),
        })
        .await;

    // Abort writer task
    writer_handle.abort();
}

/// Session-level reply for messages that never reach a duel task
fn ping_reply(msg: &ClientMsg) -> Option<ServerMsg> {
    match msg {
        ClientMsg::Ping { t } => Some(ServerMsg::Pong { t: *t }),
        _ => None,
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_ping_is_answered_with_its_own_timestamp() {
        let reply = ping_reply(&ClientMsg::Ping { t: 1234 });
        assert!(matches!(reply, Some(ServerMsg::Pong { t: 1234 })));
    }

    #[test]
    fn duel_bound_messages_are_not_answered_locally() {
        assert!(ping_reply(&ClientMsg::LeaveMatch).is_none());
        assert!(ping_reply(&ClientMsg::InputTick {
            seq: 1,
            left: false,
            right: true,
            jump: false,
            down: false,
            attack: false,
        })
        .is_none());
    }
}
