//! Matchmaking service - manages the queue and duel creation

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::commentary::CommentaryService;
use crate::game::{DuelMatch, MatchRegistry, PlayerInput};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::queue::{DuelQueue, QueuedPlayer};

/// Player connection handle for routing messages
#[derive(Clone)]
pub struct PlayerConnection {
    pub user_id: Uuid,
    /// Channel to send inputs to the current duel
    pub input_tx: mpsc::Sender<PlayerInput>,
    /// Channel to receive snapshots from the current duel
    pub snapshot_rx: broadcast::Sender<ServerMsg>,
}

/// Matchmaking service
pub struct MatchmakingService {
    queue: Arc<Mutex<DuelQueue>>,
    registry: Arc<MatchRegistry>,
    commentary: Arc<CommentaryService>,
    /// Connected players awaiting or in duels
    players: Arc<DashMap<Uuid, PlayerConnection>>,
    /// Map of player -> current duel
    player_matches: Arc<DashMap<Uuid, Uuid>>,
}

impl MatchmakingService {
    pub fn new(registry: Arc<MatchRegistry>, commentary: Arc<CommentaryService>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(DuelQueue::default())),
            registry,
            commentary,
            players: Arc::new(DashMap::new()),
            player_matches: Arc::new(DashMap::new()),
        }
    }

    /// Register a player connection (called when WebSocket connects).
    /// Returns the input channel and the personal broadcast sender the
    /// session subscribes to; the handler may also push direct replies
    /// through it.
    pub async fn register_player(
        &self,
        user_id: Uuid,
    ) -> (mpsc::Sender<PlayerInput>, broadcast::Sender<ServerMsg>) {
        // Personal channels for this player
        let (input_tx, mut input_rx) = mpsc::channel::<PlayerInput>(64);
        let (snapshot_tx, _) = broadcast::channel::<ServerMsg>(64);

        let connection = PlayerConnection {
            user_id,
            input_tx: input_tx.clone(),
            snapshot_rx: snapshot_tx.clone(),
        };

        self.players.insert(user_id, connection);

        // Route inputs from the personal channel to the current duel
        let registry = self.registry.clone();
        let player_matches = self.player_matches.clone();
        let players_for_input = self.players.clone();

        tokio::spawn(async move {
            while let Some(input) = input_rx.recv().await {
                if let Some(match_id) = player_matches.get(&user_id).map(|r| *r) {
                    if let Some(match_handle) = registry.get(&match_id) {
                        if match_handle.input_tx.send(input).await.is_err() {
                            warn!(user_id = %user_id, "Failed to send input to duel");
                        }
                    }
                }
            }
            // Cleanup when channel closes
            players_for_input.remove(&user_id);
        });

        // Route snapshots from the current duel to the player
        let snapshot_tx_clone = snapshot_tx.clone();
        let player_matches_clone = self.player_matches.clone();
        let registry_clone = self.registry.clone();
        let players_for_snapshot = self.players.clone();

        tokio::spawn(async move {
            let mut current_match_rx: Option<broadcast::Receiver<ServerMsg>> = None;
            let mut current_match_id: Option<Uuid> = None;

            loop {
                // Check if the player's duel changed
                let new_match_id = player_matches_clone.get(&user_id).map(|r| *r);

                if new_match_id != current_match_id {
                    current_match_id = new_match_id;
                    current_match_rx = new_match_id.and_then(|mid| {
                        registry_clone.get(&mid).map(|h| h.snapshot_tx.subscribe())
                    });
                }

                if let Some(ref mut rx) = current_match_rx {
                    match rx.recv().await {
                        Ok(msg) => {
                            let _ = snapshot_tx_clone.send(msg);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(user_id = %user_id, lagged = n, "Snapshot receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            current_match_rx = None;
                            current_match_id = None;
                        }
                    }
                } else {
                    // No duel, wait a bit
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                }

                if !players_for_snapshot.contains_key(&user_id) {
                    break;
                }
            }
        });

        (input_tx, snapshot_tx)
    }

    /// Unregister a player (called when WebSocket disconnects)
    pub async fn unregister_player(&self, user_id: Uuid) {
        self.players.remove(&user_id);
        self.player_matches.remove(&user_id);

        let mut queue = self.queue.lock().await;
        queue.dequeue(user_id);

        info!(user_id = %user_id, "Player unregistered from matchmaking");
    }

    /// Join matchmaking queue
    pub async fn join_queue(&self, player: QueuedPlayer) -> Result<usize, String> {
        let user_id = player.user_id;

        if self.player_matches.contains_key(&user_id) {
            return Err("Already in a duel".to_string());
        }

        let mut queue = self.queue.lock().await;
        queue.enqueue(player);
        let position = queue.len();

        info!(user_id = %user_id, queue_size = position, "Player joined matchmaking queue");

        // Pairing happens on the run() loop so the WebSocket routing
        // tasks are up before a duel starts broadcasting
        Ok(position)
    }

    /// Leave matchmaking queue
    pub async fn leave_queue(&self, user_id: Uuid) {
        let mut queue = self.queue.lock().await;
        queue.dequeue(user_id);
    }

    /// Create a duel for a matched pair
    async fn create_match(&self, pair: (QueuedPlayer, QueuedPlayer)) {
        let match_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let (duel, handle) = DuelMatch::new(match_id, seed, self.commentary.clone());
        self.registry.insert(handle);

        let players = [pair.0, pair.1];
        for player in &players {
            self.player_matches.insert(player.user_id, match_id);
        }

        info!(
            match_id = %match_id,
            p1 = %players[0].display_name,
            p2 = %players[1].display_name,
            "Created new duel"
        );

        // Spawn the duel task
        let registry = self.registry.clone();
        let player_matches = self.player_matches.clone();
        let pair_ids: Vec<Uuid> = players.iter().map(|p| p.user_id).collect();

        tokio::spawn(async move {
            duel.run().await;

            // Cleanup after the duel ends
            registry.remove(&match_id);
            for pid in pair_ids {
                player_matches.remove(&pid);
            }

            info!(match_id = %match_id, "Duel removed from registry");
        });

        // Seat both fighters, in queue order so slots are deterministic
        if let Some(match_handle) = self.registry.get(&match_id) {
            for player in players {
                let join_input = PlayerInput {
                    user_id: player.user_id,
                    msg: ClientMsg::JoinQueue {
                        display_name: player.display_name.clone(),
                    },
                    received_at: crate::util::time::unix_millis(),
                };

                if match_handle.input_tx.send(join_input).await.is_err() {
                    error!(user_id = %player.user_id, "Failed to seat fighter in duel");
                }
            }
        }
    }

    /// Run the matchmaking service (periodic queue processing)
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_millis(500));

        loop {
            interval.tick().await;

            let connected_ids: HashSet<Uuid> =
                self.players.iter().map(|entry| *entry.key()).collect();

            let pair = {
                let mut queue = self.queue.lock().await;
                queue.take_connected_pair(&connected_ids)
            };

            if let Some(pair) = pair {
                self.create_match(pair).await;
            }
        }
    }

    /// Get current queue size
    pub async fn queue_size(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Check if player is in queue
    pub async fn is_in_queue(&self, user_id: &Uuid) -> bool {
        self.queue.lock().await.contains(user_id)
    }

    /// Get player's current duel ID
    pub fn get_player_match(&self, user_id: &Uuid) -> Option<Uuid> {
        self.player_matches.get(user_id).map(|r| *r)
    }
}

impl Clone for MatchmakingService {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            registry: self.registry.clone(),
            commentary: self.commentary.clone(),
            players: self.players.clone(),
            player_matches: self.player_matches.clone(),
        }
    }
}
