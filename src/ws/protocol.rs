//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::combat::AttackKind;
use crate::game::fighter::{Facing, FighterState};
use crate::game::particles::{Particle, ParticleKind};
use crate::game::physics::WorldBounds;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the matchmaking queue
    JoinQueue {
        display_name: String,
    },

    /// Player input for current tick
    InputTick {
        /// Sequence number for client-side prediction reconciliation
        seq: u32,
        left: bool,
        right: bool,
        jump: bool,
        down: bool,
        attack: bool,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the queue or the current match
    LeaveMatch,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        user_id: Uuid,
        server_time: u64,
    },

    /// Queued for matchmaking
    QueueJoined {
        position: usize,
    },

    /// Confirmation of match join
    MatchJoined {
        match_id: Uuid,
        /// Seed for deterministic random generation
        seed: u64,
        /// Slot assigned to the fighter that just joined
        slot: u8,
        /// Arena extent
        bounds: WorldBounds,
        /// Both fighters at join time
        fighters: Vec<FighterInfo>,
    },

    /// Opponent left the match
    PlayerLeft {
        user_id: Uuid,
        reason: String,
    },

    /// Game state snapshot (sent at regular intervals)
    Snapshot {
        /// Server tick number
        tick: u64,
        /// Both fighter states
        fighters: Vec<FighterSnapshot>,
        /// Live particles
        particles: Vec<ParticleSnapshot>,
        /// Events that occurred since last snapshot
        events: Vec<GameEvent>,
    },

    /// Match countdown starting
    MatchCountdown {
        seconds_remaining: u32,
    },

    /// Match has started
    MatchStarted {
        tick: u64,
    },

    /// Match has ended
    MatchEnd {
        winner_user_id: Option<Uuid>,
        /// Match statistics
        stats: MatchStats,
    },

    /// Post-match color commentary
    Commentary {
        text: String,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Fighter identity for lobby/join
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FighterInfo {
    pub user_id: Uuid,
    pub display_name: String,
    pub slot: u8,
    /// Display color, a CSS hex string
    pub color: String,
}

/// Fighter state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FighterSnapshot {
    pub user_id: Uuid,
    pub slot: u8,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub facing: Facing,
    /// Health (0-100)
    pub health: f32,
    /// Energy (0-100)
    pub energy: f32,
    pub state: FighterState,
    /// Ticks spent in the current state
    pub frame_timer: u32,
    pub grounded: bool,
    /// Ticks until another attack may start (0 = ready)
    pub attack_cooldown: u32,
    /// Last processed input sequence
    pub last_input_seq: u32,
}

/// Particle state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub x: f32,
    pub y: f32,
    pub life: f32,
    pub color: String,
    pub radius: f32,
    pub kind: ParticleKind,
}

impl From<&Particle> for ParticleSnapshot {
    fn from(p: &Particle) -> Self {
        Self {
            x: p.x,
            y: p.y,
            life: p.life,
            color: p.color.to_string(),
            radius: p.radius,
            kind: p.kind,
        }
    }
}

/// Game events (attacks, hits, knockouts)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Fighter left the ground
    Jumped {
        user_id: Uuid,
    },

    /// Slide started
    SlideStarted {
        user_id: Uuid,
    },

    /// Attack swing started
    AttackStarted {
        user_id: Uuid,
        kind: AttackKind,
    },

    /// Hit registered
    Hit {
        attacker_id: Uuid,
        target_id: Uuid,
        damage: f32,
        x: f32,
        y: f32,
    },

    /// Fighter knocked out
    Knockout {
        winner_id: Uuid,
        loser_id: Uuid,
    },
}

/// Match statistics at end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStats {
    pub duration_secs: u32,
    pub winner_name: Option<String>,
    pub loser_name: Option<String>,
    /// Winner health remaining at the final blow
    pub winner_health: f32,
    pub fighter_stats: Vec<FighterMatchStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FighterMatchStats {
    pub user_id: Uuid,
    pub display_name: String,
    pub slot: u8,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub attacks_launched: u32,
    pub hits_landed: u32,
    pub health_remaining: f32,
    pub won: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_tick_parses_from_wire_json() {
        let raw = r#"{"type":"input_tick","seq":42,"left":false,"right":true,"jump":false,"down":false,"attack":true}"#;
        let msg: ClientMsg = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMsg::InputTick {
                seq, right, attack, ..
            } => {
                assert_eq!(seq, 42);
                assert!(right);
                assert!(attack);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn server_msgs_tag_with_snake_case_type() {
        let msg = ServerMsg::MatchCountdown {
            seconds_remaining: 3,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"match_countdown""#));

        let msg = ServerMsg::Commentary {
            text: "What a duel!".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"commentary""#));
    }

    #[test]
    fn game_events_tag_with_event_type() {
        let ev = GameEvent::AttackStarted {
            user_id: Uuid::nil(),
            kind: AttackKind::Jump,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains(r#""event_type":"attack_started""#));
        assert!(json.contains(r#""kind":"jump""#));
    }
}
