//! Game simulation modules

pub mod combat;
pub mod duel;
pub mod fighter;
pub mod particles;
pub mod physics;
pub mod snapshot;

pub use duel::{DuelMatch, MatchHandle, MatchRegistry};
pub use fighter::{Facing, Fighter, FighterState};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ws::protocol::ClientMsg;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub user_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Buttons held during one tick, snapshotted from the latest
/// `ClientMsg::InputTick`. The simulation reads this copy; the live
/// input channel never reaches the fighter directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSet {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub down: bool,
    pub attack: bool,
}
