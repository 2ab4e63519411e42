//! Matchmaking - queue and duel creation

pub mod queue;
pub mod service;

pub use queue::{DuelQueue, QueuedPlayer};
pub use service::MatchmakingService;
