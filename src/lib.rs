//! Duel Game Server - authoritative server for two-player samurai duels
//!
//! Library surface so the simulation can be driven from integration
//! tests; the binary in `main.rs` wires it to the network.

pub mod app;
pub mod commentary;
pub mod config;
pub mod game;
pub mod http;
pub mod matchmaking;
pub mod util;
pub mod ws;
