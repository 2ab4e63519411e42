//! Snapshot building and pacing

use crate::ws::protocol::{FighterSnapshot, GameEvent, ParticleSnapshot, ServerMsg};

use super::fighter::Fighter;
use super::particles::Particle;

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message
    pub fn build(
        &self,
        tick: u64,
        fighters: &[Fighter],
        particles: &[Particle],
        events: Vec<GameEvent>,
    ) -> ServerMsg {
        let fighter_snapshots = fighters
            .iter()
            .map(|f| FighterSnapshot {
                user_id: f.user_id,
                slot: f.slot,
                x: f.x,
                y: f.y,
                vel_x: f.vel_x,
                vel_y: f.vel_y,
                facing: f.facing,
                health: f.health,
                energy: f.energy,
                state: f.state,
                frame_timer: f.frame_timer,
                grounded: f.grounded,
                attack_cooldown: f.attack_cooldown,
                last_input_seq: f.last_input_seq,
            })
            .collect();

        ServerMsg::Snapshot {
            tick,
            fighters: fighter_snapshots,
            particles: particles.iter().map(ParticleSnapshot::from).collect(),
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_every_interval_ticks() {
        let mut builder = SnapshotBuilder::new(2);
        assert!(!builder.should_send());
        assert!(builder.should_send());
        assert!(!builder.should_send());
        assert!(builder.should_send());
    }

    #[test]
    fn force_next_overrides_pacing() {
        let mut builder = SnapshotBuilder::new(10);
        builder.force_next();
        assert!(builder.should_send());
        assert!(!builder.should_send());
    }
}
