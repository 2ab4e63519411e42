//! Duel state and authoritative tick loop
//!
//! Each duel runs on its own tokio task at a fixed 60 ticks per second.
//! Inputs arrive over an mpsc channel and are drained at the top of
//! every tick; snapshots fan out over a broadcast channel at 30 Hz.

use dashmap::DashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commentary::CommentaryService;
use crate::util::time::{unix_millis, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{
    ClientMsg, FighterInfo, FighterMatchStats, GameEvent, MatchStats, ServerMsg,
};

use super::combat::AttackKind;
use super::fighter::{Facing, Fighter, FighterState};
use super::particles::{sakura_field, update_particles, Particle};
use super::physics::WorldBounds;
use super::snapshot::SnapshotBuilder;
use super::{ButtonSet, PlayerInput};

/// Pre-fight countdown length
const COUNTDOWN_TICKS: u32 = 3 * SIMULATION_TPS;

/// Per-slot presentation and spawn placement
const SLOT_COLORS: [&str; 2] = ["#3b82f6", "#ef4444"];
const SLOT_SPAWN_X: [f32; 2] = [150.0, 600.0];
const SLOT_FALLBACK_NAMES: [&str; 2] = ["Blue Ronin", "Red Samurai"];

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Waiting for both fighters
    Waiting,
    /// Countdown before start
    Countdown,
    /// Duel in progress
    InProgress,
    /// Duel ended
    Ended,
}

/// Duel state (owned by the match task)
pub struct MatchState {
    pub id: Uuid,
    pub seed: u64,
    pub phase: MatchPhase,
    pub tick: u64,
    pub bounds: WorldBounds,
    /// Index 0 is slot 1, index 1 is slot 2
    pub fighters: Vec<Fighter>,
    pub particles: Vec<Particle>,
    pub rng: ChaCha8Rng,
    pub start_time: Option<u64>,
    pub countdown_ticks: u32,
    /// Set when a fighter disconnects mid-duel; suppresses the end report
    pub aborted: bool,
}

impl MatchState {
    pub fn new(id: Uuid, seed: u64) -> Self {
        Self {
            id,
            seed,
            phase: MatchPhase::Waiting,
            tick: 0,
            bounds: WorldBounds::default(),
            fighters: Vec::with_capacity(2),
            particles: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            start_time: None,
            countdown_ticks: COUNTDOWN_TICKS,
            aborted: false,
        }
    }

    pub fn winner(&self) -> Option<&Fighter> {
        self.fighters.iter().find(|f| f.state == FighterState::Win)
    }
}

/// Handle to a running duel
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<std::sync::atomic::AtomicUsize>,
}

impl MatchHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Registry of all active duels
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches.iter().map(|m| m.value().player_count()).sum()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative duel
pub struct DuelMatch {
    state: MatchState,
    input_rx: mpsc::Receiver<PlayerInput>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    /// Events produced since the last snapshot went out
    pending_events: Vec<GameEvent>,
    player_count: Arc<std::sync::atomic::AtomicUsize>,
    commentary: Arc<CommentaryService>,
}

impl DuelMatch {
    pub fn new(id: Uuid, seed: u64, commentary: Arc<CommentaryService>) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handle = MatchHandle {
            id,
            input_tx,
            snapshot_tx: snapshot_tx.clone(),
            player_count: player_count.clone(),
        };

        let snapshot_interval = SIMULATION_TPS / SNAPSHOT_TPS;
        let duel = Self {
            state: MatchState::new(id, seed),
            input_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(snapshot_interval),
            pending_events: Vec::new(),
            player_count,
            commentary,
        };

        (duel, handle)
    }

    /// Run the authoritative tick loop
    pub async fn run(mut self) {
        info!(match_id = %self.state.id, "Duel task started");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            // Drain input queue
            self.process_inputs();

            // Run simulation tick, broadcast a snapshot when one is due
            if let Some(snapshot) = self.advance() {
                let _ = self.snapshot_tx.send(snapshot);
            }

            if self.state.phase == MatchPhase::Ended {
                info!(match_id = %self.state.id, "Duel ended");
                break;
            }
        }

        if self.state.aborted {
            return;
        }

        let winner = self.state.winner().map(|f| f.user_id);
        let stats = self.build_match_stats();

        let _ = self.snapshot_tx.send(ServerMsg::MatchEnd {
            winner_user_id: winner,
            stats: stats.clone(),
        });

        // Commentary is best-effort flavor; the result is already final
        let text = self.commentary.generate(&stats).await;
        let _ = self.snapshot_tx.send(ServerMsg::Commentary { text });
    }

    /// Advance one tick. Events from ticks that fall between snapshots
    /// are held back and drained into the next snapshot that goes out.
    fn advance(&mut self) -> Option<ServerMsg> {
        let events = self.run_tick();
        self.pending_events.extend(events);

        if self.snapshot_builder.should_send() {
            Some(self.snapshot_builder.build(
                self.state.tick,
                &self.state.fighters,
                &self.state.particles,
                std::mem::take(&mut self.pending_events),
            ))
        } else {
            None
        }
    }

    /// Process all pending inputs from players
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            match input.msg {
                ClientMsg::JoinQueue { display_name } => {
                    self.handle_join(input.user_id, display_name);
                }
                ClientMsg::InputTick {
                    seq,
                    left,
                    right,
                    jump,
                    down,
                    attack,
                } => {
                    self.handle_input(
                        input.user_id,
                        seq,
                        ButtonSet {
                            left,
                            right,
                            jump,
                            down,
                            attack,
                        },
                    );
                }
                ClientMsg::Ping { .. } => {
                    // Answered by the session handler, never forwarded here
                }
                ClientMsg::LeaveMatch => {
                    self.handle_leave(input.user_id);
                }
            }
        }
    }

    /// Seat a fighter in the next free slot
    fn handle_join(&mut self, user_id: Uuid, display_name: String) {
        if self.state.fighters.iter().any(|f| f.user_id == user_id) {
            warn!(user_id = %user_id, "Fighter already in duel");
            return;
        }

        if self.state.fighters.len() >= 2 {
            let _ = self.snapshot_tx.send(ServerMsg::Error {
                code: "match_full".to_string(),
                message: "Duel already has two fighters".to_string(),
            });
            return;
        }

        let slot_idx = self.state.fighters.len();
        let name = if display_name.trim().is_empty() {
            SLOT_FALLBACK_NAMES[slot_idx].to_string()
        } else {
            display_name
        };
        let facing = if slot_idx == 0 {
            Facing::Right
        } else {
            Facing::Left
        };

        let fighter = Fighter::new(
            (slot_idx + 1) as u8,
            user_id,
            name,
            SLOT_COLORS[slot_idx],
            SLOT_SPAWN_X[slot_idx],
            facing,
        );
        self.state.fighters.push(fighter);
        self.player_count
            .store(self.state.fighters.len(), std::sync::atomic::Ordering::Relaxed);

        let fighters: Vec<FighterInfo> = self
            .state
            .fighters
            .iter()
            .map(|f| FighterInfo {
                user_id: f.user_id,
                display_name: f.display_name.clone(),
                slot: f.slot,
                color: f.color.to_string(),
            })
            .collect();

        let _ = self.snapshot_tx.send(ServerMsg::MatchJoined {
            match_id: self.state.id,
            seed: self.state.seed,
            slot: (slot_idx + 1) as u8,
            bounds: self.state.bounds,
            fighters,
        });

        info!(
            match_id = %self.state.id,
            user_id = %user_id,
            slot = slot_idx + 1,
            "Fighter joined duel"
        );

        if self.state.phase == MatchPhase::Waiting && self.state.fighters.len() == 2 {
            self.state.phase = MatchPhase::Countdown;
            self.state.countdown_ticks = COUNTDOWN_TICKS;
            let _ = self.snapshot_tx.send(ServerMsg::MatchCountdown {
                seconds_remaining: COUNTDOWN_TICKS / SIMULATION_TPS,
            });
        }
    }

    /// Latch the newest input snapshot for a fighter
    fn handle_input(&mut self, user_id: Uuid, seq: u32, buttons: ButtonSet) {
        if let Some(fighter) = self
            .state
            .fighters
            .iter_mut()
            .find(|f| f.user_id == user_id)
        {
            if !fighter.state.is_terminal() && seq > fighter.last_input_seq {
                fighter.last_input_seq = seq;
                fighter.current_input = buttons;
            }
        }
    }

    /// A disconnect aborts the duel; there is no forfeit scoring
    fn handle_leave(&mut self, user_id: Uuid) {
        if let Some(idx) = self
            .state
            .fighters
            .iter()
            .position(|f| f.user_id == user_id)
        {
            let fighter = self.state.fighters.remove(idx);
            self.player_count
                .store(self.state.fighters.len(), std::sync::atomic::Ordering::Relaxed);

            let _ = self.snapshot_tx.send(ServerMsg::PlayerLeft {
                user_id,
                reason: "disconnected".to_string(),
            });

            info!(
                match_id = %self.state.id,
                user_id = %user_id,
                display_name = %fighter.display_name,
                "Fighter left duel"
            );

            if self.state.phase != MatchPhase::Ended {
                self.state.phase = MatchPhase::Ended;
                self.state.aborted = true;
            }
        }
    }

    /// Run a single simulation tick
    fn run_tick(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.state.tick += 1;

        match self.state.phase {
            MatchPhase::Waiting => {
                // Nothing to simulate yet
            }
            MatchPhase::Countdown => {
                self.state.countdown_ticks -= 1;
                if self.state.countdown_ticks == 0 {
                    self.state.phase = MatchPhase::InProgress;
                    self.state.start_time = Some(unix_millis());
                    self.state.particles =
                        sakura_field(self.state.bounds, &mut self.state.rng);
                    let _ = self.snapshot_tx.send(ServerMsg::MatchStarted {
                        tick: self.state.tick,
                    });
                    info!(match_id = %self.state.id, "Duel started");
                } else if self.state.countdown_ticks % SIMULATION_TPS == 0 {
                    let _ = self.snapshot_tx.send(ServerMsg::MatchCountdown {
                        seconds_remaining: self.state.countdown_ticks / SIMULATION_TPS,
                    });
                }
            }
            MatchPhase::InProgress => {
                events.extend(self.step_fighters());
                update_particles(&mut self.state.particles, self.state.bounds);
                self.check_win_condition();
            }
            MatchPhase::Ended => {
                // Duel is over
            }
        }

        events
    }

    /// Advance both fighters in fixed slot order and derive the events
    /// a client needs for presentation from the state diff.
    fn step_fighters(&mut self) -> Vec<GameEvent> {
        let before: Vec<(FighterState, f32)> = self
            .state
            .fighters
            .iter()
            .map(|f| (f.state, f.health))
            .collect();

        let bounds = self.state.bounds;
        let mut emitted: Vec<Particle> = Vec::new();

        // Slot 1 always resolves before slot 2
        if let [f1, f2] = &mut self.state.fighters[..] {
            let held = f1.current_input;
            emitted.extend(f1.step(f2, held, bounds, &mut self.state.rng));
            let held = f2.current_input;
            emitted.extend(f2.step(f1, held, bounds, &mut self.state.rng));
        }
        self.state.particles.extend(emitted);

        let mut events = Vec::new();
        for (idx, fighter) in self.state.fighters.iter().enumerate() {
            let (old_state, old_health) = before[idx];
            let opponent = &self.state.fighters[1 - idx];

            if fighter.state != old_state {
                match fighter.state {
                    FighterState::Jump => events.push(GameEvent::Jumped {
                        user_id: fighter.user_id,
                    }),
                    FighterState::Slide => events.push(GameEvent::SlideStarted {
                        user_id: fighter.user_id,
                    }),
                    FighterState::Attack => events.push(GameEvent::AttackStarted {
                        user_id: fighter.user_id,
                        kind: AttackKind::Ground,
                    }),
                    FighterState::JumpAttack => events.push(GameEvent::AttackStarted {
                        user_id: fighter.user_id,
                        kind: AttackKind::Jump,
                    }),
                    FighterState::Dead => events.push(GameEvent::Knockout {
                        winner_id: opponent.user_id,
                        loser_id: fighter.user_id,
                    }),
                    FighterState::Idle
                    | FighterState::Walk
                    | FighterState::Hurt
                    | FighterState::Win => {}
                }
            }

            if fighter.health < old_health {
                events.push(GameEvent::Hit {
                    attacker_id: opponent.user_id,
                    target_id: fighter.user_id,
                    damage: old_health - fighter.health,
                    x: fighter.x,
                    y: fighter.y,
                });
            }
        }

        events
    }

    /// A duel ends the tick a fighter dies
    fn check_win_condition(&mut self) {
        if self.state.phase != MatchPhase::InProgress {
            return;
        }

        if self
            .state
            .fighters
            .iter()
            .any(|f| f.state == FighterState::Dead)
        {
            self.state.phase = MatchPhase::Ended;
            self.snapshot_builder.force_next();
        }
    }

    /// Build match stats
    fn build_match_stats(&self) -> MatchStats {
        let duration = self
            .state
            .start_time
            .map(|start| ((unix_millis() - start) / 1000) as u32)
            .unwrap_or(0);

        let winner = self.state.winner();

        let fighter_stats: Vec<FighterMatchStats> = self
            .state
            .fighters
            .iter()
            .map(|f| FighterMatchStats {
                user_id: f.user_id,
                display_name: f.display_name.clone(),
                slot: f.slot,
                damage_dealt: f.damage_dealt,
                damage_taken: f.damage_taken,
                attacks_launched: f.attacks_launched,
                hits_landed: f.hits_landed,
                health_remaining: f.health,
                won: f.state == FighterState::Win,
            })
            .collect();

        MatchStats {
            duration_secs: duration,
            winner_name: winner.map(|f| f.display_name.clone()),
            loser_name: self
                .state
                .fighters
                .iter()
                .find(|f| f.state != FighterState::Win)
                .map(|f| f.display_name.clone()),
            winner_health: winner.map(|f| f.health).unwrap_or(0.0),
            fighter_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn commentary() -> Arc<CommentaryService> {
        Arc::new(CommentaryService::new(&Config::for_tests()))
    }

    fn join(duel: &mut DuelMatch, name: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        duel.handle_join(user_id, name.to_string());
        user_id
    }

    fn new_duel() -> DuelMatch {
        let (duel, _handle) = DuelMatch::new(Uuid::new_v4(), 42, commentary());
        duel
    }

    #[test]
    fn two_joins_trigger_the_countdown() {
        let mut duel = new_duel();
        join(&mut duel, "a");
        assert_eq!(duel.state.phase, MatchPhase::Waiting);
        join(&mut duel, "b");
        assert_eq!(duel.state.phase, MatchPhase::Countdown);
    }

    #[test]
    fn third_join_is_rejected() {
        let mut duel = new_duel();
        join(&mut duel, "a");
        join(&mut duel, "b");
        join(&mut duel, "c");
        assert_eq!(duel.state.fighters.len(), 2);
    }

    #[test]
    fn blank_names_fall_back_to_slot_defaults() {
        let mut duel = new_duel();
        join(&mut duel, "  ");
        join(&mut duel, "");
        assert_eq!(duel.state.fighters[0].display_name, "Blue Ronin");
        assert_eq!(duel.state.fighters[1].display_name, "Red Samurai");
    }

    #[test]
    fn countdown_runs_down_then_the_duel_begins() {
        let mut duel = new_duel();
        join(&mut duel, "a");
        join(&mut duel, "b");

        for _ in 0..COUNTDOWN_TICKS {
            duel.run_tick();
        }
        assert_eq!(duel.state.phase, MatchPhase::InProgress);
        assert!(duel.state.start_time.is_some());
        assert!(!duel.state.particles.is_empty(), "sakura field spawned");
    }

    #[test]
    fn stale_input_sequence_is_ignored() {
        let mut duel = new_duel();
        let a = join(&mut duel, "a");
        join(&mut duel, "b");

        duel.handle_input(
            a,
            5,
            ButtonSet {
                right: true,
                ..ButtonSet::default()
            },
        );
        duel.handle_input(
            a,
            3,
            ButtonSet {
                left: true,
                ..ButtonSet::default()
            },
        );

        let fighter = &duel.state.fighters[0];
        assert_eq!(fighter.last_input_seq, 5);
        assert!(fighter.current_input.right);
        assert!(!fighter.current_input.left);
    }

    #[test]
    fn knockout_ends_the_duel_with_events() {
        let mut duel = new_duel();
        let a = join(&mut duel, "a");
        let b = join(&mut duel, "b");
        for _ in 0..COUNTDOWN_TICKS {
            duel.run_tick();
        }

        // Put the fighters in range and one hit from the end
        duel.state.fighters[0].x = 150.0;
        duel.state.fighters[1].x = 210.0;
        duel.state.fighters[1].health = 10.0;
        duel.handle_input(
            a,
            1,
            ButtonSet {
                attack: true,
                ..ButtonSet::default()
            },
        );

        // Land both fighters first so the attack can start
        for _ in 0..60 {
            duel.state.fighters[0].x = 150.0;
            duel.state.fighters[1].x = 210.0;
            if duel.state.phase == MatchPhase::Ended {
                break;
            }
            let events = duel.run_tick();
            if events
                .iter()
                .any(|e| matches!(e, GameEvent::Knockout { .. }))
            {
                let ko = events
                    .iter()
                    .find_map(|e| match e {
                        GameEvent::Knockout {
                            winner_id,
                            loser_id,
                        } => Some((*winner_id, *loser_id)),
                        _ => None,
                    })
                    .unwrap();
                assert_eq!(ko, (a, b));
            }
        }

        assert_eq!(duel.state.phase, MatchPhase::Ended);
        assert_eq!(duel.state.fighters[0].state, FighterState::Win);
        assert_eq!(duel.state.fighters[1].state, FighterState::Dead);

        let stats = duel.build_match_stats();
        assert_eq!(stats.winner_name.as_deref(), Some("a"));
        assert_eq!(stats.loser_name.as_deref(), Some("b"));
        assert!(stats.fighter_stats.iter().any(|s| s.won));
    }

    #[test]
    fn a_hit_between_snapshots_rides_along_in_the_next_one() {
        use super::super::physics::{FIGHTER_HEIGHT, GROUND_Y};

        let mut duel = new_duel();
        let a = join(&mut duel, "a");
        join(&mut duel, "b");
        for _ in 0..COUNTDOWN_TICKS {
            let _ = duel.advance();
        }
        assert_eq!(duel.state.phase, MatchPhase::InProgress);

        // Grounded and inside the strike zone
        for (fighter, x) in duel.state.fighters.iter_mut().zip([150.0, 210.0]) {
            fighter.x = x;
            fighter.y = GROUND_Y - FIGHTER_HEIGHT;
            fighter.grounded = true;
        }
        duel.handle_input(
            a,
            1,
            ButtonSet {
                attack: true,
                ..ButtonSet::default()
            },
        );

        // The attack connects on a tick the snapshot cadence skips
        assert!(duel.advance().is_none());

        match duel.advance() {
            Some(ServerMsg::Snapshot { events, .. }) => {
                assert!(
                    events
                        .iter()
                        .any(|e| matches!(e, GameEvent::AttackStarted { .. })),
                    "swing from the skipped tick is carried over"
                );
                assert!(
                    events.iter().any(|e| matches!(e, GameEvent::Hit { .. })),
                    "hit from the skipped tick is carried over"
                );
            }
            other => panic!("expected a snapshot, got {other:?}"),
        }
    }

    #[test]
    fn leave_aborts_the_duel() {
        let mut duel = new_duel();
        let a = join(&mut duel, "a");
        join(&mut duel, "b");

        duel.handle_leave(a);
        assert_eq!(duel.state.phase, MatchPhase::Ended);
        assert!(duel.state.aborted);
        assert_eq!(duel.state.fighters.len(), 1);
    }
}
