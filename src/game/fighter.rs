//! Fighter entity and the per-tick simulation step
//!
//! One `Fighter::step` call advances a single combatant by one tick:
//! input-gated state transitions, fixed-step physics, ground/wall
//! resolution, attack timers, hit resolution against the opponent and
//! the death/win flip. The step mutates `self` freely and touches the
//! opponent only through the explicit combat effects (health, state,
//! knockback). Emitted particles are returned for the match loop to
//! own.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::combat::{
    apply_damage, ground_attack_hitbox, hurtbox, jump_attack_hitbox, AttackKind, AttackStats,
    ATTACK_COOLDOWN, JUMP_ATTACK_KNOCKBACK_MULT, KNOCKBACK_X, KNOCKBACK_Y,
};
use super::particles::{dust_burst, impact_burst, Particle};
use super::physics::{
    Aabb, WorldBounds, FIGHTER_HEIGHT, FIGHTER_WIDTH, FRICTION, GRAVITY, GROUND_Y, HURT_FRICTION,
    JUMP_FORCE, MOVE_ACCEL,
};
use super::ButtonSet;

pub const MAX_HEALTH: f32 = 100.0;
pub const MAX_ENERGY: f32 = 100.0;
/// Passive energy gain per tick, up to the cap
pub const ENERGY_REGEN: f32 = 0.3;

pub const SLIDE_SPEED: f32 = 14.0;
pub const SLIDE_DURATION: u32 = 25;
pub const SLIDE_COST: f32 = 30.0;

/// Which way the fighter is looking; flips only while it has control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Right,
    Left,
}

impl Facing {
    /// +1 for right, -1 for left
    pub fn sign(self) -> f32 {
        match self {
            Facing::Right => 1.0,
            Facing::Left => -1.0,
        }
    }
}

/// The behavior state machine. Exactly one state is active at a time;
/// every transition site matches exhaustively so a new state cannot be
/// added without revisiting them all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FighterState {
    Idle,
    Walk,
    Jump,
    Attack,
    JumpAttack,
    Slide,
    Hurt,
    Dead,
    Win,
}

impl FighterState {
    /// Voluntary control: input is honored in every state except the
    /// involuntary ones
    pub fn has_control(self) -> bool {
        !matches!(
            self,
            FighterState::Hurt | FighterState::Slide | FighterState::Dead | FighterState::Win
        )
    }

    /// Dead and Win are terminal: the fighter is frozen for the rest of
    /// the match
    pub fn is_terminal(self) -> bool {
        matches!(self, FighterState::Dead | FighterState::Win)
    }
}

/// A single combatant (authoritative server state)
#[derive(Debug, Clone)]
pub struct Fighter {
    // Identity, immutable after creation
    pub slot: u8,
    pub user_id: Uuid,
    pub display_name: String,
    pub color: &'static str,

    // Kinematics
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub width: f32,
    pub height: f32,
    pub facing: Facing,

    // Resources
    pub health: f32,
    pub energy: f32,

    // Behavior
    pub state: FighterState,
    /// Ticks since the current state was entered
    pub frame_timer: u32,
    pub grounded: bool,
    /// Countdown blocking new attacks, independent of `frame_timer`
    pub attack_cooldown: u32,
    /// Live only while an attack's damage window is open; consumed the
    /// instant it registers a hit
    pub hitbox: Option<Aabb>,

    // Input tracking (written by the match loop, read by `step`)
    pub current_input: ButtonSet,
    pub last_input_seq: u32,

    // Stats
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub attacks_launched: u32,
    pub hits_landed: u32,
}

impl Fighter {
    pub fn new(
        slot: u8,
        user_id: Uuid,
        display_name: String,
        color: &'static str,
        spawn_x: f32,
        facing: Facing,
    ) -> Self {
        Self {
            slot,
            user_id,
            display_name,
            color,
            x: spawn_x,
            y: 0.0, // falls to the ground on the first ticks
            vel_x: 0.0,
            vel_y: 0.0,
            width: FIGHTER_WIDTH,
            height: FIGHTER_HEIGHT,
            facing,
            health: MAX_HEALTH,
            energy: MAX_ENERGY,
            state: FighterState::Idle,
            frame_timer: 0,
            grounded: false,
            attack_cooldown: 0,
            hitbox: None,
            current_input: ButtonSet::default(),
            last_input_seq: 0,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            attacks_launched: 0,
            hits_landed: 0,
        }
    }

    /// Transition to `next`, resetting the frame timer on a genuine
    /// state change. Re-asserting the current state keeps the timer so
    /// the animation phase survives Idle/Walk maintenance.
    fn enter_state(&mut self, next: FighterState) {
        if self.state != next {
            self.state = next;
            self.frame_timer = 0;
        }
    }

    /// Advance this fighter by one simulation tick.
    ///
    /// `held` is a read-only snapshot of the buttons held this tick.
    /// Returns the particles emitted (slide dust, hit feedback); the
    /// caller owns their decay.
    pub fn step(
        &mut self,
        opponent: &mut Fighter,
        held: ButtonSet,
        bounds: WorldBounds,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Particle> {
        let mut particles = Vec::new();

        if self.state.is_terminal() {
            return particles;
        }

        // Passive energy regen, in every non-terminal state
        self.energy = (self.energy + ENERGY_REGEN).min(MAX_ENERGY);

        let can_control = self.state.has_control();
        let mut move_x = 0.0_f32;

        if can_control {
            if held.left {
                move_x = -1.0;
            }
            if held.right {
                move_x = 1.0;
            }

            if held.jump && self.grounded && matches!(self.state, FighterState::Idle | FighterState::Walk)
            {
                self.vel_y = JUMP_FORCE;
                self.grounded = false;
                self.enter_state(FighterState::Jump);
            }

            if held.down
                && self.grounded
                && matches!(self.state, FighterState::Idle | FighterState::Walk)
                && self.energy >= SLIDE_COST
            {
                self.enter_state(FighterState::Slide);
                self.energy -= SLIDE_COST;
                self.vel_x = self.facing.sign() * SLIDE_SPEED;
                particles.extend(dust_burst(
                    self.x + self.width / 2.0,
                    self.y + self.height,
                    self.facing.sign(),
                    rng,
                ));
            }

            if held.attack && self.attack_cooldown == 0 {
                if self.state == FighterState::Jump {
                    let stats = AttackStats::for_kind(AttackKind::Jump);
                    if self.energy >= stats.energy_cost {
                        debug_assert!(self.hitbox.is_none(), "hitbox live outside an attack");
                        self.enter_state(FighterState::JumpAttack);
                        self.attack_cooldown = ATTACK_COOLDOWN;
                        self.energy -= stats.energy_cost;
                        // brief hover: any downward speed is cancelled,
                        // but the cut never regains height
                        self.vel_y = self.vel_y.min(0.0);
                        self.hitbox = Some(jump_attack_hitbox(
                            self.x,
                            self.y,
                            self.width,
                            self.height,
                            self.facing,
                        ));
                        self.attacks_launched += 1;
                    }
                } else if self.grounded
                    && matches!(self.state, FighterState::Idle | FighterState::Walk)
                {
                    debug_assert!(self.hitbox.is_none(), "hitbox live outside an attack");
                    self.enter_state(FighterState::Attack);
                    self.attack_cooldown = ATTACK_COOLDOWN;
                    self.hitbox =
                        Some(ground_attack_hitbox(self.x, self.y, self.width, self.facing));
                    self.attacks_launched += 1;
                }
            }
        }

        // Physics integration
        match self.state {
            FighterState::Slide => {
                // Closed-form deceleration over the slide, not input-driven
                let t = self.frame_timer as f32;
                self.vel_x =
                    self.facing.sign() * SLIDE_SPEED * (1.0 - t / (SLIDE_DURATION as f32 * 1.5));
            }
            FighterState::Hurt => {
                self.vel_x *= HURT_FRICTION;
            }
            FighterState::Idle
            | FighterState::Walk
            | FighterState::Jump
            | FighterState::Attack
            | FighterState::JumpAttack => {
                self.vel_x += move_x * MOVE_ACCEL;
                self.vel_x *= FRICTION;
            }
            FighterState::Dead | FighterState::Win => unreachable!("terminal states returned early"),
        }

        self.vel_y += GRAVITY;
        self.x += self.vel_x;
        self.y += self.vel_y;

        // Ground collision: clamp, kill vertical speed, land
        if self.y + self.height >= GROUND_Y {
            self.y = GROUND_Y - self.height;
            self.vel_y = 0.0;
            self.grounded = true;
            if matches!(
                self.state,
                FighterState::Jump | FighterState::JumpAttack | FighterState::Hurt
            ) {
                // landing cancels an in-flight attack
                self.hitbox = None;
                self.enter_state(FighterState::Idle);
            }
        }

        // Wall collision: clamp to arena, no bounce
        if self.x < 0.0 {
            self.x = 0.0;
            self.vel_x = 0.0;
        }
        if self.x + self.width > bounds.width {
            self.x = bounds.width - self.width;
            self.vel_x = 0.0;
        }

        // Facing and Walk/Idle maintenance. Direction is locked while an
        // attack is active, and involuntary states never turn.
        if self.state.has_control()
            && !matches!(self.state, FighterState::Attack | FighterState::JumpAttack)
        {
            if move_x != 0.0 {
                self.facing = if move_x > 0.0 {
                    Facing::Right
                } else {
                    Facing::Left
                };
                if self.grounded {
                    self.enter_state(FighterState::Walk);
                }
            } else if self.grounded {
                self.enter_state(FighterState::Idle);
            }
        }

        // Cooldown counts down every tick regardless of state
        if self.attack_cooldown > 0 {
            self.attack_cooldown -= 1;
        }

        // State-duration expiry
        match self.state {
            FighterState::Attack => {
                if self.frame_timer > AttackStats::for_kind(AttackKind::Ground).duration {
                    self.hitbox = None;
                    if self.grounded {
                        self.enter_state(FighterState::Idle);
                    }
                }
            }
            FighterState::JumpAttack => {
                if self.frame_timer > AttackStats::for_kind(AttackKind::Jump).duration {
                    self.hitbox = None;
                    if !self.grounded {
                        self.enter_state(FighterState::Jump);
                    }
                }
            }
            FighterState::Slide => {
                if self.frame_timer > SLIDE_DURATION {
                    self.enter_state(FighterState::Idle);
                    self.vel_x = 0.0;
                }
            }
            FighterState::Idle
            | FighterState::Walk
            | FighterState::Jump
            | FighterState::Hurt
            | FighterState::Dead
            | FighterState::Win => {}
        }

        // Hit resolution: one test per tick while a hitbox is live.
        // A defender already out of the match cannot be hit.
        if let Some(hb) = self.hitbox {
            if !opponent.state.is_terminal() {
                let target = hurtbox(opponent);
                if hb.overlaps(&target) {
                    let kind = if self.state == FighterState::JumpAttack {
                        AttackKind::Jump
                    } else {
                        AttackKind::Ground
                    };
                    let stats = AttackStats::for_kind(kind);

                    // consume the hitbox so a swing hits at most once
                    self.hitbox = None;

                    let (new_health, _) = apply_damage(opponent.health, stats.damage);
                    let dealt = opponent.health - new_health;
                    opponent.health = new_health;
                    opponent.state = FighterState::Hurt;
                    opponent.frame_timer = 0;

                    let mult = if kind == AttackKind::Jump {
                        JUMP_ATTACK_KNOCKBACK_MULT
                    } else {
                        1.0
                    };
                    opponent.vel_x = self.facing.sign() * KNOCKBACK_X * mult;
                    opponent.vel_y = KNOCKBACK_Y;
                    opponent.grounded = false;

                    self.hits_landed += 1;
                    self.damage_dealt += dealt;
                    opponent.damage_taken += dealt;

                    particles.extend(impact_burst(
                        opponent.x + opponent.width / 2.0,
                        opponent.y + opponent.height / 3.0,
                        rng,
                    ));
                }
            }
        }

        // Death check: victim dies and attacker wins in the same tick
        if opponent.health <= 0.0 && opponent.state != FighterState::Dead {
            opponent.state = FighterState::Dead;
            opponent.frame_timer = 0;
            self.enter_state(FighterState::Win);
        }

        self.frame_timer += 1;
        particles
    }
}
