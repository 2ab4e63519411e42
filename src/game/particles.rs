//! Transient visual-event particles
//!
//! The fighter step emits particles; the match loop owns them, decays
//! them each tick and drops them when their life runs out. Sakura
//! petals are background decoration: spawned once per duel and
//! perpetually wrapped, never culled.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::physics::{WorldBounds, GROUND_Y};

/// Life removed from a combat particle every tick
pub const PARTICLE_FADE: f32 = 0.05;
/// Downward pull on combat particles (blood falls, sparks arc)
pub const PARTICLE_GRAVITY: f32 = 0.5;
/// Petals in the background field
pub const SAKURA_COUNT: usize = 30;

pub const DUST_COLOR: &str = "#e3d5c8";
pub const BLOOD_COLOR: &str = "#b30000";
pub const SPARK_COLOR: &str = "#ffffff";
pub const SAKURA_COLOR: &str = "#ffb7b2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    Spark,
    Blood,
    Dust,
    Sakura,
}

/// Ephemeral visual record, plain data for the rendering client
#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Remaining life in (0, 1]; sakura carries a sentinel and never expires
    pub life: f32,
    pub color: &'static str,
    pub radius: f32,
    pub kind: ParticleKind,
}

/// Small forward-biased dust burst at a sliding fighter's feet.
/// `facing` is the slide direction sign (+1 right, -1 left).
pub fn dust_burst(x: f32, y: f32, facing: f32, rng: &mut ChaCha8Rng) -> Vec<Particle> {
    (0..5)
        .map(|_| Particle {
            x,
            y,
            vx: (rng.gen::<f32>() - 0.5) * 4.0 + facing,
            vy: -rng.gen::<f32>() * 2.0,
            life: 0.8,
            color: DUST_COLOR,
            radius: rng.gen::<f32>() * 4.0 + 2.0,
            kind: ParticleKind::Dust,
        })
        .collect()
}

/// Radial damage-feedback burst at the victim's upper torso, roughly
/// 70% blood and 30% spark.
pub fn impact_burst(x: f32, y: f32, rng: &mut ChaCha8Rng) -> Vec<Particle> {
    (0..12)
        .map(|_| {
            let is_spark = rng.gen::<f32>() > 0.7;
            Particle {
                x,
                y,
                vx: (rng.gen::<f32>() - 0.5) * 12.0,
                vy: (rng.gen::<f32>() - 0.5) * 12.0,
                life: 1.0,
                color: if is_spark { SPARK_COLOR } else { BLOOD_COLOR },
                radius: rng.gen::<f32>() * 6.0 + 2.0,
                kind: if is_spark {
                    ParticleKind::Spark
                } else {
                    ParticleKind::Blood
                },
            }
        })
        .collect()
}

/// Drifting petal field spawned once when a duel starts
pub fn sakura_field(bounds: WorldBounds, rng: &mut ChaCha8Rng) -> Vec<Particle> {
    (0..SAKURA_COUNT)
        .map(|_| Particle {
            x: rng.gen::<f32>() * bounds.width,
            y: rng.gen::<f32>() * bounds.height,
            vx: -0.5 - rng.gen::<f32>(),
            vy: 0.5 + rng.gen::<f32>(),
            life: 1.0,
            color: SAKURA_COLOR,
            radius: rng.gen::<f32>() * 3.0 + 1.0,
            kind: ParticleKind::Sakura,
        })
        .collect()
}

/// Advance and cull particles for one tick. Combat particles integrate
/// velocity, fall, and fade out; sakura wraps around the arena forever.
pub fn update_particles(particles: &mut Vec<Particle>, bounds: WorldBounds) {
    particles.retain_mut(|p| {
        p.x += p.vx;
        p.y += p.vy;

        match p.kind {
            ParticleKind::Sakura => {
                if p.x < 0.0 {
                    p.x = bounds.width;
                }
                if p.y > GROUND_Y {
                    p.y = 0.0;
                }
                true
            }
            ParticleKind::Spark | ParticleKind::Blood | ParticleKind::Dust => {
                p.vy += PARTICLE_GRAVITY;
                p.life -= PARTICLE_FADE;
                p.life > 0.0
            }
        }
    });
}
