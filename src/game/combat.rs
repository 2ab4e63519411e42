//! Combat resolution - attack stats, hitboxes, hurtboxes, damage

use serde::{Deserialize, Serialize};

use super::fighter::{Facing, Fighter, FighterState};
use super::physics::Aabb;

/// Ticks before another attack may start, shared by both attack kinds
/// and independent of the active window of the current swing
pub const ATTACK_COOLDOWN: u32 = 25;

/// Horizontal knockback impulse, directed away from the attacker
pub const KNOCKBACK_X: f32 = 10.0;
/// Small upward pop applied with every knockback
pub const KNOCKBACK_Y: f32 = -5.0;
/// Jump attacks knock back harder
pub const JUMP_ATTACK_KNOCKBACK_MULT: f32 = 1.2;

/// The two attack types a fighter can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    /// Standing sword swing, forward of the leading edge
    Ground,
    /// Airborne overhead cut, forward and below
    Jump,
}

/// Fixed stats per attack kind
#[derive(Debug, Clone, Copy)]
pub struct AttackStats {
    /// Damage on hit
    pub damage: f32,
    /// Ticks the hitbox stays live
    pub duration: u32,
    /// Energy spent atomically on entry
    pub energy_cost: f32,
}

impl AttackStats {
    pub fn for_kind(kind: AttackKind) -> Self {
        match kind {
            AttackKind::Ground => Self {
                damage: 10.0,
                duration: 10,
                energy_cost: 0.0,
            },
            AttackKind::Jump => Self {
                damage: 15.0,
                duration: 15,
                energy_cost: 25.0,
            },
        }
    }
}

/// Hitbox for a standing attack: extends forward from the fighter's
/// leading edge, mirrored when facing left.
pub fn ground_attack_hitbox(x: f32, y: f32, width: f32, facing: Facing) -> Aabb {
    let hx = match facing {
        Facing::Right => x + width,
        Facing::Left => x - 60.0,
    };
    Aabb::new(hx, y + 20.0, 60.0, 40.0)
}

/// Hitbox for a jump attack: forward of center and below the feet
pub fn jump_attack_hitbox(x: f32, y: f32, width: f32, height: f32, facing: Facing) -> Aabb {
    let hx = match facing {
        Facing::Right => x + width / 2.0,
        Facing::Left => x - 30.0,
    };
    Aabb::new(hx, y + height - 20.0, 50.0, 60.0)
}

/// Effective hurtbox of a defender. Normally the full bounding box; a
/// sliding fighter only exposes the lower half. This is evaluated from
/// the attacker's hit test, the defender's own step never touches it.
pub fn hurtbox(defender: &Fighter) -> Aabb {
    if defender.state == FighterState::Slide {
        Aabb::new(
            defender.x,
            defender.y + defender.height / 2.0,
            defender.width,
            defender.height / 2.0,
        )
    } else {
        Aabb::new(defender.x, defender.y, defender.width, defender.height)
    }
}

/// Apply damage to health, returns (new_health, is_dead)
pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
    let new_health = (current_health - damage).max(0.0);
    (new_health, new_health <= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::{FIGHTER_HEIGHT, FIGHTER_WIDTH};

    #[test]
    fn ground_hitbox_mirrors_with_facing() {
        let right = ground_attack_hitbox(100.0, 300.0, FIGHTER_WIDTH, Facing::Right);
        assert_eq!(right.x, 150.0);
        assert_eq!(right.y, 320.0);

        let left = ground_attack_hitbox(100.0, 300.0, FIGHTER_WIDTH, Facing::Left);
        assert_eq!(left.x, 40.0);
        // same extent either way
        assert_eq!(left.width, right.width);
        assert_eq!(left.height, right.height);
    }

    #[test]
    fn jump_hitbox_reaches_below_the_feet() {
        let hb = jump_attack_hitbox(100.0, 200.0, FIGHTER_WIDTH, FIGHTER_HEIGHT, Facing::Right);
        assert_eq!(hb.x, 125.0);
        assert_eq!(hb.y, 280.0);
        assert!(hb.y + hb.height > 200.0 + FIGHTER_HEIGHT);
    }

    #[test]
    fn jump_attack_outdamages_ground_attack() {
        let ground = AttackStats::for_kind(AttackKind::Ground);
        let jump = AttackStats::for_kind(AttackKind::Jump);
        assert!(jump.damage > ground.damage);
        assert!(jump.energy_cost > 0.0);
        assert_eq!(ground.energy_cost, 0.0);
    }

    #[test]
    fn damage_clamps_at_zero() {
        let (health, dead) = apply_damage(7.0, 10.0);
        assert_eq!(health, 0.0);
        assert!(dead);

        let (health, dead) = apply_damage(50.0, 10.0);
        assert_eq!(health, 40.0);
        assert!(!dead);
    }
}
