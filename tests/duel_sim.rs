//! End-to-end simulation scenarios driven tick by tick

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use duel_game_server::game::fighter::{Facing, Fighter, FighterState, MAX_ENERGY};
use duel_game_server::game::physics::{
    WorldBounds, FIGHTER_HEIGHT, FIGHTER_WIDTH, GROUND_Y, WORLD_WIDTH,
};
use duel_game_server::game::ButtonSet;

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(99)
}

fn bounds() -> WorldBounds {
    WorldBounds::default()
}

fn fighter(slot: u8, x: f32, facing: Facing) -> Fighter {
    let mut f = Fighter::new(
        slot,
        Uuid::new_v4(),
        format!("fighter-{slot}"),
        "#ffffff",
        x,
        facing,
    );
    f.y = GROUND_Y - FIGHTER_HEIGHT;
    f.grounded = true;
    f
}

const NO_INPUT: ButtonSet = ButtonSet {
    left: false,
    right: false,
    jump: false,
    down: false,
    attack: false,
};

fn pressing(f: impl FnOnce(&mut ButtonSet)) -> ButtonSet {
    let mut b = NO_INPUT;
    f(&mut b);
    b
}

#[test]
fn walking_right_accelerates_to_a_bound_and_clamps_at_the_wall() {
    let mut f = fighter(1, 150.0, Facing::Right);
    let mut o = fighter(2, 600.0, Facing::Left);
    // keep the opponent out of the way
    o.y = -1000.0;
    o.grounded = false;
    let mut r = rng();

    let mut last_x = f.x;
    let mut reached_wall = false;
    for _ in 0..400 {
        f.step(&mut o, pressing(|b| b.right = true), bounds(), &mut r);

        assert!(
            f.vel_x <= 6.0 + 1e-3,
            "walk speed converges below accel * friction / (1 - friction)"
        );
        if f.x + FIGHTER_WIDTH >= WORLD_WIDTH {
            reached_wall = true;
            break;
        }
        assert!(f.x > last_x, "x strictly increases while walking right");
        last_x = f.x;
    }

    assert!(reached_wall);
    // walking into the wall pins position and zeroes velocity
    for _ in 0..10 {
        f.step(&mut o, pressing(|b| b.right = true), bounds(), &mut r);
        assert_eq!(f.x, WORLD_WIDTH - FIGHTER_WIDTH);
        assert_eq!(f.vel_x, 0.0);
    }
}

#[test]
fn mashing_attack_wears_an_opponent_down_to_a_knockout() {
    let mut f = fighter(1, 150.0, Facing::Right);
    let mut o = fighter(2, 210.0, Facing::Left);
    let mut r = rng();

    let mut ticks = 0;
    while o.state != FighterState::Dead && ticks < 600 {
        // pin the victim inside the strike zone for a clean exchange
        o.x = 210.0;
        o.y = GROUND_Y - FIGHTER_HEIGHT;
        f.step(&mut o, pressing(|b| b.attack = true), bounds(), &mut r);
        ticks += 1;
    }

    assert_eq!(o.state, FighterState::Dead);
    assert_eq!(f.state, FighterState::Win, "winner flips the same tick");
    assert_eq!(o.health, 0.0);
    assert_eq!(f.hits_landed, 10, "100 health at 10 damage per swing");
    assert_eq!(f.damage_dealt, 100.0);
    assert_eq!(o.damage_taken, 100.0);
    // one swing per cooldown window, one hit per swing
    assert_eq!(f.attacks_launched, f.hits_landed);
}

#[test]
fn jump_attack_hits_harder_and_knocks_back_further() {
    let mut f = fighter(1, 160.0, Facing::Right);
    let mut o = fighter(2, 200.0, Facing::Left);
    let mut r = rng();

    // airborne and falling, directly above the strike position
    f.y = 250.0;
    f.grounded = false;
    f.state = FighterState::Jump;
    f.vel_y = 2.0;

    f.step(&mut o, pressing(|b| b.attack = true), bounds(), &mut r);

    assert_eq!(o.health, 85.0);
    assert_eq!(o.state, FighterState::Hurt);
    assert!((o.vel_x - 12.0).abs() < 1e-4, "1.2x knockback multiplier");
    assert!(o.vel_y < 0.0);
    assert!(f.energy < MAX_ENERGY, "jump attack spends energy");
}

#[test]
fn left_facing_attacker_knocks_the_defender_left() {
    let mut f = fighter(1, 600.0, Facing::Left);
    let mut o = fighter(2, 500.0, Facing::Right);
    let mut r = rng();

    f.step(&mut o, pressing(|b| b.attack = true), bounds(), &mut r);

    assert_eq!(o.health, 90.0);
    assert!(o.vel_x < 0.0, "knockback points away from the attacker");
}

#[test]
fn underfunded_slide_leaves_the_fighter_untouched() {
    let mut f = fighter(1, 150.0, Facing::Right);
    let mut o = fighter(2, 600.0, Facing::Left);
    let mut r = rng();
    f.energy = 20.0;

    let x_before = f.x;
    f.step(&mut o, pressing(|b| b.down = true), bounds(), &mut r);

    assert_eq!(f.state, FighterState::Idle);
    assert_eq!(f.x, x_before);
    assert!(f.energy >= 20.0, "no partial energy deduction");
}

#[test]
fn energy_stays_bounded_across_repeated_slides() {
    let mut f = fighter(1, 400.0, Facing::Right);
    let mut o = fighter(2, 700.0, Facing::Left);
    o.y = -1000.0;
    o.grounded = false;
    let mut r = rng();

    let mut slides = 0;
    let mut prev_state = f.state;
    for _ in 0..1000 {
        // keep away from the walls so slides have room
        f.x = 400.0;
        f.step(&mut o, pressing(|b| b.down = true), bounds(), &mut r);

        assert!(f.energy >= 0.0, "energy never goes negative");
        assert!(f.energy <= MAX_ENERGY, "energy never exceeds the cap");
        if f.state == FighterState::Slide && prev_state != FighterState::Slide {
            slides += 1;
        }
        prev_state = f.state;
    }

    assert!(slides >= 5, "regen funds repeated slides, got {slides}");
    assert!(f.energy < MAX_ENERGY, "spending keeps energy off the cap");
}

#[test]
fn a_finished_duel_is_completely_inert() {
    let mut f = fighter(1, 150.0, Facing::Right);
    let mut o = fighter(2, 210.0, Facing::Left);
    o.health = 10.0;
    let mut r = rng();

    f.step(&mut o, pressing(|b| b.attack = true), bounds(), &mut r);
    assert_eq!(o.state, FighterState::Dead);
    assert_eq!(f.state, FighterState::Win);

    let frozen = (f.x, f.y, f.energy, o.x, o.y, o.health);
    for _ in 0..120 {
        f.step(
            &mut o,
            pressing(|b| {
                b.left = true;
                b.attack = true;
                b.jump = true;
            }),
            bounds(),
            &mut r,
        );
        o.step(
            &mut f,
            pressing(|b| {
                b.right = true;
                b.attack = true;
            }),
            bounds(),
            &mut r,
        );
    }
    assert_eq!((f.x, f.y, f.energy, o.x, o.y, o.health), frozen);
}
