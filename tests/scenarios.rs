use std::f64::consts::PI;

use asteroid_arena::sim::{
    Body, Kind, ScenarioSpec, ShipCommand, SimEvent, TickInput, Vector, World, evolve, generate,
    tick, time_to_collision,
};
use asteroid_arena::{SimConfig, SimError, fuzzy_eq};

fn v(x: f64, y: f64) -> Vector {
    Vector::new(x, y).unwrap()
}

fn config() -> SimConfig {
    SimConfig::default()
}

// ==================================================================================
// Concrete scenarios
// ==================================================================================

#[test]
fn stationary_separated_bodies_never_collide() {
    let a = Body::ship(&config(), v(20.0, 20.0), Vector::ZERO, 11.0, 0.0).unwrap();
    let b = Body::ship(&config(), v(40.0, 40.0), Vector::ZERO, 11.0, 0.0).unwrap();
    let gap = a.distance_between(&b).unwrap();
    assert!((gap - (800f64.sqrt() - 22.0)).abs() < 1e-12);
    assert_eq!(time_to_collision(&a, &b).unwrap(), f64::INFINITY);
}

#[test]
fn ship_moves_along_velocity() {
    let mut ship = Body::ship(&config(), v(0.0, 0.0), v(10_000.0, 10_000.0), 10.0, PI / 2.0).unwrap();
    ship.move_by(20.0).unwrap();
    assert_eq!(ship.position().x(), 200_000.0);
}

#[test]
fn thrust_accelerates_along_heading() {
    let config = SimConfig {
        thruster_power: 1.1e18,
        ..Default::default()
    };
    let mut ship = Body::ship(&config, v(0.0, 0.0), v(10.0, 20.0), 10.0, 3.0 * PI / 2.0).unwrap();
    ship.set_mass(1.0).unwrap();
    ship.thruster_on().unwrap();
    ship.thrust(1e-14).unwrap();
    assert!((ship.velocity().x() - 10.0).abs() < 1e-6);
    assert!((ship.velocity().y() - (20.0 - 1.1e4)).abs() < 1e-6);
}

#[test]
fn firing_populates_bullets() {
    let mut world = World::new(config(), 100.0, 100.0).unwrap();
    let ship = Body::ship(&config(), v(50.0, 50.0), Vector::ZERO, 10.0, 0.0).unwrap();
    let ship_id = world.add_body(ship).unwrap();
    assert_eq!(world.bullets().count(), 0);

    let bullet = world.fire_bullet(ship_id).unwrap().unwrap();
    assert_eq!(world.bullets().count(), 1);
    assert_eq!(world.body(bullet).unwrap().source(), Some(ship_id));
}

// ==================================================================================
// Outcome table
// ==================================================================================

fn head_on(a: Body, b: Body) -> (World, Vec<SimEvent>, bool, bool) {
    let mut world = World::new(config(), 1000.0, 1000.0).unwrap();
    let a = world.add_body(a).unwrap();
    let b = world.add_body(b).unwrap();
    let events = evolve(&mut world, 10.0).unwrap();
    let (a_alive, b_alive) = (world.contains(a), world.contains(b));
    (world, events, a_alive, b_alive)
}

fn make(kind: Kind, x: f64, vx: f64) -> Body {
    let c = config();
    match kind {
        Kind::Ship => Body::ship(&c, v(x, 500.0), v(vx, 0.0), 10.0, 0.0),
        Kind::Asteroid => Body::asteroid(&c, v(x, 500.0), v(vx, 0.0), 10.0),
        Kind::Bullet => Body::bullet(&c, v(x, 500.0), v(vx, 0.0), 3.0),
    }
    .unwrap()
}

#[test]
fn outcome_table() {
    use Kind::*;
    let cases = [
        (Ship, Ship, true, true),
        (Ship, Asteroid, false, true),
        (Ship, Bullet, false, true),
        (Asteroid, Asteroid, true, true),
        (Asteroid, Bullet, false, false),
        (Bullet, Bullet, false, false),
    ];
    for (ka, kb, a_survives, b_survives) in cases {
        let (_, events, a_alive, b_alive) = head_on(make(ka, 400.0, 20.0), make(kb, 600.0, -20.0));
        assert_eq!((a_alive, b_alive), (a_survives, b_survives), "{ka:?} vs {kb:?}");
        assert!(
            events.iter().any(|e| matches!(e, SimEvent::BodyCollision { .. })),
            "{ka:?} vs {kb:?}"
        );
    }
}

#[test]
fn bounce_conserves_momentum_in_world() {
    let c = config();
    let a = Body::asteroid(&c, v(300.0, 480.0), v(30.0, 4.0), 20.0).unwrap();
    let b = Body::asteroid(&c, v(700.0, 500.0), v(-25.0, 0.0), 8.0).unwrap();
    let momentum = |world: &World| {
        world.bodies().fold((0.0, 0.0), |(px, py), (_, body)| {
            (
                px + body.mass() * body.velocity().x(),
                py + body.mass() * body.velocity().y(),
            )
        })
    };

    let mut world = World::new(c, 1000.0, 1000.0).unwrap();
    world.add_body(a).unwrap();
    world.add_body(b).unwrap();
    let before = momentum(&world);
    let events = evolve(&mut world, 8.0).unwrap();
    assert_eq!(events.len(), 1);
    let after = momentum(&world);
    assert!(fuzzy_eq(before.0, after.0) || (before.0 - after.0).abs() < 1e-6 * before.0.abs());
    assert!((before.1 - after.1).abs() < 1e-6 * before.0.abs());
}

// ==================================================================================
// Lifecycle and errors
// ==================================================================================

#[test]
fn terminated_bodies_reject_mutation() {
    let mut world = World::new(config(), 100.0, 100.0).unwrap();
    let id = world
        .add_body(Body::asteroid(&config(), v(50.0, 50.0), Vector::ZERO, 10.0).unwrap())
        .unwrap();
    let mut body = world.kill(id).unwrap();
    assert!(matches!(body.move_by(1.0), Err(SimError::InvalidState(_))));
    assert!(matches!(world.add_body(body), Err(SimError::InvalidState(_))));
    assert!(matches!(world.fire_bullet(id), Err(SimError::InvalidState(_))));
}

#[test]
fn tick_skips_commands_for_destroyed_ships() {
    let mut world = World::new(config(), 1000.0, 1000.0).unwrap();
    let shooter = world
        .add_body(Body::ship(&config(), v(500.0, 500.0), Vector::ZERO, 10.0, 0.0).unwrap())
        .unwrap();
    // Target sits right where the bullet spawns
    let target = world
        .add_body(Body::ship(&config(), v(525.0, 500.0), Vector::ZERO, 10.0, 0.0).unwrap())
        .unwrap();

    let mut input = TickInput::default();
    input.push(shooter, ShipCommand::Fire);
    input.push(target, ShipCommand::Fire);
    let events = tick(&mut world, &input, 0.1).unwrap();
    assert!(!world.contains(target));
    assert!(events.contains(&SimEvent::Destroyed {
        body: target,
        kind: Kind::Ship
    }));
}

#[test]
fn generated_scenario_runs() {
    let mut world = generate(&config(), &ScenarioSpec::default()).unwrap();
    for _ in 0..100 {
        evolve(&mut world, 0.5).unwrap();
        let (w, h) = (world.width(), world.height());
        assert!(world.bodies().all(|(_, b)| b.fits_in(w, h)));
    }
}
