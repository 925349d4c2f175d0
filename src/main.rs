//! Headless demo: generate a seeded arena and run it for a while.
//!
//! Usage: `asteroid-arena [config.json] [seed]`. Set `RUST_LOG=debug` to see
//! every collision.

use std::f64::consts::FRAC_PI_8;

use asteroid_arena::sim::{ScenarioSpec, ShipCommand, SimEvent, TickInput, generate, tick};
use asteroid_arena::{SimConfig, SimResult};

/// Fixed step length (s)
const STEP: f64 = 0.1;
const STEPS: u32 = 600;
/// Ships fire every this many steps
const FIRE_EVERY: u32 = 25;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> SimResult<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);

    let spec = ScenarioSpec {
        seed,
        ships: 3,
        asteroids: 12,
        ..Default::default()
    };
    let mut world = generate(&config, &spec)?;
    log::info!("Asteroid Arena starting with seed {seed}");

    let (mut collisions, mut destroyed, mut fired) = (0usize, 0usize, 0usize);
    for step in 0..STEPS {
        let mut input = TickInput::default();
        let ships: Vec<_> = world.ships().map(|(id, _)| id).collect();
        for ship in ships {
            input.push(ship, ShipCommand::Turn(FRAC_PI_8));
            input.push(ship, ShipCommand::Thrust(step % 50 < 10));
            if step % FIRE_EVERY == 0 {
                input.push(ship, ShipCommand::Fire);
            }
        }

        for event in tick(&mut world, &input, STEP)? {
            match event {
                SimEvent::BorderCollision { .. } | SimEvent::BodyCollision { .. } => collisions += 1,
                SimEvent::Destroyed { .. } => destroyed += 1,
                SimEvent::BulletFired { .. } => fired += 1,
            }
        }
    }

    log::info!(
        "{} steps: {collisions} collisions, {destroyed} destroyed, {fired} bullets fired",
        STEPS
    );
    log::info!(
        "Survivors: {} ships, {} asteroids, {} bullets",
        world.ships().count(),
        world.asteroids().count(),
        world.bullets().count()
    );
    Ok(())
}
