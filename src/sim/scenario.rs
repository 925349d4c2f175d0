//! Seeded scenario generation
//!
//! Populates a fresh world with ships and asteroids at random, non-overlapping
//! positions. The same seed always yields the same world.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::Body;
use super::vector::Vector;
use super::world::World;
use crate::error::{SimError, SimResult};
use crate::settings::SimConfig;

/// Placement attempts per body before giving up
const MAX_PLACEMENT_ATTEMPTS: u32 = 200;

/// Largest radius as a multiple of the kind's lower bound
const SHIP_RADIUS_SPREAD: f64 = 1.5;
const ASTEROID_RADIUS_SPREAD: f64 = 4.0;

/// Speed ranges (km/s)
const SHIP_MAX_SPEED: f64 = 50.0;
const ASTEROID_MAX_SPEED: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub width: f64,
    pub height: f64,
    pub ships: usize,
    pub asteroids: usize,
    pub seed: u64,
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            ships: 2,
            asteroids: 8,
            seed: 42,
        }
    }
}

/// Build a world from `spec`. Fails if the bodies cannot be placed.
pub fn generate(config: &SimConfig, spec: &ScenarioSpec) -> SimResult<World> {
    let mut world = World::new(config.clone(), spec.width, spec.height)?;
    let mut rng = Pcg32::seed_from_u64(spec.seed);

    for _ in 0..spec.ships {
        let radius = random_radius(&mut rng, config.ship.min_radius, SHIP_RADIUS_SPREAD);
        let direction = rng.random_range(0.0..TAU);
        place(&mut world, &mut rng, radius, SHIP_MAX_SPEED, |position, velocity| {
            Body::ship(config, position, velocity, radius, direction)
        })?;
    }
    for _ in 0..spec.asteroids {
        let radius = random_radius(&mut rng, config.asteroid.min_radius, ASTEROID_RADIUS_SPREAD);
        place(&mut world, &mut rng, radius, ASTEROID_MAX_SPEED, |position, velocity| {
            Body::asteroid(config, position, velocity, radius)
        })?;
    }

    log::info!(
        "Scenario seed {}: {}x{} world, {} ships, {} asteroids",
        spec.seed,
        spec.width,
        spec.height,
        spec.ships,
        spec.asteroids
    );
    Ok(world)
}

/// Radius strictly above `min_radius`, up to `min_radius * spread`
fn random_radius(rng: &mut Pcg32, min_radius: f64, spread: f64) -> f64 {
    let max_radius = min_radius * spread;
    let radius = rng.random_range(min_radius..=max_radius);
    if radius > min_radius { radius } else { max_radius }
}

fn place<F>(
    world: &mut World,
    rng: &mut Pcg32,
    radius: f64,
    max_speed: f64,
    make: F,
) -> SimResult<()>
where
    F: Fn(Vector, Vector) -> SimResult<Body>,
{
    let (width, height) = (world.width(), world.height());
    if 2.0 * radius > width || 2.0 * radius > height {
        return Err(SimError::invalid_argument(format!(
            "a body of radius {radius} cannot fit in a {width}x{height} world"
        )));
    }

    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let position = Vector::new(
            rng.random_range(radius..=width - radius),
            rng.random_range(radius..=height - radius),
        )?;
        let speed = rng.random_range(0.0..max_speed.min(world.config().speed_of_light));
        let velocity = Vector::from_angle(rng.random_range(0.0..TAU), speed)?;
        let body = make(position, velocity)?;
        let overlaps = world
            .bodies()
            .map(|(_, other)| body.overlaps(other))
            .collect::<SimResult<Vec<bool>>>()?
            .into_iter()
            .any(|o| o);
        if !overlaps {
            world.add_body(body)?;
            return Ok(());
        }
    }
    Err(SimError::invalid_argument(format!(
        "could not place a body of radius {radius}: world too crowded"
    )))
}
