//! Simulation step driver
//!
//! A step of `dt` repeatedly advances every body to the earliest predicted
//! collision, resolves it, and re-predicts only what it changed. Whatever
//! is left of `dt` after the last collision is plain motion.

use serde::{Deserialize, Serialize};

use super::body::{Kind, check_duration};
use super::collision::Collision;
use super::events::SimEvent;
use super::queue::CollisionQueue;
use super::world::{BodyId, World};
use crate::error::{SimError, SimResult};
use crate::fuzzy_eq;

/// Floor on the collisions one instant may resolve before the step is
/// declared jammed
const MIN_INSTANT_EVENTS: usize = 64;
/// Per-body allowance on top of the floor
const INSTANT_EVENTS_PER_BODY: usize = 8;

/// A command a ship's controller may issue between steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShipCommand {
    /// Rotate the heading by this many radians
    Turn(f64),
    /// Enable or disable the thruster
    Thrust(bool),
    /// Fire a bullet
    Fire,
}

/// Commands to apply before a step, in order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    pub commands: Vec<(BodyId, ShipCommand)>,
}

impl TickInput {
    pub fn push(&mut self, ship: BodyId, command: ShipCommand) {
        self.commands.push((ship, command));
    }
}

/// Apply one command to a ship in `world`
pub fn apply_command(
    world: &mut World,
    ship: BodyId,
    command: ShipCommand,
) -> SimResult<Vec<SimEvent>> {
    if world.body(ship)?.tag() != Kind::Ship {
        return Err(SimError::invalid_argument(format!("{ship:?} is not a ship")));
    }
    let mut events = Vec::new();
    match command {
        ShipCommand::Turn(angle) => world.body_mut(ship)?.turn(angle)?,
        ShipCommand::Thrust(enabled) => world.body_mut(ship)?.set_thruster(enabled)?,
        ShipCommand::Fire => {
            world.fire(ship, &mut events)?;
        }
    }
    Ok(events)
}

/// Apply the queued commands, then advance the world by `dt`
pub fn tick(world: &mut World, input: &TickInput, dt: f64) -> SimResult<Vec<SimEvent>> {
    check_duration(dt)?;
    let mut events = Vec::new();
    for &(ship, command) in &input.commands {
        // An earlier command in this tick may already have destroyed the ship
        if !world.contains(ship) {
            log::debug!("skipping {command:?} for {ship:?}: no longer in the world");
            continue;
        }
        events.extend(apply_command(world, ship, command)?);
    }
    events.extend(evolve(world, dt)?);
    Ok(events)
}

/// Advance the world by `dt`, resolving every collision on the way.
///
/// A prediction or resolution error aborts the step; the world is left at the
/// instant of the failure. Bodies wedged between walls or each other keep
/// colliding without time advancing; past a limit this is an `InvalidState`.
pub fn evolve(world: &mut World, dt: f64) -> SimResult<Vec<SimEvent>> {
    check_duration(dt)?;
    let mut events = Vec::new();
    let mut queue = CollisionQueue::new();
    queue.schedule_all(world, 0.0)?;

    let instant_limit = MIN_INSTANT_EVENTS.max(INSTANT_EVENTS_PER_BODY * world.len());
    let mut instant_events = 0;
    let mut now = 0.0;
    while let Some(next) = queue.peek(world) {
        if next.time > dt {
            break;
        }
        queue.pop();
        if fuzzy_eq(next.time, now) {
            instant_events += 1;
            if instant_events > instant_limit {
                return Err(SimError::invalid_state(format!(
                    "{instant_events} collisions at t = {now} without progress; bodies are jammed"
                )));
            }
        } else {
            instant_events = 0;
        }
        world.advance_all((next.time - now).max(0.0))?;
        now = next.time;

        let mut collision = match next.second {
            Some(second) => Collision::between(world, next.first, second)?,
            None => Collision::with_border(world, next.first)?,
        };
        events.extend(collision.execute(world)?);

        let mut changed = vec![next.first];
        changed.extend(next.second);
        for &id in &changed {
            queue.touch(id);
        }
        queue.reschedule(world, now, &changed)?;
    }
    world.advance_all((dt - now).max(0.0))?;

    let thrusting: Vec<BodyId> = world
        .ships()
        .filter(|(_, ship)| ship.is_thruster_active())
        .map(|(id, _)| id)
        .collect();
    for id in thrusting {
        world.body_mut(id)?.thrust(dt)?;
    }

    log::trace!("step of {dt} resolved {} events", events.len());
    Ok(events)
}
