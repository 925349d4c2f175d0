//! Continuous collision detection and resolution
//!
//! Bodies move at constant velocity between events, so the first contact of
//! two discs is the smaller root of a quadratic in time, and the first border
//! contact is a per-axis linear solve. Resolution either destroys bodies
//! (kill rules), reflects off the border, or applies an elastic impulse.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use super::body::{Body, Kind};
use super::events::SimEvent;
use super::vector::Vector;
use super::world::{BodyId, World};
use crate::error::{SimError, SimResult};
use crate::fuzzy_eq;

/// Border axis struck by a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Left or right edge
    X,
    /// Top or bottom edge
    Y,
}

/// Time until `a` and `b` first touch, or `+∞` if they never will
pub fn time_to_collision(a: &Body, b: &Body) -> SimResult<f64> {
    let dv = a.velocity().subtract(b.velocity())?;
    let dr = a.position().subtract(b.position())?;
    let sigma = a.radius() + b.radius();

    let dvdr = dv.dot(dr)?;
    // Diverging, or no relative motion at all
    if dvdr >= 0.0 {
        return Ok(f64::INFINITY);
    }
    let dvdv = dv.dot(dv)?;
    let drdr = dr.dot(dr)?;
    let d = dvdr * dvdr - dvdv * (drdr - sigma * sigma);
    if d.is_nan() || d.is_infinite() {
        return Err(SimError::ArithmeticOverflow("time_to_collision"));
    }
    if d <= 0.0 {
        return Ok(f64::INFINITY);
    }

    let time = -(dvdr + d.sqrt()) / dvdv;
    if time.is_nan() {
        return Err(SimError::ArithmeticOverflow("time_to_collision"));
    }
    // Already touching and closing in
    Ok(time.max(0.0))
}

/// Time until `body` touches the border of a `width × height` arena, and
/// which axis it strikes first. Ties go to the X axis.
pub fn time_to_border(body: &Body, width: f64, height: f64) -> SimResult<(f64, Axis)> {
    let position = body.position();
    let velocity = body.velocity();
    let radius = body.radius();

    let time_x = axis_time(position.x(), velocity.x(), radius, width)?;
    let time_y = axis_time(position.y(), velocity.y(), radius, height)?;
    if time_x <= time_y {
        Ok((time_x, Axis::X))
    } else {
        Ok((time_y, Axis::Y))
    }
}

fn axis_time(position: f64, velocity: f64, radius: f64, axis_max: f64) -> SimResult<f64> {
    let time = if velocity > 0.0 {
        (axis_max - radius - position) / velocity
    } else if velocity < 0.0 {
        (radius - position) / velocity
    } else {
        return Ok(f64::INFINITY);
    };
    if time.is_nan() {
        return Err(SimError::ArithmeticOverflow("time_to_border"));
    }
    Ok(time.max(0.0))
}

/// Angle of the displacement `(dx, dy)`. Axis-aligned displacements map to
/// exact multiples of π/2.
pub fn contact_angle(dx: f64, dy: f64) -> f64 {
    if fuzzy_eq(dy, 0.0) {
        if dx < 0.0 { PI } else { 0.0 }
    } else if fuzzy_eq(dx, 0.0) {
        if dy > 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 }
    } else {
        let base = (dy / dx).abs().atan();
        match (dx > 0.0, dy > 0.0) {
            (true, true) => base,
            (false, true) => PI - base,
            (false, false) => PI + base,
            (true, false) => -base,
        }
    }
}

/// Point where `a` touches `b`, given both centers
fn contact_point(a_position: Vector, a_radius: f64, b_position: Vector) -> SimResult<Vector> {
    let d = a_position.subtract(b_position)?;
    let alpha = contact_angle(d.x(), d.y());
    a_position.subtract(Vector::from_angle(alpha, a_radius)?)
}

/// Where `a` and `b` will touch, if they ever do
pub fn collision_position(a: &Body, b: &Body) -> SimResult<Option<Vector>> {
    let time = time_to_collision(a, b)?;
    if time.is_infinite() {
        return Ok(None);
    }
    let a_position = a.predicted_position(time)?;
    let b_position = b.predicted_position(time)?;
    contact_point(a_position, a.radius(), b_position).map(Some)
}

/// Where `body` will touch the border, if it ever does. The struck
/// coordinate is snapped to the edge.
pub fn border_collision_position(body: &Body, width: f64, height: f64) -> SimResult<Option<Vector>> {
    let (time, axis) = time_to_border(body, width, height)?;
    if time.is_infinite() {
        return Ok(None);
    }
    let position = body.predicted_position(time)?;
    let velocity = body.velocity();
    let contact = match axis {
        Axis::X => Vector::new(edge_toward(velocity.x(), width), position.y())?,
        Axis::Y => Vector::new(position.x(), edge_toward(velocity.y(), height))?,
    };
    Ok(Some(contact))
}

fn edge_toward(velocity: f64, axis_max: f64) -> f64 {
    if velocity > 0.0 { axis_max } else { 0.0 }
}

/// Whether `body` reaches both edges at the same instant
fn strikes_corner(body: &Body, width: f64, height: f64) -> SimResult<bool> {
    let (position, velocity, radius) = (body.position(), body.velocity(), body.radius());
    let time_x = axis_time(position.x(), velocity.x(), radius, width)?;
    let time_y = axis_time(position.y(), velocity.y(), radius, height)?;
    Ok(time_x.is_finite() && time_y.is_finite() && fuzzy_eq(time_x, time_y))
}

/// A predicted contact between two bodies, or between a body and the border
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    first: BodyId,
    second: Option<BodyId>,
    /// Times this contact has been executed
    collision_count: u32,
    time: Option<f64>,
}

impl Collision {
    /// Contact between two distinct active bodies of `world`
    pub fn between(world: &World, first: BodyId, second: BodyId) -> SimResult<Self> {
        if first == second {
            return Err(SimError::invalid_argument("a body cannot collide with itself"));
        }
        ensure_active(world, first)?;
        ensure_active(world, second)?;
        if world.is_exempt_pair(first, second) {
            return Err(SimError::invalid_argument(
                "a bullet never collides with the ship that fired it",
            ));
        }
        Ok(Self {
            first,
            second: Some(second),
            collision_count: 0,
            time: None,
        })
    }

    /// Contact between an active body of `world` and its border
    pub fn with_border(world: &World, body: BodyId) -> SimResult<Self> {
        ensure_active(world, body)?;
        Ok(Self {
            first: body,
            second: None,
            collision_count: 0,
            time: None,
        })
    }

    pub fn first(&self) -> BodyId {
        self.first
    }

    pub fn second(&self) -> Option<BodyId> {
        self.second
    }

    pub fn is_border(&self) -> bool {
        self.second.is_none()
    }

    pub fn collision_count(&self) -> u32 {
        self.collision_count
    }

    /// Time until contact, cached until the collision executes or is invalidated
    pub fn time_to_collision(&mut self, world: &World) -> SimResult<f64> {
        if let Some(time) = self.time {
            return Ok(time);
        }
        let time = match self.second {
            Some(second) => time_to_collision(world.body(self.first)?, world.body(second)?)?,
            None => {
                time_to_border(world.body(self.first)?, world.width(), world.height())?.0
            }
        };
        self.time = Some(time);
        Ok(time)
    }

    /// Forget the cached time after the bodies' motion changed
    pub fn invalidate(&mut self) {
        self.time = None;
    }

    /// Predicted contact point
    pub fn position(&self, world: &World) -> SimResult<Option<Vector>> {
        let first = world.body(self.first)?;
        match self.second {
            Some(second) => collision_position(first, world.body(second)?),
            None => border_collision_position(first, world.width(), world.height()),
        }
    }

    /// Resolve the contact. The bodies are expected to have been advanced to
    /// the moment of contact.
    pub fn execute(&mut self, world: &mut World) -> SimResult<Vec<SimEvent>> {
        ensure_active(world, self.first)?;
        if let Some(second) = self.second {
            ensure_active(world, second)?;
        }
        self.collision_count += 1;
        self.time = None;

        let mut events = Vec::new();
        match self.second {
            None => execute_border(world, self.first, &mut events)?,
            Some(second) => execute_pair(world, self.first, second, &mut events)?,
        }
        Ok(events)
    }
}

fn ensure_active(world: &World, id: BodyId) -> SimResult<()> {
    if world.body(id)?.is_active() {
        Ok(())
    } else {
        Err(SimError::invalid_state(format!("{id:?} is not active")))
    }
}

fn execute_border(world: &mut World, id: BodyId, events: &mut Vec<SimEvent>) -> SimResult<()> {
    let (width, height) = (world.width(), world.height());
    let max_bounces = world.config().max_border_bounces;
    let body = world.body(id)?;
    let Some(contact) = border_collision_position(body, width, height)? else {
        return Err(SimError::invalid_state(format!(
            "{id:?} is not moving toward the border"
        )));
    };
    let velocity = body.velocity();

    // A corner is one contact with both edges
    let (flip_x, flip_y, contact) = if strikes_corner(body, width, height)? {
        let corner = Vector::new(
            edge_toward(velocity.x(), width),
            edge_toward(velocity.y(), height),
        )?;
        (true, true, corner)
    } else {
        let vertical_edge = fuzzy_eq(contact.x(), 0.0) || fuzzy_eq(contact.x(), width);
        (vertical_edge, !vertical_edge, contact)
    };
    events.push(SimEvent::BorderCollision {
        body: id,
        position: contact,
    });

    if body.as_bullet().is_some_and(|b| b.border_collisions >= max_bounces) {
        world.kill(id)?;
        events.push(SimEvent::Destroyed {
            body: id,
            kind: Kind::Bullet,
        });
        return Ok(());
    }

    let reflected = Vector::new(
        if flip_x { -velocity.x() } else { velocity.x() },
        if flip_y { -velocity.y() } else { velocity.y() },
    )?;
    log::debug!("{id:?} bounced off the border at ({}, {})", contact.x(), contact.y());

    let body = world.body_mut(id)?;
    body.set_velocity_limited(reflected)?;
    if let Some(bullet) = body.as_bullet_mut() {
        bullet.border_collisions += 1;
    }
    Ok(())
}

fn execute_pair(
    world: &mut World,
    first: BodyId,
    second: BodyId,
    events: &mut Vec<SimEvent>,
) -> SimResult<()> {
    let a = world.body(first)?;
    let b = world.body(second)?;
    events.push(SimEvent::BodyCollision {
        first,
        second,
        position: contact_point(a.position(), a.radius(), b.position())?,
    });

    let first_dies = a.will_be_killed_by_other(b);
    let second_dies = b.will_be_killed_by_other(a);
    if first_dies || second_dies {
        for (id, dies) in [(first, first_dies), (second, second_dies)] {
            if dies {
                let body = world.kill(id)?;
                events.push(SimEvent::Destroyed {
                    body: id,
                    kind: body.tag(),
                });
            }
        }
        return Ok(());
    }

    let (v1, v2) = bounce(a, b)?;
    log::debug!("{first:?} and {second:?} bounced");
    world.body_mut(first)?.set_velocity_limited(v1)?;
    world.body_mut(second)?.set_velocity_limited(v2)?;
    Ok(())
}

/// Velocities after an elastic impulse between two touching bodies
pub fn bounce(a: &Body, b: &Body) -> SimResult<(Vector, Vector)> {
    let dv = b.velocity().subtract(a.velocity())?;
    let dr = b.position().subtract(a.position())?;
    let sigma = a.radius() + b.radius();
    let dvdr = dv.dot(dr)?;
    let (m1, m2) = (a.mass(), b.mass());

    // 2·m1·m2·dvdr / (σ·(m1+m2)), with the mass product kept in range
    let reduced_mass = m1 / (1.0 + m1 / m2);
    let impulse = 2.0 * reduced_mass * dvdr / sigma;
    if !impulse.is_finite() {
        return Err(SimError::ArithmeticOverflow("bounce"));
    }
    let j = dr.scale_by(impulse / sigma)?;

    let v1 = a.velocity().add(j.scale_by(1.0 / m1)?)?;
    let v2 = b.velocity().subtract(j.scale_by(1.0 / m2)?)?;
    Ok((v1, v2))
}
