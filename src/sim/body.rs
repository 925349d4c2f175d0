//! Bodies: ships, asteroids and bullets
//!
//! A `Body` holds the kinematic state every variant shares; what differs per
//! variant lives in the `BodyKind` tag. The variant set is closed, so the
//! kill rules are a plain match over a pair of tags.

use serde::{Deserialize, Serialize};

use super::vector::Vector;
use super::world::BodyId;
use crate::error::{SimError, SimResult, ensure_finite};
use crate::settings::SimConfig;
use crate::{fuzzy_eq, fuzzy_ge, fuzzy_le, sphere_volume, wrap_angle};

/// Fieldless variant tag, for queries and rule tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Ship,
    Asteroid,
    Bullet,
}

/// Lifecycle of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyState {
    /// Free-standing, not in any world
    Created,
    /// Owned by a world
    Active,
    /// Destroyed; every further mutation is an error
    Terminated,
}

/// A ship's engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thruster {
    pub enabled: bool,
    /// Force output while enabled
    pub power: f64,
}

/// Ship-specific state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub thruster: Thruster,
    /// Bullets this ship fired that are still alive in its world
    bullets: Vec<BodyId>,
}

impl Ship {
    pub fn bullets(&self) -> &[BodyId] {
        &self.bullets
    }

    pub(crate) fn track_bullet(&mut self, bullet: BodyId) {
        if !self.bullets.contains(&bullet) {
            self.bullets.push(bullet);
        }
    }

    pub(crate) fn forget_bullet(&mut self, bullet: BodyId) {
        self.bullets.retain(|&b| b != bullet);
    }

    pub(crate) fn forget_all_bullets(&mut self) -> Vec<BodyId> {
        std::mem::take(&mut self.bullets)
    }
}

/// Bullet-specific state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bullet {
    /// Ship that fired this bullet, if any
    pub source: Option<BodyId>,
    /// Border bounces survived so far
    pub border_collisions: u32,
}

/// Variant data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyKind {
    Ship(Ship),
    Asteroid,
    Bullet(Bullet),
}

/// A rigid circular body moving at constant velocity between events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    kind: BodyKind,
    state: BodyState,
    position: Vector,
    velocity: Vector,
    /// Speed bound of this body, never above `speed_of_light`
    max_speed: f64,
    speed_of_light: f64,
    /// Heading in [0, 2π)
    direction: f64,
    radius: f64,
    mass: f64,
}

impl Body {
    /// A ship with mass derived from the configured ship density
    pub fn ship(
        config: &SimConfig,
        position: Vector,
        velocity: Vector,
        radius: f64,
        direction: f64,
    ) -> SimResult<Self> {
        let ship = Ship {
            thruster: Thruster {
                enabled: false,
                power: config.thruster_power,
            },
            bullets: Vec::new(),
        };
        Self::new(config, BodyKind::Ship(ship), position, velocity, radius, direction)
    }

    pub fn asteroid(
        config: &SimConfig,
        position: Vector,
        velocity: Vector,
        radius: f64,
    ) -> SimResult<Self> {
        Self::new(config, BodyKind::Asteroid, position, velocity, radius, 0.0)
    }

    /// A bullet with no source ship
    pub fn bullet(
        config: &SimConfig,
        position: Vector,
        velocity: Vector,
        radius: f64,
    ) -> SimResult<Self> {
        Self::new(config, BodyKind::Bullet(Bullet::default()), position, velocity, radius, 0.0)
    }

    fn new(
        config: &SimConfig,
        kind: BodyKind,
        position: Vector,
        velocity: Vector,
        radius: f64,
        direction: f64,
    ) -> SimResult<Self> {
        let tag = kind_tag(&kind);
        let kind_config = config.kind(tag);

        ensure_finite(radius, "radius")?;
        if radius <= kind_config.min_radius {
            return Err(SimError::invalid_argument(format!(
                "{tag:?} radius {radius} must exceed the lower bound {}",
                kind_config.min_radius
            )));
        }

        let mass = kind_config.density * sphere_volume(radius);
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::invalid_argument(format!(
                "{tag:?} radius {radius} gives an unrepresentable mass"
            )));
        }

        let speed = velocity.modulus()?;
        if speed > config.speed_of_light {
            return Err(SimError::invalid_argument(format!(
                "speed {speed} exceeds the speed of light {}",
                config.speed_of_light
            )));
        }

        Ok(Self {
            kind,
            state: BodyState::Created,
            position,
            velocity,
            max_speed: config.speed_of_light,
            speed_of_light: config.speed_of_light,
            direction: wrap_angle(direction),
            radius,
            mass,
        })
    }

    // === Getters ===

    pub fn kind(&self) -> &BodyKind {
        &self.kind
    }

    pub fn tag(&self) -> Kind {
        kind_tag(&self.kind)
    }

    pub fn state(&self) -> BodyState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == BodyState::Active
    }

    pub fn is_terminated(&self) -> bool {
        self.state == BodyState::Terminated
    }

    pub fn position(&self) -> Vector {
        self.position
    }

    pub fn velocity(&self) -> Vector {
        self.velocity
    }

    pub fn speed(&self) -> SimResult<f64> {
        self.velocity.modulus()
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn direction(&self) -> f64 {
        self.direction
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn as_ship(&self) -> Option<&Ship> {
        match &self.kind {
            BodyKind::Ship(ship) => Some(ship),
            _ => None,
        }
    }

    pub(crate) fn as_ship_mut(&mut self) -> Option<&mut Ship> {
        match &mut self.kind {
            BodyKind::Ship(ship) => Some(ship),
            _ => None,
        }
    }

    pub fn as_bullet(&self) -> Option<&Bullet> {
        match &self.kind {
            BodyKind::Bullet(bullet) => Some(bullet),
            _ => None,
        }
    }

    pub(crate) fn as_bullet_mut(&mut self) -> Option<&mut Bullet> {
        match &mut self.kind {
            BodyKind::Bullet(bullet) => Some(bullet),
            _ => None,
        }
    }

    /// Source ship, for bullets
    pub fn source(&self) -> Option<BodyId> {
        self.as_bullet().and_then(|b| b.source)
    }

    pub fn is_thruster_active(&self) -> bool {
        self.as_ship().is_some_and(|s| s.thruster.enabled)
    }

    // === Lifecycle ===

    pub(crate) fn ensure_alive(&self) -> SimResult<()> {
        if self.is_terminated() {
            Err(SimError::invalid_state(format!("{:?} is terminated", self.tag())))
        } else {
            Ok(())
        }
    }

    pub(crate) fn set_state(&mut self, state: BodyState) {
        self.state = state;
    }

    // === Kinematics ===

    /// Advance the position by `velocity * dt`
    pub fn move_by(&mut self, dt: f64) -> SimResult<()> {
        self.ensure_alive()?;
        check_duration(dt)?;
        self.position = self.predicted_position(dt)?;
        Ok(())
    }

    /// Where the body will be after `dt` at its current velocity
    pub fn predicted_position(&self, dt: f64) -> SimResult<Vector> {
        self.position.add(self.velocity.scale_by(dt)?)
    }

    /// Accelerate along the heading for `dt` if the thruster is enabled
    pub fn thrust(&mut self, dt: f64) -> SimResult<()> {
        self.ensure_alive()?;
        check_duration(dt)?;
        let mass = self.mass;
        let direction = self.direction;
        let Some(ship) = self.as_ship() else {
            return Err(SimError::invalid_state("only ships have thrusters"));
        };
        if !ship.thruster.enabled {
            return Ok(());
        }

        let acceleration = ship.thruster.power * dt / mass;
        let delta = Vector::from_angle(direction, acceleration)?;
        let velocity = self.velocity.add(delta)?;
        self.velocity = self.limit_speed(velocity)?;
        Ok(())
    }

    /// Set the velocity. Values that are non-finite or faster than
    /// `max_speed` are ignored.
    pub fn set_velocity(&mut self, vx: f64, vy: f64) -> SimResult<()> {
        self.ensure_alive()?;
        let Ok(velocity) = Vector::new(vx, vy) else {
            log::trace!("ignoring non-finite velocity ({vx}, {vy})");
            return Ok(());
        };
        match velocity.modulus() {
            Ok(speed) if speed <= self.max_speed => self.velocity = velocity,
            _ => log::trace!("ignoring velocity ({vx}, {vy}) above {}", self.max_speed),
        }
        Ok(())
    }

    /// Replace the velocity, rescaling it down to `max_speed` if needed
    pub(crate) fn set_velocity_limited(&mut self, velocity: Vector) -> SimResult<()> {
        self.velocity = self.limit_speed(velocity)?;
        Ok(())
    }

    /// Lower (or restore) this body's speed bound. Anything above the speed
    /// of light, or NaN, is clamped to the speed of light.
    pub fn set_max_speed(&mut self, max_speed: f64) -> SimResult<()> {
        self.ensure_alive()?;
        if max_speed < 0.0 {
            return Err(SimError::invalid_argument(format!(
                "max speed must be non-negative, got {max_speed}"
            )));
        }
        self.max_speed = if max_speed.is_nan() || max_speed > self.speed_of_light {
            self.speed_of_light
        } else {
            max_speed
        };
        self.velocity = self.limit_speed(self.velocity)?;
        Ok(())
    }

    /// Set the heading. Non-finite angles normalize to 0.
    pub fn set_direction(&mut self, direction: f64) -> SimResult<()> {
        self.ensure_alive()?;
        self.direction = wrap_angle(direction);
        Ok(())
    }

    /// Rotate the heading by `angle` radians
    pub fn turn(&mut self, angle: f64) -> SimResult<()> {
        self.ensure_alive()?;
        ensure_finite(angle, "turn angle")?;
        let turned = self.direction + angle;
        ensure_finite(turned, "resulting direction")?;
        self.direction = wrap_angle(turned);
        Ok(())
    }

    /// Override a ship's mass
    pub fn set_mass(&mut self, mass: f64) -> SimResult<()> {
        self.ensure_alive()?;
        if self.as_ship().is_none() {
            return Err(SimError::invalid_state(format!(
                "{:?} mass is fixed",
                self.tag()
            )));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::invalid_argument(format!(
                "mass must be finite and positive, got {mass}"
            )));
        }
        self.mass = mass;
        Ok(())
    }

    pub fn thruster_on(&mut self) -> SimResult<()> {
        self.set_thruster(true)
    }

    pub fn thruster_off(&mut self) -> SimResult<()> {
        self.set_thruster(false)
    }

    pub fn set_thruster(&mut self, enabled: bool) -> SimResult<()> {
        self.ensure_alive()?;
        match self.as_ship_mut() {
            Some(ship) => {
                ship.thruster.enabled = enabled;
                Ok(())
            }
            None => Err(SimError::invalid_state("only ships have thrusters")),
        }
    }

    fn limit_speed(&self, velocity: Vector) -> SimResult<Vector> {
        let speed = velocity.modulus()?;
        if speed > self.max_speed {
            velocity.scale_by(self.max_speed / speed)
        } else {
            Ok(velocity)
        }
    }

    // === Kill rules ===

    /// Whether touching `other` destroys it
    pub fn kills_other(&self, other: &Body) -> bool {
        match (self.tag(), other.tag()) {
            (Kind::Ship, _) => false,
            (Kind::Asteroid, Kind::Asteroid) => false,
            (Kind::Asteroid, Kind::Ship | Kind::Bullet) => true,
            (Kind::Bullet, _) => true,
        }
    }

    /// Whether touching `other` destroys this body
    pub fn will_be_killed_by_other(&self, other: &Body) -> bool {
        other.kills_other(self)
    }

    // === Geometry ===

    /// Distance between the two surfaces (negative when overlapping)
    pub fn distance_between(&self, other: &Body) -> SimResult<f64> {
        Ok(self.position.distance_to(other.position)? - (self.radius + other.radius))
    }

    /// Strict overlap: touching surfaces do not overlap
    pub fn overlaps(&self, other: &Body) -> SimResult<bool> {
        let centers = self.position.distance_to(other.position)?;
        let sigma = self.radius + other.radius;
        Ok(centers < sigma && !fuzzy_eq(centers, sigma))
    }

    /// Whether the whole disc lies inside `[0, width] × [0, height]`
    pub fn fits_in(&self, width: f64, height: f64) -> bool {
        let (x, y, r) = (self.position.x(), self.position.y(), self.radius);
        fuzzy_ge(x - r, 0.0)
            && fuzzy_le(x + r, width)
            && fuzzy_ge(y - r, 0.0)
            && fuzzy_le(y + r, height)
    }

    pub(crate) fn set_position(&mut self, position: Vector) {
        self.position = position;
    }
}

fn kind_tag(kind: &BodyKind) -> Kind {
    match kind {
        BodyKind::Ship(_) => Kind::Ship,
        BodyKind::Asteroid => Kind::Asteroid,
        BodyKind::Bullet(_) => Kind::Bullet,
    }
}

/// Durations must be finite and non-negative
pub(crate) fn check_duration(dt: f64) -> SimResult<()> {
    if dt.is_finite() && dt >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_argument(format!("invalid duration {dt}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn v(x: f64, y: f64) -> Vector {
        Vector::new(x, y).unwrap()
    }

    fn ship_at(x: f64, y: f64) -> Body {
        Body::ship(&SimConfig::default(), v(x, y), Vector::ZERO, 10.0, 0.0).unwrap()
    }

    #[test]
    fn test_mass_from_density() {
        let config = SimConfig::default();
        let asteroid = Body::asteroid(&config, v(0.0, 0.0), Vector::ZERO, 10.0).unwrap();
        let expected = config.asteroid.density * 4.0 / 3.0 * PI * 1000.0;
        assert!((asteroid.mass() - expected).abs() / expected < 1e-12);
        assert_eq!(asteroid.state(), BodyState::Created);
    }

    #[test]
    fn test_radius_bounds() {
        let config = SimConfig::default();
        assert!(Body::ship(&config, v(0.0, 0.0), Vector::ZERO, 9.0, 0.0).is_err());
        // The bound itself is excluded
        let at_bound = config.ship.min_radius;
        assert!(Body::ship(&config, v(0.0, 0.0), Vector::ZERO, at_bound, 0.0).is_err());
        assert!(Body::ship(&config, v(0.0, 0.0), Vector::ZERO, 10.0, 0.0).is_ok());
        assert!(Body::bullet(&config, v(0.0, 0.0), Vector::ZERO, f64::NAN).is_err());

        let relaxed = SimConfig::default().with_min_radius(Kind::Ship, 1.0);
        assert!(Body::ship(&relaxed, v(0.0, 0.0), Vector::ZERO, 2.0, 0.0).is_ok());
    }

    #[test]
    fn test_rejects_faster_than_light() {
        let config = SimConfig::default();
        let result = Body::asteroid(&config, v(0.0, 0.0), v(300_000.0, 1.0), 10.0);
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    }

    #[test]
    fn test_move() {
        let mut ship = Body::ship(
            &SimConfig::default(),
            v(0.0, 0.0),
            v(10_000.0, 10_000.0),
            10.0,
            PI / 2.0,
        )
        .unwrap();
        ship.move_by(20.0).unwrap();
        assert_eq!(ship.position().x(), 200_000.0);
        assert_eq!(ship.position().y(), 200_000.0);

        assert!(ship.move_by(-1.0).is_err());
        assert!(ship.move_by(f64::NAN).is_err());
    }

    #[test]
    fn test_move_overflow() {
        let mut ship = Body::ship(
            &SimConfig::default(),
            v(f64::MAX, 0.0),
            v(1000.0, 0.0),
            10.0,
            0.0,
        )
        .unwrap();
        assert!(matches!(
            ship.move_by(f64::MAX),
            Err(SimError::ArithmeticOverflow(_))
        ));
    }

    #[test]
    fn test_thrust() {
        let mut ship = Body::ship(
            &SimConfig::default(),
            v(0.0, 0.0),
            v(10.0, 20.0),
            10.0,
            3.0 * PI / 2.0,
        )
        .unwrap();
        if let BodyKind::Ship(s) = &mut ship.kind {
            s.thruster.power = 1.1e18;
        }
        ship.set_mass(1.0).unwrap();
        ship.thruster_on().unwrap();
        ship.thrust(1e-14).unwrap();
        assert!((ship.velocity().x() - 10.0).abs() < 1e-6);
        assert!((ship.velocity().y() - (20.0 - 1.1e4)).abs() < 1e-6);
    }

    #[test]
    fn test_thrust_disabled_is_noop() {
        let mut ship = ship_at(0.0, 0.0);
        ship.thrust(100.0).unwrap();
        assert!(ship.velocity().is_zero());
    }

    #[test]
    fn test_thrust_clamps_to_max_speed() {
        let mut ship = Body::ship(&SimConfig::default(), v(0.0, 0.0), v(0.0, 100.0), 10.0, 0.0)
            .unwrap();
        ship.set_mass(1.0).unwrap();
        ship.thruster_on().unwrap();
        ship.thrust(1.0).unwrap();
        let speed = ship.speed().unwrap();
        assert!((speed - ship.max_speed()).abs() < 1e-6);
        // Direction preserved: heading is +x, initial velocity +y
        assert!(ship.velocity().x() > 0.0 && ship.velocity().y() > 0.0);
    }

    #[test]
    fn test_thrust_only_for_ships() {
        let mut asteroid =
            Body::asteroid(&SimConfig::default(), v(0.0, 0.0), Vector::ZERO, 10.0).unwrap();
        assert!(matches!(asteroid.thrust(1.0), Err(SimError::InvalidState(_))));
        assert!(asteroid.thruster_on().is_err());
        assert!(asteroid.set_mass(1.0).is_err());
    }

    #[test]
    fn test_set_velocity_ignores_invalid() {
        let mut ship = ship_at(0.0, 0.0);
        ship.set_velocity(3.0, 4.0).unwrap();
        assert_eq!(ship.velocity(), v(3.0, 4.0));
        ship.set_velocity(300_000.0, 1.0).unwrap();
        assert_eq!(ship.velocity(), v(3.0, 4.0));
        ship.set_velocity(f64::NAN, 1.0).unwrap();
        assert_eq!(ship.velocity(), v(3.0, 4.0));
    }

    #[test]
    fn test_set_max_speed() {
        let mut ship = ship_at(0.0, 0.0);
        ship.set_velocity(30.0, 40.0).unwrap();
        ship.set_max_speed(5.0).unwrap();
        assert!((ship.speed().unwrap() - 5.0).abs() < 1e-12);
        ship.set_max_speed(1e9).unwrap();
        assert_eq!(ship.max_speed(), 300_000.0);
        ship.set_max_speed(f64::NAN).unwrap();
        assert_eq!(ship.max_speed(), 300_000.0);
        assert!(ship.set_max_speed(-1.0).is_err());
    }

    #[test]
    fn test_direction_and_turn() {
        let mut ship = ship_at(0.0, 0.0);
        ship.set_direction(5.0 * PI / 2.0).unwrap();
        assert!((ship.direction() - PI / 2.0).abs() < 1e-12);
        ship.set_direction(f64::INFINITY).unwrap();
        assert_eq!(ship.direction(), 0.0);

        ship.turn(-PI / 2.0).unwrap();
        assert!((ship.direction() - 3.0 * PI / 2.0).abs() < 1e-12);
        assert!(ship.turn(f64::NAN).is_err());
        assert!((ship.direction() - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_terminated_body_is_frozen() {
        let mut ship = ship_at(0.0, 0.0);
        ship.set_state(BodyState::Terminated);
        assert!(ship.is_terminated());
        assert!(matches!(ship.move_by(1.0), Err(SimError::InvalidState(_))));
        assert!(ship.set_velocity(1.0, 1.0).is_err());
    }

    #[test]
    fn test_kill_rules() {
        let config = SimConfig::default();
        let ship = ship_at(0.0, 0.0);
        let asteroid = Body::asteroid(&config, v(0.0, 0.0), Vector::ZERO, 10.0).unwrap();
        let bullet = Body::bullet(&config, v(0.0, 0.0), Vector::ZERO, 3.0).unwrap();

        assert!(!ship.kills_other(&ship) && !ship.will_be_killed_by_other(&ship));

        assert!(ship.will_be_killed_by_other(&asteroid));
        assert!(!asteroid.will_be_killed_by_other(&ship));
        assert!(ship.will_be_killed_by_other(&bullet));
        assert!(!bullet.will_be_killed_by_other(&ship));

        assert!(!asteroid.kills_other(&asteroid));
        assert!(asteroid.kills_other(&bullet) && bullet.kills_other(&asteroid));
        assert!(bullet.kills_other(&bullet));
    }

    #[test]
    fn test_overlap_and_fit() {
        let a = ship_at(20.0, 20.0);
        let b = ship_at(40.0, 20.0);
        let c = ship_at(35.0, 20.0);
        // Exactly touching is not overlapping
        assert!(!a.overlaps(&b).unwrap());
        assert!(a.overlaps(&c).unwrap());
        assert_eq!(a.distance_between(&b).unwrap(), 0.0);

        assert!(a.fits_in(100.0, 100.0));
        assert!(ship_at(10.0, 10.0).fits_in(100.0, 100.0));
        assert!(!ship_at(5.0, 50.0).fits_in(100.0, 100.0));
        assert!(!ship_at(50.0, 95.0).fits_in(100.0, 100.0));
    }
}
