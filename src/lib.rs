//! Asteroid Arena - continuous-time collisions in a closed 2D arena
//!
//! Core modules:
//! - `sim`: Deterministic simulation (bodies, world, collision engine, step driver)
//! - `settings`: Explicit simulation configuration
//! - `error`: Error taxonomy shared by every fallible operation

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{SimError, SimResult};
pub use settings::{KindConfig, SimConfig};

use std::f64::consts::TAU;

/// Simulation constants
pub mod consts {
    /// Upper bound on any body's speed (km/s)
    pub const SPEED_OF_LIGHT: f64 = 300_000.0;

    /// Tolerance used by the fuzzy comparisons
    pub const FUZZY_EPSILON: f64 = 1e-9;

    /// Densities (kg/km³)
    pub const SHIP_DENSITY: f64 = 1.42e20;
    pub const ASTEROID_DENSITY: f64 = 2.65e12;
    pub const BULLET_DENSITY: f64 = 7.8e12;

    /// Exclusive lower bounds on body radii (km)
    pub const SHIP_MIN_RADIUS: f64 = 9.5;
    pub const ASTEROID_MIN_RADIUS: f64 = 4.5;
    pub const BULLET_MIN_RADIUS: f64 = 0.5;

    /// Thruster force (N)
    pub const THRUSTER_POWER: f64 = 1.1e21;

    /// Bullet defaults
    pub const BULLET_RADIUS: f64 = 3.0;
    pub const BULLET_SPEED: f64 = 250.0;
    /// Live bullets a ship may have in its world at once
    pub const MAX_BULLETS_PER_SHIP: usize = 3;
    /// Border bounces a bullet survives; the next border contact destroys it
    pub const MAX_BORDER_BOUNCES: u32 = 2;
}

/// Wrap an angle into [0, 2π). Non-finite angles become 0.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle % TAU;
    let wrapped = if wrapped < 0.0 { wrapped + TAU } else { wrapped };
    // -tiny % TAU + TAU rounds up to exactly TAU
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Tolerant equality: absolute near zero, relative elsewhere
#[inline]
pub fn fuzzy_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let diff = (a - b).abs();
    diff <= consts::FUZZY_EPSILON || diff <= consts::FUZZY_EPSILON * a.abs().max(b.abs())
}

/// `a <= b` within tolerance
#[inline]
pub fn fuzzy_le(a: f64, b: f64) -> bool {
    a <= b || fuzzy_eq(a, b)
}

/// `a >= b` within tolerance
#[inline]
pub fn fuzzy_ge(a: f64, b: f64) -> bool {
    a >= b || fuzzy_eq(a, b)
}

/// Volume of a sphere with the given radius
#[inline]
pub fn sphere_volume(radius: f64) -> f64 {
    4.0 / 3.0 * std::f64::consts::PI * radius.powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    #[test]
    fn test_wrap_angle() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(-PI / 2.0) - 3.0 * PI / 2.0).abs() < 1e-12);
        assert_eq!(wrap_angle(f64::NAN), 0.0);
        assert_eq!(wrap_angle(f64::INFINITY), 0.0);
        assert_eq!(wrap_angle(-1e-300), 0.0);
    }

    #[test]
    fn test_fuzzy_comparisons() {
        assert!(fuzzy_eq(1.0, 1.0 + 1e-12));
        assert!(fuzzy_eq(1e12, 1e12 + 1.0));
        assert!(!fuzzy_eq(1.0, 1.001));
        assert!(fuzzy_eq(0.0, 1e-10));
        assert!(!fuzzy_eq(f64::NAN, f64::NAN));
        assert!(fuzzy_eq(f64::INFINITY, f64::INFINITY));
        assert!(fuzzy_le(1.0 + 1e-12, 1.0));
        assert!(fuzzy_ge(1.0 - 1e-12, 1.0));
        assert!(!fuzzy_le(2.0, 1.0));
    }

    #[test]
    fn test_sphere_volume() {
        assert!((sphere_volume(1.0) - 4.0 / 3.0 * PI).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn wrapped_angle_in_range(angle in -1e6f64..1e6) {
            let wrapped = wrap_angle(angle);
            prop_assert!(wrapped >= 0.0 && wrapped < TAU);
            // Wrapping is idempotent
            prop_assert!((wrap_angle(wrapped) - wrapped).abs() < 1e-9);
        }
    }
}
