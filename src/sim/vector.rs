//! Finite-checked 2D vector
//!
//! Collision math divides by differences of these values, so every operation
//! refuses to produce NaN or infinite components.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// An immutable 2D vector whose components are always finite
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector(DVec2);

impl Vector {
    pub const ZERO: Vector = Vector(DVec2::ZERO);

    pub fn new(x: f64, y: f64) -> SimResult<Self> {
        if x.is_finite() && y.is_finite() {
            Ok(Self(DVec2::new(x, y)))
        } else {
            Err(SimError::invalid_argument(format!(
                "vector components must be finite, got ({x}, {y})"
            )))
        }
    }

    /// Vector of the given length pointing along `angle`
    pub fn from_angle(angle: f64, length: f64) -> SimResult<Self> {
        checked(DVec2::from_angle(angle) * length, "Vector::from_angle")
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.0.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.0.y
    }

    #[inline]
    pub fn as_dvec2(&self) -> DVec2 {
        self.0
    }

    pub fn add(&self, other: Vector) -> SimResult<Vector> {
        checked(self.0 + other.0, "Vector::add")
    }

    pub fn subtract(&self, other: Vector) -> SimResult<Vector> {
        checked(self.0 - other.0, "Vector::subtract")
    }

    pub fn dot(&self, other: Vector) -> SimResult<f64> {
        let dot = self.0.dot(other.0);
        if dot.is_finite() {
            Ok(dot)
        } else {
            Err(SimError::ArithmeticOverflow("Vector::dot"))
        }
    }

    pub fn scale_by(&self, factor: f64) -> SimResult<Vector> {
        checked(self.0 * factor, "Vector::scale_by")
    }

    /// Euclidean length
    pub fn modulus(&self) -> SimResult<f64> {
        // hypot avoids overflowing on the intermediate squares
        let length = self.0.x.hypot(self.0.y);
        if length.is_finite() {
            Ok(length)
        } else {
            Err(SimError::ArithmeticOverflow("Vector::modulus"))
        }
    }

    pub fn distance_to(&self, other: Vector) -> SimResult<f64> {
        self.subtract(other)?.modulus()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == DVec2::ZERO
    }
}

impl TryFrom<DVec2> for Vector {
    type Error = SimError;

    fn try_from(value: DVec2) -> SimResult<Self> {
        Vector::new(value.x, value.y)
    }
}

impl From<Vector> for DVec2 {
    fn from(value: Vector) -> Self {
        value.0
    }
}

#[inline]
fn checked(value: DVec2, op: &'static str) -> SimResult<Vector> {
    if value.is_finite() {
        Ok(Vector(value))
    } else {
        Err(SimError::ArithmeticOverflow(op))
    }
}
