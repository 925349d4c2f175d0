//! Simulation configuration
//!
//! Bounds that would otherwise be shared statics (radius lower bounds, the
//! coordinate upper bound, the speed of light) live here and are threaded
//! through constructors, so independent simulations never share state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{SimError, SimResult};
use crate::sim::Kind;

/// Per-kind body parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindConfig {
    /// Inclusive lower bound on the radius
    pub min_radius: f64,
    /// Density used to derive mass from radius
    pub density: f64,
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// No body may ever move faster than this
    pub speed_of_light: f64,
    /// Largest width/height a world may have
    pub upper_bound_coordinate: f64,

    // === Bodies ===
    pub ship: KindConfig,
    pub asteroid: KindConfig,
    pub bullet: KindConfig,

    // === Ships ===
    /// Thruster force output
    pub thruster_power: f64,
    /// Live bullets per ship
    pub max_bullets_per_ship: usize,

    // === Bullets ===
    pub bullet_radius: f64,
    pub bullet_speed: f64,
    /// Border bounces before the next border contact destroys a bullet
    pub max_border_bounces: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            speed_of_light: SPEED_OF_LIGHT,
            upper_bound_coordinate: f64::MAX,

            ship: KindConfig {
                min_radius: SHIP_MIN_RADIUS,
                density: SHIP_DENSITY,
            },
            asteroid: KindConfig {
                min_radius: ASTEROID_MIN_RADIUS,
                density: ASTEROID_DENSITY,
            },
            bullet: KindConfig {
                min_radius: BULLET_MIN_RADIUS,
                density: BULLET_DENSITY,
            },

            thruster_power: THRUSTER_POWER,
            max_bullets_per_ship: MAX_BULLETS_PER_SHIP,

            bullet_radius: BULLET_RADIUS,
            bullet_speed: BULLET_SPEED,
            max_border_bounces: MAX_BORDER_BOUNCES,
        }
    }
}

impl SimConfig {
    /// Parameters for one body kind
    pub fn kind(&self, kind: Kind) -> &KindConfig {
        match kind {
            Kind::Ship => &self.ship,
            Kind::Asteroid => &self.asteroid,
            Kind::Bullet => &self.bullet,
        }
    }

    /// Builder: override the radius lower bound of one kind
    pub fn with_min_radius(mut self, kind: Kind, min_radius: f64) -> Self {
        match kind {
            Kind::Ship => self.ship.min_radius = min_radius,
            Kind::Asteroid => self.asteroid.min_radius = min_radius,
            Kind::Bullet => self.bullet.min_radius = min_radius,
        }
        self
    }

    /// Check every value is finite and in range
    pub fn validate(&self) -> SimResult<()> {
        let positive = |value: f64, what: &str| -> SimResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimError::invalid_argument(format!(
                    "{what} must be finite and positive, got {value}"
                )))
            }
        };

        positive(self.speed_of_light, "speed_of_light")?;
        positive(self.upper_bound_coordinate, "upper_bound_coordinate")?;
        for (name, kind) in [
            ("ship", &self.ship),
            ("asteroid", &self.asteroid),
            ("bullet", &self.bullet),
        ] {
            positive(kind.min_radius, &format!("{name}.min_radius"))?;
            positive(kind.density, &format!("{name}.density"))?;
        }
        positive(self.thruster_power, "thruster_power")?;
        positive(self.bullet_speed, "bullet_speed")?;
        positive(self.bullet_radius, "bullet_radius")?;
        if self.bullet_radius <= self.bullet.min_radius {
            return Err(SimError::invalid_argument(format!(
                "bullet_radius {} must exceed the bullet lower bound {}",
                self.bullet_radius, self.bullet.min_radius
            )));
        }
        if self.bullet_speed > self.speed_of_light {
            return Err(SimError::invalid_argument("bullet_speed exceeds speed_of_light"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
