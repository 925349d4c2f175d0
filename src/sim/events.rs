//! Events reported by a simulation step

use serde::{Deserialize, Serialize};

use super::body::Kind;
use super::vector::Vector;
use super::world::BodyId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A body touched the arena border at `position`
    BorderCollision { body: BodyId, position: Vector },
    /// Two bodies touched at `position`
    BodyCollision {
        first: BodyId,
        second: BodyId,
        position: Vector,
    },
    /// A body was destroyed and left its world
    Destroyed { body: BodyId, kind: Kind },
    /// A ship fired a bullet
    BulletFired { ship: BodyId, bullet: BodyId },
}

impl SimEvent {
    /// Whether this event involves `id`
    pub fn involves(&self, id: BodyId) -> bool {
        match self {
            SimEvent::BorderCollision { body, .. } | SimEvent::Destroyed { body, .. } => *body == id,
            SimEvent::BodyCollision { first, second, .. } => *first == id || *second == id,
            SimEvent::BulletFired { ship, bullet } => *ship == id || *bullet == id,
        }
    }
}
