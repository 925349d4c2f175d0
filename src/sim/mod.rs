//! Deterministic simulation module
//!
//! Everything here is a pure state transition over geometry and kinematics:
//! - No rendering, I/O or platform dependencies
//! - Seeded RNG only
//! - Stable iteration order (by body slot) and total event ordering

pub mod body;
pub mod collision;
pub mod events;
pub mod queue;
pub mod scenario;
pub mod tick;
pub mod vector;
pub mod world;

pub use body::{Body, BodyKind, BodyState, Bullet, Kind, Ship, Thruster};
pub use collision::{
    Axis, Collision, border_collision_position, bounce, collision_position, contact_angle,
    time_to_border, time_to_collision,
};
pub use events::SimEvent;
pub use queue::CollisionQueue;
pub use scenario::{ScenarioSpec, generate};
pub use tick::{ShipCommand, TickInput, apply_command, evolve, tick};
pub use vector::Vector;
pub use world::{BodyId, World};
