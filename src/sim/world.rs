//! The arena: a bounded rectangle owning its bodies
//!
//! Bodies live in a generational slot arena. A `BodyId` names a slot plus the
//! generation it was issued for, so the handle of a destroyed body never
//! aliases whatever later reuses its slot.

use serde::{Deserialize, Serialize};

use super::body::{Body, BodyState, Kind, check_duration};
use super::events::SimEvent;
use super::vector::Vector;
use crate::error::{SimError, SimResult};
use crate::fuzzy_eq;
use crate::settings::SimConfig;

/// Handle to a body inside a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId {
    index: u32,
    generation: u32,
}

impl BodyId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// A closed rectangular arena `[0, width] × [0, height]`
#[derive(Debug, Clone)]
pub struct World {
    config: SimConfig,
    width: f64,
    height: f64,
    slots: Vec<Slot>,
    /// Vacant slot indices, reused last-in first-out
    free: Vec<u32>,
    len: usize,
}

impl World {
    pub fn new(config: SimConfig, width: f64, height: f64) -> SimResult<Self> {
        config.validate()?;
        for (name, value) in [("width", width), ("height", height)] {
            if !value.is_finite() || value <= 0.0 || value > config.upper_bound_coordinate {
                return Err(SimError::invalid_argument(format!(
                    "world {name} must be in (0, {}], got {value}",
                    config.upper_bound_coordinate
                )));
            }
        }
        Ok(Self {
            config,
            width,
            height,
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // === Membership ===

    /// Admit a free-standing body. It must fit inside the border and must not
    /// overlap any occupant other than its own source ship.
    pub fn add_body(&mut self, body: Body) -> SimResult<BodyId> {
        match body.state() {
            BodyState::Created => {}
            BodyState::Active => return Err(SimError::invalid_state("body is already in a world")),
            BodyState::Terminated => return Err(SimError::invalid_state("body is terminated")),
        }
        if body.source().is_some() {
            return Err(SimError::invalid_argument(
                "bullets with a source enter a world only by being fired",
            ));
        }
        if !body.fits_in(self.width, self.height) {
            return Err(SimError::invalid_argument(format!(
                "{:?} at ({}, {}) does not fit in a {}x{} world",
                body.tag(),
                body.position().x(),
                body.position().y(),
                self.width,
                self.height
            )));
        }
        if let Some(occupant) = self.first_overlap(&body, None)? {
            return Err(SimError::invalid_argument(format!(
                "{:?} overlaps {occupant:?}",
                body.tag()
            )));
        }
        Ok(self.insert(body))
    }

    /// Take a body out of the world without destroying it
    pub fn remove_body(&mut self, id: BodyId) -> SimResult<Body> {
        let mut body = self.detach(id)?;
        body.set_state(BodyState::Created);
        Ok(body)
    }

    /// Destroy a body: it leaves the world and is terminated
    pub fn kill(&mut self, id: BodyId) -> SimResult<Body> {
        let mut body = self.detach(id)?;
        body.set_state(BodyState::Terminated);
        log::debug!("{:?} {id:?} destroyed", body.tag());
        Ok(body)
    }

    pub(crate) fn insert(&mut self, mut body: Body) -> BodyId {
        body.set_state(BodyState::Active);
        self.len += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.body = Some(body);
                BodyId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    body: Some(body),
                });
                BodyId { index, generation: 0 }
            }
        }
    }

    fn detach(&mut self, id: BodyId) -> SimResult<Body> {
        self.body(id)?;
        let slot = &mut self.slots[id.index as usize];
        let Some(mut body) = slot.body.take() else {
            return Err(stale(id));
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;

        // Keep ship <-> bullet links consistent
        if let Some(source) = body.source() {
            if let Some(ship) = self.get_mut(source).and_then(|s| s.as_ship_mut()) {
                ship.forget_bullet(id);
            }
            if let Some(bullet) = body.as_bullet_mut() {
                bullet.source = None;
            }
        }
        if let Some(ship) = body.as_ship_mut() {
            for bullet_id in ship.forget_all_bullets() {
                if let Some(bullet) = self.get_mut(bullet_id).and_then(|b| b.as_bullet_mut()) {
                    bullet.source = None;
                }
            }
        }
        Ok(body)
    }

    // === Lookup ===

    pub fn contains(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }

    pub fn body(&self, id: BodyId) -> SimResult<&Body> {
        self.get(id).ok_or_else(|| stale(id))
    }

    pub fn body_mut(&mut self, id: BodyId) -> SimResult<&mut Body> {
        self.get_mut(id).ok_or_else(|| stale(id))
    }

    fn get(&self, id: BodyId) -> Option<&Body> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    /// Every body, in slot order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body.as_ref().map(|body| {
                (
                    BodyId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    body,
                )
            })
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies().map(|(id, _)| id)
    }

    pub fn bodies_of(&self, kind: Kind) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies().filter(move |(_, body)| body.tag() == kind)
    }

    pub fn ships(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies_of(Kind::Ship)
    }

    pub fn asteroids(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies_of(Kind::Asteroid)
    }

    pub fn bullets(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies_of(Kind::Bullet)
    }

    /// Live bullets fired by `ship`
    pub fn bullets_of(&self, ship: BodyId) -> SimResult<&[BodyId]> {
        self.body(ship)?
            .as_ship()
            .map(|s| s.bullets())
            .ok_or_else(|| SimError::invalid_argument(format!("{ship:?} is not a ship")))
    }

    /// The body whose center is at `position`
    pub fn entity_at(&self, position: Vector) -> Option<BodyId> {
        self.bodies()
            .find(|(_, body)| {
                fuzzy_eq(body.position().x(), position.x())
                    && fuzzy_eq(body.position().y(), position.y())
            })
            .map(|(id, _)| id)
    }

    /// A bullet and the ship that fired it never collide
    pub fn is_exempt_pair(&self, a: BodyId, b: BodyId) -> bool {
        let source_of = |id| self.get(id).and_then(|body| body.source());
        source_of(a) == Some(b) || source_of(b) == Some(a)
    }

    /// First occupant (slot order) that `body` overlaps, ignoring `ignore`
    /// and `body`'s own source ship
    fn first_overlap(&self, body: &Body, ignore: Option<BodyId>) -> SimResult<Option<BodyId>> {
        for (id, other) in self.bodies() {
            if Some(id) == ignore || body.source() == Some(id) {
                continue;
            }
            if body.overlaps(other)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    // === Motion ===

    /// Move every body along its velocity for `dt`
    pub fn advance_all(&mut self, dt: f64) -> SimResult<()> {
        check_duration(dt)?;
        for slot in &mut self.slots {
            if let Some(body) = slot.body.as_mut() {
                body.move_by(dt)?;
            }
        }
        Ok(())
    }

    // === Ships ===

    /// Fire a bullet from `ship`'s nose. Returns `None` when the ship already
    /// has its maximum of live bullets or the bullet would start outside the
    /// world.
    pub fn fire_bullet(&mut self, ship: BodyId) -> SimResult<Option<BodyId>> {
        let mut events = Vec::new();
        self.fire(ship, &mut events)
    }

    pub(crate) fn fire(
        &mut self,
        ship_id: BodyId,
        events: &mut Vec<SimEvent>,
    ) -> SimResult<Option<BodyId>> {
        let ship = self.body(ship_id)?;
        if !ship.is_active() {
            return Err(SimError::invalid_state("only active ships can fire"));
        }
        let Some(ship_data) = ship.as_ship() else {
            return Err(SimError::invalid_argument(format!("{ship_id:?} is not a ship")));
        };
        if ship_data.bullets().len() >= self.config.max_bullets_per_ship {
            log::trace!("{ship_id:?} already has {} bullets", ship_data.bullets().len());
            return Ok(None);
        }

        let bullet_radius = self.config.bullet_radius;
        let nose = Vector::from_angle(ship.direction(), ship.radius() + bullet_radius)?;
        let position = ship.position().add(nose)?;
        let velocity = Vector::from_angle(ship.direction(), self.config.bullet_speed)?;
        let mut bullet = Body::bullet(&self.config, position, velocity, bullet_radius)?;
        if !bullet.fits_in(self.width, self.height) {
            log::warn!("{ship_id:?} fired a bullet outside the world; discarded");
            return Ok(None);
        }
        if let Some(b) = bullet.as_bullet_mut() {
            b.source = Some(ship_id);
        }

        let bullet_id = self.insert(bullet);
        if let Some(ship) = self.get_mut(ship_id).and_then(|s| s.as_ship_mut()) {
            ship.track_bullet(bullet_id);
        }
        events.push(SimEvent::BulletFired {
            ship: ship_id,
            bullet: bullet_id,
        });
        log::debug!("{ship_id:?} fired {bullet_id:?}");

        // A bullet spawned on top of another body hits it immediately
        while self.contains(bullet_id) {
            let bullet = self.body(bullet_id)?;
            let Some(other_id) = self.first_overlap(bullet, Some(bullet_id))? else {
                break;
            };
            let other = self.body(other_id)?;
            let bullet_dies = bullet.will_be_killed_by_other(other);
            let other_dies = other.will_be_killed_by_other(bullet);
            events.push(SimEvent::BodyCollision {
                first: bullet_id,
                second: other_id,
                position: bullet.position(),
            });
            if other_dies {
                let body = self.kill(other_id)?;
                events.push(SimEvent::Destroyed {
                    body: other_id,
                    kind: body.tag(),
                });
            }
            if bullet_dies {
                self.kill(bullet_id)?;
                events.push(SimEvent::Destroyed {
                    body: bullet_id,
                    kind: Kind::Bullet,
                });
            }
            if !other_dies && !bullet_dies {
                break;
            }
        }

        Ok(Some(bullet_id))
    }
}

fn stale(id: BodyId) -> SimError {
    SimError::invalid_state(format!("{id:?} does not name a body in this world"))
}
