//! Priority queue of predicted collisions
//!
//! Events are ordered by absolute time, then by body pair, so simultaneous
//! events always resolve in the same order. Invalidation is lazy: each body
//! carries a version that is bumped whenever its motion changes, and an
//! event whose recorded versions no longer match is dropped when it surfaces.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use super::collision::{time_to_border, time_to_collision};
use super::world::{BodyId, World};
use crate::error::SimResult;

/// A collision predicted to happen at `time`
#[derive(Debug, Clone, Copy)]
pub struct Scheduled {
    /// Absolute time since the start of the step
    pub time: f64,
    pub first: BodyId,
    /// `None` for a border collision
    pub second: Option<BodyId>,
    versions: (u64, u64),
}

impl Scheduled {
    fn key(&self) -> (BodyId, Option<BodyId>) {
        (self.first, self.second)
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed: BinaryHeap is a max-heap and the earliest event must surface first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.key().cmp(&self.key()))
    }
}

#[derive(Debug, Default)]
pub struct CollisionQueue {
    heap: BinaryHeap<Scheduled>,
    versions: HashMap<BodyId, u64>,
}

impl CollisionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn version(&self, id: BodyId) -> u64 {
        self.versions.get(&id).copied().unwrap_or(0)
    }

    /// Mark `id`'s motion as changed, staling its queued events
    pub fn touch(&mut self, id: BodyId) {
        *self.versions.entry(id).or_insert(0) += 1;
    }

    /// Predict every border and pair collision in `world`
    pub fn schedule_all(&mut self, world: &World, now: f64) -> SimResult<()> {
        let ids: Vec<BodyId> = world.ids().collect();
        for (i, &a) in ids.iter().enumerate() {
            self.schedule_border(world, now, a)?;
            for &b in &ids[i + 1..] {
                self.schedule_pair(world, now, a, b)?;
            }
        }
        Ok(())
    }

    /// Re-predict every collision involving one of `changed`
    pub fn reschedule(&mut self, world: &World, now: f64, changed: &[BodyId]) -> SimResult<()> {
        let changed: BTreeSet<BodyId> = changed.iter().copied().filter(|&id| world.contains(id)).collect();
        let ids: Vec<BodyId> = world.ids().collect();
        for &a in &changed {
            self.schedule_border(world, now, a)?;
            for &b in &ids {
                // Pairs of two changed bodies are scheduled once, from the lower id
                if b == a || (changed.contains(&b) && b < a) {
                    continue;
                }
                self.schedule_pair(world, now, a, b)?;
            }
        }
        Ok(())
    }

    fn schedule_border(&mut self, world: &World, now: f64, id: BodyId) -> SimResult<()> {
        let body = world.body(id)?;
        let (time, _) = time_to_border(body, world.width(), world.height())?;
        if time.is_finite() {
            self.push(now + time, id, None);
        }
        Ok(())
    }

    fn schedule_pair(&mut self, world: &World, now: f64, a: BodyId, b: BodyId) -> SimResult<()> {
        if world.is_exempt_pair(a, b) {
            return Ok(());
        }
        let time = time_to_collision(world.body(a)?, world.body(b)?)?;
        if time.is_finite() {
            let (first, second) = if a < b { (a, b) } else { (b, a) };
            self.push(now + time, first, Some(second));
        }
        Ok(())
    }

    fn push(&mut self, time: f64, first: BodyId, second: Option<BodyId>) {
        let versions = (self.version(first), second.map_or(0, |s| self.version(s)));
        log::trace!("scheduled {first:?}/{second:?} at {time}");
        self.heap.push(Scheduled {
            time,
            first,
            second,
            versions,
        });
    }

    fn is_current(&self, world: &World, event: &Scheduled) -> bool {
        world.contains(event.first)
            && event.versions.0 == self.version(event.first)
            && event.second.is_none_or(|second| {
                world.contains(second) && event.versions.1 == self.version(second)
            })
    }

    /// Earliest still-valid event, discarding stale ones on the way
    pub fn peek(&mut self, world: &World) -> Option<Scheduled> {
        while let Some(top) = self.heap.peek().copied() {
            if self.is_current(world, &top) {
                return Some(top);
            }
            self.heap.pop();
        }
        None
    }

    pub fn pop(&mut self) -> Option<Scheduled> {
        self.heap.pop()
    }
}
