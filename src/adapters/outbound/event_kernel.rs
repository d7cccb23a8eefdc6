use crate::common::{HostError, SimTime};
use crate::domains::scenario::{EntityId, EntitySpec, HostKernel, ScenarioTimer};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Scheduled {
    at: SimTime,
    seq: u64,
    timer: ScenarioTimer,
}

/// Minimal discrete event host: a clock, a time-ordered timer queue and a
/// table of live entities keyed by id.
#[derive(Debug, Default)]
pub struct DiscreteEventKernel {
    now: SimTime,
    queue: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
    next_entity: u64,
    entities: BTreeMap<EntityId, EntitySpec>,
    created: usize,
    destroyed: usize,
    time_limit: Option<SimTime>,
    ended: bool,
}

impl DiscreteEventKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops handing out timers scheduled after `limit`.
    pub fn with_time_limit(mut self, limit: SimTime) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Pops the earliest timer and advances the clock to it. Timers with the
    /// same time come out in scheduling order.
    pub fn next_timer(&mut self) -> Option<(SimTime, ScenarioTimer)> {
        if self.ended {
            return None;
        }
        let Reverse(next) = self.queue.pop()?;
        if let Some(limit) = self.time_limit {
            if next.at > limit {
                info!("Simulation time limit {} reached", limit);
                self.ended = true;
                return None;
            }
        }
        self.now = next.at;
        Some((next.at, next.timer))
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn pending_timers(&self) -> usize {
        self.queue.len()
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, EntitySpec> {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }
}

impl HostKernel for DiscreteEventKernel {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule_at(&mut self, at: SimTime, timer: ScenarioTimer) {
        let at = at.max(self.now);
        self.seq += 1;
        self.queue.push(Reverse(Scheduled {
            at,
            seq: self.seq,
            timer,
        }));
    }

    fn create_entity(&mut self, spec: EntitySpec) -> Result<EntityId, HostError> {
        if self.ended {
            return Err(HostError::Ended);
        }
        if self.entities.values().any(|existing| existing.slot == spec.slot) {
            return Err(HostError::SlotOccupied(spec.slot));
        }
        self.next_entity += 1;
        let id = EntityId(self.next_entity);
        debug!(%id, slot = spec.slot, module_type = %spec.module_type, "created entity");
        self.entities.insert(id, spec);
        self.created += 1;
        Ok(id)
    }

    fn destroy_entity(&mut self, entity: EntityId) -> Result<(), HostError> {
        self.entities
            .remove(&entity)
            .ok_or(HostError::UnknownEntity(entity.0))?;
        self.destroyed += 1;
        debug!(id = %entity, "destroyed entity");
        Ok(())
    }

    fn end_simulation(&mut self) {
        info!("Ending simulation at {}", self.now);
        self.ended = true;
        self.queue.clear();
    }
}
