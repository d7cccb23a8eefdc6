use crate::common::{HostError, SimTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Callbacks the scenario manager asks the host to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScenarioTimer {
    ConnectAndStart,
    Timestep,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity-{}", self.0)
    }
}

/// What the host needs to instantiate a vehicle entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub external_id: String,
    pub slot: usize,
    pub module_type: String,
    pub display_string: String,
    pub start_at: SimTime,
}

/// Host simulation kernel port: a clock, a timer queue and an entity table.
pub trait HostKernel {
    fn now(&self) -> SimTime;

    fn schedule_at(&mut self, at: SimTime, timer: ScenarioTimer);

    fn create_entity(&mut self, spec: EntitySpec) -> Result<EntityId, HostError>;

    fn destroy_entity(&mut self, entity: EntityId) -> Result<(), HostError>;

    fn end_simulation(&mut self);
}
