use super::host::EntityId;
use crate::common::{ConsistencyError, SimTime};
use crate::domains::sync::{GenericWarning, OpenDoorMessage, ReceivedWirelessMessage, TimestepRequest};
use crate::domains::vehicle::{Mobility, VehicleSignal, VehicleState};
use std::collections::{BTreeMap, HashMap};

/// A vehicle entity owned by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedHost {
    pub entity: EntityId,
    pub slot: usize,
    pub mobility: Mobility,
}

/// Events collected between two sync cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingEvents {
    pub generic_warnings: Vec<GenericWarning>,
    pub received_wireless_messages: Vec<ReceivedWirelessMessage>,
    pub open_door_messages: Vec<OpenDoorMessage>,
}

impl PendingEvents {
    pub fn is_empty(&self) -> bool {
        self.generic_warnings.is_empty()
            && self.received_wireless_messages.is_empty()
            && self.open_door_messages.is_empty()
    }

    pub fn into_request(self, sync_time_s: f64) -> TimestepRequest {
        TimestepRequest {
            sync_time_s,
            generic_warnings: self.generic_warnings,
            received_wireless_messages: self.received_wireless_messages,
            open_door_messages: self.open_door_messages,
        }
    }
}

/// Reacts to a vehicle's pose having just changed.
///
/// Called synchronously right after the registry applied the change, so the
/// listener always sees the post-mutation snapshot.
pub trait PoseListener: Send {
    fn pose_changed(&mut self, external_id: &str, registry: &mut Registry, now: SimTime);
}

/// Authoritative mapping from external vehicle id to local entity.
///
/// Membership only changes through the scenario manager; listeners get
/// `&mut Registry` but can only touch door signals and the outbound queues.
#[derive(Debug, Default)]
pub struct Registry {
    hosts: BTreeMap<String, ManagedHost>,
    slots: HashMap<String, usize>,
    ego_vehicle_ids: Vec<String>,
    pending: PendingEvents,
}

impl Registry {
    /// Ego vehicles get the lowest slot indices, in list order.
    pub fn new(ego_vehicle_ids: Vec<String>) -> Self {
        let mut registry = Self {
            ego_vehicle_ids,
            ..Self::default()
        };
        for id in registry.ego_vehicle_ids.clone() {
            registry.slot_for(&id);
        }
        registry
    }

    /// Stable slot index of an id; unseen ids get the next free index.
    pub fn slot_for(&mut self, external_id: &str) -> usize {
        let next = self.slots.len();
        *self.slots.entry(external_id.to_string()).or_insert(next)
    }

    pub fn is_ego_vehicle(&self, external_id: &str) -> bool {
        self.ego_vehicle_ids.iter().any(|id| id == external_id)
    }

    pub fn ego_vehicle_ids(&self) -> &[String] {
        &self.ego_vehicle_ids
    }

    pub fn hosts(&self) -> &BTreeMap<String, ManagedHost> {
        &self.hosts
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.hosts.contains_key(external_id)
    }

    pub fn mobility(&self, external_id: &str) -> Option<&Mobility> {
        self.hosts.get(external_id).map(|host| &host.mobility)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub(crate) fn insert(&mut self, external_id: &str, host: ManagedHost) -> Result<(), ConsistencyError> {
        if self.hosts.contains_key(external_id) {
            return Err(ConsistencyError::DuplicateVehicle(external_id.to_string()));
        }
        self.hosts.insert(external_id.to_string(), host);
        Ok(())
    }

    pub(crate) fn update(&mut self, external_id: &str, state: VehicleState) -> Result<(), ConsistencyError> {
        let host = self
            .hosts
            .get_mut(external_id)
            .ok_or_else(|| ConsistencyError::UnknownVehicle {
                id: external_id.to_string(),
                operation: "update",
            })?;
        host.mobility.update(state);
        Ok(())
    }

    pub(crate) fn remove(&mut self, external_id: &str) -> Result<ManagedHost, ConsistencyError> {
        self.hosts
            .remove(external_id)
            .ok_or_else(|| ConsistencyError::UnknownVehicle {
                id: external_id.to_string(),
                operation: "remove",
            })
    }

    /// Locally flips a door bit. Returns false if the vehicle is unknown.
    pub fn set_door_signal(&mut self, external_id: &str, door: VehicleSignal, open: bool) -> bool {
        match self.hosts.get_mut(external_id) {
            Some(host) => {
                host.mobility.set_signal(door, open);
                true
            }
            None => false,
        }
    }

    pub fn register_generic_warning(&mut self, warning: GenericWarning) {
        self.pending.generic_warnings.push(warning);
    }

    pub fn register_received_wireless_message(&mut self, message: ReceivedWirelessMessage) {
        self.pending.received_wireless_messages.push(message);
    }

    pub fn register_open_door_message(&mut self, message: OpenDoorMessage) {
        self.pending.open_door_messages.push(message);
    }

    pub fn pending(&self) -> &PendingEvents {
        &self.pending
    }

    /// Drains all queued events; each event is delivered at most once.
    pub fn take_pending(&mut self) -> PendingEvents {
        std::mem::take(&mut self.pending)
    }
}
