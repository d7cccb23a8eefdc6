use crate::domains::vehicle::{Coord, Heading, VehicleSignalSet, VehicleState, VehicleStopStateSet};
use serde::{Deserialize, Serialize};

/// Static obstacle outline in local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: String,
    pub kind: String,
    pub shape: Vec<Coord>,
}

/// One vehicle as announced by the peer, already in local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub external_id: String,
    pub is_ego_vehicle: bool,
    pub stop_states: VehicleStopStateSet,
    pub signals: VehicleSignalSet,
    pub position: Coord,
    pub heading: Heading,
    pub speed: f64,
    pub road_id: String,
    pub altitude: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl Vehicle {
    pub fn state(&self) -> VehicleState {
        VehicleState {
            road_position: self.position,
            heading: self.heading,
            speed: self.speed,
            road_id: self.road_id.clone(),
            signals: self.signals,
            stop_states: self.stop_states,
            altitude: self.altitude,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Result of the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInitData {
    pub sync_interval_s: f64,
    pub init_time_s: f64,
    pub polygons: Vec<Polygon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericWarning {
    pub entity_id: u32,
    pub intensity: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedWirelessMessage {
    pub entity_id: u32,
    pub sender_id: u32,
    pub receiver_id: String,
    pub longitude: f64,
    pub latitude: f64,
    pub angle: f64,
}

/// Desired door state of one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDoorMessage {
    pub vehicle_id: u32,
    pub open_left_door: bool,
    pub open_right_door: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestepRequest {
    pub sync_time_s: f64,
    pub generic_warnings: Vec<GenericWarning>,
    pub received_wireless_messages: Vec<ReceivedWirelessMessage>,
    pub open_door_messages: Vec<OpenDoorMessage>,
}

/// Vehicle deltas for one cycle, applied as adds, then mods, then deletes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestepReply {
    pub sync_time_s: f64,
    pub add_vehicles: Vec<Vehicle>,
    pub mod_vehicles: Vec<Vehicle>,
    pub del_vehicles: Vec<String>,
}

/// Outcome of one round trip. Teardown is a normal end of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Reply(TimestepReply),
    Teardown,
}
