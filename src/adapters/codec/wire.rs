//! Records exchanged with the EVI peer.

use serde::{Deserialize, Serialize};

pub const SERVER_VERSION: &str = "evi";
pub const API_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Session(Session),
    Vehicle(VehicleMessage),
    Visualization(VisualizationMessage),
}

impl Message {
    pub fn class_name(&self) -> &'static str {
        match self {
            Message::Session(Session::NetInit(_)) => "session.net_init",
            Message::Session(Session::TimeReached { .. }) => "session.time_reached",
            Message::Session(Session::Teardown) => "session.teardown",
            Message::Vehicle(_) => "vehicle",
            Message::Visualization(_) => "visualization",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Session {
    NetInit(NetInit),
    TimeReached { time_s: f64 },
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub api: u32,
    pub server: String,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            api: API_VERSION,
            server: SERVER_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkBoundaries {
    pub topleft: Point,
    pub bottomright: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub id: String,
    pub kind: String,
    pub shape: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetInit {
    pub version: Version,
    pub network_boundaries: NetworkBoundaries,
    pub polygons: Vec<PolygonRecord>,
    pub init_time_s: f64,
    pub sync_interval_s: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleMessage {
    pub time_s: f64,
    pub commands: Vec<VehicleCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VehicleCommand {
    Register(RegisterVehicle),
    Update(UpdateVehicle),
    Unregister { vehicle_id: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    #[default]
    Undefined,
    PassengerCar,
    Truck,
    Bicycle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterVehicle {
    pub vehicle_id: u32,
    pub is_ego_vehicle: bool,
    pub veh_type: VehicleType,
    pub state: VehicleStateRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateVehicle {
    pub vehicle_id: u32,
    pub state: VehicleStateRecord,
}

/// Peer coordinates: x/y in network units, angle in degrees clockwise from north.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub road_id: u32,
    pub px: f64,
    pub py: f64,
    pub angle: f64,
    pub height: f64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleStateRecord {
    pub position: PositionRecord,
    pub speed_mps: f64,
    /// Individual flag values, informational; `signal_sum` is authoritative.
    pub signals: Vec<u32>,
    pub signal_sum: u32,
    pub stopstates: Vec<u32>,
    pub stopstate_sum: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationMessage {
    pub commands: Vec<VisualizationCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationCommand {
    pub entity_id: u32,
    pub payload: VisualizationPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisualizationPayload {
    GenericWarning {
        intensity: f64,
        description: String,
    },
    WirelessMessage {
        sender_id: u32,
        receiver_id: String,
        location: Location,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lon: f64,
    pub lat: f64,
    pub angle: f64,
}
