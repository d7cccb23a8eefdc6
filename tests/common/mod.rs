#![allow(dead_code)]

use veins_evi_bridge::adapters::codec::*;
use veins_evi_bridge::adapters::outbound::{memory_channel, DiscreteEventKernel, MemoryConnection, MemoryPeer};
use veins_evi_bridge::application::{build_manager, ScenarioManager};
use veins_evi_bridge::domains::collision::CollisionLog;
use veins_evi_bridge::domains::sync::MessageSet;
use veins_evi_bridge::domains::vehicle::{Coord, Flag, Heading, VehicleStopState};
use veins_evi_bridge::Config;

pub const NETWORK_HEIGHT: f64 = 100.0;

/// Boundaries used by every scripted peer: with margin 0 the local frame is
/// the peer frame with y flipped.
pub fn boundaries() -> NetworkBoundaries {
    NetworkBoundaries {
        topleft: Point { x: 0.0, y: 0.0 },
        bottomright: Point {
            x: 100.0,
            y: NETWORK_HEIGHT,
        },
    }
}

pub fn transform() -> CoordinateTransform {
    CoordinateTransform::new(boundaries(), 0.0)
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.scenario.margin = 0.0;
    config
}

pub fn frames(message: &Message) -> MessageSet {
    vec![AsmCodec.encode(message).unwrap()]
}

pub fn rectangle(id: &str) -> PolygonRecord {
    PolygonRecord {
        id: id.to_string(),
        kind: "building".to_string(),
        shape: vec![
            Point { x: 10.0, y: 10.0 },
            Point { x: 20.0, y: 10.0 },
            Point { x: 20.0, y: 20.0 },
            Point { x: 10.0, y: 20.0 },
        ],
    }
}

pub fn net_init(sync_interval_s: f64, polygons: Vec<PolygonRecord>) -> Message {
    Message::Session(Session::NetInit(NetInit {
        version: Version::default(),
        network_boundaries: boundaries(),
        polygons,
        init_time_s: 0.0,
        sync_interval_s,
    }))
}

/// Peer-side state for a vehicle at a local position and heading.
pub fn state_at(x: f64, y: f64, heading: f64, stopped: bool) -> VehicleStateRecord {
    let point = transform().to_peer(Coord::new(x, y));
    let stop_bits = if stopped { VehicleStopState::Stopped.bit() } else { 0 };
    VehicleStateRecord {
        position: PositionRecord {
            road_id: 3,
            px: point.x,
            py: point.y,
            angle: transform().heading_to_peer(Heading::from_rad(heading)),
            ..PositionRecord::default()
        },
        speed_mps: if stopped { 0.0 } else { 5.0 },
        stopstate_sum: stop_bits,
        ..VehicleStateRecord::default()
    }
}

pub fn register(vehicle_id: u32, is_ego: bool, state: VehicleStateRecord) -> VehicleCommand {
    VehicleCommand::Register(RegisterVehicle {
        vehicle_id,
        is_ego_vehicle: is_ego,
        veh_type: if is_ego { VehicleType::Bicycle } else { VehicleType::PassengerCar },
        state,
    })
}

pub fn update(vehicle_id: u32, state: VehicleStateRecord) -> VehicleCommand {
    VehicleCommand::Update(UpdateVehicle { vehicle_id, state })
}

pub fn vehicles(time_s: f64, commands: Vec<VehicleCommand>) -> Message {
    Message::Vehicle(VehicleMessage { time_s, commands })
}

pub fn teardown() -> Message {
    Message::Session(Session::Teardown)
}

/// Decoded three-frame request sent by the bridge.
#[derive(Debug)]
pub struct SentRequest {
    pub time_s: f64,
    pub visualization: VisualizationMessage,
    pub doors: VehicleMessage,
}

pub fn decode_request(frames: &MessageSet) -> SentRequest {
    assert_eq!(frames.len(), 3, "requests are three frames");
    let visualization = match AsmCodec.decode(&frames[0]).unwrap() {
        Message::Visualization(v) => v,
        other => panic!("expected visualization, got {other:?}"),
    };
    let time_s = match AsmCodec.decode(&frames[1]).unwrap() {
        Message::Session(Session::TimeReached { time_s }) => time_s,
        other => panic!("expected time reached, got {other:?}"),
    };
    let doors = match AsmCodec.decode(&frames[2]).unwrap() {
        Message::Vehicle(v) => v,
        other => panic!("expected vehicle message, got {other:?}"),
    };
    SentRequest {
        time_s,
        visualization,
        doors,
    }
}

/// Queues the whole peer script up front and closes the peer's sending side,
/// so a run that asks for more than the script holds fails instead of hanging.
pub fn scripted(config: &Config, script: Vec<Message>) -> (ScenarioManager<MemoryConnection>, CollisionLog, MemoryPeer) {
    let (connection, mut peer) = memory_channel();
    for message in &script {
        peer.send(frames(message)).unwrap();
    }
    peer.close();
    let (manager, log) = build_manager(config, connection);
    (manager, log, peer)
}

pub fn kernel() -> DiscreteEventKernel {
    DiscreteEventKernel::new()
}
