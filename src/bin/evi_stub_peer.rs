//! Scripted EVI peer: drives an ego bicycle past a parked car while a second
//! car overtakes, then tears the session down.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use veins_evi_bridge::adapters::codec::{
    AsmCodec, Message, NetInit, NetworkBoundaries, Point, PolygonRecord, PositionRecord, RegisterVehicle, Session,
    UpdateVehicle, Version, VehicleCommand, VehicleMessage, VehicleStateRecord, VehicleType, VisualizationPayload,
};
use veins_evi_bridge::adapters::outbound::TcpConnection;
use veins_evi_bridge::common::hashed_vehicle_id;
use veins_evi_bridge::domains::sync::Transport;
use veins_evi_bridge::domains::vehicle::{Flag, VehicleSignal, VehicleStopState};

const SYNC_INTERVAL_S: f64 = 0.1;

struct SimVehicle {
    id: u32,
    name: &'static str,
    veh_type: VehicleType,
    is_ego: bool,
    x: f64,
    y: f64,
    speed: f64,
    stopped: bool,
    registered: bool,
    gone: bool,
}

impl SimVehicle {
    fn new(name: &'static str, veh_type: VehicleType, is_ego: bool, x: f64, y: f64, speed: f64) -> Self {
        Self {
            id: hashed_vehicle_id(name),
            name,
            veh_type,
            is_ego,
            x,
            y,
            speed,
            stopped: speed == 0.0,
            registered: false,
            gone: false,
        }
    }

    fn state(&self) -> VehicleStateRecord {
        let stop_bits = if self.stopped { VehicleStopState::Stopped.bit() } else { 0 };
        VehicleStateRecord {
            position: PositionRecord {
                road_id: 1,
                px: self.x,
                py: self.y,
                angle: 90.0,
                ..PositionRecord::default()
            },
            speed_mps: self.speed,
            stopstates: if self.stopped { vec![stop_bits] } else { Vec::new() },
            stopstate_sum: stop_bits,
            ..VehicleStateRecord::default()
        }
    }

    fn command(&mut self) -> Option<VehicleCommand> {
        if self.gone {
            return None;
        }
        if self.x > 190.0 {
            self.gone = true;
            return Some(VehicleCommand::Unregister { vehicle_id: self.id });
        }
        if !self.registered {
            self.registered = true;
            return Some(VehicleCommand::Register(RegisterVehicle {
                vehicle_id: self.id,
                is_ego_vehicle: self.is_ego,
                veh_type: self.veh_type,
                state: self.state(),
            }));
        }
        Some(VehicleCommand::Update(UpdateVehicle {
            vehicle_id: self.id,
            state: self.state(),
        }))
    }
}

fn net_init() -> Message {
    let building = |id: &str, x: f64, y: f64| PolygonRecord {
        id: id.to_string(),
        kind: "building".to_string(),
        shape: vec![
            Point { x, y },
            Point { x: x + 10.0, y },
            Point { x: x + 10.0, y: y + 10.0 },
            Point { x, y: y + 10.0 },
        ],
    };
    Message::Session(Session::NetInit(NetInit {
        version: Version::default(),
        network_boundaries: NetworkBoundaries {
            topleft: Point { x: 0.0, y: 0.0 },
            bottomright: Point { x: 200.0, y: 100.0 },
        },
        polygons: vec![building("b0", 30.0, 60.0), building("b1", 90.0, 60.0)],
        init_time_s: 0.0,
        sync_interval_s: SYNC_INTERVAL_S,
    }))
}

fn log_request(codec: &AsmCodec, frames: &[Vec<u8>]) -> Result<f64> {
    let mut time_s = None;
    for frame in frames {
        match codec.decode(frame)? {
            Message::Session(Session::TimeReached { time_s: t }) => time_s = Some(t),
            Message::Visualization(visualization) => {
                for command in visualization.commands {
                    if let VisualizationPayload::GenericWarning { description, .. } = command.payload {
                        info!(entity = command.entity_id, "warning: {}", description);
                    }
                }
            }
            Message::Vehicle(vehicles) => {
                for command in vehicles.commands {
                    if let VehicleCommand::Update(update) = command {
                        let signals = update.state.signal_sum;
                        info!(
                            vehicle_id = update.vehicle_id,
                            left = signals & VehicleSignal::DoorOpenLeft.bit() != 0,
                            right = signals & VehicleSignal::DoorOpenRight.bit() != 0,
                            "door command"
                        );
                    }
                }
            }
            other => bail!("unexpected {} in request", other.class_name()),
        }
    }
    time_s.context("request without time")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let address = args.next().unwrap_or_else(|| "127.0.0.1:12347".to_string());
    let steps: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(100);
    let seed: u64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(7);

    let codec = AsmCodec;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut connection = TcpConnection::connect(&address).await?;
    let mut vehicles = vec![
        SimVehicle::new("ego-0", VehicleType::Bicycle, true, 20.0, 50.0, 4.0),
        SimVehicle::new("parked-0", VehicleType::PassengerCar, false, 45.0, 51.5, 0.0),
        SimVehicle::new("car-1", VehicleType::PassengerCar, false, 0.0, 47.0, 9.0),
    ];
    for vehicle in &vehicles {
        info!(name = vehicle.name, id = vehicle.id, "scripted vehicle");
    }

    connection.send(&[codec.encode(&net_init())?]).await?;
    for step in 0..=steps {
        let request = connection.recv().await?;
        let time_s = log_request(&codec, &request)?;
        if step == steps {
            connection
                .send(&[codec.encode(&Message::Session(Session::Teardown))?])
                .await?;
            info!(time_s, "sent teardown");
            break;
        }

        let commands = vehicles.iter_mut().filter_map(SimVehicle::command).collect();
        connection
            .send(&[codec.encode(&Message::Vehicle(VehicleMessage { time_s, commands }))?])
            .await?;

        for vehicle in vehicles.iter_mut().filter(|v| !v.stopped) {
            let jitter: f64 = rng.gen_range(-0.5..0.5);
            vehicle.speed = (vehicle.speed + jitter).max(0.5);
            vehicle.x += vehicle.speed * SYNC_INTERVAL_S;
        }
    }
    Ok(())
}
