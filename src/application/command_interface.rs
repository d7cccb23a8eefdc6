use crate::adapters::codec::{
    AsmCodec, CoordinateTransform, Location, Message, NetInit, Point, Session, VehicleCommand, VehicleMessage,
    VehicleStateRecord, VisualizationCommand, VisualizationMessage, VisualizationPayload, UpdateVehicle,
    API_VERSION, SERVER_VERSION,
};
use crate::common::{ProtocolError, SyncResult, TransportError};
use crate::domains::sync::{
    ExchangeOutcome, NetworkInitData, OpenDoorMessage, Polygon, TimestepReply, TimestepRequest, Transport, Vehicle,
};
use crate::domains::vehicle::{Flag, VehicleSignal, VehicleSignalSet, VehicleStopStateSet};
use tracing::{debug, info, warn};

/// Sync client: one handshake, then one round trip per timestep.
pub struct CommandInterface<T: Transport> {
    connection: T,
    codec: AsmCodec,
    transform: Option<CoordinateTransform>,
}

impl<T: Transport> CommandInterface<T> {
    pub fn new(connection: T) -> Self {
        Self {
            connection,
            codec: AsmCodec,
            transform: None,
        }
    }

    pub fn connection(&self) -> &T {
        &self.connection
    }

    pub fn is_initialized(&self) -> bool {
        self.transform.is_some()
    }

    /// Waits for the peer's net-init and sets up the coordinate transform.
    pub async fn initialize(&mut self, margin: f64) -> SyncResult<NetworkInitData> {
        let frames = self.connection.recv().await?;
        let message = self.decode_single(&frames)?;
        let init = match message {
            Message::Session(Session::NetInit(init)) => init,
            other => return Err(ProtocolError::UnexpectedMessageClass(other.class_name()).into()),
        };
        check_version(&init)?;
        if !(init.sync_interval_s.is_finite() && init.sync_interval_s > 0.0) {
            return Err(ProtocolError::InvalidSyncInterval(init.sync_interval_s).into());
        }

        let transform = CoordinateTransform::new(init.network_boundaries, margin);
        let polygons = init
            .polygons
            .into_iter()
            .map(|polygon| Polygon {
                id: polygon.id,
                kind: polygon.kind,
                shape: polygon.shape.into_iter().map(|p| transform.to_local(p)).collect(),
            })
            .collect();
        self.transform = Some(transform);

        info!(
            sync_interval_s = init.sync_interval_s,
            init_time_s = init.init_time_s,
            "Handshake with EVI {} (api {}) complete",
            init.version.server,
            init.version.api
        );
        Ok(NetworkInitData {
            sync_interval_s: init.sync_interval_s,
            init_time_s: init.init_time_s,
            polygons,
        })
    }

    /// Sends the request as three frames (visualization, time reached,
    /// door commands) and waits for the single-frame reply.
    pub async fn exchange_timestep(&mut self, request: &TimestepRequest) -> SyncResult<ExchangeOutcome> {
        let transform = self.transform.ok_or(ProtocolError::NotInitialized)?;

        let frames = vec![
            self.codec.encode(&visualization_message(request))?,
            self.codec.encode(&Message::Session(Session::TimeReached {
                time_s: request.sync_time_s,
            }))?,
            self.codec.encode(&door_message(request))?,
        ];
        match self.connection.send(&frames).await {
            Ok(()) => {}
            Err(TransportError::PartialSend { sent, total, source }) => {
                // the reply still arrives in lockstep, so keep going
                warn!(sent, total, error = %source, "could not send complete message");
            }
            Err(err) => return Err(err.into()),
        }

        let frames = self.connection.recv().await?;
        match self.decode_single(&frames)? {
            Message::Session(Session::Teardown) => {
                info!("EVI requested teardown");
                Ok(ExchangeOutcome::Teardown)
            }
            Message::Vehicle(vehicles) => {
                let reply = timestep_reply(&transform, vehicles);
                debug!(
                    time_s = reply.sync_time_s,
                    add = reply.add_vehicles.len(),
                    modify = reply.mod_vehicles.len(),
                    delete = reply.del_vehicles.len(),
                    "timestep reply"
                );
                Ok(ExchangeOutcome::Reply(reply))
            }
            other => Err(ProtocolError::UnexpectedMessageClass(other.class_name()).into()),
        }
    }

    fn decode_single(&self, frames: &[Vec<u8>]) -> Result<Message, ProtocolError> {
        match frames {
            [frame] => self.codec.decode(frame),
            _ => Err(ProtocolError::UnexpectedFrameCount {
                expected: 1,
                actual: frames.len(),
            }),
        }
    }
}

fn check_version(init: &NetInit) -> Result<(), ProtocolError> {
    if init.version.server != SERVER_VERSION || init.version.api != API_VERSION {
        return Err(ProtocolError::UnexpectedVersion {
            server: init.version.server.clone(),
            api: init.version.api,
        });
    }
    Ok(())
}

fn visualization_message(request: &TimestepRequest) -> Message {
    let warnings = request.generic_warnings.iter().map(|warning| VisualizationCommand {
        entity_id: warning.entity_id,
        payload: VisualizationPayload::GenericWarning {
            intensity: warning.intensity,
            description: warning.description.clone(),
        },
    });
    let received = request.received_wireless_messages.iter().map(|message| VisualizationCommand {
        entity_id: message.entity_id,
        payload: VisualizationPayload::WirelessMessage {
            sender_id: message.sender_id,
            receiver_id: message.receiver_id.clone(),
            location: Location {
                lon: message.longitude,
                lat: message.latitude,
                angle: message.angle,
            },
        },
    });
    Message::Visualization(VisualizationMessage {
        commands: warnings.chain(received).collect(),
    })
}

fn door_message(request: &TimestepRequest) -> Message {
    Message::Vehicle(VehicleMessage {
        time_s: request.sync_time_s,
        commands: request.open_door_messages.iter().map(door_command).collect(),
    })
}

fn door_command(door: &OpenDoorMessage) -> VehicleCommand {
    let mut signals = VehicleSignalSet::empty();
    signals.set(VehicleSignal::DoorOpenLeft, door.open_left_door);
    signals.set(VehicleSignal::DoorOpenRight, door.open_right_door);
    VehicleCommand::Update(UpdateVehicle {
        vehicle_id: door.vehicle_id,
        state: VehicleStateRecord {
            signals: signals.iter().map(VehicleSignal::bit).collect(),
            signal_sum: signals.bits(),
            ..VehicleStateRecord::default()
        },
    })
}

fn timestep_reply(transform: &CoordinateTransform, message: VehicleMessage) -> TimestepReply {
    let mut reply = TimestepReply {
        sync_time_s: message.time_s,
        ..TimestepReply::default()
    };
    for command in message.commands {
        match command {
            VehicleCommand::Register(register) => {
                reply
                    .add_vehicles
                    .push(vehicle(transform, register.vehicle_id, register.is_ego_vehicle, &register.state));
            }
            VehicleCommand::Update(update) => {
                reply
                    .mod_vehicles
                    .push(vehicle(transform, update.vehicle_id, false, &update.state));
            }
            VehicleCommand::Unregister { vehicle_id } => reply.del_vehicles.push(vehicle_id.to_string()),
        }
    }
    reply
}

fn vehicle(transform: &CoordinateTransform, vehicle_id: u32, is_ego_vehicle: bool, state: &VehicleStateRecord) -> Vehicle {
    let position = &state.position;
    Vehicle {
        external_id: vehicle_id.to_string(),
        is_ego_vehicle,
        stop_states: VehicleStopStateSet::from_bits(state.stopstate_sum),
        signals: VehicleSignalSet::from_bits(state.signal_sum),
        position: transform.to_local(Point {
            x: position.px,
            y: position.py,
        }),
        heading: transform.heading_to_local(position.angle),
        speed: state.speed_mps,
        road_id: position.road_id.to_string(),
        altitude: position.height,
        latitude: position.lat,
        longitude: position.lon,
    }
}
