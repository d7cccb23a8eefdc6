mod common;

use common::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tokio_test::{assert_ok, block_on};
use veins_evi_bridge::adapters::codec::{Message, NetInit, Session, Version, VisualizationPayload};
use veins_evi_bridge::adapters::outbound::memory_channel;
use veins_evi_bridge::application::CommandInterface;
use veins_evi_bridge::common::{ProtocolError, SyncError, TransportError, TransportResult};
use veins_evi_bridge::domains::sync::{
    ExchangeOutcome, GenericWarning, MessageSet, OpenDoorMessage, ReceivedWirelessMessage, TimestepRequest, Transport,
};
use veins_evi_bridge::domains::vehicle::{Coord, VehicleStopState};

#[tokio::test]
async fn initialize_transforms_polygons_into_local_frame() {
    let (connection, peer) = memory_channel();
    peer.send(frames(&net_init(0.25, vec![rectangle("r")]))).unwrap();
    let mut client = CommandInterface::new(connection);

    let init = client.initialize(0.0).await.unwrap();

    assert_eq!(init.sync_interval_s, 0.25);
    assert_eq!(init.polygons.len(), 1);
    assert_eq!(init.polygons[0].kind, "building");
    assert_eq!(init.polygons[0].shape[0], Coord::new(10.0, NETWORK_HEIGHT - 10.0));
    assert!(client.is_initialized());
}

#[tokio::test]
async fn wrong_server_version_is_rejected() {
    let (connection, peer) = memory_channel();
    let init = Message::Session(Session::NetInit(NetInit {
        version: Version {
            api: 1,
            server: "not-evi".to_string(),
        },
        network_boundaries: boundaries(),
        polygons: Vec::new(),
        init_time_s: 0.0,
        sync_interval_s: 0.1,
    }));
    peer.send(frames(&init)).unwrap();
    let mut client = CommandInterface::new(connection);

    let err = client.initialize(0.0).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Protocol(ProtocolError::UnexpectedVersion { ref server, .. }) if server == "not-evi"
    ));
}

#[tokio::test]
async fn handshake_must_be_a_single_frame() {
    let (connection, peer) = memory_channel();
    let mut two = frames(&net_init(0.1, Vec::new()));
    two.extend(frames(&teardown()));
    peer.send(two).unwrap();
    let mut client = CommandInterface::new(connection);

    let err = client.initialize(0.0).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Protocol(ProtocolError::UnexpectedFrameCount { expected: 1, actual: 2 })
    ));
}

#[tokio::test]
async fn exchange_before_handshake_is_refused() {
    let (connection, _peer) = memory_channel();
    let mut client = CommandInterface::new(connection);

    let err = client.exchange_timestep(&TimestepRequest::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::Protocol(ProtocolError::NotInitialized)));
}

#[tokio::test]
async fn request_carries_queued_events_in_three_frames() {
    let (connection, mut peer) = memory_channel();
    peer.send(frames(&net_init(0.1, Vec::new()))).unwrap();
    peer.send(frames(&vehicles(
        0.2,
        vec![register(9, true, state_at(4.0, 6.0, 0.0, true))],
    )))
    .unwrap();
    let mut client = CommandInterface::new(connection);
    client.initialize(0.0).await.unwrap();

    let request = TimestepRequest {
        sync_time_s: 0.2,
        generic_warnings: vec![GenericWarning {
            entity_id: 9,
            intensity: 0.8,
            description: "car approaching".to_string(),
        }],
        received_wireless_messages: vec![ReceivedWirelessMessage {
            entity_id: 9,
            sender_id: 4,
            receiver_id: "9".to_string(),
            longitude: 7.1,
            latitude: 51.2,
            angle: 90.0,
        }],
        open_door_messages: vec![OpenDoorMessage {
            vehicle_id: 4,
            open_left_door: true,
            open_right_door: false,
        }],
    };
    let outcome = client.exchange_timestep(&request).await.unwrap();

    let sent = decode_request(&peer.recv().await.unwrap());
    assert!((sent.time_s - 0.2).abs() < 1e-12);
    assert_eq!(sent.visualization.commands.len(), 2);
    assert!(matches!(
        sent.visualization.commands[0].payload,
        VisualizationPayload::GenericWarning { ref description, .. } if description == "car approaching"
    ));
    assert!(matches!(
        sent.visualization.commands[1].payload,
        VisualizationPayload::WirelessMessage { sender_id: 4, .. }
    ));
    assert_eq!(sent.doors.commands.len(), 1);

    let ExchangeOutcome::Reply(reply) = outcome else {
        panic!("expected a vehicle reply");
    };
    assert!((reply.sync_time_s - 0.2).abs() < 1e-12);
    let vehicle = &reply.add_vehicles[0];
    assert_eq!(vehicle.external_id, "9");
    assert!(vehicle.is_ego_vehicle);
    assert!(vehicle.stop_states.test(VehicleStopState::Stopped));
    assert!((vehicle.position.x - 4.0).abs() < 1e-9);
    assert!((vehicle.position.y - 6.0).abs() < 1e-9);
    assert!(vehicle.heading.rad().abs() < 1e-9);
    assert_eq!(vehicle.road_id, "3");
}

#[tokio::test]
async fn teardown_reply_is_not_an_error() {
    let (connection, peer) = memory_channel();
    peer.send(frames(&net_init(0.1, Vec::new()))).unwrap();
    peer.send(frames(&teardown())).unwrap();
    let mut client = CommandInterface::new(connection);
    client.initialize(0.0).await.unwrap();

    let outcome = client.exchange_timestep(&TimestepRequest::default()).await.unwrap();
    assert_eq!(outcome, ExchangeOutcome::Teardown);
}

/// Transport whose sends only ever get one frame out.
struct LossyTransport {
    replies: VecDeque<MessageSet>,
    send_attempts: Arc<Mutex<usize>>,
}

#[async_trait]
impl Transport for LossyTransport {
    async fn send(&mut self, frames: &[Vec<u8>]) -> TransportResult<()> {
        *self.send_attempts.lock().unwrap() += 1;
        Err(TransportError::PartialSend {
            sent: 1,
            total: frames.len(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "peer stopped reading"),
        })
    }

    async fn recv(&mut self) -> TransportResult<MessageSet> {
        self.replies.pop_front().ok_or(TransportError::Disconnected)
    }
}

#[test]
fn partial_send_still_waits_for_the_reply() {
    let send_attempts = Arc::new(Mutex::new(0));
    let transport = LossyTransport {
        replies: VecDeque::from(vec![frames(&net_init(0.1, Vec::new())), frames(&teardown())]),
        send_attempts: send_attempts.clone(),
    };
    let mut client = CommandInterface::new(transport);

    block_on(async {
        assert_ok!(client.initialize(0.0).await);
        let outcome = assert_ok!(client.exchange_timestep(&TimestepRequest::default()).await);
        assert_eq!(outcome, ExchangeOutcome::Teardown);
    });
    assert_eq!(*send_attempts.lock().unwrap(), 1);
}
