use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("No peer connected; a request must be received before replying")]
    NotConnected,

    #[error("Partial send: {sent} of {total} frames written: {source}")]
    PartialSend {
        sent: usize,
        total: usize,
        #[source]
        source: io::Error,
    },

    #[error("Frame of {size} bytes exceeds the limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Peer sent an empty message")]
    EmptyMessage,

    #[error("Peer closed the connection")]
    Disconnected,

    #[error("Transport I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unknown message type {0}")]
    UnknownMessageType(u8),

    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Malformed message: {0}")]
    Malformed(#[from] bincode::Error),

    #[error("Expected {expected} frame(s), received {actual}")]
    UnexpectedFrameCount { expected: usize, actual: usize },

    #[error("Unexpected peer version: server {server:?}, api {api}")]
    UnexpectedVersion { server: String, api: u32 },

    #[error("Unexpected message class received from EVI: {0}")]
    UnexpectedMessageClass(&'static str),

    #[error("Invalid sync interval {0}s")]
    InvalidSyncInterval(f64),

    #[error("Connection has not been initialized")]
    NotInitialized,
}

/// Failure of a single round trip with the peer.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsistencyError {
    #[error("Tried adding duplicate vehicle {0}")]
    DuplicateVehicle(String),

    #[error("Tried to {operation} unknown vehicle {id}")]
    UnknownVehicle { id: String, operation: &'static str },

    #[error("{0} vehicle(s) left after teardown")]
    RegistryNotEmpty(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorInputError {
    #[error("Non-finite pose for vehicle {0}")]
    NonFinitePose(String),

    #[error("Zero-length heading vector")]
    ZeroLengthHeading,

    #[error("Degenerate projection axis")]
    DegenerateAxis,

    #[error("Vehicle id {0:?} is not numeric")]
    NonNumericVehicleId(String),

    #[error("Vehicle {0} is not managed")]
    UnknownVehicle(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Slot {0} is already occupied")]
    SlotOccupied(usize),

    #[error("Unknown entity {0}")]
    UnknownEntity(u64),

    #[error("Simulation has already ended")]
    Ended,
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Invalid state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}

impl From<ProtocolError> for ScenarioError {
    fn from(err: ProtocolError) -> Self {
        ScenarioError::Sync(SyncError::Protocol(err))
    }
}

impl From<TransportError> for ScenarioError {
    fn from(err: TransportError) -> Self {
        ScenarioError::Sync(SyncError::Transport(err))
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
pub type SyncResult<T> = Result<T, SyncError>;
pub type ScenarioResult<T> = Result<T, ScenarioError>;
