use crate::common::TransportResult;
use async_trait::async_trait;

/// One logical message: an ordered group of byte frames delivered together.
pub type MessageSet = Vec<Vec<u8>>;

/// Duplex channel to the single peer. Request/reply in lockstep: the bridge
/// receives before it may send, and every send is answered by one receive.
#[async_trait]
pub trait Transport: Send {
    /// Sends all frames as one message. A failure after some frames went out
    /// is reported as `TransportError::PartialSend`.
    async fn send(&mut self, frames: &[Vec<u8>]) -> TransportResult<()>;

    /// Blocks until a complete message arrives. There is no timeout.
    async fn recv(&mut self) -> TransportResult<MessageSet>;
}
