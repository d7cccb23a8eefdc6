use crate::common::{TransportError, TransportResult};
use crate::domains::sync::{MessageSet, Transport};
use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// In-process link between the bridge and a scripted peer.
pub fn memory_channel() -> (MemoryConnection, MemoryPeer) {
    let (to_bridge, from_peer) = mpsc::unbounded_channel();
    let (to_peer, from_bridge) = mpsc::unbounded_channel();
    (
        MemoryConnection {
            outbound: to_peer,
            inbound: from_peer,
            connected: false,
        },
        MemoryPeer {
            outbound: Some(to_bridge),
            inbound: from_bridge,
        },
    )
}

/// Bridge end. Follows the same lockstep rule as the TCP server side.
pub struct MemoryConnection {
    outbound: UnboundedSender<MessageSet>,
    inbound: UnboundedReceiver<MessageSet>,
    connected: bool,
}

#[async_trait]
impl Transport for MemoryConnection {
    async fn send(&mut self, frames: &[Vec<u8>]) -> TransportResult<()> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.outbound
            .send(frames.to_vec())
            .map_err(|_| TransportError::Disconnected)
    }

    async fn recv(&mut self) -> TransportResult<MessageSet> {
        let frames = self.inbound.recv().await.ok_or(TransportError::Disconnected)?;
        self.connected = true;
        Ok(frames)
    }
}

/// Peer end. Replies may be queued ahead of time; once the script is done,
/// `close` makes further bridge receives fail instead of waiting forever.
pub struct MemoryPeer {
    outbound: Option<UnboundedSender<MessageSet>>,
    inbound: UnboundedReceiver<MessageSet>,
}

impl MemoryPeer {
    pub fn send(&self, frames: MessageSet) -> TransportResult<()> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Disconnected)?;
        outbound.send(frames).map_err(|_| TransportError::Disconnected)
    }

    pub fn close(&mut self) {
        self.outbound = None;
    }

    pub async fn recv(&mut self) -> Option<MessageSet> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<MessageSet> {
        self.inbound.try_recv().ok()
    }

    /// Everything the bridge has sent so far.
    pub fn drain(&mut self) -> Vec<MessageSet> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
