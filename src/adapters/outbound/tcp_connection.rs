use super::framing::{read_message_set, write_message_set};
use crate::common::{TransportError, TransportResult};
use crate::domains::sync::{MessageSet, Transport};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// TCP side of the peer link.
///
/// A bound connection accepts its single peer lazily on the first receive and
/// may only send after it has received. A connecting (client) side may send
/// right away.
#[derive(Debug)]
pub struct TcpConnection {
    listener: Option<TcpListener>,
    stream: Option<TcpStream>,
    address: String,
}

impl TcpConnection {
    pub async fn bind(host_iface: &str, port: u16) -> TransportResult<Self> {
        let address = format!("{host_iface}:{port}");
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| TransportError::Bind {
                address: address.clone(),
                source,
            })?;
        info!("Listening for EVI on tcp://{}", address);
        Ok(Self {
            listener: Some(listener),
            stream: None,
            address,
        })
    }

    pub async fn connect(address: &str) -> TransportResult<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| TransportError::Connect {
                address: address.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        info!("Connected to tcp://{}", address);
        Ok(Self {
            listener: None,
            stream: Some(stream),
            address: address.to_string(),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match (&self.listener, &self.stream) {
            (Some(listener), _) => listener.local_addr().ok(),
            (None, Some(stream)) => stream.local_addr().ok(),
            (None, None) => None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn stream(&mut self) -> TransportResult<&mut TcpStream> {
        if self.stream.is_none() {
            let listener = self.listener.as_ref().ok_or(TransportError::NotConnected)?;
            let (stream, peer) = listener.accept().await?;
            stream.set_nodelay(true)?;
            info!("EVI peer connected from {}", peer);
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl Transport for TcpConnection {
    async fn send(&mut self, frames: &[Vec<u8>]) -> TransportResult<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        write_message_set(stream, frames)
            .await
            .map_err(|partial| TransportError::PartialSend {
                sent: partial.frames_sent,
                total: frames.len(),
                source: partial.source,
            })?;
        debug!(frames = frames.len(), "sent message");
        Ok(())
    }

    async fn recv(&mut self) -> TransportResult<MessageSet> {
        let stream = self.stream().await?;
        let frames = read_message_set(stream).await?;
        debug!(frames = frames.len(), "received message");
        Ok(frames)
    }
}
