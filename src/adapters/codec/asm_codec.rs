use super::wire::Message;
use crate::common::ProtocolError;
use bincode::Options;

/// Header: 1 byte message type, 4 bytes big-endian payload length.
pub const HEADER_LEN: usize = 5;
pub const MESSAGE_TYPE_MESSAGE: u8 = 0;
pub const MAX_PAYLOAD_BYTES: u64 = 16 * 1024 * 1024;

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_PAYLOAD_BYTES)
        .reject_trailing_bytes()
}

/// Encodes and decodes single frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsmCodec;

impl AsmCodec {
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        let payload = bincode_options().serialize(message)?;
        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.push(MESSAGE_TYPE_MESSAGE);
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    pub fn decode(&self, frame: &[u8]) -> Result<Message, ProtocolError> {
        if frame.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                expected: HEADER_LEN,
                actual: frame.len(),
            });
        }
        let message_type = frame[0];
        if message_type != MESSAGE_TYPE_MESSAGE {
            return Err(ProtocolError::UnknownMessageType(message_type));
        }
        let length = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;
        let payload = &frame[HEADER_LEN..];
        if payload.len() != length {
            return Err(ProtocolError::Truncated {
                expected: HEADER_LEN + length,
                actual: frame.len(),
            });
        }
        Ok(bincode_options().deserialize(payload)?)
    }
}
