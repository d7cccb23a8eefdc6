use crate::common::{TransportError, TransportResult};
use crate::domains::sync::MessageSet;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// Stream layout of one message:
//   u32 BE frame count, then per frame u32 BE length + bytes.

pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
pub const MAX_FRAMES: usize = 64;

/// Error while writing, with the number of frames that fully went out.
#[derive(Debug)]
pub struct PartialWrite {
    pub frames_sent: usize,
    pub source: io::Error,
}

pub async fn write_message_set<W>(writer: &mut W, frames: &[Vec<u8>]) -> Result<(), PartialWrite>
where
    W: AsyncWrite + Unpin,
{
    let mut frames_sent = 0;
    let fail = |frames_sent, source| PartialWrite { frames_sent, source };

    writer
        .write_u32(frames.len() as u32)
        .await
        .map_err(|e| fail(frames_sent, e))?;
    for frame in frames {
        writer
            .write_u32(frame.len() as u32)
            .await
            .map_err(|e| fail(frames_sent, e))?;
        writer.write_all(frame).await.map_err(|e| fail(frames_sent, e))?;
        frames_sent += 1;
    }
    writer.flush().await.map_err(|e| fail(frames_sent, e))?;
    Ok(())
}

pub async fn read_message_set<R>(reader: &mut R) -> TransportResult<MessageSet>
where
    R: AsyncRead + Unpin,
{
    let count = reader.read_u32().await.map_err(map_read_error)? as usize;
    if count == 0 {
        return Err(TransportError::EmptyMessage);
    }
    if count > MAX_FRAMES {
        return Err(TransportError::FrameTooLarge {
            size: count,
            limit: MAX_FRAMES,
        });
    }
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let length = reader.read_u32().await.map_err(map_read_error)? as usize;
        if length > MAX_FRAME_BYTES {
            return Err(TransportError::FrameTooLarge {
                size: length,
                limit: MAX_FRAME_BYTES,
            });
        }
        let mut frame = vec![0u8; length];
        reader.read_exact(&mut frame).await.map_err(map_read_error)?;
        frames.push(frame);
    }
    Ok(frames)
}

fn map_read_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset => TransportError::Disconnected,
        _ => TransportError::Io(err),
    }
}
