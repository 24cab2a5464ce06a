//! Frame reader that survives malformed frames
//!
//! `FramedRead` terminates the stream on the first decode error. The
//! championship protocol treats most decode errors as per-frame, so reads go
//! through this wrapper which reports them and carries on.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;

use crate::codec::{Frame, FrameCodec};
use crate::error::ProtocolError;

const READ_CHUNK: usize = 8 * 1024;

/// Result of one read attempt
#[derive(Debug)]
pub enum ReadOutcome {
    /// A well-formed frame
    Frame(Frame),
    /// A complete frame that could not be interpreted; it has been skipped
    Malformed(ProtocolError),
    /// Peer closed the connection
    Closed,
}

/// Reads frames from an async byte stream
pub struct FrameReader<R> {
    inner: R,
    codec: FrameCodec,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a reader with the default codec
    pub fn new(inner: R) -> Self {
        Self::with_codec(inner, FrameCodec::new())
    }

    /// Wrap a reader with a specific codec
    pub fn with_codec(inner: R, codec: FrameCodec) -> Self {
        Self {
            inner,
            codec,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Err` only for fatal errors, after which the stream must be
    /// dropped.
    pub async fn next(&mut self) -> Result<ReadOutcome, ProtocolError> {
        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(frame)) => return Ok(ReadOutcome::Frame(frame)),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => return Ok(ReadOutcome::Malformed(e)),
            }

            self.buffer.reserve(READ_CHUNK);
            let n = self.inner.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        "Connection closed with {} bytes of partial frame",
                        self.buffer.len()
                    );
                }
                return Ok(ReadOutcome::Closed);
            }
        }
    }
}
