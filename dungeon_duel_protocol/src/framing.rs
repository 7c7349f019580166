// Length-delimited message framing over TCP.
//
// Every frame is a 4-byte big-endian length prefix followed by that many
// payload bytes (a JSON-encoded `WireMessage`, see `message.rs`). This module
// only moves bytes; the JSON step lives in `message::encode`/`decode`.
//
// Two read paths:
// - `read_message` blocks until a whole frame is available. Fine for tests
//   and for streams without a read timeout.
// - `FrameReader` buffers partial input across reads, so a socket with a
//   short read timeout can be polled (to notice shutdown) without losing the
//   bytes of a frame that was only half received when the timeout hit.
//
// `MAX_MESSAGE_SIZE` bounds allocation from a malformed length prefix. The
// largest legitimate frame is a state update with a full hand, a few KB.

use std::io::{self, Read, Write};

use crate::message::{self, WireMessage};

/// Maximum allowed frame payload (1 MB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

const PREFIX_LEN: usize = 4;

/// Write a length-delimited message: 4-byte big-endian length, then payload.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = u32::try_from(msg.len())
        .ok()
        .filter(|len| *len <= MAX_MESSAGE_SIZE)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "message too large: {} bytes (max {MAX_MESSAGE_SIZE})",
                    msg.len()
                ),
            )
        })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(msg)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited message: 4-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` if the stream closes before or during a message,
/// and `InvalidData` if the length exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; PREFIX_LEN];
    reader.read_exact(&mut len_buf)?;
    let len = checked_len(len_buf)?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Encode and frame a `WireMessage` in one step.
pub fn write_wire<W: Write>(writer: &mut W, msg: &WireMessage) -> io::Result<()> {
    let json = message::encode(msg).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_message(writer, &json)
}

fn checked_len(prefix: [u8; PREFIX_LEN]) -> io::Result<usize> {
    let len = u32::from_be_bytes(prefix);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    Ok(len as usize)
}

/// Incremental frame reader that survives read timeouts.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Read until one whole frame is buffered.
    ///
    /// `Ok(None)` means the underlying read timed out (or would block) before
    /// a frame completed; any partial bytes stay buffered for the next call.
    /// A closed stream is `UnexpectedEof`, even between frames.
    pub fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(Some(frame));
            }
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed",
                    ));
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Like `read_frame`, then decode. Undecodable JSON is `InvalidData`.
    pub fn read_wire(&mut self) -> io::Result<Option<WireMessage>> {
        match self.read_frame()? {
            Some(bytes) => message::decode(&bytes)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }

    fn take_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.buf.len() < PREFIX_LEN {
            return Ok(None);
        }
        let prefix = [self.buf[0], self.buf[1], self.buf[2], self.buf[3]];
        let total = PREFIX_LEN + checked_len(prefix)?;
        if self.buf.len() < total {
            return Ok(None);
        }
        let frame = self.buf[PREFIX_LEN..total].to_vec();
        self.buf.drain(..total);
        Ok(Some(frame))
    }
}
