//! Response descriptor and the streaming response body.
//!
//! # Design
//! A `ResponseBody` is the sole owner of the live connection handle from the
//! moment the engine returns. Closing it is the single synchronization point
//! with the platform's connection resource: the stream is dropped, the
//! handle is disconnected, and the handle reference is cleared so a second
//! close is a no-op. `Drop` closes too, so an abandoned body still releases
//! the connection exactly once.

use std::fmt;
use std::io::{self, BufReader, Read};

use crate::error::Result;
use crate::request::Request;
use crate::transport::Connection;

/// Scratch buffer size for [`ResponseBody::bytes`].
const DRAIN_BUF_SIZE: usize = 1024;

/// An HTTP response descriptor: status, headers, streaming body, plus the
/// request that produced it.
///
/// Constructed once by the engine and immutable apart from body
/// consumption. The caller is responsible for closing (or dropping) the
/// body. A non-2xx status is not an error here; interpreting status codes
/// is caller policy.
#[derive(Debug)]
pub struct Response {
    /// The request this response answers, moved in by the engine.
    pub request: Request,
    pub status: u16,
    /// Response headers in wire order. Names may repeat; server casing is
    /// preserved.
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl Response {
    /// First value for `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name` in wire order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A closeable streaming handle over the response bytes, tied 1:1 to the
/// live connection.
pub struct ResponseBody {
    content_type: Option<String>,
    content_length: i64,
    reader: Option<BufReader<Box<dyn Read + Send>>>,
    connection: Option<Box<dyn Connection + Send>>,
}

impl ResponseBody {
    pub(crate) fn new(
        content_type: Option<String>,
        content_length: i64,
        stream: Box<dyn Read + Send>,
        connection: Box<dyn Connection + Send>,
    ) -> Self {
        Self {
            content_type,
            content_length,
            reader: Some(BufReader::new(stream)),
            connection: Some(connection),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Declared length, or `-1` when the server did not declare one.
    pub fn content_length(&self) -> i64 {
        self.content_length
    }

    /// The buffered stream, for incremental consumption. Partial reads are
    /// fine; call [`close`](Self::close) when done. Fails with
    /// `NotConnected` once the body has been closed.
    pub fn reader(&mut self) -> io::Result<&mut BufReader<Box<dyn Read + Send>>> {
        self.reader
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "response body is closed"))
    }

    /// Drain the remaining stream into memory, then close the body whether
    /// the read succeeded or not. The connection is never left open after
    /// this call; a close-time problem cannot shadow a read error.
    pub fn bytes(&mut self) -> Result<Vec<u8>> {
        let drained = self.drain();
        self.close();
        Ok(drained?)
    }

    fn drain(&mut self) -> io::Result<Vec<u8>> {
        let reader = self.reader()?;
        let mut out = Vec::new();
        let mut buf = [0u8; DRAIN_BUF_SIZE];
        loop {
            match reader.read(&mut buf)? {
                0 => break,
                n => out.extend_from_slice(&buf[..n]),
            }
        }
        Ok(out)
    }

    /// [`bytes`](Self::bytes) decoded as UTF-8 text. Invalid sequences are
    /// replaced rather than treated as errors.
    pub fn string(&mut self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.bytes()?).into_owned())
    }

    /// Drop the stream and disconnect the connection handle. Idempotent:
    /// further calls (and the eventual drop) do nothing.
    pub fn close(&mut self) {
        self.reader = None;
        if let Some(mut connection) = self.connection.take() {
            connection.disconnect();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_none() && self.reader.is_none()
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("closed", &self.is_closed())
            .finish()
    }
}
