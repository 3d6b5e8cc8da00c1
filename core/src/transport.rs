//! The boundary between the engine and the platform's networking stack.
//!
//! # Design
//! The engine never touches sockets directly. It drives a [`Connection`] —
//! a live, stateful handle covering one TCP session and its HTTP framing —
//! through a fixed sequence: configure, optionally stream output, connect,
//! read status and headers, hand the input stream (and the handle itself)
//! to the [`ResponseBody`](crate::ResponseBody). A [`Transport`] is the
//! factory that binds a fresh handle to a URL without transmitting anything.
//!
//! Keeping this surface minimal is what makes the engine portable: any HTTP
//! stack that can expose these primitives can sit behind it, and tests swap
//! in an in-memory implementation.

use std::io::{Read, Write};
use std::time::Duration;

use url::Url;

use crate::request::Method;

/// How an outgoing body is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingMode {
    /// Exactly this many bytes will be written; the transport must fail the
    /// exchange if the body produces a different amount.
    FixedLength(u64),
    /// Length unknown upfront; body is sent as length-prefixed chunks of
    /// roughly this size. `0` means "use the transport's default size".
    Chunked(usize),
}

/// One live connection handle: a single TCP/TLS session plus its HTTP
/// framing, created by [`Transport::open`] and owned by exactly one
/// exchange (and, after connect, by exactly one `ResponseBody`).
///
/// Configuration calls are only meaningful before [`connect`](Self::connect);
/// response accessors only after. Implementations may panic or return
/// `NotConnected` errors on out-of-order use but must never share state
/// between handles.
pub trait Connection {
    fn set_method(&mut self, method: Method);
    fn set_connect_timeout(&mut self, timeout: Duration);
    fn set_read_timeout(&mut self, timeout: Duration);
    fn set_do_input(&mut self, do_input: bool);
    fn set_do_output(&mut self, do_output: bool);
    /// Add one request header. Repeated names are transmitted in call order.
    fn add_header(&mut self, name: &str, value: &str);
    fn set_streaming_mode(&mut self, mode: StreamingMode);

    /// The sink for the outgoing body. Must be available before `connect`;
    /// the handle stays usable afterwards.
    fn output_stream(&mut self) -> std::io::Result<Box<dyn Write + Send>>;

    /// Establish the connection. DNS, socket, and TLS failures surface here.
    fn connect(&mut self) -> std::io::Result<()>;

    /// Numeric status code of the response.
    fn response_code(&mut self) -> std::io::Result<u16>;

    /// Response headers in wire order, server casing preserved. Names may
    /// repeat.
    fn header_fields(&self) -> Vec<(String, String)>;

    /// The response byte stream. May fail for statuses the platform refuses
    /// to expose a success stream for (typically 4xx/5xx).
    fn input_stream(&mut self) -> std::io::Result<Box<dyn Read + Send>>;

    /// Alternate stream carrying the body of a failed response, if the
    /// platform distinguishes one. `None` when there is no separate stream.
    fn error_stream(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Release the underlying socket. Idempotent; never fails.
    fn disconnect(&mut self);
}

/// Factory for connection handles.
pub trait Transport {
    /// Bind a fresh, unconnected handle to `url`. Nothing is transmitted
    /// until [`Connection::connect`] is called.
    fn open(&self, url: &Url) -> std::io::Result<Box<dyn Connection + Send>>;
}
