//! One-shot HTTP exchange orchestration.
//!
//! # Design
//! `HttpEngine::execute` is a single forward pass: open a handle, configure
//! it, optionally stream the body out, connect, read status and headers,
//! wrap the input stream into a `ResponseBody`. No retries, no redirect
//! following, no state reentry — a failure at any stage aborts the whole
//! exchange. The engine is blocking and spawns nothing; concurrency is the
//! caller's business, one independent `execute` call per exchange.
//!
//! Lifecycle listeners get the live handle immediately before and after
//! `connect`, which is where custom authentication or instrumentation can
//! inspect or adjust it without the engine knowing about either.

use std::io::BufWriter;
use std::time::Duration;

use url::Url;

use crate::error::{Error, HookError, Result};
use crate::request::{Method, Request, RequestBody};
use crate::response::{Response, ResponseBody};
use crate::transport::{Connection, StreamingMode, Transport};

/// Immutable per-engine configuration, applied to every exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// `Duration::ZERO` means no connect timeout.
    pub connect_timeout: Duration,
    /// `Duration::ZERO` means no read timeout.
    pub read_timeout: Duration,
    /// Chunk size for chunked output. `0` means the transport's default.
    pub chunk_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
            chunk_size: 0,
        }
    }
}

/// Observer of the connection lifecycle within one exchange.
///
/// Both hooks run synchronously on the executing thread and may mutate the
/// handle. An error from either aborts the exchange and propagates to the
/// `execute` caller unchanged.
pub trait ConnectionListener {
    /// Called with the configured but not-yet-connected handle.
    fn on_pre_connect(
        &self,
        _request: &Request,
        _connection: &mut dyn Connection,
    ) -> std::result::Result<(), HookError> {
        Ok(())
    }

    /// Called with the now-established handle, before the status is read.
    fn on_post_connect(
        &self,
        _request: &Request,
        _connection: &mut dyn Connection,
    ) -> std::result::Result<(), HookError> {
        Ok(())
    }
}

/// Listener that observes nothing; the default.
pub struct NoopListener;

impl ConnectionListener for NoopListener {}

/// Executes single request/response exchanges over a [`Transport`].
pub struct HttpEngine<T: Transport> {
    config: HttpConfig,
    transport: T,
    listener: Box<dyn ConnectionListener + Send + Sync>,
}

impl<T: Transport> HttpEngine<T> {
    pub fn new(config: HttpConfig, transport: T) -> Self {
        Self::with_listener(config, transport, NoopListener)
    }

    pub fn with_listener(
        config: HttpConfig,
        transport: T,
        listener: impl ConnectionListener + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            transport,
            listener: Box::new(listener),
        }
    }

    /// Perform one full exchange.
    ///
    /// Fails with [`Error::Transport`] when connection, DNS, or I/O fails at
    /// any stage before a status line is obtained. A non-2xx status is an
    /// ordinary return; interpreting it is the caller's job. Ownership of
    /// the connection passes to the returned response's body, which the
    /// caller must close (or drop).
    pub fn execute(&self, request: Request) -> Result<Response> {
        let url = Url::parse(&request.url)?;
        tracing::debug!(method = %request.method, url = %url, "opening connection");
        let mut connection = self.transport.open(&url)?;

        connection.set_method(request.method);
        connection.set_read_timeout(self.config.read_timeout);
        connection.set_connect_timeout(self.config.connect_timeout);
        connection.set_do_input(true);

        if !request.headers.is_empty() {
            add_request_headers(connection.as_mut(), &request);
        }
        if let Some(body) = output_body(&request) {
            self.write_output(connection.as_mut(), body)?;
        }

        self.listener
            .on_pre_connect(&request, connection.as_mut())
            .map_err(Error::Hook)?;
        connection.connect()?;
        tracing::debug!(url = %url, "connected");
        self.listener
            .on_post_connect(&request, connection.as_mut())
            .map_err(Error::Hook)?;

        let status = connection.response_code()?;
        let headers = connection.header_fields();
        tracing::debug!(status, "response headers received");
        let body = read_input(connection, &headers);

        Ok(Response {
            request,
            status,
            headers,
            body,
        })
    }

    fn write_output(&self, connection: &mut dyn Connection, body: &dyn RequestBody) -> Result<()> {
        connection.set_do_output(true);
        if let Some(content_type) = body.content_type() {
            connection.add_header("Content-Type", content_type);
        }
        let content_length = body.content_length();
        if content_length > 0 {
            connection.set_streaming_mode(StreamingMode::FixedLength(content_length as u64));
        } else {
            connection.set_streaming_mode(StreamingMode::Chunked(self.config.chunk_size));
        }
        tracing::trace!(content_length, "streaming request body");

        let mut sink = BufWriter::new(connection.output_stream()?);
        let written = body.write_to(&mut sink);
        // Close the sink on every exit path; a close-time error must not
        // mask a failure from write_to.
        let _ = std::io::Write::flush(&mut sink);
        written?;
        Ok(())
    }
}

/// Inject each header whose value is present. `None`-valued entries are
/// skipped, which is how a caller unsets a default header.
fn add_request_headers(connection: &mut dyn Connection, request: &Request) {
    for (name, value) in request.headers.iter() {
        if let Some(value) = value {
            connection.add_header(name, value);
        }
    }
}

/// A request streams its body only when a body is attached AND the method
/// is POST or PUT. Every other method ignores an attached body.
fn output_body(request: &Request) -> Option<&dyn RequestBody> {
    let body = request.body.as_deref()?;
    match request.method {
        Method::Post | Method::Put => Some(body),
        _ => None,
    }
}

/// Wrap the response stream into a [`ResponseBody`], never failing: if the
/// success stream is unavailable for this status (typically 4xx/5xx), fall
/// back to the error stream; if that is missing too, surface an empty
/// stream. The original stream-access error is deliberately discarded —
/// callers must be able to read failure bodies, and they already see the
/// non-2xx status.
fn read_input(
    mut connection: Box<dyn Connection + Send>,
    headers: &[(String, String)],
) -> ResponseBody {
    let content_type = header_value(headers, "Content-Type").map(str::to_string);
    let content_length = header_value(headers, "Content-Length")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(-1);
    let stream = match connection.input_stream() {
        Ok(stream) => stream,
        Err(_) => connection
            .error_stream()
            .unwrap_or_else(|| Box::new(std::io::empty())),
    };
    ResponseBody::new(content_type, content_length, stream, connection)
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
