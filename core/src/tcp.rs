//! Default blocking transport: HTTP/1.1 over `std::net::TcpStream`.
//!
//! # Design
//! A `TcpConnection` buffers everything — method, headers, outgoing body —
//! until `connect()`. At that point the host is resolved through the
//! platform resolver, the socket is opened (honoring the connect timeout),
//! the request is written with the configured framing, and the status line
//! and header block are read back. The body bytes stay on the socket and
//! are handed out lazily through `input_stream()`.
//!
//! Each connection performs exactly one exchange and sends
//! `Connection: close`; pooling and reuse are out of scope. Plain `http`
//! only — TLS is not this crate's concern.
//!
//! `disconnect()` shuts the socket down in both directions and may be
//! called from another thread to abandon an in-flight read. That unblocks
//! the reader with an error; it is an escape hatch, not a polite
//! cancellation mechanism.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use crate::request::Method;
use crate::transport::{Connection, StreamingMode, Transport};

/// Chunk size used when the engine asks for chunked mode with size 0.
const DEFAULT_CHUNK_SIZE: usize = 4096;

/// [`Transport`] over plain TCP.
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn open(&self, url: &Url) -> io::Result<Box<dyn Connection + Send>> {
        if url.scheme() != "http" {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported scheme: {}", url.scheme()),
            ));
        }
        if url.host_str().is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "url has no host",
            ));
        }
        Ok(Box::new(TcpConnection {
            url: url.clone(),
            method: Method::Get,
            connect_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
            do_output: false,
            headers: Vec::new(),
            streaming: None,
            output: Arc::new(Mutex::new(Vec::new())),
            live: None,
        }))
    }
}

/// Socket-side state that exists only after a successful `connect()`.
struct Live {
    /// Kept for `disconnect()` even after the reader has been handed out.
    socket: TcpStream,
    reader: Option<BufReader<TcpStream>>,
    status: u16,
    headers: Vec<(String, String)>,
}

struct TcpConnection {
    url: Url,
    method: Method,
    connect_timeout: Duration,
    read_timeout: Duration,
    do_output: bool,
    headers: Vec<(String, String)>,
    streaming: Option<StreamingMode>,
    output: Arc<Mutex<Vec<u8>>>,
    live: Option<Live>,
}

/// Output sink handed to the engine; appends into the connection's buffer.
struct BufferedSink(Arc<Mutex<Vec<u8>>>);

impl Write for BufferedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for TcpConnection {
    fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    fn set_do_input(&mut self, _do_input: bool) {
        // Responses are always read on this transport.
    }

    fn set_do_output(&mut self, do_output: bool) {
        self.do_output = do_output;
    }

    fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn set_streaming_mode(&mut self, mode: StreamingMode) {
        self.streaming = Some(mode);
    }

    fn output_stream(&mut self) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(BufferedSink(Arc::clone(&self.output))))
    }

    fn connect(&mut self) -> io::Result<()> {
        if self.live.is_some() {
            return Ok(());
        }

        let body = std::mem::take(&mut *self.output.lock().unwrap());
        if let Some(StreamingMode::FixedLength(declared)) = self.streaming {
            if body.len() as u64 != declared {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "fixed-length body mismatch: declared {declared} bytes, got {}",
                        body.len()
                    ),
                ));
            }
        }

        let stream = self.open_socket()?;
        tracing::debug!(peer = ?stream.peer_addr().ok(), "tcp connected");
        if self.read_timeout > Duration::ZERO {
            stream.set_read_timeout(Some(self.read_timeout))?;
        }

        self.send_request(&stream, &body)?;

        let mut reader = BufReader::new(stream.try_clone()?);
        let status = read_status_line(&mut reader)?;
        let headers = read_header_block(&mut reader)?;
        tracing::debug!(status, header_count = headers.len(), "response head read");

        self.live = Some(Live {
            socket: stream,
            reader: Some(reader),
            status,
            headers,
        });
        Ok(())
    }

    fn response_code(&mut self) -> io::Result<u16> {
        self.live
            .as_ref()
            .map(|live| live.status)
            .ok_or_else(not_connected)
    }

    fn header_fields(&self) -> Vec<(String, String)> {
        self.live
            .as_ref()
            .map(|live| live.headers.clone())
            .unwrap_or_default()
    }

    fn input_stream(&mut self) -> io::Result<Box<dyn Read + Send>> {
        let method = self.method;
        let live = self.live.as_mut().ok_or_else(not_connected)?;
        let reader = live.reader.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "input stream already taken")
        })?;

        // HEAD responses carry headers describing a body that is never sent.
        if method == Method::Head {
            return Ok(Box::new(io::empty()));
        }

        let stream: Box<dyn Read + Send> = if header_equals(&live.headers, "Transfer-Encoding", "chunked") {
            Box::new(ChunkedReader::new(reader))
        } else if let Some(length) = declared_length(&live.headers) {
            Box::new(reader.take(length))
        } else {
            // `Connection: close` exchange: the body runs to end-of-stream.
            Box::new(reader)
        };
        Ok(stream)
    }

    fn error_stream(&mut self) -> Option<Box<dyn Read + Send>> {
        // Failure bodies come through input_stream like any other; there is
        // no separate stream on this transport.
        None
    }

    fn disconnect(&mut self) {
        if let Some(live) = self.live.take() {
            let _ = live.socket.shutdown(Shutdown::Both);
            tracing::trace!("tcp connection shut down");
        }
    }
}

impl TcpConnection {
    fn open_socket(&self) -> io::Result<TcpStream> {
        let host = self
            .url
            .host_str()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "url has no host"))?;
        let port = self.url.port_or_known_default().unwrap_or(80);

        if self.connect_timeout == Duration::ZERO {
            return TcpStream::connect((host, port));
        }

        // connect_timeout wants a resolved address; try each in turn.
        let mut last_err = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no addresses")
        }))
    }

    fn send_request(&self, stream: &TcpStream, body: &[u8]) -> io::Result<()> {
        let mut wire = BufWriter::new(stream);

        write!(
            wire,
            "{} {} HTTP/1.1\r\nHost: {}\r\n",
            self.method.as_str(),
            request_target(&self.url),
            host_header(&self.url)
        )?;
        for (name, value) in &self.headers {
            // Framing headers are transport-owned.
            if ["host", "content-length", "transfer-encoding", "connection"]
                .contains(&name.to_ascii_lowercase().as_str())
            {
                continue;
            }
            write!(wire, "{name}: {value}\r\n")?;
        }

        if self.do_output {
            match self.streaming {
                Some(StreamingMode::Chunked(size)) => {
                    wire.write_all(b"Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n")?;
                    write_chunked(&mut wire, body, size)?;
                }
                _ => {
                    // Fixed-length mode, or a body staged without an explicit
                    // mode: the exact count is known either way.
                    write!(wire, "Content-Length: {}\r\nConnection: close\r\n\r\n", body.len())?;
                    wire.write_all(body)?;
                }
            }
        } else {
            wire.write_all(b"Connection: close\r\n\r\n")?;
        }
        wire.flush()
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection not established")
}

/// Origin-form request target: path plus optional query.
fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Host header value: host, plus the port only when explicitly given.
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Frame `body` as chunked transfer coding, including the terminal chunk.
fn write_chunked(sink: &mut impl Write, body: &[u8], chunk_size: usize) -> io::Result<()> {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };
    for chunk in body.chunks(chunk_size) {
        write!(sink, "{:x}\r\n", chunk.len())?;
        sink.write_all(chunk)?;
        sink.write_all(b"\r\n")?;
    }
    sink.write_all(b"0\r\n\r\n")
}

/// Parse `HTTP/1.x <code> <reason>` and return the numeric code.
fn read_status_line(reader: &mut impl BufRead) -> io::Result<u16> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before status line",
        ));
    }
    line.trim_end()
        .split(' ')
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed status line: {line:?}"),
            )
        })
}

/// Read header lines until the blank separator, preserving casing and order.
fn read_header_block(reader: &mut impl BufRead) -> io::Result<Vec<(String, String)>> {
    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside header block",
            ));
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(headers);
        }
        let (name, value) = line.split_once(':').ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed header line: {line:?}"),
            )
        })?;
        headers.push((name.to_string(), value.trim().to_string()));
    }
}

fn header_equals(headers: &[(String, String)], name: &str, expected: &str) -> bool {
    headers
        .iter()
        .any(|(n, v)| n.eq_ignore_ascii_case(name) && v.eq_ignore_ascii_case(expected))
}

fn declared_length(headers: &[(String, String)]) -> Option<u64> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, v)| v.trim().parse().ok())
}

/// Decoder for chunked transfer coding. Trailers are consumed and dropped.
struct ChunkedReader<R: BufRead> {
    inner: R,
    remaining: u64,
    first_chunk: bool,
    done: bool,
}

impl<R: BufRead> ChunkedReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            remaining: 0,
            first_chunk: true,
            done: false,
        }
    }

    fn advance_chunk(&mut self) -> io::Result<()> {
        let mut line = String::new();
        if !self.first_chunk {
            // CRLF trailing the previous chunk's data.
            self.inner.read_line(&mut line)?;
            line.clear();
        }
        self.first_chunk = false;

        if self.inner.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before chunk size",
            ));
        }
        let size_field = line.trim().split(';').next().unwrap_or("").trim();
        let size = u64::from_str_radix(size_field, 16).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed chunk size: {line:?}"),
            )
        })?;

        if size == 0 {
            // Consume trailer lines up to the final blank line.
            loop {
                line.clear();
                let n = self.inner.read_line(&mut line)?;
                if n == 0 || line == "\r\n" || line == "\n" {
                    break;
                }
            }
            self.done = true;
        }
        self.remaining = size;
        Ok(())
    }
}

impl<R: BufRead> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.done {
                return Ok(0);
            }
            if self.remaining == 0 {
                self.advance_chunk()?;
                continue;
            }
            let want = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
            let n = self.inner.read(&mut buf[..want])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside chunk",
                ));
            }
            self.remaining -= n as u64;
            return Ok(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn open_rejects_non_http_schemes() {
        let url = Url::parse("https://example.test/").unwrap();
        let err = TcpTransport.open(&url).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn request_target_includes_query() {
        let url = Url::parse("http://example.test/a/b?x=1&y=2").unwrap();
        assert_eq!(request_target(&url), "/a/b?x=1&y=2");
        let url = Url::parse("http://example.test/plain").unwrap();
        assert_eq!(request_target(&url), "/plain");
    }

    #[test]
    fn host_header_keeps_explicit_port_only() {
        let url = Url::parse("http://example.test:8080/").unwrap();
        assert_eq!(host_header(&url), "example.test:8080");
        let url = Url::parse("http://example.test/").unwrap();
        assert_eq!(host_header(&url), "example.test");
    }

    #[test]
    fn fixed_length_mismatch_fails_before_any_socket_work() {
        let url = Url::parse("http://127.0.0.1:1/upload").unwrap();
        let mut conn = TcpTransport.open(&url).unwrap();
        conn.set_do_output(true);
        conn.set_streaming_mode(StreamingMode::FixedLength(10));
        let mut sink = conn.output_stream().unwrap();
        sink.write_all(b"short").unwrap();
        drop(sink);

        let err = conn.connect().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("declared 10"));
    }

    #[test]
    fn accessors_before_connect_report_not_connected() {
        let url = Url::parse("http://example.test/").unwrap();
        let mut conn = TcpTransport.open(&url).unwrap();
        assert_eq!(
            conn.response_code().unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert!(conn.header_fields().is_empty());
        assert!(conn.input_stream().is_err());
    }

    #[test]
    fn chunked_framing_roundtrips() {
        let mut framed = Vec::new();
        write_chunked(&mut framed, b"abcdefghij", 4).unwrap();
        assert_eq!(
            framed,
            b"4\r\nabcd\r\n4\r\nefgh\r\n2\r\nij\r\n0\r\n\r\n"
        );

        let mut decoder = ChunkedReader::new(Cursor::new(framed));
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, b"abcdefghij");
    }

    #[test]
    fn chunked_reader_handles_extensions_and_trailers() {
        let framed = b"3;ext=1\r\nfoo\r\n0\r\nTrailer: x\r\n\r\n";
        let mut decoder = ChunkedReader::new(Cursor::new(&framed[..]));
        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "foo");
    }

    #[test]
    fn chunked_reader_reports_truncation_as_eof() {
        // Stream ends right where the next chunk-size line should start.
        let framed = b"3\r\nfoo\r\n";
        let mut decoder = ChunkedReader::new(Cursor::new(&framed[..]));
        let mut out = Vec::new();
        let err = decoder.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn chunked_reader_rejects_garbage_sizes() {
        let mut decoder = ChunkedReader::new(Cursor::new(&b"zz\r\n"[..]));
        let mut out = Vec::new();
        let err = decoder.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn status_line_parses() {
        let mut reader = Cursor::new(&b"HTTP/1.1 404 Not Found\r\n"[..]);
        assert_eq!(read_status_line(&mut reader).unwrap(), 404);
    }

    #[test]
    fn malformed_status_line_is_invalid_data() {
        let mut reader = Cursor::new(&b"garbage\r\n"[..]);
        let err = read_status_line(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn header_block_preserves_casing_and_order() {
        let raw = b"Content-Type: text/plain\r\nX-One: a\r\nx-one: b\r\n\r\nbody";
        let mut reader = Cursor::new(&raw[..]);
        let headers = read_header_block(&mut reader).unwrap();
        assert_eq!(
            headers,
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("X-One".to_string(), "a".to_string()),
                ("x-one".to_string(), "b".to_string()),
            ]
        );
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "body");
    }
}
