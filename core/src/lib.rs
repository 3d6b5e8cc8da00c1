//! Minimal HTTP request execution engine.
//!
//! # Overview
//! Given a request descriptor (method, URL, headers, optional body), the
//! engine opens a connection, transmits the request, and returns a response
//! whose body is consumed as a stream rather than buffered eagerly. One
//! `execute` call is exactly one blocking request/response exchange: no
//! retries, no redirects, no pooling policy.
//!
//! # Design
//! - The platform's networking stack sits behind the [`Connection`] /
//!   [`Transport`] traits; [`TcpTransport`] is the built-in HTTP/1.1
//!   implementation and tests swap in an in-memory double.
//! - The returned [`ResponseBody`] exclusively owns the live connection and
//!   guarantees it is released exactly once, however reading terminates.
//! - [`ConnectionListener`] hooks run immediately before and after connect,
//!   so callers can inspect or adjust the live handle (custom auth,
//!   instrumentation) without the engine depending on that logic.
//!
//! ```no_run
//! use httpcall_core::{HttpConfig, HttpEngine, Method, Request, TcpTransport};
//!
//! # fn main() -> httpcall_core::Result<()> {
//! let engine = HttpEngine::new(HttpConfig::default(), TcpTransport);
//! let mut response = engine.execute(Request::new(Method::Get, "http://example.com/"))?;
//! println!("{}: {}", response.status, response.body.string()?);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod request;
pub mod response;
pub mod tcp;
pub mod transport;

pub use engine::{ConnectionListener, HttpConfig, HttpEngine, NoopListener};
pub use error::{Error, HookError, Result};
pub use request::{BytesBody, Headers, Method, Request, RequestBody};
pub use response::{Response, ResponseBody};
pub use tcp::TcpTransport;
pub use transport::{Connection, StreamingMode, Transport};
