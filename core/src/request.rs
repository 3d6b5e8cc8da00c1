//! Request-side value types: method, headers, outgoing payload.
//!
//! # Design
//! A `Request` is immutable once built: the engine only reads it. Header
//! values are `Option<String>` so a caller can map a name to `None` and
//! thereby suppress a default header — the engine skips `None` entries at
//! injection time instead of sending an empty value.

use std::fmt;
use std::io::{self, Write};

/// HTTP method for a request.
///
/// Only `Post` and `Put` are body-bearing: the engine never transmits a body
/// for any other method, even when one is attached to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request headers: case-insensitive names, last write wins.
///
/// Insertion order of surviving names is preserved. A `None` value marks the
/// header as suppressed; the engine silently skips it.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, Option<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any existing entry with the same
    /// name (compared case-insensitively).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.put(name.into(), Some(value.into()));
    }

    /// Map `name` to no value, suppressing a default the engine or a
    /// listener would otherwise inject.
    pub fn unset(&mut self, name: impl Into<String>) {
        self.put(name.into(), None);
    }

    fn put(&mut self, name: String, value: Option<String>) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Look up a header value case-insensitively. Suppressed entries
    /// return `None` just like absent ones.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order, including suppressed ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_deref()))
    }
}

/// An outgoing request payload.
///
/// Implementations declare their content type and length and stream their
/// bytes to a sink supplied by the engine. A length of `-1` (the default)
/// means "not known upfront" and selects chunked transfer; a positive length
/// selects fixed-length transfer and must match the byte count `write_to`
/// actually produces.
pub trait RequestBody {
    fn content_type(&self) -> Option<&str> {
        None
    }

    fn content_length(&self) -> i64 {
        -1
    }

    /// Stream the payload to `sink`. Called at most once per exchange.
    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()>;
}

/// The common case: a payload held in memory, length known.
pub struct BytesBody {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

impl BytesBody {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: Some(content_type.into()),
        }
    }
}

impl RequestBody for BytesBody {
    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn content_length(&self) -> i64 {
        self.bytes.len() as i64
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        sink.write_all(&self.bytes)
    }
}

/// An HTTP request descriptor: method, URL, headers, optional body.
///
/// Built by the caller, consumed once by
/// [`HttpEngine::execute`](crate::HttpEngine::execute), never mutated.
pub struct Request {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: Option<Box<dyn RequestBody + Send>>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Set a header, replacing any previous value for the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Attach a payload. Only transmitted for `Post` and `Put`.
    pub fn body(mut self, body: impl RequestBody + Send + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|b| b.content_length()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_case_insensitively() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.set("content-type", "application/json");
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(headers.iter().count(), 1);
    }

    #[test]
    fn unset_suppresses_a_header() {
        let mut headers = Headers::new();
        headers.set("Accept", "*/*");
        headers.unset("accept");
        assert_eq!(headers.get("Accept"), None);
        // The entry survives for the engine to observe and skip.
        assert_eq!(headers.iter().count(), 1);
        assert_eq!(headers.iter().next(), Some(("Accept", None)));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut headers = Headers::new();
        headers.set("A", "1");
        headers.set("B", "2");
        headers.set("a", "3");
        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn bytes_body_declares_exact_length() {
        let body = BytesBody::with_content_type("hello", "text/plain");
        assert_eq!(body.content_length(), 5);
        assert_eq!(body.content_type(), Some("text/plain"));
    }

    #[test]
    fn bytes_body_roundtrips_through_a_sink() {
        let body = BytesBody::new(vec![1u8, 2, 3, 4]);
        let mut sink = Vec::new();
        body.write_to(&mut sink).unwrap();
        assert_eq!(sink, vec![1, 2, 3, 4]);
    }

    #[test]
    fn default_content_length_is_unknown() {
        struct Streaming;
        impl RequestBody for Streaming {
            fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
                sink.write_all(b"streamed")
            }
        }
        assert_eq!(Streaming.content_length(), -1);
        assert_eq!(Streaming.content_type(), None);
    }

    #[test]
    fn request_builder_sets_fields() {
        let req = Request::new(Method::Post, "http://example.test/items")
            .header("Accept", "application/json")
            .body(BytesBody::new("{}"));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url, "http://example.test/items");
        assert_eq!(req.headers.get("accept"), Some("application/json"));
        assert!(req.body.is_some());
    }
}
