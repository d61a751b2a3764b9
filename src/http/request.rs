//! HTTP request parsing.

use super::error::{HttpError, HttpResult};
use bytes::Bytes;
use http::{Method, Uri};
use std::collections::HashMap;
use std::str::FromStr;

/// Maximum number of headers to parse.
const MAX_HEADERS: usize = 100;

/// Parsed HTTP request as seen by the gate.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    method: Method,
    /// Request URI.
    uri: Uri,
    /// Request headers (lowercase names).
    headers: HashMap<String, String>,
    /// Request body.
    body: Bytes,
    /// Remote peer address, if known.
    remote_addr: Option<String>,
}

impl Request {
    /// Create a new request builder.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Parse a request from raw bytes.
    ///
    /// Returns the request and the offset where the body starts.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::Incomplete` if the header section is truncated,
    /// or `HttpError::Parse` for malformed input.
    pub fn parse(data: &[u8]) -> HttpResult<(Self, usize)> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);

        match req.parse(data)? {
            httparse::Status::Complete(body_offset) => {
                let method_str = req.method.ok_or(HttpError::Incomplete)?;
                let method = Method::from_str(method_str)
                    .map_err(|_| HttpError::InvalidMethod(method_str.to_string()))?;

                let path = req.path.ok_or(HttpError::Incomplete)?;
                let uri = Uri::from_str(path)
                    .map_err(|_| HttpError::InvalidUri(path.to_string()))?;

                let mut headers_map = HashMap::new();
                for header in req.headers.iter() {
                    headers_map.insert(
                        header.name.to_lowercase(),
                        String::from_utf8_lossy(header.value).to_string(),
                    );
                }

                let body = Bytes::copy_from_slice(&data[body_offset..]);

                Ok((
                    Self {
                        method,
                        uri,
                        headers: headers_map,
                        body,
                        remote_addr: None,
                    },
                    body_offset,
                ))
            },
            httparse::Status::Partial => Err(HttpError::Incomplete),
        }
    }

    /// Get the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Get the query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Get a header value (case-insensitive name).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Get all headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Get the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the connection should stay open after this request.
    #[must_use]
    pub fn is_keep_alive(&self) -> bool {
        match self.header("connection") {
            Some(value) => !value.eq_ignore_ascii_case("close"),
            None => true,
        }
    }

    /// Declared body length, if any.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }

    /// Get the remote peer address.
    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// Set the remote peer address.
    pub fn set_remote_addr(&mut self, addr: impl Into<String>) {
        self.remote_addr = Some(addr.into());
    }

    /// Set a header value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(name.into().to_lowercase(), value.into());
    }

    /// Resolve the client IP for this request.
    ///
    /// Prefers the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
    /// socket peer address. Falls back to `"unknown"` so the rate limiter
    /// always has a key.
    #[must_use]
    pub fn client_ip(&self) -> String {
        if let Some(xff) = self.header("x-forwarded-for") {
            if let Some(first) = xff.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }

        if let Some(real_ip) = self.header("x-real-ip") {
            if !real_ip.is_empty() {
                return real_ip.to_string();
            }
        }

        self.remote_addr
            .as_deref()
            .and_then(|a| a.rsplit_once(':').map(|(host, _)| host.to_string()))
            .or_else(|| self.remote_addr.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Serialize the request to wire bytes (used when proxying upstream).
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        let target = match self.uri.query() {
            Some(q) => format!("{}?{}", self.uri.path(), q),
            None => self.uri.path().to_string(),
        };
        buf.extend_from_slice(format!("{} {} HTTP/1.1\r\n", self.method, target).as_bytes());

        for (name, value) in &self.headers {
            buf.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }

        if !self.body.is_empty() && !self.headers.contains_key("content-length") {
            buf.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(&self.body);
        buf
    }
}

/// Builder for constructing requests directly (mainly in tests).
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HashMap<String, String>,
    body: Bytes,
    remote_addr: Option<String>,
}

impl RequestBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the path (and query).
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.uri = Uri::from_str(path).ok();
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the remote address.
    #[must_use]
    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Build the request.
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method.unwrap_or(Method::GET),
            uri: self.uri.unwrap_or_else(|| Uri::from_static("/")),
            headers: self.headers,
            body: self.body,
            remote_addr: self.remote_addr,
        }
    }
}
