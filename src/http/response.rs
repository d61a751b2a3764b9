//! HTTP response building and serialization.

use super::error::{HttpError, HttpResult};
use bytes::{Bytes, BytesMut};
use http::StatusCode;
use std::collections::HashMap;

/// HTTP response produced by the gate or relayed from upstream.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    status: StatusCode,
    /// Response headers (lowercase names).
    headers: HashMap<String, String>,
    /// Response body.
    body: Bytes,
}

impl Response {
    /// Create a new response builder.
    #[must_use]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// Create an OK (200) response.
    #[must_use]
    pub fn ok() -> ResponseBuilder {
        ResponseBuilder::new().status(StatusCode::OK)
    }

    /// Create a See Other (303) redirect to the given location.
    ///
    /// 303 is used for all gate redirects so a POST to a protected path
    /// lands on the target page as a GET.
    #[must_use]
    pub fn see_other(location: &str) -> ResponseBuilder {
        ResponseBuilder::new()
            .status(StatusCode::SEE_OTHER)
            .header("location", location)
    }

    /// Create a Too Many Requests (429) response with a JSON body.
    #[must_use]
    pub fn too_many_requests(retry_after_secs: u64, body: impl Into<Bytes>) -> ResponseBuilder {
        ResponseBuilder::new()
            .status(StatusCode::TOO_MANY_REQUESTS)
            .header("content-type", "application/json")
            .header("retry-after", retry_after_secs.to_string())
            .body(body)
    }

    /// Create a Bad Gateway (502) response.
    #[must_use]
    pub fn bad_gateway() -> ResponseBuilder {
        ResponseBuilder::new().status(StatusCode::BAD_GATEWAY)
    }

    /// Get the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
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

    /// Get the response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Set a header value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(name.into().to_lowercase(), value.into());
    }

    /// Serialize the response to wire bytes.
    #[must_use]
    pub fn serialize(&self) -> BytesMut {
        let mut buf = BytesMut::new();

        buf.extend_from_slice(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason().unwrap_or("")
            )
            .as_bytes(),
        );

        for (name, value) in &self.headers {
            buf.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }

        if !self.headers.contains_key("content-length") {
            buf.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(&self.body);
        buf
    }

    /// Parse a response from bytes (used when relaying upstream responses).
    ///
    /// # Errors
    ///
    /// Returns `HttpError::Incomplete` if the header section is truncated.
    pub fn parse(data: &[u8]) -> HttpResult<(Self, usize)> {
        let mut headers = [httparse::EMPTY_HEADER; 100];
        let mut resp = httparse::Response::new(&mut headers);

        match resp.parse(data)? {
            httparse::Status::Complete(body_offset) => {
                let status = StatusCode::from_u16(resp.code.unwrap_or(200))
                    .unwrap_or(StatusCode::OK);

                let mut headers_map = HashMap::new();
                for header in resp.headers.iter() {
                    headers_map.insert(
                        header.name.to_lowercase(),
                        String::from_utf8_lossy(header.value).to_string(),
                    );
                }

                let body = Bytes::copy_from_slice(&data[body_offset..]);

                Ok((
                    Self {
                        status,
                        headers: headers_map,
                        body,
                    },
                    body_offset,
                ))
            },
            httparse::Status::Partial => Err(HttpError::Incomplete),
        }
    }
}

/// Builder for responses.
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl ResponseBuilder {
    /// Create a new builder with status 200.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Set the status code.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the response.
    #[must_use]
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
