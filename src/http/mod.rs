//! # HTTP Types
//!
//! Minimal HTTP/1.1 request parsing and response building used by the
//! request gate and the edge server. Headers are stored lowercase so
//! lookups are case-insensitive.

mod error;
mod request;
mod response;

pub use error::{HttpError, HttpResult};
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
