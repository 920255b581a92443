//! HTTP requests and responses as plain data.
//!
//! # Design
//! The client describes every API call as an `HttpRequest` value and consumes
//! the matching `HttpResponse` value. The actual round trip happens behind the
//! [`Transport`](crate::transport::Transport) trait, so request shaping and
//! response mapping stay deterministic and testable without a network.
//!
//! All fields use owned types (`String`, `Vec`) so values can be recorded and
//! replayed freely in tests.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and already carries the query string for GET/DELETE
/// calls. `headers` always include basic auth; POST/PUT requests with a body
/// additionally carry a form-urlencoded content type.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
