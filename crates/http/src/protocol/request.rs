//! HTTP request head handling.
//!
//! Wraps the standard `http::Request` type so the rest of the crate can pass
//! a parsed head around without committing to a body type yet.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// The head of a parsed HTTP request: method, uri, version and headers.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl RequestHeader {
    /// Consumes the head and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body, turning the head into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether a request with this method may carry a body at all.
    ///
    /// GET, HEAD, DELETE, OPTIONS and CONNECT requests are treated as
    /// body-less regardless of framing headers.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(method: Method) -> RequestHeader {
        Request::builder().method(method).uri("/").body(()).unwrap().into()
    }

    #[test]
    fn body_less_methods() {
        assert!(!head(Method::GET).need_body());
        assert!(!head(Method::HEAD).need_body());
        assert!(!head(Method::DELETE).need_body());
        assert!(!head(Method::OPTIONS).need_body());
        assert!(head(Method::POST).need_body());
        assert!(head(Method::PUT).need_body());
        assert!(head(Method::PATCH).need_body());
    }

    #[test]
    fn attach_body_keeps_head() {
        let request = head(Method::POST).body("payload");
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.uri().path(), "/");
        assert_eq!(*request.body(), "payload");
    }
}
