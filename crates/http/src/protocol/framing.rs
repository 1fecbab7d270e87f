//! The per-request framing decision.
//!
//! Everything a connection needs to know about how one request and its
//! response relate to the connection lifetime is derived here, once, from the
//! request head: whether the connection may be reused afterwards, whether the
//! request asks for a protocol upgrade, and how the request body is framed.
//! The decision is immutable for the lifetime of that request.

use http::{HeaderMap, Version, header};

use crate::protocol::PayloadSize;

/// The framing decision for one request, derived from version + headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFraming {
    keep_alive: bool,
    upgrade: bool,
    body: PayloadSize,
}

impl RequestFraming {
    /// Builds the decision from already-derived parts.
    ///
    /// A close-delimited body leaves no way to find the next request's start,
    /// so it forces `keep_alive` off regardless of what the headers claimed.
    pub(crate) fn new(keep_alive: bool, upgrade: bool, body: PayloadSize) -> Self {
        Self { keep_alive: keep_alive && !body.is_close(), upgrade, body }
    }

    /// Derives the full decision from a request head.
    pub fn from_head(version: Version, headers: &HeaderMap, body: PayloadSize) -> Self {
        let directives = ConnectionDirectives::parse(headers);
        let upgrade = directives.upgrade && headers.contains_key(header::UPGRADE);
        Self::new(directives.should_keep_alive(version), upgrade, body)
    }

    /// Whether the connection may serve another request after this one.
    #[inline]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Whether the request asks to switch protocols; ordinary request/response
    /// framing ends on this connection once the upgraded exchange completes.
    #[inline]
    pub fn is_upgrade(&self) -> bool {
        self.upgrade
    }

    /// How the request body is framed.
    #[inline]
    pub fn body(&self) -> PayloadSize {
        self.body
    }
}

/// Tokens of the `Connection` header relevant to connection lifetime.
///
/// The header value is a comma-separated token list; tokens are
/// case-insensitive and unknown tokens (hop-by-hop header names) are ignored
/// here.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConnectionDirectives {
    pub close: bool,
    pub keep_alive: bool,
    pub upgrade: bool,
}

impl ConnectionDirectives {
    pub(crate) fn parse(headers: &HeaderMap) -> Self {
        let mut directives = Self::default();

        for value in headers.get_all(header::CONNECTION) {
            let Ok(value) = value.to_str() else {
                continue;
            };

            for token in value.split(',') {
                let token = token.trim();
                if token.eq_ignore_ascii_case("close") {
                    directives.close = true;
                } else if token.eq_ignore_ascii_case("keep-alive") {
                    directives.keep_alive = true;
                } else if token.eq_ignore_ascii_case("upgrade") {
                    directives.upgrade = true;
                }
            }
        }

        directives
    }

    /// Connection reuse policy: an explicit `close` always wins, an explicit
    /// `keep-alive` wins next, and otherwise HTTP/1.1 defaults to reuse while
    /// HTTP/1.0 (and anything older) defaults to close.
    pub(crate) fn should_keep_alive(&self, version: Version) -> bool {
        if self.close {
            return false;
        }

        if self.keep_alive {
            return true;
        }

        version >= Version::HTTP_11
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(connection: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = connection {
            headers.insert(header::CONNECTION, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn http11_defaults_to_keep_alive() {
        let framing = RequestFraming::from_head(Version::HTTP_11, &headers(None), PayloadSize::new_empty());
        assert!(framing.keep_alive());
        assert!(!framing.is_upgrade());
    }

    #[test]
    fn http11_close_wins() {
        let framing = RequestFraming::from_head(Version::HTTP_11, &headers(Some("close")), PayloadSize::new_empty());
        assert!(!framing.keep_alive());
    }

    #[test]
    fn http10_defaults_to_close() {
        let framing = RequestFraming::from_head(Version::HTTP_10, &headers(None), PayloadSize::new_empty());
        assert!(!framing.keep_alive());
    }

    #[test]
    fn http10_explicit_keep_alive() {
        let framing = RequestFraming::from_head(Version::HTTP_10, &headers(Some("keep-alive")), PayloadSize::new_empty());
        assert!(framing.keep_alive());
    }

    #[test]
    fn token_list_is_case_insensitive() {
        let directives = ConnectionDirectives::parse(&headers(Some("Keep-Alive, X-Custom")));
        assert!(directives.keep_alive);
        assert!(!directives.close);
    }

    #[test]
    fn close_delimited_body_forces_close() {
        let framing = RequestFraming::from_head(Version::HTTP_11, &headers(Some("keep-alive")), PayloadSize::new_close());
        assert!(!framing.keep_alive());
    }

    #[test]
    fn upgrade_needs_both_headers() {
        // the `upgrade` connection token alone is not an upgrade request
        let framing = RequestFraming::from_head(Version::HTTP_11, &headers(Some("upgrade")), PayloadSize::new_empty());
        assert!(!framing.is_upgrade());

        let mut with_upgrade = headers(Some("upgrade"));
        with_upgrade.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        let framing = RequestFraming::from_head(Version::HTTP_11, &with_upgrade, PayloadSize::new_empty());
        assert!(framing.is_upgrade());
    }
}
