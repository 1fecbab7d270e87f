//! Request head decoder.
//!
//! Parses the request line and header block out of the read buffer using
//! `httparse`, zero-copy: header names and values are materialized as slices
//! of the frozen head bytes rather than copies.
//!
//! The decoder is incremental. An attempt over an incomplete head consumes
//! nothing and reports "need more" (`Ok(None)`), so the caller suspends until
//! more bytes arrive instead of re-scanning in a loop; a complete parse
//! consumes exactly the head, leaving body and pipelined bytes in place.
//! Malformed input is rejected with the parse phase that was active at
//! detection time: request-line defects and header-block defects are
//! different rejections. A head cut off by end-of-stream is tagged the same
//! way.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 8KB
//! - HTTP/1.0 and HTTP/1.1 only
//!
//! Beyond the lexer, the decoder performs post-parse validation (HTTP/1.1
//! requires `Host`) and derives the request's framing decision so it exists
//! before the application ever runs.

use std::mem::MaybeUninit;

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Method, Request, Uri, Version, header};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestFraming, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire head section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Which part of the head the parser was working on when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadPhase {
    /// still inside the request line
    FirstLine,
    /// past the request line, inside the header fields
    Fields,
}

pub struct HeaderDecoder;

impl HeaderDecoder {
    /// Derives the phase from how far the buffered input got: once a line
    /// terminator exists the request line has been passed.
    fn head_phase(src: &[u8]) -> HeadPhase {
        if src.contains(&b'\n') { HeadPhase::Fields } else { HeadPhase::FirstLine }
    }

    fn truncated(src: &[u8]) -> ParseError {
        match Self::head_phase(src) {
            HeadPhase::FirstLine => ParseError::invalid_request_line("stream ended before request line complete"),
            HeadPhase::Fields => ParseError::malformed_headers("stream ended before header block complete"),
        }
    }
}

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, RequestFraming);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Fast path: minimum valid request is longer than "GET / HTTP/1.1"
        if src.len() < 14 {
            return Ok(None);
        }

        // Create an empty HTTP request parser and uninitialized headers array
        let mut req = httparse::Request::new(&mut []);
        let mut headers: [MaybeUninit<httparse::Header>; MAX_HEADER_NUM] = [const { MaybeUninit::uninit() }; MAX_HEADER_NUM];

        // httparse does not report where it failed; its error kinds do.
        // HeaderName/HeaderValue can only arise inside the header block,
        // everything else arises while lexing the request line.
        let parsed_result = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::HeaderName | Error::HeaderValue => ParseError::malformed_headers(e.to_string()),
            e => ParseError::invalid_request_line(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(head_size) => {
                trace!(head_size, "parsed request head");
                ensure!(head_size <= MAX_HEADER_BYTES, ParseError::too_large_header(head_size, MAX_HEADER_BYTES));

                let header_count = req.headers.len();
                ensure!(header_count <= MAX_HEADER_NUM, ParseError::too_many_headers(header_count));

                // Record byte range indices for each header before the source
                // buffer is split
                let mut header_index: [HeaderIndex; MAX_HEADER_NUM] = EMPTY_HEADER_INDEX_ARRAY;
                HeaderIndex::record(src, req.headers, &mut header_index);

                let version = match req.version {
                    Some(0) => Version::HTTP_10,
                    Some(1) => Version::HTTP_11,
                    // HTTP/2 and HTTP/3 are negotiated elsewhere, never here
                    v => return Err(ParseError::InvalidVersion(v)),
                };

                let method =
                    Method::from_bytes(req.method.ok_or(ParseError::InvalidMethod)?.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
                let uri: Uri = req.path.ok_or(ParseError::InvalidUri)?.parse().map_err(|_| ParseError::InvalidUri)?;

                let mut header_builder = Request::builder().method(method).uri(uri).version(version);

                // Safe to unwrap: the builder holds no error once method and
                // uri were validated above
                let headers = header_builder.headers_mut().unwrap();
                headers.reserve(header_count);

                // Consume exactly the head; body and pipelined bytes stay put
                let header_bytes = src.split_to(head_size).freeze();
                for index in &header_index[..header_count] {
                    // Safe to unwrap since httparse verified header name is valid ASCII
                    let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).unwrap();

                    // SAFETY: httparse verified the header value contains only
                    // visible ASCII chars
                    let value = unsafe { HeaderValue::from_maybe_shared_unchecked(header_bytes.slice(index.value.0..index.value.1)) };

                    headers.append(name, value);
                }

                let header = RequestHeader::from(header_builder.body(()).map_err(|_| ParseError::InvalidUri)?);

                // Post-parse validation, distinct from the lexer: HTTP/1.1
                // requires a Host header
                if header.version() == Version::HTTP_11 && !header.headers().contains_key(header::HOST) {
                    return Err(ParseError::missing_host(header.version()));
                }

                let payload_size = negotiate_payload(&header)?;
                let framing = RequestFraming::from_head(header.version(), header.headers(), payload_size);

                Ok(Some((header, framing)))
            }
            Status::Partial => {
                // Nothing consumed; the caller waits for more input. Enforce
                // the size cap on the partial head too so an unbounded header
                // stream cannot grow the buffer forever.
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            // clean close between requests
            return Ok(None);
        }

        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(Self::truncated(src)),
        }
    }
}

/// Byte ranges of one header's name and value inside the head buffer.
///
/// Recording positions instead of copying keeps header materialization
/// zero-copy: the final values are slices of the frozen head bytes.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

const EMPTY_HEADER_INDEX_ARRAY: [HeaderIndex; MAX_HEADER_NUM] = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            let name_end = name_start + header.name.len();
            indices.name = (name_start, name_end);
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            let value_end = value_start + header.value.len();
            indices.value = (value_start, value_end);
        }
    }
}

/// Determines how the request body is framed, per RFC 9112 section 6.
///
/// Transfer-Encoding and Content-Length together are rejected (request
/// smuggling vector); `chunked` must be the final transfer coding to count;
/// an HTTP/1.0 request that may carry a body but declares no length reads
/// until the peer closes the stream.
fn negotiate_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    if !header.need_body() {
        return Ok(PayloadSize::new_empty());
    }

    let te_header = header.headers().get(header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => {
            if header.version() == Version::HTTP_10 {
                Ok(PayloadSize::new_close())
            } else {
                Ok(PayloadSize::new_empty())
            }
        }

        (te_value @ Some(_), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::new_chunked())
            } else {
                Ok(PayloadSize::new_empty())
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length =
                cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::new_length(length))
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}

/// Whether the Transfer-Encoding header ends with `chunked`.
///
/// Per RFC 7230, chunked must be the final transfer coding to frame the body.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii() == CHUNKED;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;
    use indoc::indoc;

    fn decode(input: &str) -> Result<Option<(RequestHeader, RequestFraming)>, ParseError> {
        let mut buf = BytesMut::from(input);
        HeaderDecoder.decode(&mut buf)
    }

    #[test]
    fn check_is_chunked() {
        {
            let headers = HeaderMap::new();
            assert!(!is_chunked(headers.get(header::TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "gzip, chunked".parse().unwrap());
            assert!(is_chunked(headers.get(header::TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "chunked, gzip".parse().unwrap());
            assert!(!is_chunked(headers.get(header::TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "gzip".parse().unwrap());
            assert!(!is_chunked(headers.get(header::TRANSFER_ENCODING)));
        }
    }

    #[test]
    fn consumes_exactly_the_head() {
        let str = indoc! {r##"
        POST /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        Content-Length: 3

        123"##};

        let mut bytes = BytesMut::from(str);

        let result = HeaderDecoder.decode(&mut bytes).unwrap();
        assert!(result.is_some());

        // the body stays in the buffer
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn partial_head_consumes_nothing() {
        let partial = "GET /index.html HTTP/1.1\r\nHost: 127.0.0.1";
        let mut bytes = BytesMut::from(partial);

        let result = HeaderDecoder.decode(&mut bytes).unwrap();
        assert!(result.is_none());
        assert_eq!(bytes.len(), partial.len());
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let (header, framing) = decode(str).unwrap().unwrap();

        assert!(framing.body().is_empty());
        assert!(framing.keep_alive());

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.uri().query(), None);

        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers().get(header::ACCEPT), Some(&HeaderValue::from_static("*/*")));
        assert_eq!(header.headers().get(header::HOST), Some(&HeaderValue::from_static("127.0.0.1:8080")));
        assert_eq!(header.headers().get(header::USER_AGENT), Some(&HeaderValue::from_static("curl/7.79.1")));
    }

    #[test]
    fn query_and_repeated_params() {
        let str = indoc! {r##"
        GET /index/?a=1&b=2&a=3 HTTP/1.1
        Host: 127.0.0.1:8080
        Connection: keep-alive

        "##};

        let (header, framing) = decode(str).unwrap().unwrap();

        assert!(framing.keep_alive());
        assert_eq!(header.uri().path(), "/index/");
        assert_eq!(header.uri().query(), Some("a=1&b=2&a=3"));
        assert_eq!(header.headers().get(header::CONNECTION), Some(&HeaderValue::from_static("keep-alive")));
    }

    #[test]
    fn content_length_body() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Host: a
        Content-Length: 5

        hello"##};

        let (_, framing) = decode(str).unwrap().unwrap();
        assert_eq!(framing.body(), PayloadSize::new_length(5));
    }

    #[test]
    fn chunked_body() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Host: a
        Transfer-Encoding: chunked

        "##};

        let (_, framing) = decode(str).unwrap().unwrap();
        assert!(framing.body().is_chunked());
    }

    #[test]
    fn transfer_encoding_and_content_length_rejected() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Host: a
        Transfer-Encoding: chunked
        Content-Length: 5

        "##};

        assert!(matches!(decode(str), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn http10_post_without_length_reads_until_close() {
        let str = indoc! {r##"
        POST /upload HTTP/1.0
        Host: a

        "##};

        let (_, framing) = decode(str).unwrap().unwrap();
        assert!(framing.body().is_close());
        assert!(!framing.keep_alive());
    }

    #[test]
    fn http11_without_host_rejected() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Accept: */*

        "##};

        assert!(matches!(decode(str), Err(ParseError::MissingHost { .. })));
    }

    #[test]
    fn http10_without_host_accepted() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.0
        Accept: */*

        "##};

        let (header, framing) = decode(str).unwrap().unwrap();
        assert_eq!(header.version(), Version::HTTP_10);
        assert!(!framing.keep_alive());
    }

    #[test]
    fn garbage_request_line_tagged_as_request_line() {
        let result = decode("GET?/ HTTP/9.9 nonsense nonsense nonsense\r\n");
        assert!(matches!(result, Err(ParseError::InvalidRequestLine { .. })));
    }

    #[test]
    fn broken_header_field_tagged_as_headers() {
        let str = "GET / HTTP/1.1\r\nBad\x01Name: x\r\n\r\n";
        assert!(matches!(decode(str), Err(ParseError::MalformedHeaders { .. })));
    }

    #[test]
    fn eof_mid_request_line_tagged_as_request_line() {
        let mut bytes = BytesMut::from("GET /index.html HTTP/1");
        let result = HeaderDecoder.decode_eof(&mut bytes);
        assert!(matches!(result, Err(ParseError::InvalidRequestLine { .. })));
    }

    #[test]
    fn eof_mid_headers_tagged_as_headers() {
        // header block never terminated by a blank line
        let mut bytes = BytesMut::from("GET / HTTP/1.1\r\nHost: a\r\nAccept: */*\r\n");
        let result = HeaderDecoder.decode_eof(&mut bytes);
        assert!(matches!(result, Err(ParseError::MalformedHeaders { .. })));
    }

    #[test]
    fn eof_with_empty_buffer_is_clean() {
        let mut bytes = BytesMut::new();
        assert!(HeaderDecoder.decode_eof(&mut bytes).unwrap().is_none());
    }
}
