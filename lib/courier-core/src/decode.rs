//! Response decoding.
//!
//! [`decode`] reads a [`StreamingResponse`] to completion and undoes gzip
//! content encoding. [`LineSplitter`] cuts a body into lines as chunks arrive,
//! for callers that consume a response incrementally.

use std::io::Read;

use bytes::{Bytes, BytesMut};
use flate2::read::MultiGzDecoder;
use futures_util::StreamExt;

use crate::{Error, Response, Result, StreamingBody, StreamingResponse};

/// Buffer a response body, gunzipping it when `Content-Encoding` is `gzip`.
///
/// The header name is matched case-insensitively; the value must be exactly
/// `gzip`. After gunzipping, `Content-Encoding` is dropped and
/// `Content-Length` describes the decoded body.
///
/// # Errors
///
/// - [`Error::ReadBody`] if a body chunk fails;
/// - [`Error::Gzip`] if the body is not a valid gzip stream.
///
/// Both carry the response status.
pub async fn decode(response: StreamingResponse) -> Result<Response> {
    let gzipped = response.header("Content-Encoding") == Some("gzip");
    let (status, mut headers, body) = response.into_parts();

    let raw = collect_body(status, body).await?;
    if !gzipped {
        return Ok(Response::new(status, headers, raw));
    }

    let decoded = gunzip(&raw).map_err(|e| Error::gzip(status, e.to_string()))?;
    headers.retain(|name, _| {
        !name.eq_ignore_ascii_case("content-encoding") && !name.eq_ignore_ascii_case("content-length")
    });
    headers.insert("content-length".to_string(), decoded.len().to_string());

    Ok(Response::new(status, headers, decoded))
}

/// Read every chunk of a body into one buffer.
///
/// # Errors
///
/// Returns [`Error::ReadBody`] carrying `status` if a chunk fails.
pub async fn collect_body(status: u16, mut body: StreamingBody) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| body_error(status, e))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Attach the status to a body stream failure.
#[must_use]
pub fn body_error(status: u16, error: Error) -> Error {
    match error {
        Error::ReadBody { .. } | Error::Timeout | Error::Cancelled => error,
        other => Error::read_body(status, other.to_string()),
    }
}

fn gunzip(data: &[u8]) -> std::io::Result<Bytes> {
    let mut decoded = Vec::new();
    MultiGzDecoder::new(data).read_to_end(&mut decoded)?;
    Ok(Bytes::from(decoded))
}

// ============================================================================
// Lines
// ============================================================================

/// Incremental `\n`-delimited line splitter.
///
/// Feed chunks with [`push`](Self::push), drain complete lines with
/// [`next_line`](Self::next_line) and call [`finish`](Self::finish) at end of
/// body. A trailing `\r` is stripped and blank lines are skipped.
///
/// # Example
///
/// ```
/// use courier_core::LineSplitter;
///
/// let mut lines = LineSplitter::new(200, 1024);
/// lines.push(b"line1\n\nli");
/// assert_eq!(lines.next_line().transpose().expect("short line").as_deref(), Some(&b"line1"[..]));
/// assert!(lines.next_line().is_none());
/// lines.push(b"ne2\r\n");
/// assert_eq!(lines.next_line().transpose().expect("short line").as_deref(), Some(&b"line2"[..]));
/// assert!(lines.finish().is_none());
/// ```
#[derive(Debug)]
pub struct LineSplitter {
    pending: BytesMut,
    // Prefix of `pending` known to hold no newline.
    scanned: usize,
    status: u16,
    max_line_length: usize,
}

impl LineSplitter {
    /// A splitter for a response with `status`, rejecting lines longer than
    /// `max_line_length` bytes.
    #[must_use]
    pub fn new(status: u16, max_line_length: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            scanned: 0,
            status,
            max_line_length,
        }
    }

    /// Append a chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Take the next complete, non-empty line.
    ///
    /// Returns `None` when no newline is buffered.
    ///
    /// # Errors
    ///
    /// Yields [`Error::LineTooLong`] once a line, complete or not, exceeds
    /// the maximum length.
    pub fn next_line(&mut self) -> Option<Result<Bytes>> {
        loop {
            let Some(offset) = self
                .pending
                .get(self.scanned..)
                .and_then(|rest| rest.iter().position(|&b| b == b'\n'))
            else {
                self.scanned = self.pending.len();
                return self.check_length(self.pending.len()).err().map(Err);
            };

            let mut line = self.pending.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            line.truncate(line.len() - 1);
            if let Some(line) = self.complete(line).transpose() {
                return Some(line);
            }
        }
    }

    /// Take the final line if the body did not end with a newline.
    ///
    /// # Errors
    ///
    /// Yields [`Error::LineTooLong`] if that line exceeds the maximum length.
    pub fn finish(&mut self) -> Option<Result<Bytes>> {
        let line = self.pending.split();
        self.scanned = 0;
        self.complete(line).transpose()
    }

    fn complete(&self, mut line: BytesMut) -> Result<Option<Bytes>> {
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        self.check_length(line.len())?;
        Ok((!line.is_empty()).then(|| line.freeze()))
    }

    fn check_length(&self, len: usize) -> Result<()> {
        if len > self.max_line_length {
            return Err(Error::LineTooLong {
                status: self.status,
                limit: self.max_line_length,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use assert2::{check, let_assert};
    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("write");
        encoder.finish().expect("finish")
    }

    fn streaming(status: u16, headers: &[(&str, &str)], chunks: Vec<Result<Bytes>>) -> StreamingResponse {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StreamingResponse::new(status, headers, Box::pin(futures_util::stream::iter(chunks)))
    }

    #[tokio::test]
    async fn plain_body_is_collected() {
        let response = streaming(
            200,
            &[("content-type", "text/plain")],
            vec![Ok(Bytes::from("hel")), Ok(Bytes::from("lo"))],
        );
        let decoded = decode(response).await.expect("decode");
        check!(decoded.status() == 200);
        check!(decoded.body().as_ref() == b"hello");
        check!(decoded.header("Content-Type") == Some("text/plain"));
    }

    #[tokio::test]
    async fn gzip_body_is_decompressed() {
        let compressed = gzip(b"hello");
        let response = streaming(
            200,
            &[("Content-Encoding", "gzip"), ("Content-Length", "25")],
            vec![Ok(Bytes::from(compressed))],
        );
        let decoded = decode(response).await.expect("decode");
        check!(decoded.body().as_ref() == b"hello");
        check!(decoded.header("content-encoding").is_none());
        check!(decoded.header("content-length") == Some("5"));
    }

    #[tokio::test]
    async fn gzip_header_name_is_case_insensitive() {
        let response = streaming(
            200,
            &[("content-encoding", "gzip")],
            vec![Ok(Bytes::from(gzip(b"payload")))],
        );
        let decoded = decode(response).await.expect("decode");
        check!(decoded.body().as_ref() == b"payload");
    }

    #[tokio::test]
    async fn other_encodings_pass_through() {
        let response = streaming(
            200,
            &[("Content-Encoding", "br")],
            vec![Ok(Bytes::from_static(b"\x0b\x02"))],
        );
        let decoded = decode(response).await.expect("decode");
        check!(decoded.body().as_ref() == b"\x0b\x02");
        check!(decoded.header("Content-Encoding") == Some("br"));
    }

    #[tokio::test]
    async fn malformed_gzip_keeps_status() {
        let response = streaming(
            502,
            &[("Content-Encoding", "gzip")],
            vec![Ok(Bytes::from_static(b"not gzip at all"))],
        );
        let err = decode(response).await.expect_err("malformed gzip");
        let_assert!(Error::Gzip { status, .. } = &err);
        check!(*status == 502);
        check!(err.status() == Some(502));
    }

    #[tokio::test]
    async fn body_failure_keeps_status() {
        let response = streaming(
            200,
            &[],
            vec![Ok(Bytes::from("partial")), Err(Error::connection("reset by peer"))],
        );
        let err = decode(response).await.expect_err("body failure");
        let_assert!(Error::ReadBody { status: 200, message } = err);
        check!(message.contains("reset by peer"));
    }

    fn drain(splitter: &mut LineSplitter) -> Vec<Bytes> {
        std::iter::from_fn(|| splitter.next_line())
            .map(|line| line.expect("short line"))
            .collect()
    }

    #[test]
    fn splitter_yields_non_empty_lines() {
        let mut splitter = LineSplitter::new(200, 64);
        splitter.push(b"line1\nline2\n\nline3");
        check!(drain(&mut splitter) == vec![Bytes::from("line1"), Bytes::from("line2")]);
        let_assert!(Some(Ok(last)) = splitter.finish());
        check!(last == Bytes::from("line3"));
        check!(splitter.finish().is_none());
    }

    #[test]
    fn splitter_handles_split_crlf() {
        let mut splitter = LineSplitter::new(200, 64);
        splitter.push(b"data: 1\r");
        check!(drain(&mut splitter).is_empty());
        splitter.push(b"\ndata: 2\r\n");
        check!(drain(&mut splitter) == vec![Bytes::from("data: 1"), Bytes::from("data: 2")]);
        check!(splitter.finish().is_none());
    }

    #[test]
    fn splitter_keeps_lines_before_a_long_one() {
        let mut splitter = LineSplitter::new(200, 4);
        splitter.push(b"abcd\nabcdef\n");
        let_assert!(Some(Ok(first)) = splitter.next_line());
        check!(first == Bytes::from("abcd"));
        let_assert!(Some(Err(Error::LineTooLong { status: 200, limit: 4 })) = splitter.next_line());
    }

    #[test]
    fn splitter_rejects_long_partial_lines() {
        let mut splitter = LineSplitter::new(503, 4);
        splitter.push(b"abcde");
        let_assert!(Some(Err(Error::LineTooLong { status: 503, limit: 4 })) = splitter.next_line());

        let mut splitter = LineSplitter::new(200, 4);
        splitter.push(b"ab");
        check!(splitter.next_line().is_none());
        splitter.push(b"cdef");
        let_assert!(Some(Err(Error::LineTooLong { .. })) = splitter.finish());
    }
}
