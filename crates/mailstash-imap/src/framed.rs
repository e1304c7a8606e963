//! Framed I/O for the IMAP protocol.
//!
//! IMAP responses are CRLF-terminated lines that may embed literals of the
//! form `{n}\r\n<n bytes>`. A "response" here is one logical server reply:
//! the initial line plus any literal payloads and their continuation lines.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const READ_BUFFER_SIZE: usize = 8192;

/// Upper bound on a single response line, to bound memory on hostile input.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Upper bound on a literal payload.
const MAX_LITERAL_SIZE: usize = 64 * 1024 * 1024;

/// Buffered reader/writer speaking IMAP framing over any async stream.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buf: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, stream),
            write_buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Reads one complete server response, inlining literal payloads.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(len) = literal_length(&line) else {
                return Ok(response);
            };
            if len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!("literal too large: {len} bytes")));
            }
            let mut payload = vec![0u8; len];
            self.reader.read_exact(&mut payload).await?;
            response.extend_from_slice(&payload);
            // The line after a literal continues the same response.
        }
    }

    /// Reads responses until the tagged completion for `tag` arrives.
    ///
    /// Returns every response read, the tagged one last.
    pub async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut responses = Vec::new();
        loop {
            let response = self.read_response().await?;
            let done = response.starts_with(tag.as_bytes())
                && response.get(tag.len()) == Some(&b' ');
            responses.push(response);
            if done {
                return Ok(responses);
            }
        }
    }

    /// Writes a serialized command and flushes.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buf.clear();
        self.write_buf.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Consumes the framing and returns the inner stream.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            // The CRLF can straddle two reads: accumulated '\r', next chunk
            // opening with '\n'.
            if line.last() == Some(&b'\r') && buf[0] == b'\n' {
                line.push(b'\n');
                self.reader.consume(1);
                return Ok(line);
            }

            if let Some(pos) = buf.windows(2).position(|w| w == b"\r\n") {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }
}

/// Extracts a trailing literal announcement (`{n}` or `{n+}`) from a line.
fn literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);

    let open = line.iter().rposition(|&b| b == b'{')?;
    std::str::from_utf8(&line[open + 1..]).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn literal_length_variants() {
        assert_eq!(literal_length(b"* 1 FETCH (BODY[TEXT] {12}\r\n"), Some(12));
        assert_eq!(literal_length(b"* 1 FETCH (BODY[TEXT] {12+}\r\n"), Some(12));
        assert_eq!(literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(literal_length(b"no literal here\r\n"), None);
        assert_eq!(literal_length(b"unterminated {12"), None);
        assert_eq!(literal_length(b"not a number {ab}\r\n"), None);
    }

    #[tokio::test]
    async fn reads_a_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn inlines_literal_payloads() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[TEXT] {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[TEXT] {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn crlf_split_across_reads_ends_the_line() {
        // '\r' arrives in one read, '\n' in the next; the two responses must
        // not be merged into one.
        let mock = Builder::new()
            .read(b"* 3 EXISTS\r")
            .read(b"\nA0001 OK EXAMINE done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* 3 EXISTS\r\n");
        assert_eq!(
            framed.read_response().await.unwrap(),
            b"A0001 OK EXAMINE done\r\n"
        );
    }

    #[tokio::test]
    async fn split_crlf_does_not_swallow_a_fetch_record() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (UID 7)\r")
            .read(b"\n* 2 FETCH (UID 8)\r\n")
            .read(b"A0001 OK FETCH done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let responses = framed.read_until_tagged("A0001").await.unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0], b"* 1 FETCH (UID 7)\r\n");
        assert_eq!(responses[1], b"* 2 FETCH (UID 8)\r\n");
    }

    #[tokio::test]
    async fn collects_until_tagged_completion() {
        let mock = Builder::new()
            .read(b"* 3 EXISTS\r\n")
            .read(b"* OK completed soon\r\n")
            .read(b"A0001 OK EXAMINE done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let responses = framed.read_until_tagged("A0001").await.unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[2], b"A0001 OK EXAMINE done\r\n");
    }

    #[tokio::test]
    async fn rejects_oversized_literals() {
        let header = format!("* 1 FETCH (BODY[TEXT] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn eof_is_an_error() {
        let mock = Builder::new().build();
        let mut framed = FramedStream::new(mock);

        assert!(framed.read_response().await.is_err());
    }
}
