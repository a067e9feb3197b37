//! Line-delimited transport for the MCP server.
//!
//! Follows the MCP stdio transport rules:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client, and nothing else
//! - stderr: may be used for logging (not MCP messages)
//!
//! The transport is generic over its streams so the same framing can be
//! driven from in-memory buffers.

use std::io;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

use crate::mcp::protocol::OutgoingMessage;

/// Transport over the process's standard streams.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

/// Longest accepted input line, excluding the terminator.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// One line read from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// A UTF-8 line with its terminator removed.
    Text(String),
    /// The line was not valid UTF-8 and has been discarded.
    NotUtf8,
    /// The line exceeded the length limit and has been discarded.
    TooLong {
        /// The limit that was exceeded, in bytes.
        limit: usize,
    },
}

/// A newline-framed JSON-RPC transport.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    max_line_bytes: usize,
}

impl StdioTransport {
    /// Creates a transport reading stdin and writing stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over the given reader and writer.
    #[must_use]
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Sets the longest accepted input line.
    #[must_use]
    pub const fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Reads the next line.
    ///
    /// Returns `None` if the input is closed (EOF). Lines that are not UTF-8
    /// or are too long are consumed and reported without their content, so
    /// the caller can carry on with the next line.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<InboundLine>> {
        let limit = self.max_line_bytes;
        // Room for the content plus its newline.
        let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);

        let mut buf = Vec::new();
        let bytes_read = (&mut self.reader)
            .take(cap)
            .read_until(b'\n', &mut buf)
            .await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() > limit {
            self.discard_rest_of_line().await?;
            return Ok(Some(InboundLine::TooLong { limit }));
        }

        Ok(Some(
            String::from_utf8(buf).map_or(InboundLine::NotUtf8, InboundLine::Text),
        ))
    }

    /// Skips input up to and including the next newline.
    async fn discard_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let (consumed, done) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(());
                }
                match available.iter().position(|&b| b == b'\n') {
                    Some(pos) => (pos + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(consumed);
            if done {
                return Ok(());
            }
        }
    }

    /// Writes a response or error, terminated with a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message(&mut self, message: &OutgoingMessage) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}
