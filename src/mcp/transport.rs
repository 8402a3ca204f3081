//! Byte-stream transport for single-session mode.
//!
//! Messages are UTF-8 encoded JSON-RPC, delimited by newlines, and must not
//! contain embedded newlines. The transport is generic over the underlying
//! duplex pair: production binds stdin/stdout (stderr stays free for
//! logging), tests bind an in-memory duplex.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// A newline-delimited JSON-RPC transport over any duplex byte stream.
pub struct ByteStreamTransport<R, W> {
    /// Buffered reader for the inbound half.
    reader: BufReader<R>,
    /// Outbound half.
    writer: W,
}

/// The stdio binding used in production.
pub type StdioTransport = ByteStreamTransport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates the transport over this process's stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> ByteStreamTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over an arbitrary read/write pair.
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` on EOF (the peer closed the connection).
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Writes one serialised message, newline-terminated, and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn write_line(&mut self, json: &str) -> io::Result<()> {
        // Messages must not contain embedded newlines.
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}
