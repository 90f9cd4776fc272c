//! LSP Transport Layer
//!
//! Handles LSP message framing with Content-Length headers over any async
//! byte stream: a TCP socket or a child process's stdio.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::protocol::{Message, Notification, Request, Response};

/// Upper bound on a single message body
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Reading half of an LSP connection
pub struct Transport<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> Transport<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next message from the server
    ///
    /// LSP messages are framed with headers:
    /// ```text
    /// Content-Length: 123\r\n
    /// \r\n
    /// {"jsonrpc":"2.0",...}
    /// ```
    ///
    /// Returns `Ok(None)` when the peer closes the stream between messages.
    pub async fn read_message(&mut self) -> io::Result<Option<Message>> {
        let Some(content_length) = self.read_headers().await? else {
            return Ok(None);
        };

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await?;

        let json =
            String::from_utf8(body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        tracing::trace!("LSP <- {}", json);

        Message::parse(&json)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Read headers and return Content-Length
    async fn read_headers(&mut self) -> io::Result<Option<usize>> {
        let mut content_length: Option<usize> = None;
        let mut saw_header = false;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                if saw_header {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "Server closed connection mid-header",
                    ));
                }
                return Ok(None);
            }

            let line = line.trim();

            // Empty line marks end of headers
            if line.is_empty() {
                if saw_header {
                    break;
                }
                continue;
            }
            saw_header = true;

            if let Some((name, value)) = line.split_once(':')
                && name.trim().eq_ignore_ascii_case("Content-Length")
            {
                let length: usize = value
                    .trim()
                    .parse()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                if length > MAX_CONTENT_LENGTH {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Message too large: {} bytes", length),
                    ));
                }
                content_length = Some(length);
            }
            // Ignore other headers (Content-Type, etc.)
        }

        content_length
            .map(Some)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Missing Content-Length"))
    }
}

/// Write an LSP request
pub async fn write_request<W: AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    request: &Request,
) -> io::Result<()> {
    let json = serde_json::to_string(request)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    write_message(writer, &json).await
}

/// Write an LSP notification
pub async fn write_notification<W: AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    notification: &Notification,
) -> io::Result<()> {
    let json = serde_json::to_string(notification)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    write_message(writer, &json).await
}

/// Write an LSP response (for server-initiated requests)
pub async fn write_response<W: AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    response: &Response,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    write_message(writer, &json).await
}

/// Write a raw JSON message with LSP framing
async fn write_message<W: AsyncWrite + Unpin + ?Sized>(writer: &mut W, json: &str) -> io::Result<()> {
    tracing::trace!("LSP -> {}", json);

    let message = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);
    writer.write_all(message.as_bytes()).await?;
    writer.flush().await
}
