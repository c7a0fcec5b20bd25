//! Stdio message framing. Clients either send one JSON document per line or
//! LSP-style `Content-Length` framed bodies; each message is answered in the
//! framing it arrived in.

use serde_json::Value;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Line,
    ContentLength,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Message { framing: Framing, value: Value },
    /// Frame boundaries were intact but the body was not JSON.
    Malformed { framing: Framing, reason: String },
}

impl Incoming {
    pub fn framing(&self) -> Framing {
        match self {
            Incoming::Message { framing, .. } | Incoming::Malformed { framing, .. } => *framing,
        }
    }
}

/// Upper bound on a `Content-Length` body.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Reads the next message. `Ok(None)` on clean end of input; an `Err` means
/// the stream can no longer be trusted.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<Incoming>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(length) = std::str::from_utf8(trimmed)
            .ok()
            .map(content_length)
            .transpose()?
            .flatten()
        {
            return read_framed_body(reader, length).await.map(Some);
        }
        return Ok(Some(decode(Framing::Line, trimmed)));
    }
}

fn content_length(line: &str) -> io::Result<Option<usize>> {
    let Some((name, raw_len)) = line.split_once(':') else {
        return Ok(None);
    };
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    let length = raw_len.trim().parse::<usize>().map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "Invalid Content-Length header")
    })?;
    if length > MAX_MESSAGE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Content-Length exceeds limit",
        ));
    }
    Ok(Some(length))
}

async fn read_framed_body<R>(reader: &mut R, length: usize) -> io::Result<Incoming>
where
    R: AsyncBufRead + Unpin,
{
    // Remaining headers (Content-Type and friends) up to the blank separator.
    loop {
        let mut header = Vec::new();
        if reader.read_until(b'\n', &mut header).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }
        if header.trim_ascii().is_empty() {
            break;
        }
    }

    let mut payload = vec![0_u8; length];
    reader.read_exact(&mut payload).await?;
    Ok(decode(Framing::ContentLength, &payload))
}

fn decode(framing: Framing, bytes: &[u8]) -> Incoming {
    match serde_json::from_slice(bytes) {
        Ok(value) => Incoming::Message { framing, value },
        Err(err) => Incoming::Malformed {
            framing,
            reason: format!("Invalid JSON payload: {err}"),
        },
    }
}

pub async fn write_message<W>(writer: &mut W, framing: Framing, value: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    fn reader(input: &str) -> BufReader<&[u8]> {
        BufReader::new(input.as_bytes())
    }

    #[tokio::test]
    async fn reads_newline_delimited_messages() {
        let mut input = reader("{\"id\":1}\n\n  \r\n{\"id\":2}\n");
        let first = read_message(&mut input).await.unwrap().unwrap();
        assert_eq!(
            first,
            Incoming::Message {
                framing: Framing::Line,
                value: json!({ "id": 1 })
            }
        );
        let second = read_message(&mut input).await.unwrap().unwrap();
        assert_eq!(second.framing(), Framing::Line);
        assert!(read_message(&mut input).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reads_content_length_frames() {
        let body = r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#;
        let raw = format!(
            "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n{body}content-length: 2\r\n\r\n[]",
            body.len()
        );
        let mut input = reader(&raw);
        let first = read_message(&mut input).await.unwrap().unwrap();
        assert_eq!(
            first,
            Incoming::Message {
                framing: Framing::ContentLength,
                value: json!({ "jsonrpc": "2.0", "id": 7, "method": "ping" })
            }
        );
        let second = read_message(&mut input).await.unwrap().unwrap();
        assert_eq!(
            second,
            Incoming::Message {
                framing: Framing::ContentLength,
                value: json!([])
            }
        );
        assert!(read_message(&mut input).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_bodies_keep_the_stream_alive() {
        let mut input = reader("{not json\n{\"ok\":true}\n");
        let first = read_message(&mut input).await.unwrap().unwrap();
        assert!(matches!(
            first,
            Incoming::Malformed {
                framing: Framing::Line,
                ..
            }
        ));
        let second = read_message(&mut input).await.unwrap().unwrap();
        assert!(matches!(second, Incoming::Message { .. }));
    }

    #[tokio::test]
    async fn broken_headers_are_fatal() {
        let mut input = reader("Content-Length: lots\r\n\r\n{}");
        let err = read_message(&mut input).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut truncated = reader("Content-Length: 10\r\n");
        let err = read_message(&mut truncated).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_malformed_not_fatal() {
        let mut input = BufReader::new(&b"{\"id\":1,\"x\":\"\xff\"}\n{\"id\":2}\n"[..]);
        let first = read_message(&mut input).await.unwrap().unwrap();
        assert!(matches!(
            first,
            Incoming::Malformed {
                framing: Framing::Line,
                ..
            }
        ));
        let second = read_message(&mut input).await.unwrap().unwrap();
        assert_eq!(
            second,
            Incoming::Message {
                framing: Framing::Line,
                value: json!({ "id": 2 })
            }
        );
    }

    #[tokio::test]
    async fn oversized_content_length_is_rejected_before_reading() {
        for length in [
            (MAX_MESSAGE_BYTES + 1).to_string(),
            u64::MAX.to_string(),
            "1000000000000000".to_string(),
        ] {
            let raw = format!("Content-Length: {length}\r\n\r\n{{}}");
            let mut input = reader(&raw);
            let err = read_message(&mut input).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
            assert_eq!(err.to_string(), "Content-Length exceeds limit");
        }
    }

    #[tokio::test]
    async fn writes_in_the_requested_framing() {
        let value = json!({ "id": 1 });

        let mut line = Vec::new();
        write_message(&mut line, Framing::Line, &value).await.unwrap();
        assert_eq!(line, b"{\"id\":1}\n");

        let mut framed = Vec::new();
        write_message(&mut framed, Framing::ContentLength, &value)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(framed).unwrap(),
            "Content-Length: 8\r\nContent-Type: application/json\r\n\r\n{\"id\":1}"
        );
    }
}
