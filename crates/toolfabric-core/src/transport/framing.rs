//! Content-Length message framing
//!
//! Each message is `Content-Length: <n>\r\n\r\n` followed by `n` bytes of JSON,
//! the same header framing LSP and MCP stdio servers use.

use std::io::{BufRead, Write};

use serde_json::Value;

use super::traits::{TransportError, TransportResult};

/// Largest message body a peer may announce
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Write one framed JSON message and flush
pub fn write_message<W: Write>(writer: &mut W, message: &Value) -> TransportResult<()> {
    let content = serde_json::to_string(message)?;
    write!(writer, "Content-Length: {}\r\n\r\n{}", content.len(), content)?;
    writer.flush()?;
    Ok(())
}

/// Read one framed JSON message
pub fn read_message<R: BufRead>(reader: &mut R) -> TransportResult<Value> {
    // Read headers until the blank separator line
    let mut content_length: Option<usize> = None;
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            return Err(TransportError::Closed);
        }

        let header = line.trim();
        if header.is_empty() {
            if content_length.is_some() {
                break;
            }
            // Tolerate stray blank lines before the headers
            continue;
        }

        if let Some(len_str) = header.strip_prefix("Content-Length:") {
            content_length = Some(
                len_str
                    .trim()
                    .parse()
                    .map_err(|_| TransportError::InvalidResponse("Invalid Content-Length".to_string()))?,
            );
        }
    }

    let length = content_length
        .ok_or_else(|| TransportError::InvalidResponse("Missing Content-Length header".to_string()))?;
    if length > MAX_MESSAGE_SIZE {
        return Err(TransportError::InvalidResponse(format!(
            "Content-Length {} exceeds limit of {} bytes",
            length, MAX_MESSAGE_SIZE
        )));
    }

    let mut content = vec![0u8; length];
    reader.read_exact(&mut content)?;

    Ok(serde_json::from_slice(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_write_message_header() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!({"type": "ping"})).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Content-Length: 15\r\n\r\n{\"type\":\"ping\"}");
    }

    #[test]
    fn test_read_two_messages_from_one_stream() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!({"pong": true})).unwrap();
        write_message(&mut buf, &json!({"status": "sent"})).unwrap();

        let mut reader = Cursor::new(buf);
        assert_eq!(read_message(&mut reader).unwrap(), json!({"pong": true}));
        assert_eq!(read_message(&mut reader).unwrap(), json!({"status": "sent"}));
        assert!(matches!(read_message(&mut reader), Err(TransportError::Closed)));
    }

    #[test]
    fn test_missing_content_length() {
        let mut reader = Cursor::new(b"X-Other: 1\r\n\r\n{}".to_vec());
        // The blank line is skipped while no length is known, then EOF
        assert!(read_message(&mut reader).is_err());
    }

    #[test]
    fn test_invalid_content_length() {
        let mut reader = Cursor::new(b"Content-Length: abc\r\n\r\n{}".to_vec());
        assert!(matches!(
            read_message(&mut reader),
            Err(TransportError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_oversized_content_length() {
        for length in [u64::MAX, (MAX_MESSAGE_SIZE + 1) as u64] {
            let frame = format!("Content-Length: {}\r\n\r\n{{}}", length);
            let mut reader = Cursor::new(frame.into_bytes());
            assert!(matches!(
                read_message(&mut reader),
                Err(TransportError::InvalidResponse(_))
            ));
        }
    }
}
