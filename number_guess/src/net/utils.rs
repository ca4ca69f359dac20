use serde::{Serialize, de::DeserializeOwned};
use std::io::{self, BufRead, Read, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::errors::{LineTooLong, ProtocolError, Result};

/// Maximum line length in bytes, excluding the terminating newline.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Serialize a message as one newline-terminated JSON line.
pub fn encode_line<T: Serialize>(value: &T) -> Result<String> {
    let mut line = serde_json::to_string(value)?;
    if line.len() > MAX_LINE_LENGTH {
        return Err(ProtocolError::MessageTooLarge {
            actual: line.len(),
            max: MAX_LINE_LENGTH,
        });
    }
    line.push('\n');
    Ok(line)
}

/// Parse one line (without its newline) as a message.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    Ok(serde_json::from_str(line)?)
}

fn finish_line(mut line: String, read: usize) -> io::Result<Option<String>> {
    if read == 0 {
        return Ok(None);
    }

    if !line.ends_with('\n') {
        // Hitting the limit without a newline means the peer is not framing
        // its messages.
        if read > MAX_LINE_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                LineTooLong { read },
            ));
        }
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("line not terminated after {read} bytes"),
        ));
    }

    line.pop();
    if line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Whether a read error came from an over-long line rather than bad bytes.
pub fn is_line_too_long(error: &io::Error) -> bool {
    error
        .get_ref()
        .is_some_and(|inner| inner.is::<LineTooLong>())
}

/// Read one line, blocking. `Ok(None)` means the peer closed cleanly.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LENGTH as u64 + 1)
        .read_line(&mut line)?;
    finish_line(line, read)
}

/// Async counterpart of [`read_line`] for the server.
pub async fn read_line_async<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LENGTH as u64 + 1)
        .read_line(&mut line)
        .await?;
    finish_line(line, read)
}

/// Write one message as a JSON line in a single chunk.
pub fn write_line<T: Serialize, W: Write>(writer: &mut W, value: &T) -> io::Result<()> {
    let line = encode_line(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(line.as_bytes())?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::messages::ServerMessage;
    use std::io::Cursor;

    #[test]
    fn test_write_and_read() {
        let mut buf = Vec::new();
        write_line(&mut buf, &ServerMessage::error("nope")).unwrap();
        write_line(&mut buf, &ServerMessage::error("again")).unwrap();

        let mut reader = Cursor::new(buf);
        let first = read_line(&mut reader).unwrap().unwrap();
        assert_eq!(
            decode_line::<ServerMessage>(&first).unwrap(),
            ServerMessage::error("nope")
        );
        let second = read_line(&mut reader).unwrap().unwrap();
        assert_eq!(
            decode_line::<ServerMessage>(&second).unwrap(),
            ServerMessage::error("again")
        );
        assert!(read_line(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut reader = Cursor::new(b"{\"username\":\"a\"}\r\n".to_vec());
        assert_eq!(
            read_line(&mut reader).unwrap().as_deref(),
            Some("{\"username\":\"a\"}")
        );
    }

    #[test]
    fn test_unterminated_line_is_unexpected_eof() {
        let mut reader = Cursor::new(b"{\"action\":".to_vec());
        assert_eq!(
            read_line(&mut reader).map_err(|e| e.kind()),
            Err(io::ErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn test_oversized_line_is_invalid_data() {
        let mut data = vec![b'x'; MAX_LINE_LENGTH + 10];
        data.push(b'\n');
        let mut reader = Cursor::new(data);
        let error = read_line(&mut reader).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert!(is_line_too_long(&error));
    }

    #[test]
    fn test_non_utf8_line_is_not_too_long() {
        let mut reader = Cursor::new(b"\xff\xfe{}\n".to_vec());
        let error = read_line(&mut reader).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert!(!is_line_too_long(&error));
    }

    #[test]
    fn test_line_at_limit_is_accepted() {
        let mut data = vec![b'x'; MAX_LINE_LENGTH];
        data.push(b'\n');
        let mut reader = Cursor::new(data);
        assert_eq!(read_line(&mut reader).unwrap().unwrap().len(), MAX_LINE_LENGTH);
    }

    #[test]
    fn test_encode_rejects_oversized_message() {
        let message = ServerMessage::error("x".repeat(MAX_LINE_LENGTH));
        assert!(matches!(
            encode_line(&message),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_line::<ServerMessage>("not json"),
            Err(ProtocolError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_read_line_async() {
        let data: &[u8] = b"first\nsecond\r\nthird";
        let mut reader = tokio::io::BufReader::new(data);
        assert_eq!(
            read_line_async(&mut reader).await.unwrap().as_deref(),
            Some("first")
        );
        assert_eq!(
            read_line_async(&mut reader).await.unwrap().as_deref(),
            Some("second")
        );
        assert_eq!(
            read_line_async(&mut reader).await.map_err(|e| e.kind()),
            Err(io::ErrorKind::UnexpectedEof)
        );
    }

    #[tokio::test]
    async fn test_read_line_async_eof() {
        let data: &[u8] = b"";
        let mut reader = tokio::io::BufReader::new(data);
        assert!(read_line_async(&mut reader).await.unwrap().is_none());
    }
}
