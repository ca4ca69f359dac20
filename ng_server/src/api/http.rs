//! Minimal HTTP/1.1 request parsing and response writing for the poll adapter.
//!
//! Every exchange is one request and one response on a fresh connection, so
//! there is no keep-alive, chunked encoding or pipelining to deal with.

use chrono::Utc;
use number_guess::{entities::PlayerId, messages::ErrorResponse, utils};
use serde::Serialize;
use std::io;
use tokio::io::{AsyncBufRead, AsyncReadExt};

/// Largest accepted request body.
pub const MAX_BODY_LENGTH: usize = 64 * 1024;

/// Most header lines accepted in one request.
pub const MAX_HEADERS: usize = 64;

/// Header carrying the caller's identity.
pub const PLAYER_ID_HEADER: &str = "x-player-id";

const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Why a request could not be read
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Peer closed before sending a request line
    #[error("connection closed before request")]
    Closed,

    /// Request is unusable; the message is sent back in a 400
    #[error("{0}")]
    Malformed(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A parsed request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Target with any query string removed
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Caller-supplied identity, if present and non-blank
    pub fn player_id(&self) -> Option<PlayerId> {
        self.header(PLAYER_ID_HEADER)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PlayerId::from)
    }
}

/// Read one request head and its body.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let request_line = match utils::read_line_async(reader).await {
        Ok(Some(line)) => line,
        Ok(None) => return Err(RequestError::Closed),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            return Err(RequestError::Malformed("Malformed request line"));
        }
        Err(e) => return Err(e.into()),
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(RequestError::Malformed("Malformed request line"));
    };
    if !version.starts_with("HTTP/") {
        return Err(RequestError::Malformed("Malformed request line"));
    }
    let path = target.split('?').next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let line = match utils::read_line_async(reader).await {
            Ok(Some(line)) => line,
            Ok(None) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Err(e) if utils::is_line_too_long(&e) => {
                return Err(RequestError::Malformed("Request header too large"));
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(RequestError::Malformed("Malformed request header"));
            }
            Err(e) => return Err(e.into()),
        };
        if line.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(RequestError::Malformed("Too many request headers"));
        }
        // Lines without a colon carry nothing usable.
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let mut request = Request {
        method: method.to_ascii_uppercase(),
        path,
        headers,
        body: Vec::new(),
    };

    let content_length = match request.header("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed("Invalid Content-Length"))?,
        None => 0,
    };
    if content_length > MAX_BODY_LENGTH {
        return Err(RequestError::Malformed("Request body too large"));
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).await?;
    request.body = body;

    Ok(request)
}

/// A response ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    /// JSON response; serialization failure becomes a 500.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(e) => {
                log::error!("Failed to serialize response: {e}");
                Self {
                    status: 500,
                    body: r#"{"error":"Internal server error"}"#.to_string(),
                }
            }
        }
    }

    /// `{"error": message}` with the given status
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, &ErrorResponse::new(message))
    }

    /// Full wire form: status line, headers and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Date: {date}\r\n\
             Server: {SERVER_NAME}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status,
            reason_phrase(self.status),
            self.body.len(),
        );

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(raw: &str) -> Result<Request, RequestError> {
        let mut reader = tokio::io::BufReader::new(raw.as_bytes());
        read_request(&mut reader).await
    }

    #[tokio::test]
    async fn test_parse_post_with_body() {
        let request = parse(
            "POST /action?x=1 HTTP/1.1\r\n\
             Host: localhost\r\n\
             x-player-id: player_abc123\r\n\
             Content-Length: 17\r\n\
             \r\n\
             {\"action\":\"noop\"}",
        )
        .await
        .unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/action");
        assert_eq!(request.header("HOST"), Some("localhost"));
        assert_eq!(request.player_id(), Some(PlayerId::new("player_abc123")));
        assert_eq!(request.body, b"{\"action\":\"noop\"}");
    }

    #[tokio::test]
    async fn test_parse_get_without_body() {
        let request = parse("GET /gamestate HTTP/1.1\r\nX-Player-ID:   \r\n\r\n")
            .await
            .unwrap();
        assert_eq!(request.method, "GET");
        assert!(request.body.is_empty());
        assert_eq!(request.player_id(), None);
    }

    #[tokio::test]
    async fn test_malformed_request_line() {
        assert!(matches!(
            parse("GARBAGE\r\n\r\n").await,
            Err(RequestError::Malformed("Malformed request line"))
        ));
        assert!(matches!(
            parse("GET / SPDY\r\n\r\n").await,
            Err(RequestError::Malformed("Malformed request line"))
        ));
    }

    #[tokio::test]
    async fn test_closed_and_truncated() {
        assert!(matches!(parse("").await, Err(RequestError::Closed)));
        assert!(matches!(
            parse("POST /connect HTTP/1.1\r\nContent-Length: 10\r\n\r\n{}").await,
            Err(RequestError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_body_limits() {
        let raw = format!(
            "POST /connect HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_LENGTH + 1
        );
        assert!(matches!(
            parse(&raw).await,
            Err(RequestError::Malformed("Request body too large"))
        ));
        assert!(matches!(
            parse("POST /connect HTTP/1.1\r\nContent-Length: ten\r\n\r\n").await,
            Err(RequestError::Malformed("Invalid Content-Length"))
        ));
    }

    #[tokio::test]
    async fn test_bad_header_lines() {
        let raw: &[u8] = b"GET /gamestate HTTP/1.1\r\nX-Player-ID: \xff\xfe\r\n\r\n";
        let mut reader = tokio::io::BufReader::new(raw);
        assert!(matches!(
            read_request(&mut reader).await,
            Err(RequestError::Malformed("Malformed request header"))
        ));

        let raw = format!(
            "GET /gamestate HTTP/1.1\r\nX-Padding: {}\r\n\r\n",
            "x".repeat(utils::MAX_LINE_LENGTH)
        );
        assert!(matches!(
            parse(&raw).await,
            Err(RequestError::Malformed("Request header too large"))
        ));
    }

    #[test]
    fn test_response_bytes() {
        let response = Response::error(404, "Endpoint /nope not found");
        let text = String::from_utf8(response.to_bytes()).unwrap();
        let (head, body) = text.split_once("\r\n\r\n").unwrap();

        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(head.contains("Connection: close"));
        assert!(head.contains("Content-Type: application/json"));
        assert!(head.contains("Date: "));
        assert!(head.contains(&format!("Content-Length: {}", body.len())));
        assert_eq!(body, r#"{"error":"Endpoint /nope not found"}"#);
    }
}
