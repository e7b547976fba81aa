//! # 手組みHTTP/1.1トランスポート
//!
//! TCPストリーム上にHTTP/1.1リクエストを直接フレーミングする。
//! リクエスト全体（リクエスト行 + ヘッダ + ボディ）を1回の書き込みで
//! 送信し、レスポンスを読む。ボディの境界は `Content-Length` ヘッダ
//! （大文字小文字を区別しない）で決定し、宣言された長さに達するまで
//! 追加読みする。ヘッダが無い場合は最初の読みで完結とみなす。

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::{HttpResponse, Transport, TransportError};

const READ_CHUNK: usize = 8192;

/// 生ソケット上の手組みHTTP/1.1トランスポート。リクエストごとに接続する。
pub struct RawSocketTransport {
    host: String,
    port: u16,
    timeout: Duration,
}

impl RawSocketTransport {
    /// 宛先ホストとポートに対するトランスポートを作る。
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(120),
        }
    }

    fn connect(&self) -> Result<TcpStream, TransportError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        Ok(stream)
    }

    fn send(&self, request: &[u8]) -> Result<HttpResponse, TransportError> {
        let mut stream = self.connect()?;
        // リクエスト全体を1回の書き込みで送る
        stream.write_all(request)?;
        stream.flush()?;
        read_response(&mut stream)
    }

    fn format_request(&self, method: &str, path: &str, body: &[u8]) -> Vec<u8> {
        let head = format!(
            "{method} {path} HTTP/1.1\r\nHost: {host}\r\nContent-Type: application/json\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n",
            host = self.host,
            len = body.len(),
        );
        let mut request = Vec::with_capacity(head.len() + body.len());
        request.extend_from_slice(head.as_bytes());
        request.extend_from_slice(body);
        request
    }
}

impl Transport for RawSocketTransport {
    fn post(&mut self, path: &str, body: &[u8]) -> Result<HttpResponse, TransportError> {
        tracing::debug!(host = %self.host, port = self.port, path = %path, bytes = body.len(), "生ソケットでPOSTします");
        self.send(&self.format_request("POST", path, body))
    }

    fn get(&mut self, path: &str) -> Result<HttpResponse, TransportError> {
        self.send(&self.format_request("GET", path, &[]))
    }
}

/// ストリームからHTTPレスポンスを読み取り、ステータスとボディに分解する。
fn read_response(stream: &mut impl Read) -> Result<HttpResponse, TransportError> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    // まずヘッダ終端（CRLF CRLF）が現れるまで読む
    let header_end = loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            match find_header_end(&raw) {
                Some(end) => break end,
                None => {
                    return Err(TransportError::MalformedResponse(
                        "ヘッダ終端の前にストリームが閉じられました".to_string(),
                    ))
                }
            }
        }
        raw.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&raw) {
            break end;
        }
    };

    let head = std::str::from_utf8(&raw[..header_end])
        .map_err(|_| TransportError::MalformedResponse("ヘッダがUTF-8ではありません".to_string()))?
        .to_string();
    let status = parse_status_line(&head)?;
    let declared_len = content_length(&head)?;

    let body_start = header_end + 4;
    match declared_len {
        Some(len) => {
            // 宣言された長さに達するまで追加読みする（上限は宣言値）
            while raw.len() - body_start < len {
                let n = stream.read(&mut chunk)?;
                if n == 0 {
                    return Err(TransportError::MalformedResponse(format!(
                        "ボディが宣言長より短く終了しました: {} / {len} バイト",
                        raw.len() - body_start,
                    )));
                }
                raw.extend_from_slice(&chunk[..n]);
            }
            let body = raw[body_start..body_start + len].to_vec();
            Ok(HttpResponse { status, body })
        }
        // Content-Lengthが無い場合は最初の読みで完結したとみなす
        None => Ok(HttpResponse { status, body: raw[body_start..].to_vec() }),
    }
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

/// ステータス行（`HTTP/1.1 200 OK`）からコードを取り出す。
fn parse_status_line(head: &str) -> Result<u16, TransportError> {
    let line = head
        .lines()
        .next()
        .ok_or_else(|| TransportError::MalformedResponse("ステータス行がありません".to_string()))?;
    let code = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| TransportError::MalformedResponse(format!("ステータス行が不正です: {line}")))?;
    code.parse::<u16>()
        .map_err(|_| TransportError::MalformedResponse(format!("ステータスコードが不正です: {code}")))
}

/// `Content-Length` ヘッダを大文字小文字を区別せずに探す。
fn content_length(head: &str) -> Result<Option<usize>, TransportError> {
    for line in head.lines().skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let len = value.trim().parse::<usize>().map_err(|_| {
                    TransportError::MalformedResponse(format!(
                        "Content-Lengthが不正です: {}",
                        value.trim()
                    ))
                })?;
                return Ok(Some(len));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn response_bytes(head: &str, body: &[u8]) -> Vec<u8> {
        let mut raw = head.as_bytes().to_vec();
        raw.extend_from_slice(body);
        raw
    }

    /// Content-Length付きレスポンスのボディ境界が正しく決まることを確認する
    #[test]
    fn test_read_response_with_content_length() {
        let raw = response_bytes(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\n",
            b"pongEXTRA",
        );
        let response = read_response(&mut Cursor::new(raw)).unwrap();
        assert_eq!(response.status, 200);
        // 宣言長を超えた分は無視される
        assert_eq!(response.body, b"pong");
    }

    /// ヘッダ名の大文字小文字が無視されることを確認する
    #[test]
    fn test_content_length_case_insensitive() {
        let raw = response_bytes(
            "HTTP/1.1 200 OK\r\ncontent-LENGTH: 2\r\n\r\n",
            b"ok",
        );
        let response = read_response(&mut Cursor::new(raw)).unwrap();
        assert_eq!(response.body, b"ok");
    }

    /// Content-Lengthなしの場合、読めた分がそのままボディになることを確認する
    #[test]
    fn test_read_response_without_content_length() {
        let raw = response_bytes("HTTP/1.1 204 No Content\r\n\r\n", b"tail");
        let response = read_response(&mut Cursor::new(raw)).unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(response.body, b"tail");
    }

    /// 宣言長より短いボディがフレーミングエラーになることを確認する
    #[test]
    fn test_truncated_body_is_malformed() {
        let raw = response_bytes(
            "HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n",
            b"shor",
        );
        assert!(matches!(
            read_response(&mut Cursor::new(raw)),
            Err(TransportError::MalformedResponse(_))
        ));
    }

    /// 不正なステータス行がエラーになることを確認する
    #[test]
    fn test_malformed_status_line() {
        let raw = response_bytes("GARBAGE\r\n\r\n", b"");
        assert!(matches!(
            read_response(&mut Cursor::new(raw)),
            Err(TransportError::MalformedResponse(_))
        ));
    }

    /// リクエストのフレーミング（1書き込み分のバイト列）を確認する
    #[test]
    fn test_format_request_framing() {
        let transport = RawSocketTransport::new("example.org", 12345);
        let request = transport.format_request("POST", "/new", b"{\"a\":1}");
        let text = String::from_utf8(request).unwrap();
        assert!(text.starts_with("POST /new HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.org\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.contains("Content-Length: 7\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"a\":1}"));
    }

    /// 実ソケット経由の送受信を確認する（分割書き込みされたレスポンス）
    #[test]
    fn test_send_over_tcp_with_split_response() {
        use std::io::Write as _;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let n = socket.read(&mut buf).unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).into_owned();

            // ヘッダとボディを分割して書き、追加読みの経路を通す
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello")
                .unwrap();
            socket.flush().unwrap();
            std::thread::sleep(Duration::from_millis(20));
            socket.write_all(b" world").unwrap();
            request
        });

        let mut transport = RawSocketTransport::new("127.0.0.1", port);
        let response = transport.post("/new", b"{\"id\":\"12345\"}").unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"hello world");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /new HTTP/1.1\r\n"));
        assert!(request.contains("Content-Length: 14\r\n"));
        assert!(request.ends_with("{\"id\":\"12345\"}"));
    }

    /// pingのデフォルト実装がpongボディを受理することを確認する
    #[test]
    fn test_ping_roundtrip() {
        use std::io::Write as _;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\npong")
                .unwrap();
        });

        let mut transport = RawSocketTransport::new("127.0.0.1", port);
        transport.ping().unwrap();
    }
}
