use sage::config::Config;
use sage::client::HttpChatBackend;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CHAT_PATH: &str = "/api/v1/chat";

/// Text parts only, the way the chat service streams an answer
pub fn text_parts(fragments: &[&str]) -> String {
    fragments
        .iter()
        .map(|fragment| format!("0:{}\n", serde_json::to_string(fragment).unwrap()))
        .collect()
}

/// Text parts closed by a finish part
pub fn data_stream(fragments: &[&str]) -> String {
    let mut body = text_parts(fragments);
    body.push_str("d:{\"finishReason\":\"stop\"}\n");
    body
}

/// Serve one request: send `first_chunk` of a chunked body, then go silent
/// for `stall` without closing the response.
///
/// Returns the endpoint URL.
pub async fn stalling_server(first_chunk: &str, stall: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let chunk = first_chunk.to_string();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/plain; charset=utf-8\r\ntransfer-encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
            chunk.len(),
            chunk
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(stall).await;
    });

    format!("http://{}{}", addr, CHAT_PATH)
}

/// Read request headers and a content-length body
async fn read_request(socket: &mut TcpStream) {
    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        received.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&received).to_string();
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= header_end + 4 + content_length {
            return;
        }
    }
}

/// Mock chat service for exercising the HTTP backend
pub struct ChatMockServer {
    server: MockServer,
}

impl ChatMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            api_url: format!("{}{}", self.server.uri(), CHAT_PATH),
            ..Config::default()
        }
    }

    pub fn backend(&self) -> HttpChatBackend {
        HttpChatBackend::new(&self.config()).unwrap()
    }

    pub fn backend_with_timeout(&self, secs: u64) -> HttpChatBackend {
        let config = Config {
            request_timeout_secs: secs,
            ..self.config()
        };
        HttpChatBackend::new(&config).unwrap()
    }

    /// Mock a successful streamed answer
    pub async fn mock_answer(&self, fragments: &[&str]) {
        self.mock_raw(ResponseTemplate::new(200).set_body_string(data_stream(fragments)))
            .await;
    }

    /// Mock an answer that starts only after `delay`
    pub async fn mock_slow_answer(&self, fragments: &[&str], delay: Duration) {
        self.mock_raw(
            ResponseTemplate::new(200)
                .set_body_string(data_stream(fragments))
                .set_delay(delay),
        )
        .await;
    }

    /// Mock an error status with a JSON body
    pub async fn mock_status(&self, status: u16, body: Value) {
        self.mock_raw(ResponseTemplate::new(status).set_body_json(body)).await;
    }

    /// Mock a raw body, malformed or otherwise
    pub async fn mock_body(&self, body: &str) {
        self.mock_raw(ResponseTemplate::new(200).set_body_string(body)).await;
    }

    async fn mock_raw(&self, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(header("content-type", "application/json"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of every request received so far
    pub async fn request_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect()
    }
}
