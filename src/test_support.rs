use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Mutex, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use actix_web::dev::ServerHandle;
use actix_web::http::{StatusCode, Version};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};

use crate::adapters::apns::{DeliveryError, NotificationDispatcher};
use crate::adapters::apns_credentials::{CredentialError, CredentialIssuer};
use crate::domain::models::DeliveryReceipt;

const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);

pub enum CannedResponse {
    Reply { status: u16, body: String },
    Stall(Duration),
}

impl CannedResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self::Reply {
            status,
            body: body.to_string(),
        }
    }
}

/// Local HTTP/1.1 responder serving one canned response per connection and
/// recording the raw requests it saw.
pub struct HttpResponder {
    port: u16,
    handle: JoinHandle<Vec<String>>,
}

impl HttpResponder {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn finish(self) -> Vec<String> {
        self.handle.join().expect("responder thread should finish")
    }
}

pub fn spawn_http_responder(responses: Vec<CannedResponse>) -> HttpResponder {
    let listener = TcpListener::bind("127.0.0.1:0").expect("responder should bind");
    listener
        .set_nonblocking(true)
        .expect("listener should switch to non-blocking");
    let port = listener.local_addr().expect("addr should be available").port();

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for response in responses {
            let Some(mut stream) = accept_with_deadline(&listener) else {
                break;
            };
            requests.push(read_request(&mut stream));

            match response {
                CannedResponse::Reply { status, body } => {
                    let payload = format!(
                        "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(payload.as_bytes());
                    let _ = stream.flush();
                }
                CannedResponse::Stall(duration) => thread::sleep(duration),
            }
        }
        requests
    });

    HttpResponder { port, handle }
}

fn accept_with_deadline(listener: &TcpListener) -> Option<TcpStream> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    while Instant::now() < deadline {
        match listener.accept() {
            Ok((stream, _)) => {
                stream
                    .set_nonblocking(false)
                    .expect("stream should switch to blocking");
                return Some(stream);
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(_) => return None,
        }
    }
    None
}

fn read_request(stream: &mut TcpStream) -> String {
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout should be configurable");

    let mut raw = Vec::new();
    let mut buffer = [0_u8; 1024];
    loop {
        let size = match stream.read(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(size) => size,
        };
        raw.extend_from_slice(&buffer[..size]);

        let text = String::from_utf8_lossy(&raw);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let body_len = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.trim()
                        .eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + body_len {
                break;
            }
        }
    }

    String::from_utf8_lossy(&raw).into_owned()
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub version: Version,
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

struct H2cState {
    captured: Mutex<Vec<CapturedRequest>>,
    replies: Mutex<VecDeque<(u16, String)>>,
}

/// Local cleartext HTTP/2 server answering with canned `(status, body)`
/// replies in order, 500 once they run out.
pub struct H2cResponder {
    addr: SocketAddr,
    server: ServerHandle,
    join: JoinHandle<std::io::Result<()>>,
    state: web::Data<H2cState>,
}

impl H2cResponder {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn finish(self) -> Vec<CapturedRequest> {
        actix_web::rt::System::new().block_on(self.server.stop(false));
        self.join
            .join()
            .expect("h2c responder thread should finish")
            .expect("h2c responder should exit cleanly");
        self.state.captured.lock().expect("captured lock").clone()
    }
}

pub fn spawn_h2c_responder(replies: Vec<(u16, &str)>) -> H2cResponder {
    let state = web::Data::new(H2cState {
        captured: Mutex::new(Vec::new()),
        replies: Mutex::new(
            replies
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
        ),
    });
    let server_state = state.clone();
    let (ready_tx, ready_rx) = mpsc::channel();

    let join = thread::spawn(move || {
        actix_web::rt::System::new().block_on(async move {
            let server = HttpServer::new(move || {
                App::new()
                    .app_data(server_state.clone())
                    .default_service(web::to(capture_h2c))
            })
            .workers(1)
            .disable_signals()
            .bind_auto_h2c(("127.0.0.1", 0))?;
            let addr = server.addrs()[0];
            let server = server.run();
            let _ = ready_tx.send((addr, server.handle()));
            server.await
        })
    });

    let (addr, server) = ready_rx
        .recv_timeout(ACCEPT_DEADLINE)
        .expect("h2c responder should start");

    H2cResponder {
        addr,
        server,
        join,
        state,
    }
}

async fn capture_h2c(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<H2cState>,
) -> HttpResponse {
    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect();

    state.captured.lock().expect("captured lock").push(CapturedRequest {
        version: req.version(),
        method: req.method().to_string(),
        path: req.path().to_string(),
        headers,
        body: body.to_vec(),
    });

    let (status, payload) = state
        .replies
        .lock()
        .expect("replies lock")
        .pop_front()
        .unwrap_or((500, String::new()));

    HttpResponse::build(StatusCode::from_u16(status).expect("canned status should be valid"))
        .content_type("application/json")
        .body(payload)
}

pub fn temp_file_path(name: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join(name);
    (dir, path)
}

pub struct StaticCredentials(pub Option<&'static str>);

impl CredentialIssuer for StaticCredentials {
    fn issue(&self) -> Result<String, CredentialError> {
        self.0
            .map(ToString::to_string)
            .ok_or(CredentialError::EmptyKeyId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub device_token: String,
    pub message: String,
    pub credential: String,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<SentNotification>>,
    pub failing_tokens: Vec<String>,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn send(
        &self,
        device_token: &str,
        message: &str,
        credential: &str,
        notification_id: Option<&str>,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        if self.failing_tokens.iter().any(|token| token == device_token) {
            return Err(DeliveryError::InvalidDeviceToken(device_token.to_string()));
        }

        self.sent.lock().expect("sent lock").push(SentNotification {
            device_token: device_token.to_string(),
            message: message.to_string(),
            credential: credential.to_string(),
        });

        Ok(DeliveryReceipt {
            status_code: 200,
            response_body: String::new(),
            notification_id: notification_id.unwrap_or("recorded").to_string(),
        })
    }
}
