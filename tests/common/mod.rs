//! Purpose: Loopback HTTP stub standing in for the platform API in integration tests.
//! Exports: `StubServer`, `Recorded`, `TestResult`, `item`, `items`.
//! Role: Serves canned JSON responses in order and records every request it saw.
//! Invariants: Loopback-only; one connection per request (`Connection: close`).
//! Invariants: The server thread exits after its last canned response.
#![allow(dead_code)]

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

struct Reply {
    status: u16,
    declared_len: usize,
    payload: String,
}

pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: Option<JoinHandle<()>>,
}

impl StubServer {
    /// Serve `responses` (status, body) to successive requests.
    pub fn start(responses: Vec<(u16, Value)>) -> TestResult<Self> {
        let mut replies = Vec::with_capacity(responses.len());
        for (status, body) in responses {
            let payload = serde_json::to_string(&body)?;
            replies.push(Reply {
                status,
                declared_len: payload.len(),
                payload,
            });
        }
        Self::serve(replies)
    }

    /// Answer one request with a 200 that promises `declared_len` bytes but
    /// sends only `payload` before closing the connection.
    pub fn start_truncated(declared_len: usize, payload: &str) -> TestResult<Self> {
        Self::serve(vec![Reply {
            status: 200,
            declared_len,
            payload: payload.to_string(),
        }])
    }

    fn serve(replies: Vec<Reply>) -> TestResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = std::thread::spawn(move || {
            for reply in replies {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                if let Ok(request) = handle_connection(stream, &reply) {
                    recorded
                        .lock()
                        .unwrap_or_else(|poison| poison.into_inner())
                        .push(request);
                }
            }
        });
        Ok(Self {
            addr,
            requests,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Wait for the canned responses to be used up, then return what was seen.
    pub fn finish(mut self) -> Vec<Recorded> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.requests()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

fn handle_connection(stream: TcpStream, reply: &Reply) -> TestResult<Recorded> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse()?,
                "authorization" => authorization = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let mut raw = vec![0u8; content_length];
    reader.read_exact(&mut raw)?;
    let request_body = if raw.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&raw)?)
    };

    let reason = if reply.status < 400 { "OK" } else { "Error" };
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status, reply.declared_len, reply.payload
    )?;
    stream.flush()?;
    let _ = stream.shutdown(std::net::Shutdown::Both);

    Ok(Recorded {
        method,
        path,
        authorization,
        body: request_body,
    })
}

pub fn item(guid: &str) -> Value {
    json!({
        "title": "Example Title",
        "date": "2010-01-26T16:14:00+00:00",
        "guid": guid,
        "author": "me",
        "contents": "Example content",
        "language": "en"
    })
}

pub fn items(count: usize) -> Vec<Value> {
    (0..count).map(|n| item(&format!("post{n}"))).collect()
}
