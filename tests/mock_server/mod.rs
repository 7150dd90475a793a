//! Scripted mock of the Rev.ai streaming endpoint.
//!
//! Accepts a single WebSocket connection, records what the client sends, and
//! plays a fixed script of server actions.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async, tungstenite::Message};
use url::Url;

/// Upper bound on a whole scripted session
const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// One server action.
#[derive(Debug, Clone)]
pub enum Action {
    /// Send a text frame
    SendText(String),
    /// Wait until this many audio frames have arrived in total
    AwaitAudio(usize),
    /// Wait for the `EOS` text frame
    AwaitEndOfStream,
    /// Send a close frame with this code and reason
    Close(u16, String),
}

/// What the client sent.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    /// Request target of the upgrade request (path and query)
    pub uri: Option<String>,
    pub binary_frames: usize,
    pub audio_bytes: usize,
    pub text_frames: Vec<String>,
    pub client_closed: bool,
}

impl Recorded {
    /// Query parameters of the upgrade request, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(uri) = self.uri.as_deref() else {
            return Vec::new();
        };
        let url = Url::parse(&format!("http://localhost{uri}")).unwrap();
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn path(&self) -> Option<String> {
        let uri = self.uri.as_deref()?;
        Some(uri.split('?').next().unwrap_or_default().to_string())
    }
}

pub struct MockStreamServer {
    pub addr: SocketAddr,
    recorded: Arc<Mutex<Recorded>>,
    handle: JoinHandle<()>,
}

impl MockStreamServer {
    /// Bind an ephemeral port and serve one connection with `script`.
    pub async fn start(script: Vec<Action>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let session_record = recorded.clone();
        let handle = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let session = serve(stream, script, session_record);
            if tokio::time::timeout(SESSION_TIMEOUT, session).await.is_err() {
                eprintln!("mock stream session timed out");
            }
        });

        Self {
            addr,
            recorded,
            handle,
        }
    }

    /// Base URL to configure the client with.
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    /// Wait for the session to finish and return what the client sent.
    pub async fn join(self) -> Recorded {
        let _ = tokio::time::timeout(SESSION_TIMEOUT, self.handle).await;
        self.recorded.lock().clone()
    }
}

async fn serve(stream: TcpStream, script: Vec<Action>, recorded: Arc<Mutex<Recorded>>) {
    let uri_record = recorded.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        uri_record.lock().uri = Some(request.uri().to_string());
        Ok(response)
    };

    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    for action in script {
        match action {
            Action::SendText(text) => {
                if write.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
            Action::AwaitAudio(count) => {
                while recorded.lock().binary_frames < count {
                    if !read_one(&mut read, &recorded).await {
                        return;
                    }
                }
            }
            Action::AwaitEndOfStream => {
                while !recorded.lock().text_frames.iter().any(|t| t == "EOS") {
                    if !read_one(&mut read, &recorded).await {
                        return;
                    }
                }
            }
            Action::Close(code, reason) => {
                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: reason.into(),
                };
                let _ = write.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }

    // Keep recording until the client goes away
    while read_one(&mut read, &recorded).await {}
}

/// Record one client frame. Returns false once the client is gone.
async fn read_one(
    read: &mut SplitStream<WebSocketStream<TcpStream>>,
    recorded: &Mutex<Recorded>,
) -> bool {
    match read.next().await {
        Some(Ok(Message::Binary(data))) => {
            let mut recorded = recorded.lock();
            recorded.binary_frames += 1;
            recorded.audio_bytes += data.len();
            true
        }
        Some(Ok(Message::Text(text))) => {
            recorded.lock().text_frames.push(text.as_str().to_string());
            true
        }
        Some(Ok(Message::Close(_))) => {
            recorded.lock().client_closed = true;
            false
        }
        Some(Ok(_)) => true,
        Some(Err(_)) | None => false,
    }
}

pub fn connected(id: &str) -> Action {
    Action::SendText(json!({ "type": "connected", "id": id }).to_string())
}

pub fn partial(ts: f64, words: &[&str]) -> Action {
    let elements: Vec<_> = words
        .iter()
        .map(|w| json!({ "type": "text", "value": w }))
        .collect();
    Action::SendText(json!({ "type": "partial", "ts": ts, "end_ts": ts + 1.0, "elements": elements }).to_string())
}

pub fn final_text(ts: f64, words: &[&str]) -> Action {
    let mut elements = Vec::new();
    for (i, w) in words.iter().enumerate() {
        if i > 0 {
            elements.push(json!({ "type": "punct", "value": " " }));
        }
        elements.push(json!({ "type": "text", "value": w, "ts": ts, "end_ts": ts + 0.5, "confidence": 0.9 }));
    }
    elements.push(json!({ "type": "punct", "value": "." }));
    Action::SendText(json!({ "type": "final", "ts": ts, "end_ts": ts + 2.0, "elements": elements }).to_string())
}

pub fn close(code: u16, reason: &str) -> Action {
    Action::Close(code, reason.to_string())
}
