//! A minimal OBS WebSocket v5 server for tests.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::{WebSocketStream, accept_async};

use crate::constants::PLAYBACK_SOURCE_NAME;
use crate::models::ConnectionParams;

const SALT: &str = "c2FsdA==";
const CHALLENGE: &str = "Y2hhbGxlbmdl";
const SCENE_UUID: &str = "3f2b8c1e-5d4a-4b7e-9c61-0a8d2e4f6b13";
const INPUT_UUID: &str = "9a7c5e3b-1d2f-4a6b-8c0e-2f4d6b8a0c1e";

type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

#[derive(Clone, Default)]
pub struct Script {
    pub password: Option<String>,
    pub responses: HashMap<String, Value>,
    pub failures: HashMap<String, (u16, String)>,
    /// Request types that never get an answer.
    pub silent: HashSet<String>,
    pub close_after_identify: bool,
}

impl Script {
    pub fn respond(mut self, request_type: &str, data: Value) -> Self {
        self.responses.insert(request_type.to_string(), data);
        self
    }

    pub fn fail(mut self, request_type: &str, code: u16, comment: &str) -> Self {
        self.failures
            .insert(request_type.to_string(), (code, comment.to_string()));
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn silent(mut self, request_type: &str) -> Self {
        self.silent.insert(request_type.to_string());
        self
    }

    pub fn close_after_identify(mut self) -> Self {
        self.close_after_identify = true;
        self
    }

    /// Replies for a fresh OBS with an inactive replay buffer and no playback source.
    pub fn studio() -> Self {
        Self::default()
            .respond("GetReplayBufferStatus", json!({ "outputActive": false }))
            .respond("GetInputList", json!({ "inputs": [] }))
            .respond(
                "GetCurrentProgramScene",
                json!({ "sceneName": "Game", "sceneUuid": SCENE_UUID }),
            )
            .respond(
                "CreateInput",
                json!({ "inputUuid": INPUT_UUID, "sceneItemId": 7 }),
            )
            .respond(
                "GetSceneItemList",
                json!({ "sceneItems": [
                    scene_item("Camera", 1, 0),
                    scene_item(PLAYBACK_SOURCE_NAME, 7, 1),
                ]}),
            )
    }
}

pub fn scene_item(source_name: &str, id: i64, index: u32) -> Value {
    json!({
        "sceneItemId": id,
        "sceneItemIndex": index,
        "sourceName": source_name,
        "sourceType": "OBS_SOURCE_TYPE_INPUT",
        "inputKind": "vlc_source",
    })
}

pub fn vlc_input(name: &str) -> Value {
    json!({
        "inputName": name,
        "inputUuid": INPUT_UUID,
        "inputKind": "vlc_source",
        "unversionedInputKind": "vlc_source",
    })
}

/// `base64(sha256(base64(sha256(password + salt)) + challenge))`
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(Sha256::digest(format!("{password}{salt}")));
    STANDARD.encode(Sha256::digest(format!("{secret}{challenge}")))
}

fn version_info() -> Value {
    json!({
        "obsVersion": "30.2.3",
        "obsWebSocketVersion": "5.5.2",
        "rpcVersion": 1,
        "availableRequests": [],
        "supportedImageFormats": ["png"],
        "platform": "ubuntu",
        "platformDescription": "Ubuntu 24.04",
    })
}

pub struct FakeObs {
    pub addr: SocketAddr,
    requests: Recorded,
    events: mpsc::UnboundedSender<Value>,
    task: JoinHandle<()>,
}

impl FakeObs {
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Recorded = Arc::new(Mutex::new(Vec::new()));
        let (events, mut events_rx) = mpsc::unbounded_channel();

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                serve(stream, &script, &recorded, &mut events_rx).await;
            }
        });

        Self {
            addr,
            requests,
            events,
            task,
        }
    }

    pub fn params(&self, password: Option<&str>) -> ConnectionParams {
        ConnectionParams {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            password: password.map(str::to_string),
        }
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_types(&self) -> Vec<String> {
        self.requests().into_iter().map(|(kind, _)| kind).collect()
    }

    pub fn push_event(&self, event_type: &str, data: Value) {
        self.events
            .send(json!({
                "eventType": event_type,
                "eventIntent": 64,
                "eventData": data,
            }))
            .unwrap();
    }

    pub async fn wait_for_request(&self, request_type: &str, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        while tokio::time::Instant::now() < deadline {
            if self.request_types().iter().any(|kind| kind == request_type) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

impl Drop for FakeObs {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    stream: TcpStream,
    script: &Script,
    recorded: &Recorded,
    events: &mut mpsc::UnboundedReceiver<Value>,
) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    let mut hello = json!({ "obsWebSocketVersion": "5.5.2", "rpcVersion": 1 });
    if script.password.is_some() {
        hello["authentication"] = json!({ "challenge": CHALLENGE, "salt": SALT });
    }
    if send(&mut ws, 0, hello).await.is_err() {
        return;
    }

    let Some(identify) = next_json(&mut ws).await else {
        return;
    };
    if let Some(password) = &script.password {
        let expected = auth_response(password, SALT, CHALLENGE);
        if identify["d"]["authentication"].as_str() != Some(expected.as_str()) {
            let _ = ws
                .send(Message::Close(Some(CloseFrame {
                    code: CloseCode::from(4009),
                    reason: "Authentication failed.".into(),
                })))
                .await;
            return;
        }
    }
    if send(&mut ws, 2, json!({ "negotiatedRpcVersion": 1 }))
        .await
        .is_err()
    {
        return;
    }
    if script.close_after_identify {
        let _ = ws
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::from(1001),
                reason: "OBS is shutting down.".into(),
            })))
            .await;
        return;
    }

    loop {
        tokio::select! {
            message = ws.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let Ok(request) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    let Some(reply) = respond(script, recorded, &request["d"]) else {
                        continue;
                    };
                    if send(&mut ws, 7, reply).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
            Some(event) = events.recv() => {
                if send(&mut ws, 5, event).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// GetVersion is answered but not recorded: every client sends it on connect.
fn respond(script: &Script, recorded: &Recorded, request: &Value) -> Option<Value> {
    let request_type = request["requestType"].as_str().unwrap_or_default().to_string();
    let data = request.get("requestData").cloned().unwrap_or(Value::Null);
    if request_type != "GetVersion" {
        recorded
            .lock()
            .unwrap()
            .push((request_type.clone(), data));
    }
    if script.silent.contains(&request_type) {
        return None;
    }

    let mut reply = json!({
        "requestType": request_type,
        "requestId": request["requestId"],
    });
    match script.failures.get(&request_type) {
        Some((code, comment)) => {
            reply["requestStatus"] = json!({ "result": false, "code": code, "comment": comment });
        }
        None => {
            reply["requestStatus"] = json!({ "result": true, "code": 100 });
            if let Some(data) = script.responses.get(&request_type) {
                reply["responseData"] = data.clone();
            } else if request_type == "GetVersion" {
                reply["responseData"] = version_info();
            }
        }
    }
    Some(reply)
}

async fn send(
    ws: &mut WebSocketStream<TcpStream>,
    op: u8,
    d: Value,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    ws.send(Message::text(json!({ "op": op, "d": d }).to_string()))
        .await
}

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Option<Value> {
    while let Some(Ok(message)) = ws.next().await {
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_matches_reference_vector() {
        assert_eq!(
            auth_response(
                "supersecretpassword",
                "lM1GncleQOaCu9lT1yeUZhFYnqhsLLP1G5lAGo3ixaI=",
                "+IxH4CnCiqpX1rM9scsNynZzbOe4KhDeYcTNS3PDaeY=",
            ),
            "1Ct943GAT+6YQUUX47Ia/ncufilbe6+oD6lY+5kaCu4="
        );
    }
}
