//! WebSocket bridge to the browser extension that evaluates page scripts.
//!
//! The extension connects as a client and answers `eval` requests in the
//! active tab. Requests are matched to replies by id.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ExportError;

pub const DEFAULT_WS_ADDR: &str = "127.0.0.1:17373";

type BridgeResult = Result<serde_json::Value, String>;
type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<BridgeResult>>>>;
type Clients = Arc<Mutex<Vec<Client>>>;

#[derive(Debug, Serialize, Deserialize)]
struct EvalRequest {
    id: String,
    action: String,
    code: String,
    #[serde(default)]
    await_promise: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum BridgeIncoming {
    EvalResult {
        id: String,
        ok: bool,
        result: Option<serde_json::Value>,
        error: Option<String>,
    },
    Typed(TypedIncoming),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum TypedIncoming {
    #[serde(rename = "hello")]
    Hello { from: Option<String> },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "console_event")]
    ConsoleEvent {
        level: Option<String>,
        args: Option<serde_json::Value>,
    },
}

struct Client {
    sender: mpsc::UnboundedSender<Message>,
}

pub struct PageBridge {
    addr: SocketAddr,
    _server_task: JoinHandle<()>,
    clients: Clients,
    pending: Pending,
}

static GLOBAL: OnceCell<Arc<PageBridge>> = OnceCell::new();

impl PageBridge {
    /// Process-wide bridge on [`DEFAULT_WS_ADDR`]
    pub async fn global() -> Result<Arc<PageBridge>, ExportError> {
        if let Some(bridge) = GLOBAL.get() {
            return Ok(bridge.clone());
        }
        let bridge = PageBridge::bind(DEFAULT_WS_ADDR).await?;
        Ok(GLOBAL.get_or_init(|| bridge).clone())
    }

    /// Listen for the extension on `addr`
    pub async fn bind(addr: &str) -> Result<Arc<PageBridge>, ExportError> {
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                warn!(%addr, ?e, "Port in use, waiting 2 seconds and retrying once...");
                tokio::time::sleep(Duration::from_secs(2)).await;
                TcpListener::bind(addr).await.map_err(|e2| {
                    ExportError::BridgeUnavailable(format!("failed to bind {addr}: {e2}"))
                })?
            }
            Err(e) => {
                return Err(ExportError::BridgeUnavailable(format!(
                    "failed to bind {addr}: {e}"
                )))
            }
        };
        let local = listener.local_addr()?;
        info!("Extension bridge listening on {}", local);

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let server_task = tokio::spawn(accept_loop(listener, clients.clone(), pending.clone()));

        Ok(Arc::new(PageBridge {
            addr: local,
            _server_task: server_task,
            clients,
            pending,
        }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn is_client_connected(&self) -> bool {
        !self.clients.lock().await.is_empty()
    }

    /// Poll until the extension connects or `timeout` elapses
    pub async fn wait_for_client(&self, timeout: Duration) -> Result<(), ExportError> {
        let step = Duration::from_millis(500);
        let mut waited = Duration::ZERO;
        while !self.is_client_connected().await {
            if waited >= timeout {
                return Err(ExportError::BridgeUnavailable(format!(
                    "extension did not connect within {}s; make sure it is installed and enabled",
                    timeout.as_secs()
                )));
            }
            if waited.as_millis() % 3000 == 0 && !waited.is_zero() {
                info!("Still waiting for extension client... {}s", waited.as_secs());
            }
            tokio::time::sleep(step).await;
            waited += step;
        }
        Ok(())
    }

    /// Evaluate `code` in the active tab and return its result.
    ///
    /// String results are returned as-is, anything else as JSON text. A
    /// script that throws becomes [`ExportError::ScriptError`].
    pub async fn eval(&self, code: &str, timeout: Duration) -> Result<String, ExportError> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel::<BridgeResult>();
        self.pending.lock().await.insert(id.clone(), tx);

        let payload = serde_json::to_string(&EvalRequest {
            id: id.clone(),
            action: "eval".into(),
            code: code.to_string(),
            await_promise: true,
        })?;

        let sent = {
            let clients = self.clients.lock().await;
            debug!(clients = clients.len(), preview = %payload.chars().take(120).collect::<String>(), "Sending eval to extension");
            clients
                .first()
                .map(|c| c.sender.send(Message::Text(payload)).is_ok())
                .unwrap_or(false)
        };
        if !sent {
            self.pending.lock().await.remove(&id);
            return Err(ExportError::BridgeUnavailable(
                "no extension client connected".into(),
            ));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            Ok(Ok(Err(err))) => Err(ExportError::ScriptError(describe_script_error(&err))),
            Ok(Err(_canceled)) => Err(ExportError::BridgeUnavailable(
                "extension disconnected before replying".into(),
            )),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                Err(ExportError::Timeout(format!(
                    "no eval result within {}ms (id={id})",
                    timeout.as_millis()
                )))
            }
        }
    }
}

/// Structured `{message, code}` errors are flattened, raw text is truncated
fn describe_script_error(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(val) => {
            let msg = val
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("JavaScript execution error");
            let code = val
                .get("code")
                .and_then(|v| v.as_str())
                .unwrap_or("EVAL_ERROR");
            format!("{msg} ({code})")
        }
        Err(_) => raw.chars().take(400).collect(),
    }
}

async fn accept_loop(listener: TcpListener, clients: Clients, pending: Pending) {
    loop {
        let (stream, _peer) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                warn!("ws accept error: {}", e);
                continue;
            }
        };
        let clients = clients.clone();
        let pending = pending.clone();
        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("ws handshake error: {}", e);
                    return;
                }
            };
            let (mut sink, mut stream) = ws_stream.split();
            let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

            let writer = tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    if let Err(e) = sink.send(msg).await {
                        warn!("ws send error: {}", e);
                        break;
                    }
                }
            });

            clients.lock().await.push(Client { sender: tx.clone() });

            while let Some(Ok(msg)) = stream.next().await {
                if !msg.is_text() {
                    continue;
                }
                let txt = msg.into_text().unwrap_or_default();
                handle_incoming(&txt, &pending).await;
            }

            // Drop this client so evals stop targeting a dead socket
            clients.lock().await.retain(|c| !c.sender.same_channel(&tx));
            info!("Extension disconnected");
            writer.abort();
        });
    }
}

async fn handle_incoming(txt: &str, pending: &Pending) {
    match serde_json::from_str::<BridgeIncoming>(txt) {
        Ok(BridgeIncoming::EvalResult {
            id,
            ok,
            result,
            error,
        }) => {
            if ok {
                let size = result.as_ref().map(|r| r.to_string().len()).unwrap_or(0);
                debug!(id = %id, result_size = size, "Bridge received EvalResult");
            } else {
                error!(id = %id, error = ?error, "Bridge received EvalResult error");
            }
            if let Some(tx) = pending.lock().await.remove(&id) {
                let _ = tx.send(if ok {
                    Ok(result.unwrap_or(serde_json::Value::Null))
                } else {
                    Err(error.unwrap_or_else(|| "unknown error".into()))
                });
            }
        }
        Ok(BridgeIncoming::Typed(TypedIncoming::ConsoleEvent { level, args })) => {
            let args = args.map(|v| v.to_string()).unwrap_or_else(|| "[]".into());
            match level.as_deref() {
                Some("error") => error!(args = %args, "Page console error"),
                Some("warning") | Some("warn") => warn!(args = %args, "Page console warning"),
                _ => debug!(args = %args, "Page console"),
            }
        }
        Ok(BridgeIncoming::Typed(TypedIncoming::Hello { from })) => {
            info!(from = ?from, "Extension connected");
        }
        Ok(BridgeIncoming::Typed(TypedIncoming::Pong)) => {}
        Err(e) => warn!("Invalid incoming JSON: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_script_errors_are_flattened() {
        let raw = r#"{"message":"document is not defined","code":"REFERENCE_ERROR"}"#;
        assert_eq!(
            describe_script_error(raw),
            "document is not defined (REFERENCE_ERROR)"
        );
    }

    #[test]
    fn raw_script_errors_are_truncated() {
        let raw = "x".repeat(1000);
        assert_eq!(describe_script_error(&raw).len(), 400);
    }

    #[tokio::test]
    async fn eval_without_client_reports_unavailable() {
        let bridge = PageBridge::bind("127.0.0.1:0").await.unwrap();
        assert!(!bridge.is_client_connected().await);
        let err = bridge
            .eval("1 + 1", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::BridgeUnavailable(_)));
    }
}
