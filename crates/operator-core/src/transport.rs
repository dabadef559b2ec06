//! Persistent connection to the call hub.
//!
//! `HubTransport` keeps one logical connection to the hub's `/hubs/calls`
//! endpoint alive for the life of the client. Running with no reachable hub
//! is a first-class mode: connection failures are logged and retried on a
//! backoff schedule, never surfaced to the caller: the incoming-call stream
//! simply stays empty until a connection succeeds. Events published while
//! disconnected are gone; there is no replay across reconnects.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use callpop_call_events::{CallArrivalEvent, ClientMessage, ServerMessage};

/// Retry delays after a failed or dropped connection. The schedule restarts
/// from the top after every successful connection, and the final delay
/// repeats indefinitely.
const RECONNECT_SCHEDULE: [Duration; 3] = [
    Duration::ZERO,
    Duration::from_secs(2),
    Duration::from_secs(10),
];

type HubSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client transport for the hub's event channel.
pub struct HubTransport {
    group: Option<String>,
    incoming_tx: Option<watch::Sender<Option<CallArrivalEvent>>>,
    incoming_rx: watch::Receiver<Option<CallArrivalEvent>>,
    connected_tx: Arc<watch::Sender<bool>>,
    connected_rx: watch::Receiver<bool>,
    task: Option<JoinHandle<()>>,
}

impl HubTransport {
    /// Create a transport that has not yet been started. The incoming-call
    /// stream starts out holding `None`.
    pub fn new() -> Self {
        let (incoming_tx, incoming_rx) = watch::channel(None);
        let (connected_tx, connected_rx) = watch::channel(false);
        Self {
            group: None,
            incoming_tx: Some(incoming_tx),
            incoming_rx,
            connected_tx: Arc::new(connected_tx),
            connected_rx,
            task: None,
        }
    }

    /// Join an ad-hoc fan-out group right after each (re)connect.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Begin connecting to the hub at `server_addr` (an `http://host:port`
    /// base). Returns immediately; reconnection is automatic and a hub that
    /// never becomes reachable only means no events are delivered.
    ///
    /// Calling `start` again, or after [`stop`](Self::stop), is a no-op.
    pub fn start(&mut self, server_addr: &str) {
        if self.task.is_some() {
            return;
        }
        let Some(incoming_tx) = self.incoming_tx.take() else {
            return;
        };

        let url = hub_url(server_addr);
        let group = self.group.clone();
        let connected_tx = self.connected_tx.clone();

        info!(url = %url, "Starting hub transport");
        self.task = Some(tokio::spawn(async move {
            connection_loop(url, group, incoming_tx, connected_tx).await;
        }));
    }

    /// Stream of received call events, newest value wins; `None` until the
    /// first event arrives.
    pub fn incoming_call(&self) -> watch::Receiver<Option<CallArrivalEvent>> {
        self.incoming_rx.clone()
    }

    /// Whether a hub connection is currently established.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// Release the connection. Idempotent, and safe even if no connection
    /// attempt ever succeeded; no events are delivered afterwards.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.connected_tx.send_replace(false);
            info!("Hub transport stopped");
        }
    }
}

impl Default for HubTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HubTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Derive the websocket endpoint from an HTTP base address.
fn hub_url(server_addr: &str) -> String {
    let base = server_addr.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        format!("ws://{base}")
    };
    format!("{base}/hubs/calls")
}

async fn connection_loop(
    url: String,
    group: Option<String>,
    incoming_tx: watch::Sender<Option<CallArrivalEvent>>,
    connected_tx: Arc<watch::Sender<bool>>,
) {
    let mut attempt: usize = 0;

    loop {
        let delay = RECONNECT_SCHEDULE[attempt.min(RECONNECT_SCHEDULE.len() - 1)];
        if !delay.is_zero() {
            sleep(delay).await;
        }
        attempt += 1;

        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(url = %url, "Hub connected");
                attempt = 0;
                connected_tx.send_replace(true);

                run_connection(socket, group.as_deref(), &incoming_tx).await;

                connected_tx.send_replace(false);
                warn!(url = %url, "Hub connection lost, reconnecting");
            }
            Err(e) => {
                // Backend unavailable: keep working in demo mode and retry.
                debug!(url = %url, error = %e, next_retry = ?RECONNECT_SCHEDULE[attempt.min(RECONNECT_SCHEDULE.len() - 1)], "Hub connection failed");
                if attempt == 1 {
                    warn!("Hub unreachable, operating in demo mode until it comes back");
                }
            }
        }
    }
}

async fn run_connection(
    socket: HubSocket,
    group: Option<&str>,
    incoming_tx: &watch::Sender<Option<CallArrivalEvent>>,
) {
    let (mut tx, mut rx) = socket.split();

    if let Some(group) = group {
        let join = ClientMessage::JoinGroup {
            group: group.to_string(),
        };
        match serde_json::to_string(&join) {
            Ok(json) => {
                if tx.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize joinGroup"),
        }
    }

    while let Some(result) = rx.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(text.as_str()) {
                Ok(ServerMessage::IncomingCall(event)) => {
                    debug!(call_sid = %event.call_sid, from = %event.from_number, "Incoming call received");
                    incoming_tx.send_replace(Some(event));
                }
                Err(e) => {
                    warn!(error = %e, "Unparseable hub frame");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Hub socket error");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_url_maps_schemes() {
        assert_eq!(
            hub_url("http://127.0.0.1:5080"),
            "ws://127.0.0.1:5080/hubs/calls"
        );
        assert_eq!(
            hub_url("https://hub.example.com/"),
            "wss://hub.example.com/hubs/calls"
        );
        assert_eq!(hub_url("127.0.0.1:5080"), "ws://127.0.0.1:5080/hubs/calls");
    }

    #[tokio::test]
    async fn stop_before_any_connection_is_safe() {
        let mut transport = HubTransport::new();
        // Nothing listens here; the transport must swallow the failure.
        transport.start("http://127.0.0.1:9");
        transport.stop();
        transport.stop();

        assert!(transport.incoming_call().borrow().is_none());
        assert!(!*transport.connected().borrow());
    }

    #[tokio::test]
    async fn unreachable_hub_means_no_events_not_errors() {
        let mut transport = HubTransport::new();
        transport.start("http://127.0.0.1:9");

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(transport.incoming_call().borrow().is_none());
        transport.stop();
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let mut transport = HubTransport::new();
        transport.start("http://127.0.0.1:9");
        transport.start("http://127.0.0.1:9");
        transport.stop();
    }
}
