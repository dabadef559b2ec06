//! Softphone device integration.
//!
//! The provider SDK is opaque to the pipeline; everything here depends on
//! the [`VoiceDevice`] capability interface instead of a concrete SDK type,
//! so a fake device can drive tests and the SDK binding lives entirely
//! behind [`DeviceFactory`]. The device path is optional by design: if
//! initialization fails the rest of the client keeps working, only
//! device-originated calls are disabled.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{OperatorError, OperatorResult};

/// Notifications a registered device emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Device registered and able to place/receive calls
    Ready,
    /// Device-level failure; the device is no longer usable
    Error(String),
    /// An inbound call is ringing on the device itself
    Incoming { from: String, call_sid: String },
    /// Device lost its provider connection
    Disconnected,
}

/// An inbound call observed on the device path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingDeviceCall {
    pub from: String,
    pub call_sid: String,
}

/// Handle to a call placed through the device.
#[derive(Debug, Clone)]
pub struct CallHandle {
    pub call_sid: String,
}

/// Parameters for placing an outbound call.
#[derive(Debug, Clone)]
pub struct CallParams {
    pub to: String,
}

/// Capability interface over the provider softphone SDK.
#[async_trait]
pub trait VoiceDevice: Send + Sync {
    /// Register the device with the provider.
    async fn register(&self) -> OperatorResult<()>;

    /// Place an outbound call.
    async fn connect(&self, params: CallParams) -> OperatorResult<CallHandle>;

    /// Tear the device down. Must be safe to call more than once.
    async fn destroy(&self);
}

/// Builds a device from an access token, yielding the device and its event
/// stream in one step so no notification can be missed.
#[async_trait]
pub trait DeviceFactory: Send + Sync {
    async fn create(
        &self,
        token: &str,
    ) -> OperatorResult<(Box<dyn VoiceDevice>, mpsc::UnboundedReceiver<DeviceEvent>)>;
}

/// Device-originated producer of incoming-call notifications.
///
/// Mirrors the hub transport's surface: `incoming()` is a nullable stream of
/// the latest device ring, `device_ready()` tracks registration state.
pub struct DeviceEventSource {
    http: reqwest::Client,
    factory: Arc<dyn DeviceFactory>,
    device: Mutex<Option<Box<dyn VoiceDevice>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    incoming_tx: Arc<watch::Sender<Option<IncomingDeviceCall>>>,
    incoming_rx: watch::Receiver<Option<IncomingDeviceCall>>,
    ready_tx: Arc<watch::Sender<bool>>,
    ready_rx: watch::Receiver<bool>,
}

impl DeviceEventSource {
    pub fn new(factory: Arc<dyn DeviceFactory>) -> Self {
        let (incoming_tx, incoming_rx) = watch::channel(None);
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            http: reqwest::Client::new(),
            factory,
            device: Mutex::new(None),
            pump: Mutex::new(None),
            incoming_tx: Arc::new(incoming_tx),
            incoming_rx,
            ready_tx: Arc::new(ready_tx),
            ready_rx,
        }
    }

    /// Obtain an access token for `identity` from the hub, build the device
    /// and register it.
    ///
    /// Unlike the hub transport, failures here propagate: the caller decides
    /// whether to run without the device path. A failed init leaves the
    /// source in its initial not-ready state and may be retried.
    pub async fn init(&self, identity: &str, server_addr: &str) -> OperatorResult<()> {
        let token = self.fetch_token(identity, server_addr).await?;
        self.init_with_token(&token).await
    }

    pub(crate) async fn init_with_token(&self, token: &str) -> OperatorResult<()> {
        let (device, events) = self.factory.create(token).await?;
        device.register().await?;

        let incoming_tx = self.incoming_tx.clone();
        let ready_tx = self.ready_tx.clone();
        let pump = tokio::spawn(async move {
            pump_events(events, incoming_tx, ready_tx).await;
        });

        if let Some(old) = self.device.lock().await.replace(device) {
            old.destroy().await;
        }
        if let Some(old) = self.pump.lock().await.replace(pump) {
            old.abort();
        }
        info!("Voice device initialized");
        Ok(())
    }

    async fn fetch_token(&self, identity: &str, server_addr: &str) -> OperatorResult<String> {
        let base = server_addr.trim_end_matches('/');
        let url = format!("{base}/api/twilio/token");
        let response = self
            .http
            .get(&url)
            .query(&[("identity", identity)])
            .send()
            .await
            .map_err(|e| OperatorError::token_fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OperatorError::token_fetch(format!(
                "token endpoint answered {}",
                response.status()
            )));
        }

        let token = response
            .text()
            .await
            .map_err(|e| OperatorError::token_fetch(e.to_string()))?;
        if token.is_empty() {
            return Err(OperatorError::token_fetch("token endpoint answered empty"));
        }
        Ok(token)
    }

    /// Latest inbound ring seen on the device path; `None` until one arrives.
    pub fn incoming(&self) -> watch::Receiver<Option<IncomingDeviceCall>> {
        self.incoming_rx.clone()
    }

    /// Whether the device is registered and usable. Starts `false`.
    pub fn device_ready(&self) -> watch::Receiver<bool> {
        self.ready_rx.clone()
    }

    /// Place an outbound call through the device.
    ///
    /// Fails fast with [`OperatorError::DeviceNotReady`] when the device was
    /// never initialized or has not reported ready.
    pub async fn place_call(&self, to: impl Into<String>) -> OperatorResult<CallHandle> {
        if !*self.ready_rx.borrow() {
            warn!("Rejecting outbound call, device is not ready");
            return Err(OperatorError::DeviceNotReady);
        }
        let device = self.device.lock().await;
        let Some(device) = device.as_ref() else {
            return Err(OperatorError::DeviceNotReady);
        };
        device.connect(CallParams { to: to.into() }).await
    }

    /// Tear down the device and reset ready state. Idempotent.
    pub async fn disconnect(&self) {
        if let Some(device) = self.device.lock().await.take() {
            device.destroy().await;
            info!("Voice device disconnected");
        }
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }
        self.ready_tx.send_replace(false);
    }
}

async fn pump_events(
    mut events: mpsc::UnboundedReceiver<DeviceEvent>,
    incoming_tx: Arc<watch::Sender<Option<IncomingDeviceCall>>>,
    ready_tx: Arc<watch::Sender<bool>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            DeviceEvent::Ready => {
                info!("Voice device is ready");
                ready_tx.send_replace(true);
            }
            DeviceEvent::Error(reason) => {
                warn!(reason = %reason, "Voice device error");
                ready_tx.send_replace(false);
            }
            DeviceEvent::Incoming { from, call_sid } => {
                debug!(from = %from, call_sid = %call_sid, "Incoming call via device");
                incoming_tx.send_replace(Some(IncomingDeviceCall { from, call_sid }));
            }
            DeviceEvent::Disconnected => {
                debug!("Voice device disconnected from provider");
                ready_tx.send_replace(false);
            }
        }
    }
}
