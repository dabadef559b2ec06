//! Assembled operator client.
//!
//! Glues the hub transport, the customer lookup, the notification state
//! machine and (optionally) the device event source into one object a UI
//! can own. The device path is best-effort: when its initialization fails
//! the client still starts, with device-originated calls disabled.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::device::{CallHandle, DeviceEventSource, DeviceFactory};
use crate::error::{OperatorError, OperatorResult};
use crate::lookup::CustomerLookup;
use crate::notifier::{CallNotifier, NotificationState};
use crate::transport::HubTransport;

/// One operator session's view of the pipeline.
pub struct OperatorClient {
    transport: HubTransport,
    device: Option<Arc<DeviceEventSource>>,
    notifier: CallNotifier,
}

impl OperatorClient {
    /// Start building a client against a hub base address.
    pub fn builder(server_addr: impl Into<String>) -> OperatorClientBuilder {
        OperatorClientBuilder {
            server_addr: server_addr.into(),
            group: None,
            device: None,
        }
    }

    /// Watchable popup state for the UI.
    pub fn notification_state(&self) -> watch::Receiver<NotificationState> {
        self.notifier.state()
    }

    /// Snapshot of the current popup state.
    pub fn current_state(&self) -> NotificationState {
        self.notifier.current()
    }

    /// Answer the active call.
    pub fn answer(&self) {
        self.notifier.answer();
    }

    /// Decline the active call.
    pub fn decline(&self) {
        self.notifier.decline();
    }

    /// Dismiss the popup.
    pub fn close(&self) {
        self.notifier.close();
    }

    /// Whether the device-originated call path is available.
    pub fn device_available(&self) -> bool {
        self.device.is_some()
    }

    /// Place an outbound call through the device, if the device path came up.
    pub async fn place_call(&self, to: impl Into<String>) -> OperatorResult<CallHandle> {
        match &self.device {
            Some(device) => device.place_call(to).await,
            None => Err(OperatorError::DeviceNotReady),
        }
    }

    /// Shut everything down: transport, device, state machine. Idempotent.
    pub async fn stop(&mut self) {
        self.transport.stop();
        if let Some(device) = &self.device {
            device.disconnect().await;
        }
        self.notifier.shutdown();
    }
}

/// Builder for [`OperatorClient`].
pub struct OperatorClientBuilder {
    server_addr: String,
    group: Option<String>,
    device: Option<(String, Arc<dyn DeviceFactory>)>,
}

impl OperatorClientBuilder {
    /// Join an ad-hoc hub group after connecting.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Enable the device path for `identity`, constructing devices through
    /// `factory`.
    pub fn with_device(
        mut self,
        identity: impl Into<String>,
        factory: Arc<dyn DeviceFactory>,
    ) -> Self {
        self.device = Some((identity.into(), factory));
        self
    }

    /// Start the client. Never fails: an unreachable hub leaves the
    /// transport retrying in demo mode, and a failed device init only
    /// disables the device path.
    pub async fn start(self) -> OperatorClient {
        let lookup = Arc::new(CustomerLookup::new(self.server_addr.clone()));
        let mut notifier = CallNotifier::new(lookup);

        let mut transport = HubTransport::new();
        if let Some(group) = &self.group {
            transport = transport.with_group(group.clone());
        }
        notifier.attach_transport(&transport);
        transport.start(&self.server_addr);

        let device = match self.device {
            Some((identity, factory)) => {
                let source = Arc::new(DeviceEventSource::new(factory));
                match source.init(&identity, &self.server_addr).await {
                    Ok(()) => {
                        notifier.attach_device(&source);
                        info!(identity = %identity, "Device path enabled");
                        Some(source)
                    }
                    Err(e) => {
                        warn!(error = %e, "Device init failed, continuing without the device path");
                        None
                    }
                }
            }
            None => None,
        };

        OperatorClient {
            transport,
            device,
            notifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_without_a_backend_and_stops_cleanly() {
        let mut client = OperatorClient::builder("http://127.0.0.1:9").start().await;

        assert!(client.current_state().is_idle());
        assert!(!client.device_available());
        assert!(matches!(
            client.place_call("+15550001111").await,
            Err(OperatorError::DeviceNotReady)
        ));

        client.stop().await;
        client.stop().await;
    }
}
