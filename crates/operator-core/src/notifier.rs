//! Call notification state machine.
//!
//! Both producers (hub transport and device source) and every UI action feed
//! one internal queue, consumed by a single owner task that applies
//! transitions serially: two callback sources never race on the popup
//! state. The lifecycle per call is Idle → Ringing (lookup in flight) →
//! Resolved → cleared back to Idle by answer/decline/close.
//!
//! One call is tracked at a time: a new arrival overwrites whatever is
//! showing. Each lookup is tagged with the `callSid` it was started for and
//! its result is applied only while that sid is still current; results that
//! lost the race are discarded, never mixed into a newer call. Note that
//! arrivals are not deduplicated across sources: the same `callSid` coming
//! in via both the hub and the device rings twice, as the upstream system
//! does.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use callpop_call_events::{CallArrivalEvent, Customer};

use crate::device::DeviceEventSource;
use crate::lookup::CustomerResolver;
use crate::transport::HubTransport;

/// The single popup slot shown to an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationState {
    /// Whether the popup is showing
    pub visible: bool,
    /// Caller number of the active call, empty when idle
    pub from_number: String,
    /// Correlation key of the active call, empty when idle
    pub call_sid: String,
    /// Resolved customer record, if any
    pub customer: Option<Customer>,
    /// Whether the identity lookup is still in flight
    pub resolving: bool,
}

impl NotificationState {
    fn empty() -> Self {
        Self {
            visible: false,
            from_number: String::new(),
            call_sid: String::new(),
            customer: None,
            resolving: false,
        }
    }

    /// True when no call is being shown.
    pub fn is_idle(&self) -> bool {
        !self.visible
    }
}

#[derive(Debug)]
enum NotifierInput {
    CallArrival(CallArrivalEvent),
    LookupResolved {
        call_sid: String,
        customer: Option<Customer>,
    },
    Answer,
    Decline,
    Close,
    Shutdown,
}

/// Owner of the notification state.
pub struct CallNotifier {
    input_tx: mpsc::UnboundedSender<NotifierInput>,
    state_rx: watch::Receiver<NotificationState>,
    owner: Option<JoinHandle<()>>,
    forwarders: Vec<JoinHandle<()>>,
}

impl CallNotifier {
    /// Spawn the state machine over the given resolver.
    pub fn new(resolver: Arc<dyn CustomerResolver>) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(NotificationState::empty());

        let owner = tokio::spawn(owner_loop(input_rx, input_tx.clone(), state_tx, resolver));

        Self {
            input_tx,
            state_rx,
            owner: Some(owner),
            forwarders: Vec::new(),
        }
    }

    /// Feed a call arrival into the machine directly.
    pub fn notify_call(&self, event: CallArrivalEvent) {
        let _ = self.input_tx.send(NotifierInput::CallArrival(event));
    }

    /// Operator answered the active call; clears the popup.
    pub fn answer(&self) {
        let _ = self.input_tx.send(NotifierInput::Answer);
    }

    /// Operator declined the active call; clears the popup.
    pub fn decline(&self) {
        let _ = self.input_tx.send(NotifierInput::Decline);
    }

    /// Operator dismissed the popup without acting on the call.
    pub fn close(&self) {
        let _ = self.input_tx.send(NotifierInput::Close);
    }

    /// Watchable popup state for the UI.
    pub fn state(&self) -> watch::Receiver<NotificationState> {
        self.state_rx.clone()
    }

    /// Snapshot of the current popup state.
    pub fn current(&self) -> NotificationState {
        self.state_rx.borrow().clone()
    }

    /// Forward call arrivals from the hub transport into the machine.
    pub fn attach_transport(&mut self, transport: &HubTransport) {
        let mut incoming = transport.incoming_call();
        let input_tx = self.input_tx.clone();
        self.forwarders.push(tokio::spawn(async move {
            while incoming.changed().await.is_ok() {
                let event = incoming.borrow_and_update().clone();
                if let Some(event) = event {
                    if input_tx.send(NotifierInput::CallArrival(event)).is_err() {
                        break;
                    }
                }
            }
        }));
    }

    /// Forward device rings into the machine.
    pub fn attach_device(&mut self, source: &DeviceEventSource) {
        let mut incoming = source.incoming();
        let input_tx = self.input_tx.clone();
        self.forwarders.push(tokio::spawn(async move {
            while incoming.changed().await.is_ok() {
                let call = incoming.borrow_and_update().clone();
                if let Some(call) = call {
                    let event = CallArrivalEvent::new(call.from, call.call_sid);
                    if input_tx.send(NotifierInput::CallArrival(event)).is_err() {
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the owner task and all forwarders. Idempotent.
    pub fn shutdown(&mut self) {
        let _ = self.input_tx.send(NotifierInput::Shutdown);
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
        if let Some(owner) = self.owner.take() {
            owner.abort();
        }
    }
}

impl Drop for CallNotifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn owner_loop(
    mut input_rx: mpsc::UnboundedReceiver<NotifierInput>,
    input_tx: mpsc::UnboundedSender<NotifierInput>,
    state_tx: watch::Sender<NotificationState>,
    resolver: Arc<dyn CustomerResolver>,
) {
    let mut state = NotificationState::empty();

    while let Some(input) = input_rx.recv().await {
        match input {
            NotifierInput::CallArrival(event) => {
                if state.visible {
                    debug!(
                        superseded = %state.call_sid,
                        by = %event.call_sid,
                        "New arrival supersedes the active call"
                    );
                }
                info!(from = %event.from_number, call_sid = %event.call_sid, "Call ringing");

                state = NotificationState {
                    visible: true,
                    from_number: event.from_number.clone(),
                    call_sid: event.call_sid.clone(),
                    customer: None,
                    resolving: true,
                };
                state_tx.send_replace(state.clone());

                // Lookup runs off the owner task; the sid tag decides later
                // whether its result still applies.
                let resolver = resolver.clone();
                let input_tx = input_tx.clone();
                tokio::spawn(async move {
                    let customer = resolver.resolve(&event.from_number).await;
                    let _ = input_tx.send(NotifierInput::LookupResolved {
                        call_sid: event.call_sid,
                        customer,
                    });
                });
            }
            NotifierInput::LookupResolved { call_sid, customer } => {
                if state.visible && state.call_sid == call_sid {
                    state.customer = customer;
                    state.resolving = false;
                    state_tx.send_replace(state.clone());
                } else {
                    debug!(call_sid = %call_sid, "Discarding stale lookup result");
                }
            }
            NotifierInput::Answer | NotifierInput::Decline | NotifierInput::Close => {
                if state.visible {
                    let action = match input {
                        NotifierInput::Answer => "answered",
                        NotifierInput::Decline => "declined",
                        _ => "closed",
                    };
                    info!(call_sid = %state.call_sid, action, "Call popup cleared");
                }
                state = NotificationState::empty();
                state_tx.send_replace(state.clone());
            }
            NotifierInput::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    struct TableResolver {
        delay: Duration,
        table: HashMap<String, Customer>,
    }

    impl TableResolver {
        fn new(entries: &[(&str, &str)]) -> Arc<Self> {
            Self::with_delay(entries, Duration::ZERO)
        }

        fn with_delay(entries: &[(&str, &str)], delay: Duration) -> Arc<Self> {
            let table = entries
                .iter()
                .map(|(phone, name)| {
                    (
                        phone.to_string(),
                        Customer::new("1", name.to_string(), phone.to_string()),
                    )
                })
                .collect();
            Arc::new(Self { delay, table })
        }
    }

    #[async_trait]
    impl CustomerResolver for TableResolver {
        async fn resolve(&self, phone: &str) -> Option<Customer> {
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.table.get(phone).cloned()
        }
    }

    async fn wait_until<F>(notifier: &CallNotifier, predicate: F) -> NotificationState
    where
        F: Fn(&NotificationState) -> bool,
    {
        let mut rx = notifier.state();
        timeout(Duration::from_secs(1), async {
            loop {
                if predicate(&rx.borrow()) {
                    return rx.borrow().clone();
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("state machine never reached expected state")
    }

    #[tokio::test]
    async fn idle_to_ringing_to_resolved() {
        let resolver = TableResolver::new(&[("+353851234567", "Dublin Tech Solutions Ltd")]);
        let notifier = CallNotifier::new(resolver);

        assert!(notifier.current().is_idle());

        notifier.notify_call(CallArrivalEvent::new("+353851234567", "CA1"));

        let ringing = wait_until(&notifier, |s| s.visible).await;
        assert_eq!(ringing.call_sid, "CA1");

        let resolved = wait_until(&notifier, |s| s.visible && !s.resolving).await;
        assert_eq!(resolved.from_number, "+353851234567");
        assert_eq!(
            resolved.customer.as_ref().map(|c| c.name.as_str()),
            Some("Dublin Tech Solutions Ltd")
        );
    }

    #[tokio::test]
    async fn unknown_caller_resolves_without_customer() {
        let resolver = TableResolver::new(&[]);
        let notifier = CallNotifier::new(resolver);

        notifier.notify_call(CallArrivalEvent::new("+15550001111", "CA1"));

        let resolved = wait_until(&notifier, |s| s.visible && !s.resolving).await;
        assert!(resolved.customer.is_none());
    }

    #[tokio::test]
    async fn terminal_actions_clear_back_to_idle() {
        let resolver = TableResolver::new(&[("+353861234567", "Liam O'Connor")]);
        let notifier = CallNotifier::new(resolver);

        for clear in [
            CallNotifier::answer as fn(&CallNotifier),
            CallNotifier::decline,
            CallNotifier::close,
        ] {
            notifier.notify_call(CallArrivalEvent::new("+353861234567", "CA1"));
            wait_until(&notifier, |s| s.visible && !s.resolving).await;

            clear(&notifier);
            let idle = wait_until(&notifier, |s| s.is_idle()).await;
            assert_eq!(idle.from_number, "");
            assert_eq!(idle.call_sid, "");
            assert!(idle.customer.is_none());
            assert!(!idle.resolving);
        }
    }

    #[tokio::test]
    async fn second_arrival_supersedes_inflight_lookup() {
        let resolver = TableResolver::with_delay(
            &[("+111", "First Caller"), ("+222", "Second Caller")],
            Duration::from_millis(50),
        );
        let notifier = CallNotifier::new(resolver);

        notifier.notify_call(CallArrivalEvent::new("+111", "CA1"));
        wait_until(&notifier, |s| s.visible && s.call_sid == "CA1").await;
        notifier.notify_call(CallArrivalEvent::new("+222", "CA2"));

        let resolved = wait_until(&notifier, |s| s.call_sid == "CA2" && !s.resolving).await;
        assert_eq!(resolved.from_number, "+222");
        assert_eq!(
            resolved.customer.as_ref().map(|c| c.name.as_str()),
            Some("Second Caller")
        );

        // The first call's result must have been discarded, not applied late.
        sleep(Duration::from_millis(120)).await;
        let after = notifier.current();
        assert_eq!(after.call_sid, "CA2");
        assert_eq!(
            after.customer.as_ref().map(|c| c.name.as_str()),
            Some("Second Caller")
        );
    }

    #[tokio::test]
    async fn lookup_landing_after_clear_stays_discarded() {
        let resolver =
            TableResolver::with_delay(&[("+111", "First Caller")], Duration::from_millis(50));
        let notifier = CallNotifier::new(resolver);

        notifier.notify_call(CallArrivalEvent::new("+111", "CA1"));
        wait_until(&notifier, |s| s.visible).await;
        notifier.answer();
        wait_until(&notifier, |s| s.is_idle()).await;

        sleep(Duration::from_millis(120)).await;
        assert!(notifier.current().is_idle());
    }

    #[tokio::test]
    async fn arrivals_from_an_attached_device_ring_the_popup() {
        use crate::device::{DeviceEvent, DeviceEventSource, DeviceFactory, VoiceDevice};
        use crate::error::OperatorResult;
        use tokio::sync::{mpsc, Mutex};

        struct NullDevice;

        #[async_trait]
        impl VoiceDevice for NullDevice {
            async fn register(&self) -> OperatorResult<()> {
                Ok(())
            }
            async fn connect(
                &self,
                _params: crate::device::CallParams,
            ) -> OperatorResult<crate::device::CallHandle> {
                Err(crate::error::OperatorError::DeviceNotReady)
            }
            async fn destroy(&self) {}
        }

        struct NullFactory {
            events: Mutex<Option<mpsc::UnboundedReceiver<DeviceEvent>>>,
        }

        #[async_trait]
        impl DeviceFactory for NullFactory {
            async fn create(
                &self,
                _token: &str,
            ) -> OperatorResult<(Box<dyn VoiceDevice>, mpsc::UnboundedReceiver<DeviceEvent>)>
            {
                Ok((
                    Box::new(NullDevice),
                    self.events.lock().await.take().unwrap(),
                ))
            }
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let source = DeviceEventSource::new(Arc::new(NullFactory {
            events: Mutex::new(Some(events_rx)),
        }));
        source.init_with_token("jwt").await.unwrap();

        let resolver = TableResolver::new(&[("+353871234567", "Aoife Murphy")]);
        let mut notifier = CallNotifier::new(resolver);
        notifier.attach_device(&source);

        events_tx
            .send(DeviceEvent::Incoming {
                from: "+353871234567".to_string(),
                call_sid: "CAdev9".to_string(),
            })
            .unwrap();

        let resolved = wait_until(&notifier, |s| s.visible && !s.resolving).await;
        assert_eq!(resolved.call_sid, "CAdev9");
        assert_eq!(
            resolved.customer.as_ref().map(|c| c.name.as_str()),
            Some("Aoife Murphy")
        );
    }
}
