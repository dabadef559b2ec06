//! # callpop-operator-core
//!
//! Client side of the callpop pipeline. An operator UI owns one
//! [`OperatorClient`], which merges two independent producers of incoming
//! call events: the hub's `/hubs/calls` socket and an optional softphone
//! device: into a single popup state enriched by an asynchronous customer
//! lookup.
//!
//! Everything degrades rather than fails: an unreachable hub means demo
//! mode, an unreachable directory means fallback data, a failed device init
//! means no device-originated calls. The one error callers must handle
//! themselves is device initialization, so they can decide whether to show
//! softphone controls.

pub mod client;
pub mod device;
pub mod error;
pub mod lookup;
pub mod notifier;
pub mod transport;

pub use client::{OperatorClient, OperatorClientBuilder};
pub use device::{
    CallHandle, CallParams, DeviceEvent, DeviceEventSource, DeviceFactory, IncomingDeviceCall,
    VoiceDevice,
};
pub use error::{OperatorError, OperatorResult};
pub use lookup::{CustomerLookup, CustomerResolver};
pub use notifier::{CallNotifier, NotificationState};
pub use transport::HubTransport;
