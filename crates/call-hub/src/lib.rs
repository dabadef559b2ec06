//! # callpop-call-hub
//!
//! Server side of the callpop pipeline: accepts inbound-call notifications
//! from the telephony provider (and a test harness), fans them out to every
//! connected operator client over `/hubs/calls`, and serves the customer
//! directory and device-token endpoints the clients enrich with.
//!
//! The moving parts:
//!
//! - [`broadcaster::EventBroadcaster`]: in-memory fan-out with one
//!   independent queue per subscriber
//! - [`api`]: webhook ingest, test harness, customer directory, token
//!   issuance and the WebSocket event channel
//! - [`server::CallHubServer`]: lifecycle wrapper tying it all together

pub mod api;
pub mod broadcaster;
pub mod config;
pub mod customers;
pub mod error;
pub mod server;
pub mod token;
pub mod twiml;

pub use broadcaster::{ConnectionId, EventBroadcaster};
pub use config::{CallHubConfig, ProviderConfig};
pub use customers::{CustomerDirectory, InMemoryCustomerDirectory};
pub use error::{HubError, HubResult};
pub use server::{CallHubServer, CallHubServerBuilder};
pub use token::AccessTokenIssuer;
pub use twiml::VoiceResponse;
