//! Shared wire contract for the callpop notification pipeline.
//!
//! Everything that crosses a process boundary lives here: the canonical
//! [`CallArrivalEvent`], the read-only [`Customer`] record it is enriched
//! with, and the JSON frames spoken on the `/hubs/calls` socket. Field names
//! are part of the wire contract and must not drift: both the hub server
//! and operator clients depend on them byte-for-byte.

pub mod customer;
pub mod event;
pub mod protocol;

pub use customer::Customer;
pub use event::CallArrivalEvent;
pub use protocol::{ClientMessage, ServerMessage};
