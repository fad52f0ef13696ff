//! The resilient RPC client for the backend access service.
//!
//! Everything the gateway says to the access service goes through this
//! crate:
//!
//! - [`BridgeClient`] — register, check access, subscribe to the push
//!   stream, shut down. Calls run over a lazily-dialed WebSocket
//!   connection with sequence-number correlation and an explicit
//!   deadline; the push stream lives on its own connection and
//!   resubscribes forever with a fixed delay.
//! - [`AccessBridge`] — the trait seam the decision layers program
//!   against, so tests can swap in a scripted backend.
//! - [`Backoff`] — the capped-doubling delay sequence for registration
//!   retries.
//! - [`ProxyRegistrar`] — the startup loop: register until it sticks,
//!   then hand off to the subscription exactly once.
//!
//! # Failure philosophy
//!
//! Nothing here is ever fatal to the process. A failed call surfaces a
//! [`BridgeError`] and the caller fails closed; a failed registration
//! retries on the backoff schedule; a broken push stream resubscribes
//! after a fixed delay, forever, until shutdown.

mod backoff;
mod client;
mod error;
mod registrar;

pub use backoff::Backoff;
pub use client::{
    AccessBridge, AccessQuery, BridgeClient, BridgeConfig,
    RegistrationState, SubscriptionState,
};
pub use error::BridgeError;
pub use registrar::ProxyRegistrar;
