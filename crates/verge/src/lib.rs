//! # Verge
//!
//! Proxy-side player access-control gateway for multiplayer game
//! networks.
//!
//! Verge sits inside a proxy runtime and decides, for every connecting
//! or already-connected player, whether they may reach the server they
//! asked for. Authorization lives in an external access service; Verge
//! consults it over RPC, parks unverified players on a holding-area
//! server until the service clears them, and reacts to pushed
//! access-change notifications without waiting for a new connection
//! attempt.
//!
//! ## Embedding
//!
//! The host implements [`ProxyHost`] over its runtime, builds an
//! [`AccessGateway`] from its configuration, forwards lifecycle events
//! into the gateway's [`Dispatcher`], and applies the returned
//! outcomes:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use verge::prelude::*;
//!
//! # fn wire(host: Arc<impl ProxyHost>) -> Result<(), verge::VergeError> {
//! let mut config = GatewayConfig::default();
//! config.proxy_id = GatewayConfig::generate_proxy_id();
//!
//! let gateway = AccessGateway::new(config, host)?;
//! let _dispatcher = gateway.dispatcher();
//! gateway.start();
//! // hook host events to dispatcher methods, apply the outcomes…
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod gateway;

pub use config::{ConfigError, GatewayConfig};
pub use error::VergeError;
pub use gateway::AccessGateway;

/// The types a host embedding Verge typically needs.
pub mod prelude {
    pub use crate::{AccessGateway, GatewayConfig, VergeError};
    pub use verge_gate::{
        CommandRuling, ConnectRuling, Dispatcher, PlayerSnapshot,
        ProxyHost, ServerChoice,
    };
}
