//! Gateway configuration.
//!
//! Verge does not load or persist configuration itself — the host
//! proxy owns the file (or key-value store) and hands the values over.
//! This module defines the shape, the defaults, and the normalization;
//! [`GatewayConfig::generate_proxy_id`] covers the one value the host
//! is expected to generate once and persist forever.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use verge_bridge::BridgeConfig;
use verge_gate::GateSettings;

/// Everything the gateway needs from the host's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// This proxy's identifier, sent with every RPC. Generated once
    /// (see [`Self::generate_proxy_id`]) and persisted by the host.
    pub proxy_id: String,

    /// Hostname or address of the backend access service.
    pub backend_host: String,

    /// Port of the backend access service.
    pub backend_port: u16,

    /// Name of the holding-area server unverified players are parked
    /// on. Never announced to the access service.
    pub holding_server: String,

    /// The one message players see when denied. No internal detail
    /// ever leaks through it.
    pub denial_message: String,

    /// Text of the verification reminder; the host attaches the link.
    pub reminder_text: String,

    /// How often a parked player is re-sent their verification link.
    pub reminder_interval: Duration,

    /// Deadline for each RPC; expiry fails closed.
    pub call_timeout: Duration,

    /// Delay before reopening a failed push stream.
    pub resubscribe_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            proxy_id: String::new(),
            backend_host: "127.0.0.1".to_string(),
            backend_port: 50051,
            holding_server: "limbo".to_string(),
            denial_message: "You are not whitelisted on this server!"
                .to_string(),
            reminder_text: "Click here to verify your account."
                .to_string(),
            reminder_interval: Duration::from_secs(10),
            call_timeout: Duration::from_secs(10),
            resubscribe_delay: Duration::from_secs(5),
        }
    }
}

impl GatewayConfig {
    /// Generates a fresh proxy identifier: 32 hex characters, 128 bits
    /// of entropy. Call once, persist the result, reuse it forever —
    /// the access service keys this proxy's registration on it.
    pub fn generate_proxy_id() -> String {
        let mut rng = rand::rng();
        let bytes: [u8; 16] = rng.random();
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Fixes any out-of-range values so the config is safe to use.
    ///
    /// Zero durations would spin (a reminder every 0 s) or disable the
    /// fail-closed deadline entirely, so they fall back to defaults.
    /// Emptiness of the required strings is checked separately by
    /// [`Self::ensure_complete`] — it is an error, not something to
    /// silently repair.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.reminder_interval.is_zero() {
            tracing::warn!(
                "reminder_interval is zero — using the default"
            );
            self.reminder_interval = defaults.reminder_interval;
        }
        if self.call_timeout.is_zero() {
            tracing::warn!("call_timeout is zero — using the default");
            self.call_timeout = defaults.call_timeout;
        }
        if self.resubscribe_delay.is_zero() {
            tracing::warn!(
                "resubscribe_delay is zero — using the default"
            );
            self.resubscribe_delay = defaults.resubscribe_delay;
        }
        if self.denial_message.trim().is_empty() {
            self.denial_message = defaults.denial_message;
        }
        self
    }

    /// Checks that the values only the host can supply are present.
    ///
    /// # Errors
    /// Returns [`ConfigError`] naming the first missing field.
    pub fn ensure_complete(&self) -> Result<(), ConfigError> {
        if self.proxy_id.trim().is_empty() {
            return Err(ConfigError::MissingProxyId);
        }
        if self.holding_server.trim().is_empty() {
            return Err(ConfigError::MissingHoldingServer);
        }
        if self.backend_host.trim().is_empty() {
            return Err(ConfigError::MissingBackendHost);
        }
        Ok(())
    }

    /// The WebSocket endpoint of the access service.
    pub fn endpoint(&self) -> String {
        format!("ws://{}:{}", self.backend_host, self.backend_port)
    }

    /// Derives the bridge client's connection settings.
    pub fn bridge_config(&self) -> BridgeConfig {
        let mut bridge = BridgeConfig::new(self.endpoint());
        bridge.call_timeout = self.call_timeout;
        bridge.resubscribe_delay = self.resubscribe_delay;
        bridge
    }

    /// Derives the decision components' shared settings.
    pub fn gate_settings(&self) -> GateSettings {
        GateSettings {
            proxy_id: self.proxy_id.clone(),
            holding_server: self.holding_server.clone(),
            denial_message: self.denial_message.clone(),
            reminder_interval: self.reminder_interval,
            reminder_text: self.reminder_text.clone(),
        }
    }
}

/// A required configuration value is missing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `proxy_id` is empty — generate one and persist it.
    #[error("proxy_id is empty; generate one and persist it")]
    MissingProxyId,

    /// `holding_server` is empty.
    #[error("holding_server is empty")]
    MissingHoldingServer,

    /// `backend_host` is empty.
    #[error("backend_host is empty")]
    MissingBackendHost,
}

// =========================================================================
// Tests
// =========================================================================
