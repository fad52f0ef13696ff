//! Startup registration with capped exponential backoff.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{AccessBridge, Backoff};

/// Registers the proxy with the access service, retrying forever.
///
/// Runs on its own spawned task — registration blocks on the backend
/// and must never stall host startup. The loop exits in exactly two
/// ways: the first successful registration (which invokes
/// `on_registered` once, the hook the gateway uses to start the push
/// subscription), or shutdown, which ends any backoff sleep early and
/// returns without error.
pub struct ProxyRegistrar<B: AccessBridge> {
    bridge: Arc<B>,
    proxy_id: String,
    servers: Vec<String>,
    shutdown: watch::Receiver<bool>,
}

impl<B: AccessBridge> ProxyRegistrar<B> {
    /// Creates a registrar announcing `servers` under `proxy_id`.
    pub fn new(
        bridge: Arc<B>,
        proxy_id: impl Into<String>,
        servers: Vec<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            bridge,
            proxy_id: proxy_id.into(),
            servers,
            shutdown,
        }
    }

    /// Runs the retry loop to completion.
    pub async fn run(mut self, on_registered: impl FnOnce()) {
        let mut backoff = Backoff::registration();

        loop {
            if *self.shutdown.borrow() {
                tracing::info!("registration abandoned: shutting down");
                return;
            }

            tracing::info!(
                servers = self.servers.len(),
                "attempting proxy registration"
            );
            match self
                .bridge
                .register(&self.proxy_id, &self.servers)
                .await
            {
                Ok(true) => {
                    on_registered();
                    return;
                }
                Ok(false) => {
                    // The service answered but said no; retry like a
                    // failure.
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "proxy registration failed"
                    );
                }
            }

            let delay = backoff.next_delay();
            tracing::info!(
                delay_secs = delay.as_secs(),
                "retrying registration after backoff"
            );
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        tracing::info!(
                            "registration retry interrupted: shutting down"
                        );
                        return;
                    }
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
