//! Assembly and lifecycle of the whole gateway.

use std::sync::Arc;

use verge_bridge::{BridgeClient, ProxyRegistrar};
use verge_gate::{
    ConnectionGate, Dispatcher, HoldingAreaMonitor, ProxyHost,
    PushEventProcessor,
};
use verge_registry::{
    IdentityLocks, ReminderTimers, VerificationRegistry,
};

use crate::{GatewayConfig, VergeError};

/// The assembled access-control gateway.
///
/// Construction wires every layer over the shared registry; the host
/// then forwards its lifecycle events into [`Self::dispatcher`], calls
/// [`Self::start`] once at startup, and [`Self::shutdown`] at teardown.
pub struct AccessGateway<H: ProxyHost> {
    config: GatewayConfig,
    host: Arc<H>,
    bridge: Arc<BridgeClient>,
    registry: Arc<VerificationRegistry>,
    timers: Arc<ReminderTimers>,
    dispatcher: Arc<Dispatcher<H, BridgeClient>>,
    processor: Arc<PushEventProcessor<H, BridgeClient>>,
}

impl<H: ProxyHost> AccessGateway<H> {
    /// Validates the configuration and wires the components.
    ///
    /// No I/O happens here; the first connection to the access service
    /// is made by the registration task spawned in [`Self::start`].
    ///
    /// # Errors
    /// Returns [`VergeError::Config`] if a required value is missing.
    pub fn new(
        config: GatewayConfig,
        host: Arc<H>,
    ) -> Result<Self, VergeError> {
        let config = config.validated();
        config.ensure_complete()?;
        tracing::info!(
            proxy_id = %config.proxy_id,
            endpoint = %config.endpoint(),
            holding_server = %config.holding_server,
            "initializing access gateway"
        );

        let bridge = Arc::new(BridgeClient::new(config.bridge_config()));
        let registry = Arc::new(VerificationRegistry::new());
        let locks = Arc::new(IdentityLocks::new());
        let timers = Arc::new(ReminderTimers::new());
        let settings = Arc::new(config.gate_settings());

        let gate = ConnectionGate::new(
            Arc::clone(&host),
            Arc::clone(&bridge),
            Arc::clone(&registry),
            Arc::clone(&locks),
            Arc::clone(&settings),
        );
        let monitor = HoldingAreaMonitor::new(
            Arc::clone(&host),
            Arc::clone(&registry),
            Arc::clone(&timers),
            Arc::clone(&settings),
        );
        let processor = Arc::new(PushEventProcessor::new(
            Arc::clone(&host),
            Arc::clone(&bridge),
            Arc::clone(&registry),
            Arc::clone(&locks),
            Arc::clone(&timers),
            Arc::clone(&settings),
        ));

        Ok(Self {
            config,
            host,
            bridge,
            registry,
            timers,
            dispatcher: Arc::new(Dispatcher::new(gate, monitor)),
            processor,
        })
    }

    /// The named hooks the host forwards its events into.
    pub fn dispatcher(&self) -> Arc<Dispatcher<H, BridgeClient>> {
        Arc::clone(&self.dispatcher)
    }

    /// Number of players currently awaiting verification.
    pub fn pending_verifications(&self) -> usize {
        self.registry.len()
    }

    /// Starts the background registration task.
    ///
    /// Registration retries with capped backoff until it succeeds or
    /// shutdown begins; host startup is never stalled by it. The first
    /// success opens the push subscription — exactly once for the
    /// process lifetime — wiring each notification onto its own worker
    /// and each stream recovery onto one reconciliation sweep.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        // The holding area is ours alone; it is never announced.
        let servers: Vec<String> = self
            .host
            .server_names()
            .into_iter()
            .filter(|name| name != &self.config.holding_server)
            .collect();

        let registrar = ProxyRegistrar::new(
            Arc::clone(&self.bridge),
            self.config.proxy_id.clone(),
            servers,
            self.bridge.shutdown_signal(),
        );

        let bridge = Arc::clone(&self.bridge);
        let processor = Arc::clone(&self.processor);
        let proxy_id = self.config.proxy_id.clone();
        tokio::spawn(async move {
            registrar
                .run(move || {
                    let event_processor = Arc::clone(&processor);
                    let sweep_processor = processor;
                    let result = bridge.subscribe(
                        proxy_id,
                        move |event| {
                            // One independent worker per notification:
                            // a slow check stalls only the player it
                            // concerns.
                            let processor =
                                Arc::clone(&event_processor);
                            tokio::spawn(async move {
                                processor.handle_event(event).await;
                            });
                        },
                        move || {
                            let processor =
                                Arc::clone(&sweep_processor);
                            tokio::spawn(async move {
                                processor.reconcile_all().await;
                            });
                        },
                    );
                    if let Err(e) = result {
                        tracing::error!(
                            error = %e,
                            "failed to start push subscription"
                        );
                    }
                })
                .await;
        })
    }

    /// Tears the gateway down: cancels every reminder timer, then runs
    /// the bridge's two-stage graceful shutdown (which also ends the
    /// registration and subscription loops). Idempotent.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down access gateway");
        self.timers.cancel_all();
        self.bridge.shutdown().await;
    }
}

// =========================================================================
// Tests
// =========================================================================
