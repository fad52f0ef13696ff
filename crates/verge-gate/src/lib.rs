//! The decision core of the Verge gateway.
//!
//! Three components share one registry and decide everything the
//! gateway does:
//!
//! - [`ConnectionGate`] — invoked at initial-server selection and
//!   pre-connect; allows, redirects to the holding area, denies, or
//!   fails closed.
//! - [`HoldingAreaMonitor`] — reminder messaging and containment while
//!   a player is parked, plus unconditional cleanup on disconnect.
//! - [`PushEventProcessor`] — consumes access-change notifications and
//!   runs the post-reconnect reconciliation sweep.
//!
//! The host proxy runtime stays on the far side of two seams: the
//! [`ProxyHost`] trait (lookups and player actions) and the
//! [`Dispatcher`] (named hooks the host invokes, returning outcomes the
//! host applies). The backend access service sits behind
//! [`AccessBridge`](verge_bridge::AccessBridge) from `verge-bridge`.
//!
//! ```text
//! host hooks → Dispatcher → ConnectionGate ─┐
//!                         → HoldingAreaMonitor ├─ VerificationRegistry
//! push stream → PushEventProcessor ─────────┘
//! ```

mod dispatch;
mod gate;
mod holding;
mod host;
mod outcome;
mod push;
mod settings;

pub use dispatch::Dispatcher;
pub use gate::ConnectionGate;
pub use holding::HoldingAreaMonitor;
pub use host::{PlayerSnapshot, ProxyHost};
pub use outcome::{CommandRuling, ConnectRuling, ServerChoice};
pub use push::PushEventProcessor;
pub use settings::GateSettings;
