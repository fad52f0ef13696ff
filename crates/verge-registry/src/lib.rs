//! Shared verification state for the Verge gateway.
//!
//! This crate owns the mutable heart of the system:
//!
//! - [`Identity`] — the (username, IP) composite key for a connection.
//! - [`PendingVerification`] — what we remember about a parked player.
//! - [`VerificationRegistry`] — the concurrency-safe map of the two.
//! - [`IdentityLocks`] — per-identity serialization for check-then-write
//!   sequences that span an RPC call.
//! - [`ReminderTimers`] — reminder-task handles, kept out of the registry
//!   entries so timer lifecycle can be audited and cancelled on its own.
//!
//! # Concurrency note
//!
//! Host callbacks fire concurrently for different players, and the push
//! stream adds its own workers on top. Every container here is therefore
//! safe to share behind an `Arc` as-is; handlers only ever touch the
//! entry for their own identity, so the short internal critical sections
//! never become a cross-player bottleneck.

mod identity;
mod locks;
mod pending;
mod registry;
mod timers;

pub use identity::Identity;
pub use locks::IdentityLocks;
pub use pending::PendingVerification;
pub use registry::VerificationRegistry;
pub use timers::ReminderTimers;
