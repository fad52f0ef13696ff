//! Wire contract for the Verge access bridge.
//!
//! This crate defines the "language" the proxy gateway and the backend
//! access service speak:
//!
//! - **Types** ([`Envelope`], [`BridgeRequest`], [`BridgeResponse`],
//!   [`ServerEvent`], etc.) — the message structures that travel on the
//!   wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding,
//!   decoding, or interpreting a reply.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw WebSocket frames)
//! and the bridge client (calls and the push stream). It doesn't know
//! about connections, players, or the registry — it only knows how to
//! serialize and interpret messages.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Bridge (calls / stream)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AccessDecision, AccessReply, AccessStatus, BridgeRequest,
    BridgeResponse, Envelope, EventPayload, EventType, Payload,
    ServerEvent,
};
