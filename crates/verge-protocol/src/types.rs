//! Message types for the bridge wire format.
//!
//! Everything here gets serialized, sent over the bridge connection, and
//! deserialized on the other side. The shapes are a fixed contract with
//! the backend access service — field names and tag spellings are part of
//! that contract and must not drift.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Access status / decision
// ---------------------------------------------------------------------------

/// The raw access verdict as it appears on the wire.
///
/// `REQUIRES_VERIFICATION` is only meaningful together with the
/// `verification_url` carried alongside it in [`AccessReply`] — see
/// [`AccessReply::decision`] for the checked conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessStatus {
    /// The player may reach the requested server.
    Allowed,
    /// The player must not reach the requested server.
    Prohibited,
    /// The player must verify their account first.
    RequiresVerification,
}

/// A complete reply to a `CheckAccess` call: the verdict plus the
/// verification URL that accompanies `REQUIRES_VERIFICATION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessReply {
    pub status: AccessStatus,
    pub verification_url: Option<String>,
}

impl AccessReply {
    /// Interprets the reply as a domain decision.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] when the service claims
    /// `REQUIRES_VERIFICATION` but sent no usable URL — the contract
    /// requires one, and a parked player without a link would be stuck
    /// forever.
    pub fn decision(&self) -> Result<AccessDecision, ProtocolError> {
        match self.status {
            AccessStatus::Allowed => Ok(AccessDecision::Allowed),
            AccessStatus::Prohibited => Ok(AccessDecision::Prohibited),
            AccessStatus::RequiresVerification => {
                match self.verification_url.as_deref() {
                    Some(url) if !url.trim().is_empty() => {
                        Ok(AccessDecision::RequiresVerification {
                            verification_url: url.to_string(),
                        })
                    }
                    _ => Err(ProtocolError::InvalidMessage(
                        "REQUIRES_VERIFICATION reply carries no \
                         verification URL"
                            .into(),
                    )),
                }
            }
        }
    }
}

/// The interpreted verdict of an access check.
///
/// Unlike [`AccessStatus`], the verification variant always carries a
/// non-empty URL — the conversion in [`AccessReply::decision`] enforces
/// that, so downstream code never has to re-check it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Prohibited,
    RequiresVerification { verification_url: String },
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// The kinds of push events a proxy can subscribe to.
///
/// Only `PLAYER_ACCESS_CHANGED` is requested today; the list form keeps
/// the subscription payload forward-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PlayerAccessChanged,
}

/// A call from the proxy to the access service.
///
/// `#[serde(tag = "op")]` produces internally tagged JSON, e.g.
/// `{ "op": "CheckAccess", "player_name": "alice", ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum BridgeRequest {
    /// Announce this proxy and the servers it fronts.
    RegisterProxy {
        proxy_id: String,
        servers: Vec<String>,
    },

    /// Ask whether a player may reach a server.
    CheckAccess {
        player_name: String,
        player_ipv4: String,
        server_name: String,
        proxy_id: String,
    },

    /// Open the push stream, filtered to the given event types.
    Subscribe {
        proxy_id: String,
        event_types: Vec<EventType>,
    },
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A reply from the access service to a [`BridgeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum BridgeResponse {
    /// Reply to `RegisterProxy`.
    RegisterAck { success: bool },

    /// Reply to `CheckAccess`.
    AccessResult {
        status: AccessStatus,
        verification_url: Option<String>,
    },

    /// Reply to `Subscribe`; the event stream follows on the same
    /// connection.
    SubscribeAck,

    /// The service rejected the request.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Push events
// ---------------------------------------------------------------------------

/// The content of a pushed [`ServerEvent`].
///
/// The service may stream payload kinds this proxy does not understand;
/// those decode to [`EventPayload::Unknown`] via `#[serde(other)]` and
/// are ignored by the consumer rather than treated as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventPayload {
    /// A player's access state changed; re-evaluate them.
    PlayerUpdate {
        player_name: String,
        player_ipv4: String,
    },

    /// Any payload kind this build does not know about.
    #[serde(other)]
    Unknown,
}

/// One message on the push stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEvent {
    pub payload: EventPayload,
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// The content of an [`Envelope`].
///
/// `#[serde(tag = "type", content = "data")]` produces adjacently tagged
/// JSON: `{ "type": "Request", "data": { "op": "Subscribe", ... } }`.
/// The receiver checks the outer tag first to decide whether a frame is
/// a call, a reply, or a pushed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Request(BridgeRequest),
    Response(BridgeResponse),
    Event(ServerEvent),
}

/// The top-level message wrapper; every frame on the wire is an Envelope.
///
/// `seq` correlates a response with its request. Each client numbers its
/// own requests; the service echoes the number back. Pushed events carry
/// `seq` 0 — they answer nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    #[serde(flatten)]
    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================
