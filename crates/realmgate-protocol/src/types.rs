//! Session message types for Realmgate's wire format.
//!
//! Every frame exchanged between a client and the router is one
//! [`Message`]. The shape follows the classic WAMP session lifecycle:
//!
//! ```text
//! client                         router
//!   │ ── Hello ──────────────────→ │
//!   │ ←──────────────── Challenge ─ │   (or Abort)
//!   │ ── Authenticate ───────────→ │
//!   │ ←────────────────── Welcome ─ │   (or Abort)
//!   │ ── Call ───────────────────→ │
//!   │ ←─────────────────── Result ─ │   (or Error)
//!   │ ── Goodbye ────────────────→ │
//!   │ ←────────────────── Goodbye ─ │
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form details attached to challenges and authenticate messages.
pub type Extra = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Router-assigned identifier of a joined session.
///
/// Serialized as a plain number (`#[serde(transparent)]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Client-chosen identifier correlating a request with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Hello
// ---------------------------------------------------------------------------

/// What a client announces when it asks to attach to a realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloDetails {
    /// The realm to attach to.
    pub realm: String,

    /// Authentication methods the client can do, in order of preference.
    #[serde(default)]
    pub authmethods: Vec<String>,

    /// The identity the client claims. Anonymous clients leave it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authid: Option<String>,
}

impl HelloDetails {
    /// Convenience constructor for a client offering the given methods.
    pub fn new(
        realm: impl Into<String>,
        authmethods: &[&str],
        authid: Option<&str>,
    ) -> Self {
        Self {
            realm: realm.into(),
            authmethods: authmethods.iter().map(|m| m.to_string()).collect(),
            authid: authid.map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One frame of the session protocol.
///
/// Internally tagged: `{ "type": "Challenge", "authmethod": "ticket", ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    // -- Attach handshake --
    /// Client → Router: "Let me into this realm."
    Hello(HelloDetails),

    /// Router → Client: "Prove who you are."
    Challenge {
        authmethod: String,
        #[serde(default)]
        extra: Extra,
    },

    /// Client → Router: the answer to a challenge.
    Authenticate {
        signature: String,
        #[serde(default)]
        extra: Extra,
    },

    /// Router → Client: "You're in."
    Welcome {
        session: SessionId,
        authid: String,
        authrole: String,
        authmethod: String,
        authprovider: String,
    },

    /// Router → Client: "You're not getting in." Ends the connection.
    Abort {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    // -- Session close --
    /// Either direction: orderly end of an established session.
    Goodbye { reason: String },

    // -- Remote procedure calls --
    /// Client → Router: invoke a registered procedure.
    Call {
        request: RequestId,
        procedure: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },

    /// Router → Client: the value a procedure returned.
    #[serde(rename = "Result")]
    CallResult {
        request: RequestId,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },

    /// Router → Client: a request failed.
    Error {
        request: RequestId,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Message {
    /// The `type` tag of this message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello(_) => "Hello",
            Self::Challenge { .. } => "Challenge",
            Self::Authenticate { .. } => "Authenticate",
            Self::Welcome { .. } => "Welcome",
            Self::Abort { .. } => "Abort",
            Self::Goodbye { .. } => "Goodbye",
            Self::Call { .. } => "Call",
            Self::CallResult { .. } => "Result",
            Self::Error { .. } => "Error",
        }
    }

    /// Builds an `Abort`. Denied attaches pass `None` so the client
    /// learns nothing beyond the reason URI.
    pub fn abort(reason: &str, message: Option<&str>) -> Self {
        Self::Abort {
            reason: reason.to_string(),
            message: message.map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Well-known URIs
// ---------------------------------------------------------------------------

/// Reason and error URIs the router sends.
pub mod uri {
    /// Every denied attach, whatever the internal cause.
    pub const NOT_AUTHORIZED: &str = "wamp.error.not_authorized";
    /// Hello named a realm the router doesn't serve.
    pub const NO_SUCH_REALM: &str = "wamp.error.no_such_realm";
    /// Call named a procedure nobody registered.
    pub const NO_SUCH_PROCEDURE: &str = "wamp.error.no_such_procedure";
    /// A procedure failed while running.
    pub const RUNTIME_ERROR: &str = "wamp.error.runtime_error";
    /// Message out of order for the current session state.
    pub const PROTOCOL_VIOLATION: &str = "wamp.error.protocol_violation";
    /// Peer-initiated close.
    pub const CLOSE_NORMAL: &str = "wamp.close.normal";
    /// Reply to a peer's goodbye.
    pub const GOODBYE_AND_OUT: &str = "wamp.close.goodbye_and_out";
}

// =========================================================================
// Tests
// =========================================================================
