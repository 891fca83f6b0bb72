//! The attach handshake: one [`AuthenticatingSession`] per connection.
//!
//! ```text
//!   Anonymous ──hello──→ AwaitingHello ──credential found──→ AwaitingResponse
//!                              │                                    │
//!                              │ no method / unknown id /           │ authenticate
//!                              │ store down                         │
//!                              ▼                                    ▼
//!                           Denied ◄──── wrong ticket/signature ── Accepted
//! ```
//!
//! `AwaitingHello` covers the credential lookup. Both handshake methods
//! take `&mut self`, so while `hello` is suspended on the store nothing
//! else can touch the session. If the connection task is dropped in the
//! middle of a lookup, the session is dropped with it.
//!
//! Misuse never resets the machine. A second hello, or an authenticate
//! with no challenge outstanding, discards whatever was pending and
//! denies. A client that was denied has to reconnect and start over.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use realmgate_protocol::{Extra, HelloDetails};

use crate::cra;
use crate::{AuthError, Credential, CredentialStore, Ticket};

// ---------------------------------------------------------------------------
// AuthConfig
// ---------------------------------------------------------------------------

/// Handshake settings shared by every session on a router.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Label put on every identity this router verifies.
    ///
    /// Default: `"userdb"`.
    pub authprovider: String,

    /// How long a challenged client has to answer before the pending
    /// record is dropped and the attach denied.
    ///
    /// Default: 10 seconds.
    pub response_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authprovider: "userdb".to_string(),
            response_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthMethod
// ---------------------------------------------------------------------------

/// Authentication methods this router can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Shared-secret ticket, compared verbatim.
    Ticket,
    /// HMAC-SHA256 signature over a one-time challenge.
    WampCra,
}

impl AuthMethod {
    /// Parses a method name offered in a hello. Unknown names are `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ticket" => Some(Self::Ticket),
            "wampcra" => Some(Self::WampCra),
            _ => None,
        }
    }

    /// The wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::WampCra => "wampcra",
        }
    }
}

// ---------------------------------------------------------------------------
// Identity / PendingAuth / AuthDecision
// ---------------------------------------------------------------------------

/// Who a session turned out to be. Only exists after an accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub authid: String,
    pub authrole: String,
    pub authmethod: String,
    pub authprovider: String,
}

/// The expectation recorded when a challenge goes out.
///
/// Owned by exactly one session and consumed by the next authenticate,
/// whatever its outcome.
#[derive(Debug)]
pub struct PendingAuth {
    ticket: Ticket,
    identity: Identity,
    /// The challenge string a WAMP-CRA client must sign. `None` for ticket.
    challenge: Option<String>,
    challenged_at: Instant,
}

impl PendingAuth {
    fn new(credential: Credential, method: AuthMethod, authprovider: &str) -> Self {
        let identity = Identity {
            authid: credential.authid,
            authrole: credential.authrole,
            authmethod: method.as_str().to_string(),
            authprovider: authprovider.to_string(),
        };
        let challenge = match method {
            AuthMethod::Ticket => None,
            AuthMethod::WampCra => Some(cra::new_challenge(&identity)),
        };
        Self {
            ticket: credential.ticket,
            identity,
            challenge,
            challenged_at: Instant::now(),
        }
    }

    /// The identity that will be granted if the client answers correctly.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.challenged_at.elapsed() >= timeout
    }

    fn verify(self, signature: &str) -> Result<Identity, AuthError> {
        let ok = match &self.challenge {
            None => self.ticket.verify(signature),
            Some(challenge) => cra::verify_signature(self.ticket.as_key(), challenge, signature),
        };
        if ok {
            Ok(self.identity)
        } else {
            Err(AuthError::WrongSecret {
                authid: self.identity.authid,
            })
        }
    }
}

/// What the session wants the router to do next.
#[derive(Debug)]
pub enum AuthDecision {
    /// Send a challenge for this method and wait for authenticate.
    /// `extra` is empty for ticket and carries the challenge string (and
    /// salt, if any) for WAMP-CRA.
    Challenge { authmethod: String, extra: Extra },
    /// Admit the session with this identity.
    Accept(Identity),
    /// Refuse the attach. The cause is for logs only.
    Deny(AuthError),
}

impl AuthDecision {
    pub fn is_challenge(&self) -> bool {
        matches!(self, Self::Challenge { .. })
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny(_))
    }
}

// ---------------------------------------------------------------------------
// HandshakeState
// ---------------------------------------------------------------------------

/// Where a session is in the attach handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing received yet.
    Anonymous,
    /// Hello received, credential lookup in flight.
    AwaitingHello,
    /// Challenge sent, a pending record is held.
    AwaitingResponse,
    /// Terminal: the session was admitted.
    Accepted,
    /// Terminal: the attach was refused.
    Denied,
}

impl HandshakeState {
    /// `Accepted` and `Denied` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Denied)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Anonymous => "Anonymous",
            Self::AwaitingHello => "AwaitingHello",
            Self::AwaitingResponse => "AwaitingResponse",
            Self::Accepted => "Accepted",
            Self::Denied => "Denied",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// AuthenticatingSession
// ---------------------------------------------------------------------------

/// Drives one client's attach from hello to accept or deny.
pub struct AuthenticatingSession<S: CredentialStore> {
    store: Arc<S>,
    config: AuthConfig,
    state: HandshakeState,
    pending: Option<PendingAuth>,
}

impl<S: CredentialStore> AuthenticatingSession<S> {
    /// Creates a session in the `Anonymous` state.
    pub fn new(store: Arc<S>, config: AuthConfig) -> Self {
        Self {
            store,
            config,
            state: HandshakeState::Anonymous,
            pending: None,
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// The identity a correct answer would grant, while a challenge is
    /// outstanding.
    pub fn pending_identity(&self) -> Option<&Identity> {
        self.pending.as_ref().map(PendingAuth::identity)
    }

    /// How long the router should wait for authenticate after a challenge.
    pub fn response_timeout(&self) -> Duration {
        self.config.response_timeout
    }

    /// Handles a hello.
    ///
    /// Picks the first offered method we support, looks up the claimed
    /// authid and either challenges or denies. Offers with no supported
    /// method are denied without touching the store.
    pub async fn hello(&mut self, details: &HelloDetails) -> AuthDecision {
        if self.state != HandshakeState::Anonymous {
            return self.misuse("hello on a session that already sent one");
        }
        self.state = HandshakeState::AwaitingHello;

        tracing::debug!(
            realm = %details.realm,
            authid = ?details.authid,
            authmethods = ?details.authmethods,
            "hello received"
        );

        let Some(method) = details
            .authmethods
            .iter()
            .find_map(|name| AuthMethod::parse(name))
        else {
            return self.deny(AuthError::UnsupportedMethod {
                offered: details.authmethods.clone(),
            });
        };

        let Some(authid) = details.authid.as_deref() else {
            return self.deny(AuthError::UnknownIdentity { authid: None });
        };

        match self.store.lookup(authid).await {
            Ok(Some(credential)) if !credential.ticket.is_empty() => {
                let salt = credential.salt.clone();
                let pending = PendingAuth::new(credential, method, &self.config.authprovider);
                let extra = match &pending.challenge {
                    Some(challenge) => cra::challenge_extra(challenge, salt.as_ref()),
                    None => Extra::new(),
                };
                self.pending = Some(pending);
                self.state = HandshakeState::AwaitingResponse;
                tracing::debug!(
                    authid,
                    authmethod = method.as_str(),
                    salted = salt.is_some(),
                    "challenge issued"
                );
                AuthDecision::Challenge {
                    authmethod: method.as_str().to_string(),
                    extra,
                }
            }
            Ok(_) => self.deny(AuthError::UnknownIdentity {
                authid: Some(authid.to_string()),
            }),
            Err(e) => self.deny(e),
        }
    }

    /// Handles the client's answer to a challenge.
    ///
    /// The pending record is consumed here, so a second authenticate
    /// always finds nothing to compare against and is denied.
    pub fn authenticate(&mut self, signature: &str, extra: &Extra) -> AuthDecision {
        if self.state != HandshakeState::AwaitingResponse {
            return self.misuse("authenticate without an outstanding challenge");
        }
        let Some(pending) = self.pending.take() else {
            return self.misuse("authenticate without an outstanding challenge");
        };

        tracing::debug!(
            authid = %pending.identity.authid,
            extra_keys = extra.len(),
            "authenticate received"
        );

        if pending.is_expired(self.config.response_timeout) {
            return self.deny(AuthError::HandshakeTimeout {
                authid: pending.identity.authid,
                timeout: self.config.response_timeout,
            });
        }

        match pending.verify(signature) {
            Ok(identity) => {
                self.state = HandshakeState::Accepted;
                tracing::info!(
                    authid = %identity.authid,
                    authrole = %identity.authrole,
                    authmethod = %identity.authmethod,
                    authprovider = %identity.authprovider,
                    "attach accepted"
                );
                AuthDecision::Accept(identity)
            }
            Err(e) => self.deny(e),
        }
    }

    /// Gives up on an outstanding challenge (the router's response timer
    /// fired). Drops the pending record and denies.
    pub fn expire(&mut self) -> AuthDecision {
        let authid = self
            .pending
            .as_ref()
            .map(|p| p.identity.authid.clone())
            .unwrap_or_default();
        self.deny(AuthError::HandshakeTimeout {
            authid,
            timeout: self.config.response_timeout,
        })
    }

    /// Denies because the client sent something the handshake doesn't
    /// accept at this point.
    pub fn reject(&mut self, what: &'static str) -> AuthDecision {
        self.misuse(what)
    }

    fn misuse(&mut self, what: &'static str) -> AuthDecision {
        self.deny(AuthError::ProtocolMisuse(what))
    }

    fn deny(&mut self, cause: AuthError) -> AuthDecision {
        self.pending = None;
        if !self.state.is_terminal() {
            self.state = HandshakeState::Denied;
        }

        if cause.is_infrastructure() {
            tracing::error!(error = %cause, "attach denied: credential store failure");
        } else {
            tracing::info!(reason = %cause, "attach denied");
        }

        AuthDecision::Deny(cause)
    }
}

// =========================================================================
// Tests
// =========================================================================
