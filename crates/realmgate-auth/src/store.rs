//! Credential storage for ticket and WAMP-CRA authentication.
//!
//! The handshake doesn't care where credentials live. It talks to a
//! [`CredentialStore`]: one async lookup and one add. [`UserDb`] is the
//! in-memory implementation the router ships with; a database or
//! directory-backed store implements the same trait and reports outages
//! as [`AuthError::StoreUnavailable`].
//!
//! # A note on tickets
//!
//! A ticket is a shared secret compared verbatim against the client's
//! response. It's fine for demos and tests. A production deployment wants
//! [`Credential::salted`] instead: the store keeps only a PBKDF2-derived
//! key, and clients prove they know the password with WAMP-CRA.

use std::collections::HashMap;
use std::fmt;

use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::AuthError;
use crate::cra::{self, SaltParams};

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// A shared-secret ticket.
///
/// Deliberately not `PartialEq`: the only way to compare a ticket is
/// [`Ticket::verify`], which runs in constant time. `Debug` never prints
/// the secret.
#[derive(Clone)]
pub struct Ticket(String);

impl Ticket {
    /// Wraps a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns `true` if the ticket is the empty string. An empty ticket
    /// can never be used to authenticate.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks a client's signature against this ticket.
    ///
    /// Runs in time independent of where the two strings first differ.
    /// Length differences still return early.
    pub fn verify(&self, signature: &str) -> bool {
        self.0.as_bytes().ct_eq(signature.as_bytes()).into()
    }

    /// The secret as an HMAC key.
    pub(crate) fn as_key(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ticket(****)")
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// One stored identity: who, with which role, proven by which secret.
#[derive(Debug, Clone)]
pub struct Credential {
    /// The identity a client claims in its hello.
    pub authid: String,
    /// The role granted once the identity is proven.
    pub authrole: String,
    /// The secret the client must present (ticket) or sign with
    /// (WAMP-CRA). For a salted credential this is the derived key.
    pub ticket: Ticket,
    /// Set when `ticket` holds a PBKDF2-derived key rather than the
    /// password itself.
    pub salt: Option<SaltParams>,
}

impl Credential {
    /// Builds a credential from plain strings.
    pub fn new(
        authid: impl Into<String>,
        authrole: impl Into<String>,
        ticket: impl Into<String>,
    ) -> Self {
        Self {
            authid: authid.into(),
            authrole: authrole.into(),
            ticket: Ticket::new(ticket),
            salt: None,
        }
    }

    /// Builds a credential that keeps only the key derived from
    /// `password`. Clients attach with WAMP-CRA and derive the same key
    /// from the salt sent in the challenge.
    pub fn salted(
        authid: impl Into<String>,
        authrole: impl Into<String>,
        password: &str,
        params: SaltParams,
    ) -> Self {
        Self {
            authid: authid.into(),
            authrole: authrole.into(),
            ticket: Ticket::new(cra::derive_key(password, &params)),
            salt: Some(params),
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Looks up and stores credentials by authid.
///
/// `Send + Sync + 'static` because one store is shared (behind an `Arc`)
/// by every connection task for the life of the router.
///
/// # Example
///
/// ```rust
/// use realmgate_auth::{AuthError, Credential, CredentialStore};
///
/// /// A store that is always down. Every attach gets denied, and the
/// /// router logs the outage at error level.
/// struct Offline;
///
/// impl CredentialStore for Offline {
///     async fn lookup(&self, _authid: &str) -> Result<Option<Credential>, AuthError> {
///         Err(AuthError::StoreUnavailable("maintenance".into()))
///     }
///
///     async fn add(&self, _credential: Credential) -> Result<(), AuthError> {
///         Err(AuthError::StoreUnavailable("maintenance".into()))
///     }
/// }
/// ```
pub trait CredentialStore: Send + Sync + 'static {
    /// Finds the credential for `authid`.
    ///
    /// # Returns
    /// - `Ok(Some(credential))`: the identity exists
    /// - `Ok(None)`: no such identity. A normal outcome, not a fault
    /// - `Err(AuthError::StoreUnavailable)`: the store couldn't answer
    fn lookup(
        &self,
        authid: &str,
    ) -> impl Future<Output = Result<Option<Credential>, AuthError>> + Send;

    /// Inserts a credential, replacing any existing one for the same
    /// authid (last write wins).
    fn add(
        &self,
        credential: Credential,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;
}

// ---------------------------------------------------------------------------
// UserDb
// ---------------------------------------------------------------------------

/// In-memory [`CredentialStore`].
///
/// Lookups take a shared read lock, so any number of handshakes can look
/// up concurrently; `add` takes the write lock, so a reader sees either the
/// old credential or the new one, never a mix.
#[derive(Debug, Default)]
pub struct UserDb {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl UserDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a database pre-seeded with `credentials`. Later entries
    /// overwrite earlier ones with the same authid.
    pub fn with_credentials(
        credentials: impl IntoIterator<Item = Credential>,
    ) -> Self {
        let map = credentials
            .into_iter()
            .map(|c| (c.authid.clone(), c))
            .collect();
        Self {
            credentials: RwLock::new(map),
        }
    }

    /// Returns the number of stored identities.
    pub async fn len(&self) -> usize {
        self.credentials.read().await.len()
    }

    /// Returns `true` if no identities are stored.
    pub async fn is_empty(&self) -> bool {
        self.credentials.read().await.is_empty()
    }
}

impl CredentialStore for UserDb {
    async fn lookup(
        &self,
        authid: &str,
    ) -> Result<Option<Credential>, AuthError> {
        Ok(self.credentials.read().await.get(authid).cloned())
    }

    async fn add(&self, credential: Credential) -> Result<(), AuthError> {
        let authid = credential.authid.clone();
        let replaced = self
            .credentials
            .write()
            .await
            .insert(authid.clone(), credential)
            .is_some();
        tracing::debug!(%authid, replaced, "credential stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_ticket_verify_matches_exact_secret_only() {
        let ticket = Ticket::new("magic_secret_1");
        assert!(ticket.verify("magic_secret_1"));
        assert!(!ticket.verify("magic_secret_2"));
        assert!(!ticket.verify("magic_secret_1 "));
        assert!(!ticket.verify("magic"));
        assert!(!ticket.verify(""));
    }

    #[test]
    fn test_ticket_debug_never_prints_secret() {
        let credential = Credential::new("peter", "user", "magic_secret_1");
        let printed = format!("{credential:?}");
        assert!(printed.contains("peter"));
        assert!(!printed.contains("magic_secret_1"));
    }

    #[test]
    fn test_salted_credential_never_holds_the_password() {
        let credential =
            Credential::salted("alice", "user", "secret1", SaltParams::new("salt123"));
        assert!(!credential.ticket.verify("secret1"));
        assert!(credential
            .ticket
            .verify("64xfzBvZhGDT7PB0bQwDeI8/WR1M9x6Cw5dt0yP9koc="));
        assert_eq!(credential.salt, Some(SaltParams::new("salt123")));
    }

    #[tokio::test]
    async fn test_lookup_unknown_authid_returns_none() {
        let db = UserDb::new();
        assert!(db.lookup("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_then_lookup_returns_role_and_ticket() {
        let db = UserDb::new();
        db.add(Credential::new("peter", "user", "magic_secret_1"))
            .await
            .unwrap();

        let found = db.lookup("peter").await.unwrap().expect("peter exists");
        assert_eq!(found.authrole, "user");
        assert!(found.ticket.verify("magic_secret_1"));
    }

    #[tokio::test]
    async fn test_add_existing_authid_last_write_wins() {
        let db = UserDb::new();
        db.add(Credential::new("joe", "user", "old")).await.unwrap();
        db.add(Credential::new("joe", "admin", "new")).await.unwrap();

        let found = db.lookup("joe").await.unwrap().unwrap();
        assert_eq!(found.authrole, "admin");
        assert!(found.ticket.verify("new"));
        assert!(!found.ticket.verify("old"));
        assert_eq!(db.len().await, 1);
    }

    #[tokio::test]
    async fn test_with_credentials_seeds_all_entries() {
        let db = UserDb::with_credentials([
            Credential::new("peter", "user", "magic_secret_1"),
            Credential::new("joe", "user", "magic_secret_2"),
        ]);
        assert_eq!(db.len().await, 2);
        assert!(!db.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_and_adds_see_whole_credentials() {
        let db = Arc::new(UserDb::new());
        db.add(Credential::new("peter", "user", "v0")).await.unwrap();

        let writer = {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                for i in 1..50 {
                    db.add(Credential::new("peter", format!("role{i}"), format!("v{i}")))
                        .await
                        .unwrap();
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let db = Arc::clone(&db);
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let c = db.lookup("peter").await.unwrap().unwrap();
                    // Role and ticket were written together, so they agree.
                    let n = c.authrole.trim_start_matches("role");
                    let n = if n == "user" { "0" } else { n };
                    assert!(c.ticket.verify(&format!("v{n}")));
                }
            }));
        }

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
    }
}
