//! Session authority: issues and validates opaque bearer tokens.
//!
//! Owns the token -> account mapping exclusively. Every connection task
//! calls into the same instance concurrently, so the map is a `DashMap`;
//! no caller-side synchronization is needed.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// One live session.
///
/// `created_at` is recorded for a future TTL sweep; no expiry is enforced
/// today, so a session lives until logout, account deletion, or process
/// exit.
#[derive(Debug, Clone)]
pub struct Session {
    pub cpf: String,
    pub created_at: DateTime<Utc>,
}

/// Token authority shared by all connections.
#[derive(Debug, Default)]
pub struct SessionAuthority {
    sessions: DashMap<String, Session>,
}

impl SessionAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for `cpf`. Never fails.
    ///
    /// Tokens are v4 UUIDs; the entry API re-draws on the (cosmically
    /// unlikely) collision with a live token, so the returned token is
    /// unique among current sessions.
    pub fn create_session(&self, cpf: &str) -> String {
        loop {
            let token = Uuid::new_v4().to_string();
            match self.sessions.entry(token.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Session {
                        cpf: cpf.to_string(),
                        created_at: Utc::now(),
                    });
                    tracing::debug!(cpf, token, "session created");
                    return token;
                }
                Entry::Occupied(_) => continue,
            }
        }
    }

    /// Look up the account behind `token`.
    ///
    /// Unknown and revoked tokens return `None`; callers treat that as an
    /// authentication failure, never as a fault.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.sessions.get(token).map(|s| s.cpf.clone())
    }

    /// Remove `token`. Idempotent: revoking an unknown token is a no-op.
    pub fn revoke(&self, token: &str) {
        if let Some((_, session)) = self.sessions.remove(token) {
            tracing::debug!(cpf = session.cpf, "session revoked");
        }
    }

    /// Remove every live session belonging to `cpf`.
    ///
    /// Used when an account is deleted so stale tokens on other
    /// connections fail as InvalidSession instead of dangling.
    pub fn revoke_account(&self, cpf: &str) {
        self.sessions.retain(|_, session| session.cpf != cpf);
    }

    /// Number of live sessions, for logging.
    pub fn live_count(&self) -> usize {
        self.sessions.len()
    }
}
