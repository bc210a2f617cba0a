//! In-memory login sessions.
//!
//! A successful login issues an opaque token; requests present it in the
//! [`SESSION_HEADER`] header. Tokens expire after the store's time-to-live and do not
//! survive a restart.

use chrono::{DateTime, Duration, Utc};
use perisentez_core::Username;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Header carrying the session token on authenticated requests.
pub const SESSION_HEADER: &str = "x-session-token";

/// Default session lifetime: one clinic shift.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone)]
struct Session {
    username: Username,
    issued_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.issued_at >= self.ttl
    }

    /// Starts a session for `username` and returns its token. Expired sessions are pruned.
    pub fn issue(&self, username: Username) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();

        let mut sessions = self.sessions.write().unwrap_or_else(|p| {
            tracing::error!("session store lock poisoned; recovering");
            p.into_inner()
        });
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        if sessions.len() < before {
            tracing::debug!(pruned = before - sessions.len(), "pruned expired sessions");
        }
        sessions.insert(
            token.clone(),
            Session {
                username,
                issued_at: now,
            },
        );
        token
    }

    /// Returns the clinician owning `token`, if the session is active and not expired.
    pub fn resolve(&self, token: &str) -> Option<Username> {
        let sessions = self.sessions.read().unwrap_or_else(|p| p.into_inner());
        sessions
            .get(token)
            .filter(|s| !self.is_expired(s, Utc::now()))
            .map(|s| s.username.clone())
    }

    /// Ends a session. Returns whether the token was active.
    pub fn revoke(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|p| p.into_inner());
        match sessions.remove(token) {
            Some(s) => !self.is_expired(&s, Utc::now()),
            None => false,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}
