//! Explicit access-credential session for the music provider.
//!
//! The credential is passed to each collaborator that needs it instead of
//! living in process-wide state, and its expiry is plain data.

use std::fmt;
use std::time::{Duration, SystemTime};

#[derive(Clone)]
pub struct Session {
    access_token: String,
    expires_at: Option<SystemTime>,
}

impl Session {
    /// Session without a known expiry.
    pub fn new(access_token: &str) -> Self {
        Session { access_token: access_token.to_string(), expires_at: None }
    }

    pub fn with_expiry(mut self, expires_at: SystemTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Session expiring `lifetime` from now, as reported by a token response.
    pub fn expiring_in(access_token: &str, lifetime: Duration) -> Self {
        Session::new(access_token).with_expiry(SystemTime::now() + lifetime)
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.access_token.is_empty() || self.expires_at.map_or(false, |at| now >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the token itself
        let prefix: String = self.access_token.chars().take(4).collect();
        f.debug_struct("Session")
            .field("access_token", &format!("{}…", prefix))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
