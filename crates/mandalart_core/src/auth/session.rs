//! Session verification seam and the session manager.
//!
//! # Responsibility
//! - Define the contract the host implements against its auth provider.
//! - Hold the signed-in session for one client with explicit lifecycle.
//!
//! # Invariants
//! - The manager never caches an expired session.
//! - A verifier error never clears a session the caller did not ask to drop.

use crate::model::board::UserId;
use crate::routing::cookie::{CookieJar, SetCookie};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};

/// Authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: Option<String>,
    /// Epoch ms after which the session is no longer valid.
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired_at(&self, now_epoch_ms: i64) -> bool {
        now_epoch_ms >= self.expires_at
    }
}

/// Outcome of one cookie-based session check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCheck {
    pub session: Option<Session>,
    /// Cookies the provider rotated during the check; forward them as is.
    pub refreshed_cookies: Vec<SetCookie>,
}

impl SessionCheck {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session) -> Self {
        Self {
            session: Some(session),
            refreshed_cookies: Vec::new(),
        }
    }
}

/// Session-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Auth provider could not be reached or rejected the call.
    Provider(String),
    /// Session cookie exists but cannot be decoded.
    MalformedCookie(String),
    /// Operation needs a signed-in user.
    NotSignedIn,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(message) => write!(f, "auth provider error: {message}"),
            Self::MalformedCookie(name) => write!(f, "malformed session cookie `{name}`"),
            Self::NotSignedIn => write!(f, "no signed-in user"),
        }
    }
}

impl Error for SessionError {}

/// Cookie-based session check against the auth provider.
pub trait SessionVerifier {
    fn verify(&self, cookies: &CookieJar) -> Result<SessionCheck, SessionError>;
}

impl<T: SessionVerifier + ?Sized> SessionVerifier for &T {
    fn verify(&self, cookies: &CookieJar) -> Result<SessionCheck, SessionError> {
        (**self).verify(cookies)
    }
}

impl<T: SessionVerifier + ?Sized> SessionVerifier for std::sync::Arc<T> {
    fn verify(&self, cookies: &CookieJar) -> Result<SessionCheck, SessionError> {
        (**self).verify(cookies)
    }
}

/// Holds the current session for one client.
pub struct SessionManager<V: SessionVerifier> {
    verifier: V,
    current: Mutex<Option<Session>>,
}

impl<V: SessionVerifier> SessionManager<V> {
    pub fn new(verifier: V) -> Self {
        Self {
            verifier,
            current: Mutex::new(None),
        }
    }

    /// Re-checks the session from `cookies` and stores the result.
    ///
    /// Expired sessions are treated as signed out. On verifier error the
    /// previous state is kept and the error is returned.
    pub fn refresh(
        &self,
        cookies: &CookieJar,
        now_epoch_ms: i64,
    ) -> Result<SessionCheck, SessionError> {
        let mut check = match self.verifier.verify(cookies) {
            Ok(check) => check,
            Err(err) => {
                warn!("event=session_refresh module=auth status=error error={err}");
                return Err(err);
            }
        };
        if check
            .session
            .as_ref()
            .is_some_and(|session| session.is_expired_at(now_epoch_ms))
        {
            check.session = None;
        }

        let mut current = self.lock();
        let was_signed_in = current.is_some();
        *current = check.session.clone();
        if was_signed_in != current.is_some() {
            info!(
                "event=session_change module=auth status=ok signed_in={}",
                current.is_some()
            );
        }
        Ok(check)
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().clone()
    }

    /// Returns the signed-in user id or `NotSignedIn`.
    pub fn require_user(&self) -> Result<UserId, SessionError> {
        self.lock()
            .as_ref()
            .map(|session| session.user_id)
            .ok_or(SessionError::NotSignedIn)
    }

    /// Drops the local session. The caller clears provider cookies.
    pub fn sign_out(&self) {
        if self.lock().take().is_some() {
            info!("event=session_change module=auth status=ok signed_in=false");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
