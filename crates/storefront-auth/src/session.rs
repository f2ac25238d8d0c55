//! Session management.

use crate::{AuthError, BearerToken};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use storefront_commerce::ids::UserId;

/// A signed-in user's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Token sent with every cart request.
    pub token: BearerToken,
    /// User, if known.
    pub user_id: Option<UserId>,
    /// Unix timestamp of sign-in.
    pub created_at: i64,
    /// Unix timestamp the token stops being valid, if known.
    pub expires_at: Option<i64>,
}

impl AuthSession {
    /// Create a session for a token.
    pub fn new(token: BearerToken) -> Self {
        Self {
            token,
            user_id: None,
            created_at: current_timestamp(),
            expires_at: None,
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Expire the session `duration_secs` after creation.
    pub fn with_duration(mut self, duration_secs: i64) -> Self {
        self.expires_at = Some(self.created_at + duration_secs);
        self
    }

    /// Check if session is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| current_timestamp() > at)
            .unwrap_or(false)
    }

    /// Validate the session, returning error if invalid.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.is_expired() {
            Err(AuthError::SessionExpired)
        } else {
            Ok(())
        }
    }
}

/// Shared handle to the current session.
///
/// Cheap to clone; all clones see the same session. `epoch` increments on
/// every sign-in and sign-out so holders can tell whether the session they
/// started work under is still the current one.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<AuthSession>>>,
    epoch: Arc<AtomicU64>,
}

impl SessionHandle {
    /// A handle with nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle already signed in.
    pub fn signed_in(session: AuthSession) -> Self {
        let handle = Self::new();
        handle.sign_in(session);
        handle
    }

    /// Replace the current session.
    pub fn sign_in(&self, session: AuthSession) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(session);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("session signed in");
    }

    /// Sign out. Returns whether a session was active.
    pub fn sign_out(&self) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let was_active = guard.take().is_some();
        if was_active {
            self.epoch.fetch_add(1, Ordering::SeqCst);
        }
        was_active
    }

    /// Forget the session because the backend rejected it.
    pub fn invalidate(&self) {
        if self.sign_out() {
            tracing::warn!("session invalidated after the server rejected the token");
        }
    }

    /// Token of the current session.
    ///
    /// An expired session is dropped and reported as `SessionExpired`.
    pub fn bearer_token(&self) -> Result<BearerToken, AuthError> {
        {
            let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                None => return Err(AuthError::NotAuthenticated),
                Some(session) if !session.is_expired() => return Ok(session.token.clone()),
                Some(_) => {}
            }
        }
        self.sign_out();
        Err(AuthError::SessionExpired)
    }

    /// Check if a non-expired session is active.
    pub fn is_authenticated(&self) -> bool {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|s| !s.is_expired()).unwrap_or(false)
    }

    /// User of the current session.
    pub fn user_id(&self) -> Option<UserId> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().and_then(|s| s.user_id.clone())
    }

    /// Incremented on every sign-in and sign-out.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> AuthSession {
        AuthSession::new(BearerToken::new(token).unwrap())
    }

    #[test]
    fn test_signed_out_handle() {
        let handle = SessionHandle::new();
        assert!(!handle.is_authenticated());
        assert_eq!(handle.bearer_token(), Err(AuthError::NotAuthenticated));
    }

    #[test]
    fn test_clones_share_session() {
        let handle = SessionHandle::signed_in(session("abc").with_user(UserId::new("u1")));
        let clone = handle.clone();

        assert_eq!(clone.bearer_token().unwrap().expose(), "abc");
        assert_eq!(clone.user_id(), Some(UserId::new("u1")));

        handle.invalidate();
        assert!(!clone.is_authenticated());
    }

    #[test]
    fn test_expired_session_is_dropped() {
        let handle = SessionHandle::signed_in(session("abc").with_duration(-10));
        assert_eq!(handle.bearer_token(), Err(AuthError::SessionExpired));
        assert_eq!(handle.bearer_token(), Err(AuthError::NotAuthenticated));
    }

    #[test]
    fn test_epoch_tracks_sign_in_and_out() {
        let handle = SessionHandle::new();
        let start = handle.epoch();
        handle.sign_in(session("a"));
        handle.invalidate();
        handle.invalidate();
        assert_eq!(handle.epoch(), start + 2);
    }
}
