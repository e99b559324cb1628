//! # Auth Slice
//!
//! Owns the session state. Login and register are not optimistic (there is
//! no local entity to propose before the server answers), so they run as
//! loading-flag async calls. The durable session (token + user record) is
//! written best-effort alongside the in-memory transition; `check_auth`
//! restores it on app start without a network round trip, trusting the
//! persisted token until a later authenticated call fails with an auth error.

use log::{info, warn};
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::models::AuthUser;
use crate::session::{decode_user, encode_user, SessionStore, TOKEN_KEY, USER_KEY};
use crate::store::{AuthState, StateCell};

#[derive(Clone)]
pub struct AuthSlice {
    state: Arc<StateCell>,
    backend: Arc<Backend>,
    session: Arc<dyn SessionStore>,
}

impl AuthSlice {
    pub(crate) fn new(
        state: Arc<StateCell>,
        backend: Arc<Backend>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        AuthSlice { state, backend, session }
    }

    // --- getters the UI subscribes to ---

    pub fn is_authenticated(&self) -> bool {
        self.state.read(|s| s.auth.is_authenticated)
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.state.read(|s| s.auth.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.state.read(|s| s.auth.token.clone())
    }

    pub fn loading(&self) -> bool {
        self.state.read(|s| s.auth.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.state.read(|s| s.auth.error.clone())
    }

    // --- operations ---

    /// Sign in. Returns true on success; on failure the error is recorded on
    /// the slice and `is_authenticated` stays false.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        if email.trim().is_empty() || password.is_empty() {
            self.state.update(|s| {
                s.auth.error = Some("Email and password are required".to_string());
            });
            return false;
        }
        self.state.update(|s| {
            s.auth.loading = true;
            s.auth.error = None;
        });
        match self.backend.sign_in(email, password).await {
            Ok(payload) => {
                let user = AuthUser::from(payload.user);
                self.persist_session(&payload.token, &user);
                self.state.update(|s| {
                    s.auth = AuthState {
                        is_authenticated: true,
                        user: Some(user.clone()),
                        token: Some(payload.token.clone()),
                        loading: false,
                        error: None,
                    };
                });
                info!("signed in as {}", user.email);
                true
            }
            Err(e) => {
                self.fail_auth(e);
                false
            }
        }
    }

    /// Create an account and sign in. Same contract as [`Self::login`].
    pub async fn register(&self, email: &str, password: &str, name: &str) -> bool {
        if email.trim().is_empty() || password.is_empty() || name.trim().is_empty() {
            self.state.update(|s| {
                s.auth.error = Some("Email, password and name are required".to_string());
            });
            return false;
        }
        self.state.update(|s| {
            s.auth.loading = true;
            s.auth.error = None;
        });
        match self.backend.sign_up(email, password, name).await {
            Ok(payload) => {
                let user = AuthUser::from(payload.user);
                self.persist_session(&payload.token, &user);
                self.state.update(|s| {
                    s.auth = AuthState {
                        is_authenticated: true,
                        user: Some(user.clone()),
                        token: Some(payload.token.clone()),
                        loading: false,
                        error: None,
                    };
                });
                info!("registered {}", user.email);
                true
            }
            Err(e) => {
                self.fail_auth(e);
                false
            }
        }
    }

    /// Sign out. Local state and durable storage are cleared unconditionally;
    /// a failing remote sign-out never blocks a local logout.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.sign_out().await {
            warn!("remote sign-out failed, clearing local session anyway: {e}");
        }
        self.backend.set_session_token(None);
        if let Err(e) = self.session.remove(TOKEN_KEY) {
            warn!("failed to remove stored token: {e}");
        }
        if let Err(e) = self.session.remove(USER_KEY) {
            warn!("failed to remove stored user: {e}");
        }
        self.state.update(|s| {
            s.auth = AuthState::default();
        });
        info!("signed out");
    }

    /// Restore the session from durable storage. No network call: the
    /// persisted token is trusted until a later call fails with `Auth`.
    pub async fn check_auth(&self) {
        let token = match self.session.get(TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => return,
            Err(e) => {
                warn!("session restore failed reading token: {e}");
                return;
            }
        };
        let user = match self.session.get(USER_KEY) {
            Ok(Some(raw)) => match decode_user(&raw) {
                Ok(user) => user,
                Err(e) => {
                    warn!("session restore failed parsing user: {e}");
                    return;
                }
            },
            Ok(None) => return,
            Err(e) => {
                warn!("session restore failed reading user: {e}");
                return;
            }
        };
        self.backend.set_session_token(Some(token.clone()));
        self.state.update(|s| {
            s.auth = AuthState {
                is_authenticated: true,
                user: Some(user),
                token: Some(token),
                loading: false,
                error: None,
            };
        });
        info!("session restored from storage");
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.auth.error = None);
    }

    /// Best-effort sequential writes of the two durable keys. A failure
    /// after the first write leaves a documented inconsistency window; the
    /// in-memory session is still established.
    fn persist_session(&self, token: &str, user: &AuthUser) {
        if let Err(e) = self.session.set(TOKEN_KEY, token) {
            warn!("failed to persist token: {e}");
            return;
        }
        match encode_user(user) {
            Ok(encoded) => {
                if let Err(e) = self.session.set(USER_KEY, &encoded) {
                    warn!("failed to persist user record: {e}");
                }
            }
            Err(e) => warn!("failed to encode user record: {e}"),
        }
    }

    fn fail_auth(&self, error: BackendError) {
        self.state.update(|s| {
            s.auth.loading = false;
            s.auth.is_authenticated = false;
            s.auth.error = Some(error.to_string());
        });
    }
}
