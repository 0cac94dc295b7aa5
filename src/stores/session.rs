// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: the signed-in user and the auth flows around it.
//!
//! Every operation catches backend failures, logs them, and reports a
//! boolean (plus the `error` field) instead of propagating.

use crate::models::User;
use crate::services::auth::{AuthChange, AuthGateway};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Observable session state.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<User>,
    pub is_loading: bool,
    pub is_initialized: bool,
    /// Message of the last failed login, registration or resend
    pub error: Option<String>,
    pub is_logging_in: bool,
    pub is_registering: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Owner of the current user.
pub struct SessionStore {
    auth: Arc<dyn AuthGateway>,
    state: RwLock<SessionState>,
    /// Serializes `init` so only one session restore runs.
    init_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthGateway>) -> Self {
        Self {
            auth,
            state: RwLock::new(SessionState::default()),
            init_lock: Mutex::new(()),
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn user_id(&self) -> Option<String> {
        self.state.read().await.user.as_ref().map(|u| u.id.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_initialized
    }

    /// Restore an existing session. Runs once; later calls return immediately.
    ///
    /// The store counts as initialized afterwards even if the restore failed,
    /// so navigation is never blocked on a broken backend.
    pub async fn init(&self) {
        let _guard = self.init_lock.lock().await;
        if self.is_initialized().await {
            return;
        }

        self.state.write().await.is_loading = true;
        let result = self.auth.get_session().await;

        let mut state = self.state.write().await;
        match result {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user.id, "Session restored");
                state.user = Some(User::from(&session.user));
            }
            Ok(None) => tracing::debug!("No existing session"),
            Err(e) => tracing::error!(error = %e, "Error initializing session"),
        }
        state.is_initialized = true;
        state.is_loading = false;
    }

    /// Keep the user in sync with session changes pushed by the backend
    /// (token refresh, expiry, sign-in or sign-out elsewhere).
    ///
    /// Changes are applied in the order they arrive.
    pub fn setup_session_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.auth.subscribe();
        let store = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(change) => store.apply_session_change(&change).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Session listener fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Apply one session change: a session means signed in, none means signed out.
    pub async fn apply_session_change(&self, change: &AuthChange) {
        let mut state = self.state.write().await;
        match &change.session {
            Some(session) => {
                tracing::debug!(event = ?change.event, user_id = %session.user.id, "Session changed");
                state.user = Some(User::from(&session.user));
            }
            None => {
                tracing::debug!(event = ?change.event, "Session ended");
                state.user = None;
            }
        }
    }

    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        {
            let mut state = self.state.write().await;
            state.is_logging_in = true;
            state.error = None;
        }

        let result = self.auth.sign_in_with_password(email, password).await;

        let mut state = self.state.write().await;
        state.is_logging_in = false;
        match result {
            Ok(session) => {
                state.user = Some(User::from(&session.user));
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Login error");
                state.error = Some(e.to_string());
                false
            }
        }
    }

    /// Create an account with `name` as its display name, then ask for the
    /// verification email. Whether that email goes out does not change the result.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> bool {
        {
            let mut state = self.state.write().await;
            state.is_registering = true;
            state.error = None;
        }

        let result = self
            .auth
            .sign_up(email, password, serde_json::json!({ "name": name }))
            .await;

        let ok = match result {
            Ok(outcome) => {
                let user_id = outcome.user.as_ref().map(|u| u.id.as_str());
                tracing::info!(user_id = ?user_id, "Account registered");
                if !email.is_empty() {
                    if let Err(e) = self.auth.resend_signup_email(email).await {
                        tracing::warn!(error = %e, "Verification email resend failed");
                    }
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Register error");
                self.state.write().await.error = Some(e.to_string());
                false
            }
        };

        self.state.write().await.is_registering = false;
        ok
    }

    /// Sign out. The local user is cleared only when the backend confirms.
    pub async fn logout(&self) -> bool {
        self.state.write().await.is_loading = true;

        let result = self.auth.sign_out().await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(()) => {
                state.user = None;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Logout error");
                false
            }
        }
    }

    /// Send the sign-up verification email again.
    pub async fn resend_verification_email(&self, email: &str) -> bool {
        match self.auth.resend_signup_email(email).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Resend verification error");
                self.state.write().await.error = Some(e.to_string());
                false
            }
        }
    }
}
