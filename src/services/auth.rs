// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase auth (GoTrue) client.
//!
//! Handles:
//! - Password sign-in, sign-up with metadata, sign-out
//! - Verification email resends
//! - Holding the current session and refreshing it before it expires
//! - Optional persistence of the session to a local file
//! - Broadcasting session changes to subscribers

use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, Mutex, RwLock};

/// Refresh the access token when it expires within this many seconds.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Buffered session-change events per subscriber.
const AUTH_EVENT_CAPACITY: usize = 32;

/// User record as returned by the auth backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form metadata supplied at sign-up (e.g. `{"name": "..."}`)
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp (seconds) at which the access token expires
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Fill in `expires_at` for a session just received from the backend.
    fn stamp_expiry(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self
                .expires_in
                .map(|secs| now.timestamp() + secs)
                .or_else(|| decode_unverified_claims(&self.access_token).map(|c| c.exp));
        }
        self
    }

    /// Whether the access token is expired or about to expire.
    ///
    /// Sessions with unknown expiry are treated as still valid.
    pub fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - EXPIRY_MARGIN_SECS <= now.timestamp())
    }
}

/// The one access-token claim the client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    pub exp: i64,
}

/// Read the claims of an access token without checking its signature.
///
/// Only the backend can verify its own tokens; the client just needs `exp`.
pub fn decode_unverified_claims(token: &str) -> Option<AccessTokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<AccessTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

/// Kind of session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A session transition pushed to subscribers.
#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

/// Result of a sign-up. Projects with email confirmation return only a user.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

/// Authentication operations of the backend.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Current session, refreshed first if it is about to expire.
    async fn get_session(&self) -> Result<Option<AuthSession>, AppError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpOutcome, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;

    /// Send the sign-up confirmation email again.
    async fn resend_signup_email(&self, email: &str) -> Result<(), AppError>;

    /// Subscribe to session changes. Events arrive in the order they happened.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// Access token of the current session, refreshed first if it is about
    /// to expire. `None` when signed out or when the refresh failed.
    async fn access_token(&self) -> Option<String>;
}

/// GoTrue HTTP client holding the current session.
pub struct GoTrueAuth {
    http: reqwest::Client,
    auth_url: String,
    api_key: String,
    session: RwLock<Option<AuthSession>>,
    /// Serializes refreshes so a refresh token is only spent once.
    refresh_lock: Mutex<()>,
    session_file: Option<PathBuf>,
    events: broadcast::Sender<AuthChange>,
}

impl GoTrueAuth {
    /// Create a client for `{base_url}/auth/v1`.
    ///
    /// When `session_file` is set, sessions are written there on every change;
    /// call [`GoTrueAuth::restore_persisted_session`] to pick up an earlier one.
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str, session_file: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Self {
            http,
            auth_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            session_file,
            events,
        }
    }

    /// Load the session persisted by an earlier run, if any.
    ///
    /// An unreadable file is logged and ignored. Returns whether a session was restored.
    pub async fn restore_persisted_session(&self) -> bool {
        let Some(path) = &self.session_file else {
            return false;
        };

        match load_session_file(path).await {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user.id, "Restored persisted auth session");
                *self.session.write().await = Some(session);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "Ignoring persisted auth session");
                false
            }
        }
    }

    /// Replace the current session, persist it and notify subscribers.
    async fn set_session(&self, session: Option<AuthSession>, event: AuthEvent) {
        *self.session.write().await = session.clone();

        if let Some(path) = &self.session_file {
            if let Err(e) = persist_session_file(path, session.as_ref()).await {
                tracing::warn!(error = %format!("{:#}", e), "Failed to persist auth session");
            }
        }

        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(AuthChange { event, session });
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(AppError::transport)?;

        let session: AuthSession = check_response_json(response).await?;
        Ok(session.stamp_expiry(Utc::now()))
    }
}

#[async_trait]
impl AuthGateway for GoTrueAuth {
    async fn get_session(&self) -> Result<Option<AuthSession>, AppError> {
        let current = self.session.read().await.clone();
        match current {
            Some(session) if session.is_expiring(Utc::now()) => {}
            other => return Ok(other),
        }

        // Another caller may have refreshed while we waited.
        let _guard = self.refresh_lock.lock().await;
        let current = self.session.read().await.clone();
        let Some(session) = current else {
            return Ok(None);
        };
        if !session.is_expiring(Utc::now()) {
            return Ok(Some(session));
        }

        tracing::debug!(user_id = %session.user.id, "Access token expiring, refreshing");
        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                self.set_session(Some(refreshed.clone()), AuthEvent::TokenRefreshed)
                    .await;
                Ok(Some(refreshed))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, dropping session");
                self.set_session(None, AuthEvent::SignedOut).await;
                Err(e)
            }
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(AppError::transport)?;

        let session: AuthSession = check_response_json(response).await?;
        let session = session.stamp_expiry(Utc::now());

        tracing::info!(user_id = %session.user.id, "Signed in");
        self.set_session(Some(session.clone()), AuthEvent::SignedIn)
            .await;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpOutcome, AppError> {
        let response = self
            .http
            .post(format!("{}/signup", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(AppError::transport)?;

        let body: serde_json::Value = check_response_json(response).await?;
        let outcome = parse_sign_up(body)?;

        if let Some(session) = &outcome.session {
            self.set_session(Some(session.clone()), AuthEvent::SignedIn)
                .await;
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let token = self.access_token().await;

        if let Some(token) = token {
            let response = self
                .http
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.api_key)
                .bearer_auth(token)
                .send()
                .await
                .map_err(AppError::transport)?;

            // The backend no longer knows this token; the session is over either way.
            let status = response.status();
            if matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            ) {
                tracing::debug!(status = %status, "Session already ended on the backend");
            } else {
                check_response(response).await?;
            }
        }

        tracing::info!("Signed out");
        self.set_session(None, AuthEvent::SignedOut).await;
        Ok(())
    }

    async fn resend_signup_email(&self, email: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/resend", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "type": "signup", "email": email }))
            .send()
            .await
            .map_err(AppError::transport)?;

        check_response(response).await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn access_token(&self) -> Option<String> {
        match self.get_session().await {
            Ok(session) => session.map(|s| s.access_token),
            Err(_) => None,
        }
    }
}

/// Sign-up answers with a full session when email confirmation is off,
/// and with the bare user object otherwise.
fn parse_sign_up(body: serde_json::Value) -> Result<SignUpOutcome, AppError> {
    if body.get("access_token").is_some() {
        let session: AuthSession = serde_json::from_value(body)
            .map_err(|e| AppError::Backend(format!("Invalid sign-up session: {}", e)))?;
        let session = session.stamp_expiry(Utc::now());
        return Ok(SignUpOutcome {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }

    let user = if let Some(user) = body.get("user") {
        serde_json::from_value(user.clone()).ok()
    } else {
        serde_json::from_value(body).ok()
    };
    Ok(SignUpOutcome {
        user,
        session: None,
    })
}

/// Error payloads differ between GoTrue versions.
#[derive(Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(auth_error(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(auth_error(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))
}

async fn auth_error(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message).or(b.error));

    if status.is_server_error() {
        return AppError::Backend(format!("HTTP {}: {}", status, message.unwrap_or(body)));
    }
    AppError::Auth(message.unwrap_or_else(|| format!("HTTP {}", status)))
}

/// Read a persisted session. A missing file is not an error.
async fn load_session_file(path: &Path) -> anyhow::Result<Option<AuthSession>> {
    let data = match tokio::fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", path.display()));
        }
    };

    let session = serde_json::from_str(&data)
        .with_context(|| format!("parsing session file {}", path.display()))?;
    Ok(Some(session))
}

/// Write the session to `path`, or remove the file when signed out.
async fn persist_session_file(path: &Path, session: Option<&AuthSession>) -> anyhow::Result<()> {
    match session {
        Some(session) => {
            let data = serde_json::to_string(session).context("serializing auth session")?;
            tokio::fs::write(path, data)
                .await
                .with_context(|| format!("writing {}", path.display()))
        }
        None => match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other.with_context(|| format!("removing {}", path.display())),
        },
    }
}
