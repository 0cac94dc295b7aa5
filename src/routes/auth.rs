// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login view and account routes.

use axum::{extract::State, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::routes::LOGIN_PATH;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(LOGIN_PATH, get(login_view).post(login))
        .route("/register", post(register))
        .route("/resend-verification", post(resend_verification))
        .route("/logout", post(logout))
}

/// Session state as shown on the login view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginView {
    pub authenticated: bool,
    pub user: Option<User>,
    pub error: Option<String>,
    pub is_logging_in: bool,
    pub is_registering: bool,
}

async fn login_view(State(state): State<Arc<AppState>>) -> Json<LoginView> {
    let session = state.session.snapshot().await;
    Json(LoginView {
        authenticated: session.is_authenticated(),
        user: session.user,
        error: session.error,
        is_logging_in: session.is_logging_in,
        is_registering: session.is_registering,
    })
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 64, message = "name must be 1-64 characters"))]
    pub name: String,
}

#[derive(Deserialize, Validate)]
pub struct ResendRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

fn validate<T: Validate>(request: &T) -> Result<()> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// The error the session store recorded for a failed flow.
async fn session_error(state: &AppState, fallback: &str) -> AppError {
    let message = state.session.snapshot().await.error;
    AppError::Auth(message.unwrap_or_else(|| fallback.to_string()))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    validate(&request)?;

    if !state.session.login(&request.email, &request.password).await {
        return Err(session_error(&state, "Login failed").await);
    }

    // Pick up the new user's check-ins if the domain was loaded before.
    state.domain.load_checkins().await;

    Ok(Json(AuthResponse {
        success: true,
        user: state.session.user().await,
    }))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    validate(&request)?;

    if !state
        .session
        .register(&request.email, &request.password, &request.name)
        .await
    {
        return Err(session_error(&state, "Registration failed").await);
    }

    Ok(Json(AuthResponse {
        success: true,
        user: None,
    }))
}

async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResendRequest>,
) -> Result<Json<AuthResponse>> {
    validate(&request)?;

    if !state.session.resend_verification_email(&request.email).await {
        return Err(session_error(&state, "Could not resend verification email").await);
    }

    Ok(Json(AuthResponse {
        success: true,
        user: None,
    }))
}

async fn logout(State(state): State<Arc<AppState>>) -> Result<Json<AuthResponse>> {
    if !state.session.logout().await {
        return Err(AppError::Backend("Sign-out failed".to_string()));
    }

    Ok(Json(AuthResponse {
        success: true,
        user: None,
    }))
}
