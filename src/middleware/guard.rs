// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation guard.
//!
//! Every guarded request first waits for session initialization, then is
//! checked against the route table: protected views redirect anonymous
//! visitors to the login view, protected actions answer 401.

use crate::error::AppError;
use crate::routes::{route_meta, RouteKind, LOGIN_PATH};
use crate::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Middleware applied to every routed request.
pub async fn navigation_guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    // Block until the session restore finished so the auth check below is meaningful.
    if !state.session.is_initialized().await {
        state.session.init().await;
    }

    let meta = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| route_meta(path.as_str()));

    if let Some(meta) = meta {
        if meta.requires_auth && !state.session.is_authenticated().await {
            tracing::debug!(path = meta.path, "Anonymous request to protected route");
            return match meta.kind {
                RouteKind::View => Redirect::to(LOGIN_PATH).into_response(),
                RouteKind::Action => AppError::Unauthorized.into_response(),
            };
        }
    }

    next.run(request).await
}
