// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers and the route table the navigation guard reads.

pub mod api;
pub mod auth;

use crate::middleware::navigation_guard;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Where anonymous visitors of protected views are sent.
pub const LOGIN_PATH: &str = "/login";

/// What a route serves, which decides how the guard refuses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// A page the front end navigates to; refused with a redirect to login.
    View,
    /// An operation on the stores; refused with 401.
    Action,
}

/// Static description of a route.
#[derive(Debug, Clone, Copy)]
pub struct RouteMeta {
    pub path: &'static str,
    pub name: &'static str,
    pub kind: RouteKind,
    pub requires_auth: bool,
}

const fn route(path: &'static str, name: &'static str, kind: RouteKind, requires_auth: bool) -> RouteMeta {
    RouteMeta {
        path,
        name,
        kind,
        requires_auth,
    }
}

/// Every guarded route. Paths are axum route patterns.
pub const ROUTES: &[RouteMeta] = &[
    route(LOGIN_PATH, "login", RouteKind::View, false),
    route("/", "map", RouteKind::View, true),
    route("/stats", "stats", RouteKind::View, true),
    route("/register", "register", RouteKind::Action, false),
    route("/resend-verification", "resend-verification", RouteKind::Action, false),
    route("/logout", "logout", RouteKind::Action, true),
    route("/filters", "filters", RouteKind::Action, true),
    route("/selection", "clear-selection", RouteKind::Action, true),
    route("/selection/{peak_id}", "select-peak", RouteKind::Action, true),
    route("/checkins", "checkins", RouteKind::Action, true),
    route("/checkins/{checkin_id}", "checkin", RouteKind::Action, true),
];

/// Look up a route by its matched pattern.
pub fn route_meta(path: &str) -> Option<&'static RouteMeta> {
    ROUTES.iter().find(|r| r.path == path)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Everything the guard sees; the health probe stays outside it.
    let guarded = Router::new()
        .merge(auth::routes())
        .merge(api::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            navigation_guard,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(guarded)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        let login = route_meta("/login").unwrap();
        assert!(!login.requires_auth);
        assert_eq!(login.kind, RouteKind::View);

        for path in ["/", "/stats"] {
            let meta = route_meta(path).unwrap();
            assert!(meta.requires_auth, "{} should require auth", path);
            assert_eq!(meta.kind, RouteKind::View);
        }

        assert!(route_meta("/checkins/{checkin_id}").unwrap().requires_auth);
        assert!(!route_meta("/register").unwrap().requires_auth);
        assert!(route_meta("/nowhere").is_none());
    }

    #[test]
    fn test_route_names_are_unique() {
        let mut names: Vec<_> = ROUTES.iter().map(|r| r.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ROUTES.len());
    }
}
