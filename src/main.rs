// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Peak Tracker server
//!
//! Holds one user's session and peak/check-in state, synchronized with
//! Supabase, and serves the views the front end renders.

use peak_tracker::{
    config::Config,
    db::PostgrestDb,
    services::GoTrueAuth,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = %config.supabase_url,
        "Starting Peak Tracker"
    );
    if config.supabase_anon_key.is_empty() {
        tracing::warn!("SUPABASE_ANON_KEY is not set; backend requests will be anonymous");
    }

    // One HTTP client shared by auth and table requests
    let http = reqwest::Client::new();

    let auth = Arc::new(GoTrueAuth::new(
        http.clone(),
        &config.supabase_url,
        &config.supabase_anon_key,
        config.session_file.clone(),
    ));
    auth.restore_persisted_session().await;
    let db = Arc::new(PostgrestDb::new(
        http,
        &config.supabase_url,
        &config.supabase_anon_key,
        auth.clone(),
    ));

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), auth, db));

    // Mirror session changes (refresh, expiry) into the session store
    let _listener = state.session.setup_session_listener();

    // Build router
    let app = peak_tracker::routes::create_router(state);

    // Start server
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("peak_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
