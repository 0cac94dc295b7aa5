// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Peak Tracker: check in to mountain peaks and track your progress.
//!
//! This crate keeps the session and peak/check-in state in sync with a
//! Supabase backend and serves it as JSON view models to the front end.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod stores;
pub mod time_utils;

use config::Config;
use db::TableGateway;
use services::AuthGateway;
use std::sync::Arc;
use stores::{DomainStore, SessionStore};

/// Shared application state, built once at startup.
pub struct AppState {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub domain: Arc<DomainStore>,
}

impl AppState {
    /// Wire the stores to the backend gateways.
    pub fn new(config: Config, auth: Arc<dyn AuthGateway>, db: Arc<dyn TableGateway>) -> Self {
        let session = Arc::new(SessionStore::new(auth));
        let domain = Arc::new(DomainStore::new(db, session.clone()));
        Self {
            config,
            session,
            domain,
        }
    }
}
