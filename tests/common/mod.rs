// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use peak_tracker::config::Config;
use peak_tracker::db::{Filter, TableGateway};
use peak_tracker::error::AppError;
use peak_tracker::routes::create_router;
use peak_tracker::services::auth::{
    AuthChange, AuthEvent, AuthGateway, AuthSession, AuthUser, SignUpOutcome,
};
use peak_tracker::AppState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Which backend calls should fail.
#[derive(Default)]
#[allow(dead_code)]
pub struct Failures {
    pub get_session: AtomicBool,
    pub sign_in: AtomicBool,
    pub sign_up: AtomicBool,
    pub sign_out: AtomicBool,
    pub resend: AtomicBool,
    pub select: AtomicBool,
    pub insert: AtomicBool,
    pub delete: AtomicBool,
}

/// In-memory stand-in for Supabase auth and tables.
pub struct MemoryBackend {
    accounts: Mutex<HashMap<String, (String, AuthUser)>>,
    session: Mutex<Option<AuthSession>>,
    tables: Mutex<HashMap<String, Vec<Value>>>,
    events: broadcast::Sender<AuthChange>,
    pub fail: Failures,
    pub resend_calls: AtomicUsize,
    pub get_session_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            tables: Mutex::new(HashMap::new()),
            events,
            fail: Failures::default(),
            resend_calls: AtomicUsize::new(0),
            get_session_calls: AtomicUsize::new(0),
        })
    }

    /// Register an account that can sign in.
    pub fn add_account(&self, id: &str, email: &str, password: &str, name: Option<&str>) {
        let user = auth_user(id, email, name);
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), user));
    }

    /// Pretend a session already exists (as if restored from storage).
    pub fn set_existing_session(&self, id: &str, email: &str, name: Option<&str>) {
        *self.session.lock().unwrap() = Some(session_for(auth_user(id, email, name)));
    }

    pub fn has_session(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables.lock().unwrap().insert(table.to_string(), rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Push a session change as the backend would (refresh, expiry, other tab).
    pub fn emit(&self, event: AuthEvent, session: Option<AuthSession>) {
        let _ = self.events.send(AuthChange { event, session });
    }

    fn failing(flag: &AtomicBool, what: &str) -> Result<(), AppError> {
        if flag.load(Ordering::SeqCst) {
            return Err(AppError::Backend(format!("{} unavailable", what)));
        }
        Ok(())
    }
}

#[allow(dead_code)]
pub fn auth_user(id: &str, email: &str, name: Option<&str>) -> AuthUser {
    AuthUser {
        id: id.to_string(),
        email: Some(email.to_string()),
        user_metadata: match name {
            Some(name) => serde_json::json!({ "name": name }),
            None => serde_json::json!({}),
        },
        created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
    }
}

#[allow(dead_code)]
pub fn session_for(user: AuthUser) -> AuthSession {
    AuthSession {
        access_token: format!("access-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        token_type: Some("bearer".to_string()),
        expires_in: Some(3600),
        expires_at: None,
        user,
    }
}

#[async_trait]
impl AuthGateway for MemoryBackend {
    async fn get_session(&self) -> Result<Option<AuthSession>, AppError> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        Self::failing(&self.fail.get_session, "auth")?;
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        Self::failing(&self.fail.sign_in, "auth")?;
        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some((expected, user)) if expected == password => user.clone(),
                _ => return Err(AppError::Auth("Invalid login credentials".to_string())),
            }
        };
        let session = session_for(user);
        *self.session.lock().unwrap() = Some(session.clone());
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<SignUpOutcome, AppError> {
        Self::failing(&self.fail.sign_up, "auth")?;
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AppError::Auth("User already registered".to_string()));
        }
        let mut user = auth_user(&format!("user-{}", accounts.len() + 1), email, None);
        user.user_metadata = metadata;
        accounts.insert(email.to_string(), (password.to_string(), user.clone()));
        Ok(SignUpOutcome {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        Self::failing(&self.fail.sign_out, "auth")?;
        *self.session.lock().unwrap() = None;
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn resend_signup_email(&self, _email: &str) -> Result<(), AppError> {
        self.resend_calls.fetch_add(1, Ordering::SeqCst);
        Self::failing(&self.fail.resend, "mailer")
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn access_token(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone())
    }
}

#[async_trait]
impl TableGateway for MemoryBackend {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, AppError> {
        Self::failing(&self.fail.select, "database")?;
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .collect())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), AppError> {
        Self::failing(&self.fail.insert, "database")?;
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), AppError> {
        Self::failing(&self.fail.delete, "database")?;
        if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
            rows.retain(|row| !filters.iter().all(|f| f.matches(row)));
        }
        Ok(())
    }
}

/// Build state over a fresh in-memory backend.
#[allow(dead_code)]
pub fn create_test_state() -> (Arc<AppState>, Arc<MemoryBackend>) {
    let backend = MemoryBackend::new();
    let state = Arc::new(AppState::new(
        Config::default(),
        backend.clone(),
        backend.clone(),
    ));
    (state, backend)
}

/// Create a test app over an in-memory backend.
/// Returns the router, the shared state and the backend.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryBackend>) {
    let (state, backend) = create_test_state();
    (create_router(state.clone()), state, backend)
}

/// Two peaks in Shandong and one in Shaanxi, as raw table rows.
#[allow(dead_code)]
pub fn sample_peak_rows() -> Vec<Value> {
    vec![
        serde_json::json!({
            "id": "p1", "name": "Mount Tai", "province": "Shandong", "city": "Tai'an",
            "altitude": 1545, "difficulty": 3, "description": "",
            "location": {"lat": 36.25, "lng": 117.1}
        }),
        serde_json::json!({
            "id": "p2", "name": "Mount Hua", "province": "Shaanxi", "city": "Weinan",
            "altitude": "2154", "difficulty": "5", "description": "",
            "location": "{\"lat\": 34.48, \"lng\": 110.08}"
        }),
        serde_json::json!({
            "id": "p3", "name": "Mount Lao", "province": "Shandong", "city": "Qingdao",
            "altitude": 1132, "difficulty": 2, "description": "",
            "location": null
        }),
    ]
}
