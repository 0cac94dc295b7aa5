// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Domain store: peaks, the current user's check-ins, selection and filters.
//!
//! This store is the only place rows are translated between the backend's
//! snake_case columns and the in-memory models. Writes are applied locally
//! only after the backend accepted them.

use crate::db::rows::{checkin_from_row, checkin_to_row, normalize_peak};
use crate::db::{tables, Filter, TableGateway};
use crate::models::{Checkin, Location, Peak, PeakWithCheckin, Stats};
use crate::stores::views;
use crate::stores::SessionStore;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

/// Owned collections and UI filters.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    pub peaks: Vec<Peak>,
    pub checkins: Vec<Checkin>,
    pub selected_peak: Option<Peak>,
    pub is_loading: bool,
    pub search_query: String,
    pub province_filter: String,
    pub city_filter: String,
}

/// Client-side check-in id. Two check-ins in the same millisecond collide.
pub fn checkin_id(now: DateTime<Utc>) -> String {
    format!("checkin-{}", now.timestamp_millis())
}

pub struct DomainStore {
    db: Arc<dyn TableGateway>,
    session: Arc<SessionStore>,
    state: RwLock<DomainState>,
    initialized: AtomicBool,
}

impl DomainStore {
    pub fn new(db: Arc<dyn TableGateway>, session: Arc<SessionStore>) -> Self {
        Self {
            db,
            session,
            state: RwLock::new(DomainState::default()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Read access to the raw state, e.g. for the pure functions in `views`.
    pub async fn state(&self) -> RwLockReadGuard<'_, DomainState> {
        self.state.read().await
    }

    // ─── Loading ─────────────────────────────────────────────────

    /// Load peaks and check-ins together, once.
    pub async fn init(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::join!(self.load_peaks(), self.load_checkins());
    }

    /// Replace the peak collection with a fresh, normalized copy from the backend.
    pub async fn load_peaks(&self) {
        self.state.write().await.is_loading = true;

        match self.db.select(tables::PEAKS, &[]).await {
            Ok(rows) => {
                let peaks: Vec<Peak> = rows.iter().map(normalize_peak).collect();
                tracing::info!(count = peaks.len(), "Loaded peaks");
                self.state.write().await.peaks = peaks;
            }
            Err(e) => tracing::error!(error = %e, "Failed to load peaks"),
        }

        self.state.write().await.is_loading = false;
    }

    /// Replace the check-in collection with the current user's check-ins.
    pub async fn load_checkins(&self) {
        let Some(user_id) = self.session.user_id().await else {
            return;
        };

        self.state.write().await.is_loading = true;

        let filters = [Filter::eq("user_id", &user_id)];
        match self.db.select(tables::CHECKINS, &filters).await {
            Ok(rows) => {
                let checkins: Vec<Checkin> = rows
                    .iter()
                    .filter_map(|row| match checkin_from_row(row) {
                        Ok(checkin) => Some(checkin),
                        Err(e) => {
                            tracing::warn!(error = %e, "Skipping malformed check-in row");
                            None
                        }
                    })
                    .collect();
                tracing::info!(user_id = %user_id, count = checkins.len(), "Loaded check-ins");
                self.state.write().await.checkins = checkins;
            }
            Err(e) => tracing::error!(error = %e, "Failed to load check-ins"),
        }

        self.state.write().await.is_loading = false;
    }

    // ─── Mutations ───────────────────────────────────────────────

    /// Record a check-in on `peak_id` at `location`.
    ///
    /// Returns the new check-in, or `None` when nobody is signed in or the
    /// backend rejected the write (local state is then unchanged).
    pub async fn checkin(&self, peak_id: &str, location: Location) -> Option<Checkin> {
        let user_id = self.session.user_id().await?;

        let now = Utc::now();
        let checkin = Checkin {
            id: checkin_id(now),
            user_id,
            peak_id: peak_id.to_string(),
            checkin_time: now,
            location,
        };

        match self
            .db
            .insert(tables::CHECKINS, checkin_to_row(&checkin))
            .await
        {
            Ok(()) => {
                tracing::info!(checkin_id = %checkin.id, peak_id, "Check-in recorded");
                self.state.write().await.checkins.push(checkin.clone());
                Some(checkin)
            }
            Err(e) => {
                tracing::error!(error = %e, peak_id, "Failed to add check-in");
                None
            }
        }
    }

    /// Delete a check-in remotely, then drop the first local match.
    ///
    /// Returns `false` when nobody is signed in or the backend refused.
    pub async fn delete_checkin(&self, checkin_id: &str) -> bool {
        if !self.session.is_authenticated().await {
            return false;
        }

        let filters = [Filter::eq("id", checkin_id)];
        match self.db.delete(tables::CHECKINS, &filters).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                if let Some(index) = state.checkins.iter().position(|c| c.id == checkin_id) {
                    state.checkins.remove(index);
                }
                tracing::info!(checkin_id, "Check-in deleted");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, checkin_id, "Failed to delete check-in");
                false
            }
        }
    }

    // ─── Selection ───────────────────────────────────────────────

    pub async fn select_peak(&self, peak: Peak) {
        self.state.write().await.selected_peak = Some(peak);
    }

    /// Select a loaded peak by id. Returns it, or `None` if no such peak is loaded.
    pub async fn select_peak_by_id(&self, peak_id: &str) -> Option<Peak> {
        let mut state = self.state.write().await;
        let peak = state.peaks.iter().find(|p| p.id == peak_id).cloned()?;
        state.selected_peak = Some(peak.clone());
        Some(peak)
    }

    pub async fn clear_selected_peak(&self) {
        self.state.write().await.selected_peak = None;
    }

    // ─── Filters ─────────────────────────────────────────────────

    pub async fn set_search_query(&self, query: &str) {
        self.state.write().await.search_query = query.to_string();
    }

    /// Set the province filter. The city filter is cleared since city lists
    /// depend on the province.
    pub async fn set_province_filter(&self, province: &str) {
        let mut state = self.state.write().await;
        state.province_filter = province.to_string();
        state.city_filter.clear();
    }

    pub async fn set_city_filter(&self, city: &str) {
        self.state.write().await.city_filter = city.to_string();
    }

    pub async fn reset_filters(&self) {
        let mut state = self.state.write().await;
        state.search_query.clear();
        state.province_filter.clear();
        state.city_filter.clear();
    }

    // ─── Derived views ───────────────────────────────────────────

    pub async fn filtered_peaks(&self) -> Vec<Peak> {
        let state = self.state.read().await;
        views::filtered_peaks(&state).into_iter().cloned().collect()
    }

    pub async fn peaks_with_checkin(&self) -> Vec<PeakWithCheckin> {
        let user_id = self.session.user_id().await;
        let state = self.state.read().await;
        views::peaks_with_checkin(&state, user_id.as_deref())
    }

    pub async fn checked_in_peaks(&self) -> Vec<PeakWithCheckin> {
        let user_id = self.session.user_id().await;
        let state = self.state.read().await;
        views::checked_in_peaks(&state, user_id.as_deref())
    }

    pub async fn stats(&self) -> Stats {
        let user_id = self.session.user_id().await;
        let state = self.state.read().await;
        views::stats(&state, user_id.as_deref())
    }

    pub async fn provinces(&self) -> Vec<String> {
        views::provinces(&*self.state.read().await)
    }

    pub async fn cities(&self) -> Vec<String> {
        views::cities(&*self.state.read().await)
    }
}
