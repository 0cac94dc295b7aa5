// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map and stats views plus the peak/check-in actions behind them.
//! All routes here require a signed-in user (see the route table).

use crate::error::{AppError, Result};
use crate::models::{Checkin, Location, Peak, PeakWithCheckin, Stats};
use crate::stores::{views, DomainState};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(map_view))
        .route("/stats", get(stats_view))
        .route("/filters", patch(update_filters).delete(reset_filters))
        .route("/selection", delete(clear_selection))
        .route("/selection/{peak_id}", put(select_peak))
        .route("/checkins", post(create_checkin))
        .route("/checkins/{checkin_id}", delete(delete_checkin))
}

// ─── Views ───────────────────────────────────────────────────

/// Active filter values.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Filters {
    pub search_query: String,
    pub province_filter: String,
    pub city_filter: String,
}

/// Everything the map view renders.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MapView {
    pub peaks: Vec<PeakWithCheckin>,
    pub selected_peak: Option<Peak>,
    pub provinces: Vec<String>,
    pub cities: Vec<String>,
    pub filters: Filters,
    pub is_loading: bool,
}

impl MapView {
    fn build(domain: &DomainState, user_id: Option<&str>) -> Self {
        Self {
            peaks: views::peaks_with_checkin(domain, user_id),
            selected_peak: domain.selected_peak.clone(),
            provinces: views::provinces(domain),
            cities: views::cities(domain),
            filters: Filters {
                search_query: domain.search_query.clone(),
                province_filter: domain.province_filter.clone(),
                city_filter: domain.city_filter.clone(),
            },
            is_loading: domain.is_loading,
        }
    }
}

/// Everything the stats view renders.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatsView {
    pub stats: Stats,
    pub checked_in_peaks: Vec<PeakWithCheckin>,
}

async fn current_map_view(state: &AppState) -> MapView {
    let user_id = state.session.user_id().await;
    let domain = state.domain.state().await;
    MapView::build(&domain, user_id.as_deref())
}

async fn map_view(State(state): State<Arc<AppState>>) -> Json<MapView> {
    state.domain.init().await;
    Json(current_map_view(&state).await)
}

async fn stats_view(State(state): State<Arc<AppState>>) -> Json<StatsView> {
    state.domain.init().await;

    let user_id = state.session.user_id().await;
    let domain = state.domain.state().await;
    Json(StatsView {
        stats: views::stats(&domain, user_id.as_deref()),
        checked_in_peaks: views::checked_in_peaks(&domain, user_id.as_deref()),
    })
}

// ─── Filters & selection ─────────────────────────────────────

/// Filter changes; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterUpdate {
    pub search_query: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
}

/// Apply filter changes in order search, province, city, so a city sent
/// together with a province survives the province reset.
async fn update_filters(
    State(state): State<Arc<AppState>>,
    Json(update): Json<FilterUpdate>,
) -> Json<MapView> {
    if let Some(query) = &update.search_query {
        state.domain.set_search_query(query).await;
    }
    if let Some(province) = &update.province {
        state.domain.set_province_filter(province).await;
    }
    if let Some(city) = &update.city {
        state.domain.set_city_filter(city).await;
    }
    Json(current_map_view(&state).await)
}

async fn reset_filters(State(state): State<Arc<AppState>>) -> Json<MapView> {
    state.domain.reset_filters().await;
    Json(current_map_view(&state).await)
}

async fn select_peak(
    State(state): State<Arc<AppState>>,
    Path(peak_id): Path<String>,
) -> Result<Json<Peak>> {
    state
        .domain
        .select_peak_by_id(&peak_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Peak {}", peak_id)))
}

async fn clear_selection(State(state): State<Arc<AppState>>) -> Json<MapView> {
    state.domain.clear_selected_peak().await;
    Json(current_map_view(&state).await)
}

// ─── Check-ins ───────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    #[validate(length(min = 1, message = "peakId is required"))]
    pub peak_id: String,
    #[validate(nested)]
    pub location: LocationInput,
}

async fn create_checkin(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckinRequest>,
) -> Result<Json<Checkin>> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let location = Location::new(request.location.lat, request.location.lng);
    state
        .domain
        .checkin(&request.peak_id, location)
        .await
        .map(Json)
        .ok_or_else(|| AppError::Backend("Check-in was not saved".to_string()))
}

#[derive(Serialize)]
pub struct DeleteCheckinResponse {
    pub success: bool,
}

async fn delete_checkin(
    State(state): State<Arc<AppState>>,
    Path(checkin_id): Path<String>,
) -> Result<Json<DeleteCheckinResponse>> {
    if !state.domain.delete_checkin(&checkin_id).await {
        return Err(AppError::Backend(format!(
            "Check-in {} was not deleted",
            checkin_id
        )));
    }
    Ok(Json(DeleteCheckinResponse { success: true }))
}
