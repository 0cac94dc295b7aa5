// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Check-in model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::Location;

/// A user's recorded visit to a peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Checkin {
    /// Client-generated id (`checkin-<unix millis>`)
    pub id: String,
    pub user_id: String,
    pub peak_id: String,
    pub checkin_time: DateTime<Utc>,
    /// Where the user was when checking in
    pub location: Location,
}
