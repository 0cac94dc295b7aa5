//! Check-in statistics shown on the stats view.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Aggregate progress for the current user.
///
/// Recomputed from the peak and check-in collections on every read; never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Stats {
    /// Number of peaks loaded (unfiltered)
    pub total_peaks: usize,
    /// Number of visible peaks with at least one check-in
    pub checked_in_count: usize,
    /// Sum of altitude over checked-in peaks (meters)
    pub total_altitude: i64,
    /// `checked_in_count / total_peaks` as a percentage, 0 when there are no peaks
    pub checkin_rate: f64,
}
