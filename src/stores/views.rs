//! Derived views over the domain state.
//!
//! All functions here are pure: they read the current collections and
//! filters and never mutate. Callers recompute on every read, so there is
//! no cache to invalidate.

use std::collections::BTreeSet;

use crate::models::{Checkin, Peak, PeakWithCheckin, Stats};
use crate::stores::domain::DomainState;

/// Case-insensitive substring match; an empty needle matches everything.
fn field_matches(value: Option<&str>, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    value.is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase()))
}

/// Peaks passing the name search, province filter and city filter (all of them).
pub fn filtered_peaks(state: &DomainState) -> Vec<&Peak> {
    state
        .peaks
        .iter()
        .filter(|peak| {
            field_matches(Some(&peak.name), &state.search_query)
                && field_matches(peak.province.as_deref(), &state.province_filter)
                && field_matches(peak.city.as_deref(), &state.city_filter)
        })
        .collect()
}

/// Filtered peaks enriched with the given user's check-ins.
pub fn peaks_with_checkin(state: &DomainState, user_id: Option<&str>) -> Vec<PeakWithCheckin> {
    filtered_peaks(state)
        .into_iter()
        .map(|peak| enrich(peak, &state.checkins, user_id))
        .collect()
}

fn enrich(peak: &Peak, checkins: &[Checkin], user_id: Option<&str>) -> PeakWithCheckin {
    let mut count = 0;
    let mut latest: Option<&Checkin> = None;

    for checkin in checkins
        .iter()
        .filter(|c| c.peak_id == peak.id && Some(c.user_id.as_str()) == user_id)
    {
        count += 1;
        // Strictly later only: on ties the first one seen wins.
        if latest.map_or(true, |l| checkin.checkin_time > l.checkin_time) {
            latest = Some(checkin);
        }
    }

    let checkin_time = latest.map(|c| c.checkin_time);
    PeakWithCheckin {
        peak: peak.clone(),
        checked_in: count > 0,
        checkin_time,
        checkin_count: count,
        last_checkin_time: checkin_time,
    }
}

/// Filtered peaks the user has checked in to at least once.
pub fn checked_in_peaks(state: &DomainState, user_id: Option<&str>) -> Vec<PeakWithCheckin> {
    peaks_with_checkin(state, user_id)
        .into_iter()
        .filter(|p| p.checked_in)
        .collect()
}

/// Progress summary: checked-in peaks over all loaded peaks.
pub fn stats(state: &DomainState, user_id: Option<&str>) -> Stats {
    let checked_in = checked_in_peaks(state, user_id);
    let total_peaks = state.peaks.len();
    let checked_in_count = checked_in.len();

    Stats {
        total_peaks,
        checked_in_count,
        total_altitude: checked_in.iter().map(|p| p.peak.altitude).sum(),
        checkin_rate: if total_peaks > 0 {
            checked_in_count as f64 / total_peaks as f64 * 100.0
        } else {
            0.0
        },
    }
}

/// Distinct provinces across all peaks, sorted.
pub fn provinces(state: &DomainState) -> Vec<String> {
    state
        .peaks
        .iter()
        .filter_map(|p| p.province.clone())
        .filter(|p| !p.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct cities, sorted; only those of the selected province when one is set.
pub fn cities(state: &DomainState) -> Vec<String> {
    let province = state.province_filter.as_str();
    state
        .peaks
        .iter()
        .filter(|p| province.is_empty() || p.province.as_deref() == Some(province))
        .filter_map(|p| p.city.clone())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use chrono::{DateTime, Utc};

    fn peak(id: &str, name: &str, province: Option<&str>, city: Option<&str>, altitude: i64) -> Peak {
        Peak {
            id: id.to_string(),
            name: name.to_string(),
            city: city.map(String::from),
            province: province.map(String::from),
            location: Location::default(),
            altitude,
            difficulty: 1,
            description: String::new(),
            image_url: None,
        }
    }

    fn checkin(id: &str, user: &str, peak: &str, time: &str) -> Checkin {
        Checkin {
            id: id.to_string(),
            user_id: user.to_string(),
            peak_id: peak.to_string(),
            checkin_time: time.parse::<DateTime<Utc>>().unwrap(),
            location: Location::default(),
        }
    }

    fn sample_state() -> DomainState {
        DomainState {
            peaks: vec![
                peak("p1", "Mount Tai", Some("Shandong"), Some("Tai'an"), 1545),
                peak("p2", "Mount Hua", Some("Shaanxi"), Some("Weinan"), 2154),
                peak("p3", "Mount Lao", Some("Shandong"), Some("Qingdao"), 1132),
                peak("p4", "Nameless Hill", None, None, 300),
            ],
            ..DomainState::default()
        }
    }

    fn ids<'a>(peaks: impl IntoIterator<Item = &'a Peak>) -> Vec<&'a str> {
        peaks.into_iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filters_return_everything_in_order() {
        let state = sample_state();
        assert_eq!(ids(filtered_peaks(&state)), vec!["p1", "p2", "p3", "p4"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mut state = sample_state();
        state.search_query = "MOUNT".to_string();
        assert_eq!(ids(filtered_peaks(&state)), vec!["p1", "p2", "p3"]);

        state.search_query = "lao".to_string();
        assert_eq!(ids(filtered_peaks(&state)), vec!["p3"]);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let mut state = sample_state();
        state.search_query = "tai".to_string();
        state.city_filter = "tai'an".to_string();
        assert_eq!(ids(filtered_peaks(&state)), vec!["p1"]);

        state.province_filter = "Yunnan".to_string();
        assert!(filtered_peaks(&state).is_empty());
    }

    #[test]
    fn test_province_filter_skips_peaks_without_province() {
        let mut state = sample_state();
        state.province_filter = "shan".to_string();
        assert_eq!(ids(filtered_peaks(&state)), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_latest_checkin_and_count() {
        let mut state = sample_state();
        state.checkins = vec![
            checkin("c1", "u1", "p1", "2024-01-01T00:00:00Z"),
            checkin("c2", "u1", "p1", "2024-06-01T00:00:00Z"),
            checkin("c3", "u1", "p2", "2024-03-01T00:00:00Z"),
        ];

        let enriched = peaks_with_checkin(&state, Some("u1"));
        let p1 = &enriched[0];
        assert!(p1.checked_in);
        assert_eq!(p1.checkin_count, 2);
        assert_eq!(
            p1.checkin_time,
            Some("2024-06-01T00:00:00Z".parse().unwrap())
        );
        assert_eq!(p1.last_checkin_time, p1.checkin_time);

        let p3 = &enriched[2];
        assert!(!p3.checked_in);
        assert_eq!(p3.checkin_count, 0);
        assert_eq!(p3.checkin_time, None);
    }

    #[test]
    fn test_latest_checkin_tie_keeps_first() {
        let mut state = sample_state();
        state.checkins = vec![
            checkin("first", "u1", "p1", "2024-01-01T00:00:00Z"),
            checkin("second", "u1", "p1", "2024-01-01T00:00:00Z"),
        ];
        let enriched = peaks_with_checkin(&state, Some("u1"));
        assert_eq!(enriched[0].checkin_count, 2);
        assert_eq!(
            enriched[0].checkin_time,
            Some("2024-01-01T00:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn test_other_users_checkins_are_ignored() {
        let mut state = sample_state();
        state.checkins = vec![checkin("c1", "someone-else", "p1", "2024-01-01T00:00:00Z")];

        assert!(checked_in_peaks(&state, Some("u1")).is_empty());
        assert!(checked_in_peaks(&state, None).is_empty());
    }

    #[test]
    fn test_stats() {
        let mut state = sample_state();
        state.checkins = vec![
            checkin("c1", "u1", "p1", "2024-01-01T00:00:00Z"),
            checkin("c2", "u1", "p2", "2024-01-02T00:00:00Z"),
            checkin("c3", "u1", "p2", "2024-01-03T00:00:00Z"),
        ];

        let stats = stats(&state, Some("u1"));
        assert_eq!(stats.total_peaks, 4);
        assert_eq!(stats.checked_in_count, 2);
        assert_eq!(stats.total_altitude, 1545 + 2154);
        assert_eq!(stats.checkin_rate, 50.0);
    }

    #[test]
    fn test_stats_with_no_peaks() {
        let state = DomainState {
            checkins: vec![checkin("c1", "u1", "p1", "2024-01-01T00:00:00Z")],
            ..DomainState::default()
        };
        let stats = stats(&state, Some("u1"));
        assert_eq!(stats.total_peaks, 0);
        assert_eq!(stats.checkin_rate, 0.0);
    }

    #[test]
    fn test_provinces_and_cities() {
        let mut state = sample_state();
        state.peaks.push(peak("p5", "Mount Meng", Some("Shandong"), Some("Linyi"), 1156));
        state.peaks.push(peak("p6", "Empty", Some(""), Some(""), 10));

        assert_eq!(provinces(&state), vec!["Shaanxi", "Shandong"]);
        assert_eq!(cities(&state), vec!["Linyi", "Qingdao", "Tai'an", "Weinan"]);

        state.province_filter = "Shandong".to_string();
        assert_eq!(cities(&state), vec!["Linyi", "Qingdao", "Tai'an"]);

        // City lists need the exact province name.
        state.province_filter = "shandong".to_string();
        assert!(cities(&state).is_empty());
    }
}
