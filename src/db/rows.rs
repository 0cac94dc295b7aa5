// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Translation between table rows (snake_case, loosely typed) and the
//! in-memory models.
//!
//! Peak rows come from hand-maintained data: numbers may arrive as strings
//! and `location` may be a JSON object, a JSON-encoded string, or missing.
//! Normalization never fails; bad values fall back to safe defaults.

use crate::error::AppError;
use crate::models::{Checkin, Location, Peak};
use crate::time_utils::{format_utc_rfc3339, parse_utc};
use serde_json::Value;

/// Altitude used when the row has none (or an unparseable one).
const DEFAULT_ALTITUDE: i64 = 0;

/// Difficulty used when the row has none (or an unparseable one).
const DEFAULT_DIFFICULTY: i64 = 1;

/// Build a `Peak` from a raw `peaks` row.
pub fn normalize_peak(row: &Value) -> Peak {
    Peak {
        id: string_field(row, "id").unwrap_or_default(),
        name: string_field(row, "name").unwrap_or_default(),
        city: string_field(row, "city"),
        province: string_field(row, "province"),
        location: normalize_location(row.get("location")),
        altitude: int_or(row.get("altitude"), DEFAULT_ALTITUDE).max(0),
        difficulty: int_or(row.get("difficulty"), DEFAULT_DIFFICULTY).max(DEFAULT_DIFFICULTY),
        description: string_field(row, "description").unwrap_or_default(),
        image_url: string_field(row, "image_url"),
    }
}

/// Coerce a location value to finite coordinates, defaulting to (0, 0).
pub fn normalize_location(value: Option<&Value>) -> Location {
    let parsed;
    let location = match value {
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(v) => {
                parsed = v;
                &parsed
            }
            Err(e) => {
                tracing::warn!(location = %s, error = %e, "Failed to parse location string");
                return Location::default();
            }
        },
        Some(v @ Value::Object(_)) => v,
        _ => return Location::default(),
    };

    Location {
        lat: float_or_zero(location.get("lat")),
        lng: float_or_zero(location.get("lng")),
    }
}

/// A non-empty string field; numbers are rendered as strings.
fn string_field(row: &Value, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer value, or `default` when missing, unparseable or zero.
fn int_or(value: Option<&Value>, default: i64) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_leading_int(s),
        _ => None,
    };
    parsed.filter(|n| *n != 0).unwrap_or(default)
}

/// Finite float value, or 0.
fn float_or_zero(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_leading_float(s),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

/// Parse the integer prefix of a string (`"3000m"` → 3000, `"12.9"` → 12).
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Parse the decimal prefix of a string (`"10.5N"` → 10.5, `"1e3x"` → 1000).
fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    // Exponent only counts when digits follow it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Build a `Checkin` from a raw `checkins` row.
pub fn checkin_from_row(row: &Value) -> Result<Checkin, AppError> {
    let field = |key: &str| {
        string_field(row, key)
            .ok_or_else(|| AppError::Backend(format!("Check-in row is missing {}", key)))
    };

    let checkin_time = field("checkin_time")?;
    let checkin_time = parse_utc(&checkin_time).ok_or_else(|| {
        AppError::Backend(format!("Invalid checkin_time: {}", checkin_time))
    })?;

    Ok(Checkin {
        id: field("id")?,
        user_id: field("user_id")?,
        peak_id: field("peak_id")?,
        checkin_time,
        location: normalize_location(row.get("location")),
    })
}

/// Render a `Checkin` as a `checkins` row.
pub fn checkin_to_row(checkin: &Checkin) -> Value {
    serde_json::json!({
        "id": checkin.id,
        "user_id": checkin.user_id,
        "peak_id": checkin.peak_id,
        "checkin_time": format_utc_rfc3339(checkin.checkin_time),
        "location": {
            "lat": checkin.location.lat,
            "lng": checkin.location.lng,
        },
    })
}
