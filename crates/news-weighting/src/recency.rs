use analysis_core::{numeric::clamp, WeightingParams};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Weight given to a record whose publish time cannot be parsed: kept, but never dominant.
pub const UNKNOWN_AGE_WEIGHT: f64 = 0.25;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a `YYYY-MM-DD` reference date.
pub fn parse_reference_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

/// Calendar date (UTC) of a publish timestamp.
///
/// Accepts ISO dates (`2026-02-23`), RFC-2822 (`Fri, 20 Feb 2026 23:30:02 GMT`),
/// RFC-3339 datetimes with an offset, and naive ISO datetimes (taken as UTC).
pub fn parse_published_date(published_at: &str) -> Option<NaiveDate> {
    let s = published_at.trim();
    if s.is_empty() {
        return None;
    }

    if s.len() == 10 {
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(d);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Recency weight and age in days of one record relative to `reference`.
///
/// `w = 0.5^(age / half_life)`, boosted by `fresh_boost` inside the fresh window,
/// then clamped to `[min_weight, 1]`. Without a reference date no decay applies.
pub fn recency_weight(
    params: &WeightingParams,
    published_at: &str,
    reference: Option<NaiveDate>,
) -> (f64, Option<i64>) {
    let Some(reference) = reference else {
        return (1.0, None);
    };

    let Some(published) = parse_published_date(published_at) else {
        return (clamp(UNKNOWN_AGE_WEIGHT, params.min_weight, 1.0), None);
    };

    let age_days = (reference - published).num_days().max(0);
    let mut w = 0.5_f64.powf(age_days as f64 / params.half_life_days.max(1.0));
    if params.fresh_boost_days > 0 && age_days <= params.fresh_boost_days {
        w *= params.fresh_boost;
    }

    (clamp(w, params.min_weight, 1.0), Some(age_days))
}
