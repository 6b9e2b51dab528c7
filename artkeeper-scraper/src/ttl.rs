//! Cache lifetime by release-date age.
//!
//! New releases gain artwork quickly, so their cache rows expire sooner.

use chrono::{Duration, NaiveDate, Utc};

/// (maximum age in days, TTL in hours), youngest first.
const BUCKETS: &[(i64, i64)] = &[(30, 24), (180, 72), (730, 168), (3650, 720)];

const OLDEST_TTL_HOURS: i64 = 2160;
const UNKNOWN_TTL_HOURS: i64 = 168;

/// TTL for an item released on `release`, as seen on `today`.
///
/// Future dates count as brand new.
pub fn cache_ttl(release: Option<NaiveDate>, today: NaiveDate) -> Duration {
    let Some(release) = release else {
        return Duration::hours(UNKNOWN_TTL_HOURS);
    };
    let age = (today - release).num_days();
    let hours = BUCKETS
        .iter()
        .find(|(max_age, _)| age < *max_age)
        .map(|(_, hours)| *hours)
        .unwrap_or(OLDEST_TTL_HOURS);
    Duration::hours(hours)
}

/// [`cache_ttl`] against the current UTC date.
pub fn get_cache_ttl(release: Option<NaiveDate>) -> Duration {
    cache_ttl(release, Utc::now().date_naive())
}
