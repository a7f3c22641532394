//! Snowflake id helpers.
//!
//! Platform ids encode their creation instant in the upper bits; the account
//! age check for fake-join classification reads it straight from the member
//! id rather than asking the platform.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Platform snowflake epoch: 2015-01-01T00:00:00Z, in milliseconds.
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_420_070_400_000;

/// Extract the creation instant encoded in a snowflake id.
pub fn creation_time(id: i64) -> DateTime<Utc> {
    let ms = ((id as u64) >> 22) as i64 + SNOWFLAKE_EPOCH_MS;
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(|| Utc.timestamp_millis_opt(SNOWFLAKE_EPOCH_MS).unwrap())
}

/// Age of the account behind `id` at the given instant. Negative ages (clock
/// skew, malformed ids) collapse to zero.
pub fn account_age_at(id: i64, at: DateTime<Utc>) -> Duration {
    let age = at - creation_time(id);
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}
