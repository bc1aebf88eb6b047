use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Unix times at or above this are treated as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub fn now_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

pub fn now_timestamp_s() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Interprets a venue unix time that may be in seconds or milliseconds.
pub fn unix_to_datetime(raw: i64) -> Option<DateTime<Utc>> {
    if raw.abs() >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

/// Same as [`unix_to_datetime`] but keeps sub-second precision of fractional
/// seconds such as `1609459200.25`.
pub fn unix_decimal_to_datetime(raw: Decimal) -> Option<DateTime<Utc>> {
    let whole = raw.trunc().to_i64()?;
    if whole.abs() >= MILLIS_THRESHOLD {
        return DateTime::from_timestamp_millis(whole);
    }
    let nanos = (raw.fract() * Decimal::from(1_000_000_000)).trunc().to_u32()?;
    DateTime::from_timestamp(whole, nanos)
}

pub fn datetime_to_timestamp(dt: DateTime<Utc>) -> u64 {
    dt.timestamp_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_seconds_and_millis() {
        let from_secs = unix_to_datetime(1_609_459_200).unwrap();
        let from_millis = unix_to_datetime(1_609_459_200_000).unwrap();

        assert_eq!(from_secs, from_millis);
        assert_eq!(from_secs.timestamp(), 1_609_459_200);
    }

    #[test]
    fn test_fractional_seconds() {
        let dt = unix_decimal_to_datetime(dec!(1609459200.5)).unwrap();
        assert_eq!(dt.timestamp(), 1_609_459_200);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_timestamp_conversion() {
        let now = Utc::now();
        let timestamp = datetime_to_timestamp(now);
        let converted = unix_to_datetime(timestamp as i64).unwrap();

        assert!((now.timestamp_millis() - converted.timestamp_millis()).abs() < 1000);
    }
}
