//! Timestamp and number codecs for stored metadata.
//!
//! Timestamps are stored as `yyyy-MM-ddTHH:mm:ssZ` in UTC. Parsing never
//! fails: a malformed value yields the caller's default, so corrupt
//! metadata cannot abort a read. The codec holds no state; each call builds
//! its own format description, so it is safe from any number of threads.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// strftime pattern for stored timestamps.
pub const ISO_8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The Unix epoch, used when no better default exists.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Render a timestamp in the stored format. Sub-second precision is dropped.
pub fn format_date(time: &DateTime<Utc>) -> String {
    time.format(ISO_8601_FORMAT).to_string()
}

/// Parse a stored timestamp, or `None` if it is malformed.
pub fn try_parse_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, ISO_8601_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse a stored timestamp, falling back to `default` on any failure.
pub fn parse_date(s: &str, default: DateTime<Utc>) -> DateTime<Utc> {
    try_parse_date(s).unwrap_or(default)
}

/// Parse a decimal byte count, falling back to `default` on any failure.
pub fn parse_long(s: &str, default: u64) -> u64 {
    s.trim().parse().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn format_is_fixed_width_utc() {
        assert_eq!(format_date(&epoch()), "1970-01-01T00:00:00Z");
        assert_eq!(format_date(&at(1_700_000_000)), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn format_drops_subseconds() {
        let t = Utc.timestamp_opt(1_700_000_000, 999_000_000).unwrap();
        assert_eq!(format_date(&t), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn malformed_dates_use_default() {
        let default = at(42);
        for bad in [
            "",
            "yesterday",
            "2023-11-14",
            "2023-11-14 22:13:20",
            "2023-13-14T22:13:20Z",
            "2023-11-14T22:13:20+01:00",
            "2023-11-14T25:13:20Z",
        ] {
            assert_eq!(parse_date(bad, default), default, "input {bad:?}");
        }
    }

    #[test]
    fn parse_long_defaults() {
        assert_eq!(parse_long("10", 0), 10);
        assert_eq!(parse_long(" 10 ", 0), 10);
        assert_eq!(parse_long("-1", 7), 7);
        assert_eq!(parse_long("ten", 7), 7);
        assert_eq!(parse_long("", 7), 7);
    }

    #[test]
    fn parallel_use_is_independent() {
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                std::thread::spawn(move || {
                    for j in 0..200i64 {
                        let t = at(i * 1_000_000 + j);
                        assert_eq!(parse_date(&format_date(&t), epoch()), t);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    proptest! {
        /// Any second-precision timestamp between year 0001 and 9999 survives the codec.
        #[test]
        fn prop_roundtrip(secs in -62_135_596_800i64..253_402_300_799i64) {
            let t = at(secs);
            prop_assert_eq!(parse_date(&format_date(&t), epoch()), t);
        }

        /// Strings that do not look like timestamps always yield the default.
        #[test]
        fn prop_garbage_yields_default(s in "[a-zA-Z ]{0,24}") {
            let default = at(7);
            prop_assert_eq!(parse_date(&s, default), default);
        }
    }
}
