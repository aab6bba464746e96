//! Extract: stateless conversions from raw line fields to typed values.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::model::ExtractError;
use super::FRACTION_DIGITS;
use crate::tx::{RequestAccounting, Timestamp, TtlData, TtlDetail, TtlSource};

/// Parse an epoch time such as `1714823222.274262` or `1606398419`.
///
/// The fractional part is right-padded (or truncated) to nanoseconds.
pub fn parse_unix_time(value: &str) -> Result<DateTime<Utc>, ExtractError> {
    let (secs, nanos) = match value.split_once('.') {
        Some((secs, fraction)) => {
            if !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ExtractError::InvalidTime(value.to_string()));
            }
            let digits = &fraction[..fraction.len().min(FRACTION_DIGITS)];
            let nanos = if digits.is_empty() {
                0
            } else {
                let scale = 10u32.pow((FRACTION_DIGITS - digits.len()) as u32);
                digits
                    .parse::<u32>()
                    .map_err(|_| ExtractError::InvalidTime(value.to_string()))?
                    * scale
            };
            (secs, nanos)
        }
        None => (value, 0),
    };

    let secs = secs
        .parse::<i64>()
        .map_err(|_| ExtractError::InvalidTime(value.to_string()))?;

    DateTime::from_timestamp(secs, nanos).ok_or_else(|| ExtractError::TimeOutOfRange(value.to_string()))
}

/// Parse fractional seconds (`0.003330`) into a duration, rounded to the nanosecond.
pub fn parse_seconds(value: &str) -> Result<Duration, ExtractError> {
    let secs = value
        .parse::<f64>()
        .map_err(|_| ExtractError::InvalidDuration(value.to_string()))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(ExtractError::DurationOutOfRange(value.to_string()));
    }

    Ok(Duration::from_nanos((secs * 1e9).round() as u64))
}

fn parse_int(field: &'static str, value: &str) -> Result<i64, ExtractError> {
    value.parse::<i64>().map_err(|_| ExtractError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

fn parse_bytes(field: &'static str, value: &str) -> Result<u64, ExtractError> {
    value.parse::<u64>().map_err(|_| ExtractError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

/// Build a checkpoint from its label and the three numeric columns.
pub fn timestamp(
    label: &str,
    absolute: &str,
    since_start: &str,
    since_last: &str,
) -> Result<Timestamp, ExtractError> {
    Ok(Timestamp {
        label: label.to_string(),
        absolute: parse_unix_time(absolute)?,
        since_start: parse_seconds(since_start)?,
        since_last: parse_seconds(since_last)?,
    })
}

/// Build a TTL snapshot from the fields following the `TTL` tag.
///
/// ```text
/// VCL 120 10 0 1606400537 uncacheable
/// RFC 120 10 0 1606398419 1606398419 1606398419 0 0 cacheable
/// ```
pub fn ttl(fields: &[&str]) -> Result<TtlData, ExtractError> {
    if fields.len() != 6 && fields.len() != 10 {
        return Err(ExtractError::TtlShape(fields.len()));
    }

    let source = TtlSource::from_tag(fields[0]);
    let ttl = parse_int("ttl", fields[1])?;
    let grace = parse_int("grace", fields[2])?;
    let keep = parse_int("keep", fields[3])?;
    let reference = parse_unix_time(fields[4])?;

    let (detail, cache_status) = if fields.len() == 10 {
        let detail = TtlDetail {
            age: parse_int("age", fields[5])?,
            date: parse_unix_time(fields[6])?,
            expires: parse_unix_time(fields[7])?,
            max_age: parse_int("max_age", fields[8])?,
        };
        (Some(detail), fields[9])
    } else {
        (None, fields[5])
    };

    Ok(TtlData {
        source,
        ttl,
        grace,
        keep,
        reference,
        detail,
        cache_status: cache_status.to_string(),
    })
}

/// Build byte counters from the six numeric fields of `ReqAcct`/`BereqAcct`.
///
/// Layout is `header body total` received, then the same transmitted.
/// The totals are not kept.
pub fn accounting(fields: &[&str]) -> Result<RequestAccounting, ExtractError> {
    if fields.len() != 6 {
        return Err(ExtractError::AccountingShape(fields.len()));
    }

    Ok(RequestAccounting {
        header_bytes_received: parse_bytes("header_bytes_received", fields[0])?,
        body_bytes_received: parse_bytes("body_bytes_received", fields[1])?,
        header_bytes_transmitted: parse_bytes("header_bytes_transmitted", fields[3])?,
        body_bytes_transmitted: parse_bytes("body_bytes_transmitted", fields[4])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unix_time_fractional() {
        let t = parse_unix_time("1714823222.274262").unwrap();
        assert_eq!(t.timestamp(), 1714823222);
        assert_eq!(t.timestamp_subsec_nanos(), 274_262_000);
    }

    #[test]
    fn test_parse_unix_time_integer() {
        let t = parse_unix_time("1606398419").unwrap();
        assert_eq!(t.timestamp(), 1606398419);
        assert_eq!(t.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_parse_unix_time_truncates_extra_digits() {
        let t = parse_unix_time("10.1234567891234").unwrap();
        assert_eq!(t.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_parse_unix_time_empty_fraction() {
        let t = parse_unix_time("1700000000.").unwrap();
        assert_eq!(t.timestamp(), 1700000000);
        assert_eq!(t.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_parse_unix_time_rejects_garbage() {
        assert!(matches!(parse_unix_time("abc"), Err(ExtractError::InvalidTime(_))));
        assert!(matches!(parse_unix_time("12.3x"), Err(ExtractError::InvalidTime(_))));
        assert!(matches!(parse_unix_time("12.-3"), Err(ExtractError::InvalidTime(_))));
        assert!(parse_unix_time("").is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("0.003330").unwrap(), Duration::from_micros(3330));
        assert_eq!(parse_seconds("0.000015").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_seconds("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_seconds("1.5").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_seconds_rejects_negative_and_non_finite() {
        assert!(matches!(parse_seconds("-0.5"), Err(ExtractError::DurationOutOfRange(_))));
        assert!(matches!(parse_seconds("inf"), Err(ExtractError::DurationOutOfRange(_))));
        assert!(matches!(parse_seconds("NaN"), Err(ExtractError::DurationOutOfRange(_))));
        assert!(matches!(parse_seconds("fast"), Err(ExtractError::InvalidDuration(_))));
    }

    #[test]
    fn test_timestamp() {
        let ts = timestamp("Resp", "1714823222.274262", "0.003330", "0.000015").unwrap();
        assert_eq!(ts.label, "Resp");
        assert_eq!(ts.since_start, Duration::from_micros(3330));
        assert_eq!(ts.since_last, Duration::from_micros(15));
    }

    #[test]
    fn test_timestamp_fails_on_any_bad_field() {
        assert!(timestamp("Resp", "x", "0.1", "0.1").is_err());
        assert!(timestamp("Resp", "1.0", "x", "0.1").is_err());
        assert!(timestamp("Resp", "1.0", "0.1", "x").is_err());
    }

    #[test]
    fn test_ttl_short_form() {
        let ttl = ttl(&["VCL", "120", "10", "0", "1606400537", "uncacheable"]).unwrap();
        assert_eq!(ttl.source, TtlSource::Vcl);
        assert_eq!((ttl.ttl, ttl.grace, ttl.keep), (120, 10, 0));
        assert_eq!(ttl.reference.timestamp(), 1606400537);
        assert!(ttl.detail.is_none());
        assert_eq!(ttl.cache_status, "uncacheable");
    }

    #[test]
    fn test_ttl_long_form() {
        let ttl = ttl(&[
            "RFC", "120", "10", "0", "1606398419", "3", "1606398416", "1606398539", "120", "cacheable",
        ])
        .unwrap();
        assert_eq!(ttl.source, TtlSource::Rfc);
        let detail = ttl.detail.expect("long form carries detail");
        assert_eq!(detail.age, 3);
        assert_eq!(detail.date.timestamp(), 1606398416);
        assert_eq!(detail.expires.timestamp(), 1606398539);
        assert_eq!(detail.max_age, 120);
        assert_eq!(ttl.cache_status, "cacheable");
    }

    #[test]
    fn test_ttl_negative_values() {
        let ttl = ttl(&["HFP", "-1", "0", "0", "1606402666", "uncacheable"]).unwrap();
        assert_eq!(ttl.source, TtlSource::Hfp);
        assert_eq!(ttl.ttl, -1);
    }

    #[test]
    fn test_ttl_rejects_other_shapes() {
        assert_eq!(
            ttl(&["VCL", "120", "10", "0", "1606400537"]),
            Err(ExtractError::TtlShape(5))
        );
        assert!(ttl(&["VCL", "1x", "10", "0", "1606400537", "uncacheable"]).is_err());
        assert!(ttl(&["VCL", "120", "10", "0", "yesterday", "uncacheable"]).is_err());
    }

    #[test]
    fn test_accounting() {
        let acct = accounting(&["619", "0", "619", "536", "935300", "935836"]).unwrap();
        assert_eq!(acct.header_bytes_received, 619);
        assert_eq!(acct.body_bytes_received, 0);
        assert_eq!(acct.header_bytes_transmitted, 536);
        assert_eq!(acct.body_bytes_transmitted, 935300);
    }

    #[test]
    fn test_accounting_rejects_bad_counter() {
        let err = accounting(&["619", "-1", "619", "536", "0", "536"]).unwrap_err();
        assert_eq!(
            err,
            ExtractError::InvalidInteger {
                field: "body_bytes_received",
                value: "-1".to_string()
            }
        );
    }
}
