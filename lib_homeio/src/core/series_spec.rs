//! # Series Specifier
//!
//! A plotted series is named by a dot-delimited string:
//! `identifier.kind.windowStart.windowEnd.limit`, e.g.
//! `kitchen.temp.sensor.1h.now.100`.
//!
//! Identifiers may themselves contain dots, so parsing is anchored on the
//! right: the last four tokens are always `kind`, `windowStart`, `windowEnd`
//! and `limit`; whatever precedes them joins back into the identifier.
//!
//! Window tokens use the duration suffix format of the backend UI:
//! an integer followed by one of `s i h d w m y` (seconds, minutes, hours,
//! days, weeks, months, years); a bare integer counts as seconds.
//! `windowEnd == "now"` marks the series whose most-recent point should
//! track live push updates for its identifier.

use thiserror::Error;

const MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Specifier parse/validation failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpecError {
    #[error("malformed series specifier '{spec}': {reason}")]
    Malformed { spec: String, reason: String },
}

fn malformed(spec: &str, reason: impl Into<String>) -> SpecError {
    SpecError::Malformed {
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

/// Where the query window ends, relative to the time of the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// The window tracks "now"; this is the live-tracking series for its item.
    Now,
    /// Fixed historical window ending this many milliseconds before now.
    Offset(i64),
}

/// Parsed descriptor of one plotted time range for one identifier.
///
/// Two specifiers are distinct entities even when they share an identifier;
/// the raw string (`key`) is the identity used for caching and publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    raw: String,
    /// Backend identifier the series plots.
    pub item: String,
    /// Aggregation kind requested by the widget (`avg`, `min`, `sensor`, ...).
    pub kind: String,
    /// Window start, as milliseconds back from the fetch time.
    pub start_offset_ms: i64,
    /// Window end, either live ("now") or a fixed offset back from now.
    pub end: WindowEnd,
    /// Maximum number of rows to request from the history endpoint.
    pub limit: u32,
}

impl SeriesSpec {
    /// Parses a raw specifier string, right-anchored.
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() < 5 {
            return Err(malformed(raw, "expected identifier.kind.start.end.limit"));
        }

        let limit_tok = parts[parts.len() - 1];
        let end_tok = parts[parts.len() - 2];
        let start_tok = parts[parts.len() - 3];
        let kind = parts[parts.len() - 4];
        let item = parts[..parts.len() - 4].join(".");

        if item.is_empty() {
            return Err(malformed(raw, "empty identifier"));
        }
        if kind.is_empty() {
            return Err(malformed(raw, "empty series kind"));
        }

        let limit: u32 = limit_tok
            .parse()
            .map_err(|_| malformed(raw, format!("invalid limit '{}'", limit_tok)))?;

        let start_offset_ms = parse_duration_ms(start_tok)
            .ok_or_else(|| malformed(raw, format!("invalid window start '{}'", start_tok)))?;

        let end = if end_tok == "now" {
            WindowEnd::Now
        } else {
            WindowEnd::Offset(
                parse_duration_ms(end_tok)
                    .ok_or_else(|| malformed(raw, format!("invalid window end '{}'", end_tok)))?,
            )
        };

        Ok(Self {
            raw: raw.to_string(),
            item,
            kind: kind.to_string(),
            start_offset_ms,
            end,
            limit,
        })
    }

    /// The raw specifier string; identity for cache entries and updates.
    pub fn key(&self) -> &str {
        &self.raw
    }

    /// True when the most-recent point should track live push updates.
    pub fn is_live(&self) -> bool {
        matches!(self.end, WindowEnd::Now)
    }

    /// Resolves the query window against a concrete fetch time (Unix ms).
    pub fn window(&self, now_ms: i64) -> (i64, i64) {
        let start = now_ms - self.start_offset_ms;
        let end = match self.end {
            WindowEnd::Now => now_ms,
            WindowEnd::Offset(back_ms) => now_ms - back_ms,
        };
        (start, end)
    }
}

/// Parses a duration token (`90`, `30s`, `10i`, `1h`, `7d`, ...) to
/// milliseconds. Months and years are calendar approximations (30/365 days),
/// matching the plotting frontend.
pub(crate) fn parse_duration_ms(token: &str) -> Option<i64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let (digits, unit) = if token.ends_with(|c: char| c.is_ascii_alphabetic()) {
        token.split_at(token.len() - 1)
    } else {
        (token, "")
    };

    let n: i64 = digits.parse().ok()?;
    if n < 0 {
        return None;
    }

    let ms = match unit {
        "" | "s" => n.checked_mul(MS)?,
        "i" => n.checked_mul(MINUTE_MS)?,
        "h" => n.checked_mul(HOUR_MS)?,
        "d" => n.checked_mul(DAY_MS)?,
        "w" => n.checked_mul(7 * DAY_MS)?,
        "m" => n.checked_mul(30 * DAY_MS)?,
        "y" => n.checked_mul(365 * DAY_MS)?,
        _ => return None,
    };
    Some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_identifier_right_anchored() {
        let spec = SeriesSpec::parse("kitchen.temp.sensor.1h.now.100").unwrap();
        assert_eq!(spec.item, "kitchen.temp");
        assert_eq!(spec.kind, "sensor");
        assert_eq!(spec.start_offset_ms, HOUR_MS);
        assert_eq!(spec.end, WindowEnd::Now);
        assert_eq!(spec.limit, 100);
        assert!(spec.is_live());
        assert_eq!(spec.key(), "kitchen.temp.sensor.1h.now.100");
    }

    #[test]
    fn parses_fixed_window() {
        let spec = SeriesSpec::parse("attic.hum.avg.2d.1d.50").unwrap();
        assert_eq!(spec.item, "attic.hum");
        assert_eq!(spec.end, WindowEnd::Offset(DAY_MS));
        assert!(!spec.is_live());

        let (start, end) = spec.window(10 * DAY_MS);
        assert_eq!(start, 8 * DAY_MS);
        assert_eq!(end, 9 * DAY_MS);
    }

    #[test]
    fn window_tracks_now_for_live_series() {
        let spec = SeriesSpec::parse("hall.light.avg.30i.now.20").unwrap();
        let now = 1_700_000_000_000;
        assert_eq!(spec.window(now), (now - 30 * MINUTE_MS, now));
    }

    #[test]
    fn rejects_malformed_specifiers() {
        assert!(SeriesSpec::parse("kitchen.temp").is_err());
        assert!(SeriesSpec::parse("kitchen.avg.1h.now.many").is_err());
        assert!(SeriesSpec::parse("kitchen.avg.soon.now.100").is_err());
        assert!(SeriesSpec::parse("kitchen.avg.1h.later.100").is_err());
        assert!(SeriesSpec::parse(".avg.1h.now.100").is_err());
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration_ms("90"), Some(90 * MS));
        assert_eq!(parse_duration_ms("45s"), Some(45 * MS));
        assert_eq!(parse_duration_ms("10i"), Some(10 * MINUTE_MS));
        assert_eq!(parse_duration_ms("2h"), Some(2 * HOUR_MS));
        assert_eq!(parse_duration_ms("1w"), Some(7 * DAY_MS));
        assert_eq!(parse_duration_ms("1y"), Some(365 * DAY_MS));
        assert_eq!(parse_duration_ms("h"), None);
        assert_eq!(parse_duration_ms("-1h"), None);
        assert_eq!(parse_duration_ms("1x"), None);
        assert_eq!(parse_duration_ms(""), None);
    }
}
