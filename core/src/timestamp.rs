//! API timestamps and look-back periods.
//!
//! MediaWiki writes instants as ISO 8601 without fractional seconds, always
//! in UTC (`2006-01-01T00:00:00Z`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, SecondsFormat, TimeDelta, Utc};

use crate::error::{MediaWikiError, Result};

/// Render an instant the way the API expects it in `ucstart`/`ucend`.
pub fn format_api_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an API timestamp. Any RFC 3339 offset is accepted and normalized
/// to UTC.
pub fn parse_api_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| MediaWikiError::MalformedResponse(format!("bad timestamp {raw:?}: {e}")))
}

/// A span of calendar months plus a fixed duration, measured backwards from
/// an end instant.
///
/// Months are applied first using calendar arithmetic, so `P1M` before
/// March 31st lands on the last day of February.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Period {
    months: u32,
    delta: TimeDelta,
}

impl Period {
    pub fn new(months: u32, delta: TimeDelta) -> Self {
        Self { months, delta }
    }

    pub fn years(years: u32) -> Self {
        Self::new(years.saturating_mul(12), TimeDelta::zero())
    }

    pub fn months(months: u32) -> Self {
        Self::new(months, TimeDelta::zero())
    }

    pub fn days(days: u32) -> Self {
        Self::new(0, TimeDelta::days(i64::from(days)))
    }

    pub fn month_count(&self) -> u32 {
        self.months
    }

    pub fn delta(&self) -> TimeDelta {
        self.delta
    }

    /// `end - self`, or `None` if the result leaves chrono's range.
    pub fn before(&self, end: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        end.checked_sub_months(Months::new(self.months))?
            .checked_sub_signed(self.delta)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P")?;
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        let days = self.delta.num_days();
        if days != 0 {
            write!(f, "{days}D")?;
        }
        let seconds = (self.delta - TimeDelta::days(days)).num_seconds();
        if seconds != 0 {
            write!(f, "T{seconds}S")?;
        }
        if self.months == 0 && self.delta.is_zero() {
            write!(f, "0D")?;
        }
        Ok(())
    }
}

impl FromStr for Period {
    type Err = MediaWikiError;

    /// Parse an ISO 8601 duration such as `P2M`, `P1Y2M10DT2H30M` or `PT90S`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MediaWikiError::InvalidArgument(format!("invalid period {s:?}"));
        let body = s.strip_prefix('P').ok_or_else(invalid)?;
        if body.is_empty() {
            return Err(invalid());
        }

        let mut months: u32 = 0;
        let mut delta = TimeDelta::zero();
        let mut in_time = false;
        let mut time_fields = 0;
        // Rank of the last designator seen; each must come strictly later in
        // Y M W D T H M S than the one before it.
        let mut last_rank: Option<u8> = None;
        let mut digits = String::new();

        for c in body.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            if c == 'T' {
                if in_time || !digits.is_empty() {
                    return Err(invalid());
                }
                in_time = true;
                continue;
            }
            let n: u32 = digits.parse().map_err(|_| invalid())?;
            digits.clear();
            let n64 = i64::from(n);
            let (rank, part) = match (in_time, c) {
                (false, 'Y') => (0, None),
                (false, 'M') => (1, None),
                (false, 'W') => (2, TimeDelta::try_weeks(n64)),
                (false, 'D') => (3, TimeDelta::try_days(n64)),
                (true, 'H') => (4, TimeDelta::try_hours(n64)),
                (true, 'M') => (5, TimeDelta::try_minutes(n64)),
                (true, 'S') => (6, TimeDelta::try_seconds(n64)),
                _ => return Err(invalid()),
            };
            if last_rank.is_some_and(|last| rank <= last) {
                return Err(invalid());
            }
            last_rank = Some(rank);
            if in_time {
                time_fields += 1;
            }
            match rank {
                0 => {
                    let years = n.checked_mul(12).ok_or_else(invalid)?;
                    months = months.checked_add(years).ok_or_else(invalid)?;
                }
                1 => months = months.checked_add(n).ok_or_else(invalid)?,
                _ => {
                    let part = part.ok_or_else(invalid)?;
                    delta = delta.checked_add(&part).ok_or_else(invalid)?;
                }
            }
        }
        if !digits.is_empty() || (in_time && time_fields == 0) {
            return Err(invalid());
        }
        Ok(Self::new(months, delta))
    }
}
