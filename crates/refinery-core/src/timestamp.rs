//! The end-of-window cutoff used by the time filter.
//!
//! Accepted spellings: `Any time`, an RFC 3339 instant, a `YYYY-MM-DD` date
//! (midnight UTC), or `Last N <unit>` / `Last <unit>`.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

const ANY_TIME: &str = "Any time";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeUnit {
  Hours,
  Days,
  Weeks,
  Months,
  Years,
}

impl RelativeUnit {
  fn parse(s: &str) -> Option<Self> {
    let s = s.to_ascii_lowercase();
    match s.strip_suffix('s').unwrap_or(&s) {
      "hour" => Some(Self::Hours),
      "day" => Some(Self::Days),
      "week" => Some(Self::Weeks),
      "month" => Some(Self::Months),
      "year" => Some(Self::Years),
      _ => None,
    }
  }

  fn as_str(self, plural: bool) -> &'static str {
    match (self, plural) {
      (Self::Hours, false) => "hour",
      (Self::Hours, true) => "hours",
      (Self::Days, false) => "day",
      (Self::Days, true) => "days",
      (Self::Weeks, false) => "week",
      (Self::Weeks, true) => "weeks",
      (Self::Months, false) => "month",
      (Self::Months, true) => "months",
      (Self::Years, false) => "year",
      (Self::Years, true) => "years",
    }
  }
}

/// Facts at or after the resolved instant are filtered out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EndTimestamp {
  #[default]
  AnyTime,
  Absolute(DateTime<Utc>),
  Relative { amount: u32, unit: RelativeUnit },
}

impl EndTimestamp {
  pub fn is_any_time(&self) -> bool { matches!(self, Self::AnyTime) }

  /// The absolute cutoff relative to `now`, or `None` for [`Self::AnyTime`].
  ///
  /// Month and year offsets use calendar arithmetic, clamping to the end of
  /// shorter months.
  pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (amount, unit) = match *self {
      Self::AnyTime => return None,
      Self::Absolute(at) => return Some(at),
      Self::Relative { amount, unit } => (amount, unit),
    };
    let resolved = match unit {
      RelativeUnit::Hours => now.checked_sub_signed(Duration::hours(amount.into())),
      RelativeUnit::Days => now.checked_sub_signed(Duration::days(amount.into())),
      RelativeUnit::Weeks => now.checked_sub_signed(Duration::weeks(amount.into())),
      RelativeUnit::Months => now.checked_sub_months(Months::new(amount)),
      RelativeUnit::Years => amount
        .checked_mul(12)
        .and_then(|m| now.checked_sub_months(Months::new(m))),
    };
    Some(resolved.unwrap_or(DateTime::<Utc>::MIN_UTC))
  }
}

impl FromStr for EndTimestamp {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    let invalid = || Error::InvalidEndTimestamp(s.to_owned());

    if trimmed.eq_ignore_ascii_case(ANY_TIME) || trimmed.eq_ignore_ascii_case("anytime") {
      return Ok(Self::AnyTime);
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if let Some((first, rest)) = words.split_first()
      && first.eq_ignore_ascii_case("last")
    {
      let (amount, unit) = match rest {
        [unit] => (1, *unit),
        [amount, unit] => (amount.parse::<u32>().map_err(|_| invalid())?, *unit),
        _ => return Err(invalid()),
      };
      let unit = RelativeUnit::parse(unit).ok_or_else(invalid)?;
      if amount == 0 {
        return Err(invalid());
      }
      return Ok(Self::Relative { amount, unit });
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
      return Ok(Self::Absolute(at.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
      .ok()
      .and_then(|d| d.and_hms_opt(0, 0, 0))
      .map(|dt| Self::Absolute(dt.and_utc()))
      .ok_or_else(invalid)
  }
}

impl TryFrom<String> for EndTimestamp {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<EndTimestamp> for String {
  fn from(t: EndTimestamp) -> Self { t.to_string() }
}

impl fmt::Display for EndTimestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::AnyTime => f.write_str(ANY_TIME),
      Self::Absolute(at) => f.write_str(&at.to_rfc3339()),
      Self::Relative { amount: 1, unit } => write!(f, "Last {}", unit.as_str(false)),
      Self::Relative { amount, unit } => write!(f, "Last {amount} {}", unit.as_str(true)),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap() }

  #[test]
  fn parses_any_time() {
    assert_eq!("Any time".parse::<EndTimestamp>().unwrap(), EndTimestamp::AnyTime);
    assert_eq!("any TIME".parse::<EndTimestamp>().unwrap(), EndTimestamp::AnyTime);
    assert_eq!(EndTimestamp::AnyTime.resolve(now()), None);
  }

  #[test]
  fn parses_relative_ranges() {
    let t: EndTimestamp = "Last 7 days".parse().unwrap();
    assert_eq!(t, EndTimestamp::Relative {
      amount: 7,
      unit:   RelativeUnit::Days,
    });
    assert_eq!(t.resolve(now()), Some(Utc.with_ymd_and_hms(2024, 3, 24, 12, 0, 0).unwrap()));

    let t: EndTimestamp = "last year".parse().unwrap();
    assert_eq!(t.resolve(now()), Some(Utc.with_ymd_and_hms(2023, 3, 31, 12, 0, 0).unwrap()));
  }

  #[test]
  fn month_arithmetic_clamps() {
    let t: EndTimestamp = "Last 1 month".parse().unwrap();
    assert_eq!(t.resolve(now()), Some(Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()));
  }

  #[test]
  fn parses_absolute_forms() {
    let t: EndTimestamp = "2020-01-02T03:04:05Z".parse().unwrap();
    assert_eq!(t.resolve(now()), Some(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap()));

    let t: EndTimestamp = "2020-01-02".parse().unwrap();
    assert_eq!(t.resolve(now()), Some(Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap()));
  }

  #[test]
  fn rejects_garbage() {
    for bad in ["", "Last", "Last 0 days", "Last -3 days", "Last 3 fortnights", "yesterday"] {
      assert!(
        matches!(bad.parse::<EndTimestamp>(), Err(Error::InvalidEndTimestamp(_))),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn display_parses_back() {
    for s in ["Any time", "Last hour", "Last 30 days", "2020-01-02T03:04:05+00:00"] {
      let t: EndTimestamp = s.parse().unwrap();
      assert_eq!(t.to_string(), s);
    }
  }

  #[test]
  fn serde_uses_display_form() {
    let json = serde_json::to_string(&EndTimestamp::Relative {
      amount: 2,
      unit:   RelativeUnit::Weeks,
    })
    .unwrap();
    assert_eq!(json, r#""Last 2 weeks""#);
    let back: EndTimestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(back.to_string(), "Last 2 weeks");
  }
}
