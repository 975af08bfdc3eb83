//! Cron expression parser for the daily jobs.
//! Supports: "MIN HOUR DOM MON DOW" (5-field), or 6 fields with a leading
//! seconds field that must be `0`.
//! Fields: `*`, `*/N`, `N`, `A-B`, `A-B/N` and comma-separated lists of those.
//! Example: "0 9 * * *" = every day at 09:00 UTC

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    #[error("invalid cron expression `{0}`: need 5 fields (MIN HOUR DOM MON DOW)")]
    FieldCount(String),

    #[error("invalid cron field `{field}`: {reason}")]
    Field { field: String, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    /// 0 = Sunday.
    days_of_week: Vec<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule").field(&self.expression).finish()
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() == 6 {
            if parts[0] != "0" {
                return Err(CronError::Field {
                    field: parts[0].to_string(),
                    reason: "seconds must be 0".to_string(),
                });
            }
            parts.remove(0);
        }
        if parts.len() != 5 {
            return Err(CronError::FieldCount(expression.to_string()));
        }

        // Sunday may be written as 7.
        let mut days_of_week: Vec<u32> = parse_field(parts[4], 0, 7)?
            .into_iter()
            .map(|d| d % 7)
            .collect();
        days_of_week.sort_unstable();
        days_of_week.dedup();

        Ok(Self {
            expression: parts.join(" "),
            minutes: parse_field(parts[0], 0, 59)?,
            hours: parse_field(parts[1], 0, 23)?,
            days_of_month: parse_field(parts[2], 1, 31)?,
            months: parse_field(parts[3], 1, 12)?,
            days_of_week,
            dom_restricted: parts[2] != "*",
            dow_restricted: parts[4] != "*",
        })
    }
}

impl CronSchedule {
    /// Every day at `hour:minute` UTC.
    pub fn daily(hour: u32, minute: u32) -> Self {
        let hour = hour.min(23);
        let minute = minute.min(59);
        Self {
            expression: format!("{minute} {hour} * * *"),
            minutes: vec![minute],
            hours: vec![hour],
            days_of_month: (1..=31).collect(),
            months: (1..=12).collect(),
            days_of_week: (0..=6).collect(),
            dom_restricted: false,
            dow_restricted: false,
        }
    }

    /// First matching minute strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = (after + Duration::minutes(1))
            .with_second(0)?
            .with_nanosecond(0)?;

        // Four years covers every satisfiable day/month combination, Feb 29 included.
        let horizon = after + Duration::days(366 * 4);
        while candidate <= horizon {
            if !self.matches_day(candidate) {
                let next_day = candidate.date_naive().succ_opt()?;
                candidate = next_day.and_time(NaiveTime::MIN).and_utc();
                continue;
            }
            if !self.hours.contains(&candidate.hour()) {
                candidate = candidate.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if self.minutes.contains(&candidate.minute()) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }

    fn matches_day(&self, at: DateTime<Utc>) -> bool {
        if !self.months.contains(&at.month()) {
            return false;
        }
        let dom = self.days_of_month.contains(&at.day());
        let dow = self
            .days_of_week
            .contains(&at.weekday().num_days_from_sunday());
        // Classic cron: when both day fields are restricted, either may match.
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }
}

/// Parse a cron field into the sorted list of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Result<Vec<u32>, CronError> {
    let invalid = |reason: &str| CronError::Field {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let mut values = Vec::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step.parse().map_err(|_| invalid("bad step"))?;
                if step == 0 {
                    return Err(invalid("step must be positive"));
                }
                (range, step)
            }
            None => (part, 1),
        };

        let (start, end) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            let a: u32 = a.parse().map_err(|_| invalid("bad range start"))?;
            let b: u32 = b.parse().map_err(|_| invalid("bad range end"))?;
            (a, b)
        } else {
            let n: u32 = range.parse().map_err(|_| invalid("not a number"))?;
            (n, n)
        };

        if start < min || end > max || start > end {
            return Err(invalid(&format!("out of range {min}-{max}")));
        }
        values.extend((start..=end).step_by(step as usize));
    }

    values.sort_unstable();
    values.dedup();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule(expr: &str) -> CronSchedule {
        expr.parse().unwrap()
    }

    #[test]
    fn test_daily_at_nine() {
        let cron = schedule("0 9 * * *");
        let before = Utc.with_ymd_and_hms(2026, 2, 22, 7, 0, 0).unwrap();
        assert_eq!(
            cron.next_after(before),
            Some(Utc.with_ymd_and_hms(2026, 2, 22, 9, 0, 0).unwrap())
        );

        let after = Utc.with_ymd_and_hms(2026, 2, 22, 9, 0, 0).unwrap();
        assert_eq!(
            cron.next_after(after),
            Some(Utc.with_ymd_and_hms(2026, 2, 23, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_daily_constructor_matches_parsed() {
        assert_eq!(CronSchedule::daily(9, 0), schedule("0 9 * * *"));
    }

    #[test]
    fn test_six_field_form() {
        let cron = schedule("0 0 9 * * *");
        assert_eq!(cron.to_string(), "0 9 * * *");
        assert!(matches!(
            "30 0 9 * * *".parse::<CronSchedule>(),
            Err(CronError::Field { .. })
        ));
    }

    #[test]
    fn test_every_15_minutes() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 10, 2, 0).unwrap();
        let next = schedule("*/15 * * * *").next_after(after).unwrap();
        assert_eq!((next.hour(), next.minute()), (10, 15));
    }

    #[test]
    fn test_weekday_only() {
        // 2026-02-21 is a Saturday.
        let after = Utc.with_ymd_and_hms(2026, 2, 21, 12, 0, 0).unwrap();
        let next = schedule("30 8 * * 1-5").next_after(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 23, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_invalid_expression() {
        assert!(matches!(
            "bad".parse::<CronSchedule>(),
            Err(CronError::FieldCount(_))
        ));
        assert!("61 * * * *".parse::<CronSchedule>().is_err());
        assert!("*/0 * * * *".parse::<CronSchedule>().is_err());
    }
}
