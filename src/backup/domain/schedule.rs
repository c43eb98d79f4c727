//! Five-field cron schedules.
//!
//! Expressions follow the unix grammar (`minute hour day-of-month month
//! day-of-week`, Sunday as `0` or `7`). When both day fields are restricted
//! a minute matches if either of them does. Six-field expressions with a
//! leading seconds column are rejected. Evaluation happens at minute
//! resolution.

use super::BackupDomainError;
use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];
const LAST_WEEKDAY: u8 = 7;

/// Validated five-field cron schedule.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CronSchedule {
    expression: String,
    /// One schedule, or two whose union is the expression when both day
    /// fields are restricted.
    schedules: Vec<Schedule>,
}

impl CronSchedule {
    /// Parses a five-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns [`BackupDomainError::InvalidCronSchedule`] when the expression
    /// does not have exactly five fields or a field is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use strongroom::backup::domain::CronSchedule;
    ///
    /// assert!(CronSchedule::parse("* * * * *").is_ok());
    /// assert!(CronSchedule::parse("not-a-cron").is_err());
    /// assert!(CronSchedule::parse("0 0 0 * * *").is_err());
    /// ```
    pub fn parse(expression: impl Into<String>) -> Result<Self, BackupDomainError> {
        let raw = expression.into();
        let fields: Vec<&str> = raw.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
            return Err(invalid(&raw, field_count_reason(fields.len())));
        };

        let weekdays =
            normalize_day_of_week(day_of_week).map_err(|reason| invalid(&raw, reason))?;
        let build = |days_of_month: &str, days_of_week: &str| {
            let six_field = format!("0 {minute} {hour} {days_of_month} {month} {days_of_week}");
            Schedule::from_str(&six_field).map_err(|err| invalid(&raw, err.to_string()))
        };

        let schedules = if is_restricted(day_of_month) && is_restricted(day_of_week) {
            vec![build(day_of_month, "*")?, build("*", &weekdays)?]
        } else {
            vec![build(day_of_month, &weekdays)?]
        };

        Ok(Self {
            expression: fields.join(" "),
            schedules,
        })
    }

    /// Returns the normalized five-field expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Returns whether the schedule matches the minute containing `instant`
    /// when read in `timezone`.
    #[must_use]
    pub fn fires_at(&self, instant: DateTime<Utc>, timezone: &FixedOffset) -> bool {
        let local = truncate_to_minute(instant).with_timezone(timezone);
        let just_before = local - Duration::seconds(1);
        self.schedules.iter().any(|schedule| {
            schedule
                .after(&just_before)
                .next()
                .is_some_and(|next| next == local)
        })
    }

    /// Returns the first matching minute strictly after `instant`.
    #[must_use]
    pub fn next_after(
        &self,
        instant: DateTime<Utc>,
        timezone: &FixedOffset,
    ) -> Option<DateTime<Utc>> {
        let local = instant.with_timezone(timezone);
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(&local).next())
            .min()
            .map(|next| next.with_timezone(&Utc))
    }
}

/// Drops seconds and sub-second precision from an instant.
#[must_use]
pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(instant)
}

fn invalid(expression: &str, reason: String) -> BackupDomainError {
    BackupDomainError::InvalidCronSchedule {
        expression: expression.to_owned(),
        reason,
    }
}

fn field_count_reason(count: usize) -> String {
    if count == 6 {
        return String::from(
            "six-field expressions with a seconds column are not supported; \
             use minute hour day-of-month month day-of-week",
        );
    }
    format!(
        "expected five fields (minute hour day-of-month month day-of-week), found {count}"
    )
}

/// A day field starting with `*` leaves the other day field in charge.
fn is_restricted(field: &str) -> bool {
    !field.starts_with('*')
}

/// Rewrites a unix day-of-week field (`0`-`7`, Sunday twice) as a list of
/// day names so the underlying parser, which counts from Sunday as `1`,
/// reads it the unix way.
fn normalize_day_of_week(field: &str) -> Result<String, String> {
    if field == "*" {
        return Ok(field.to_owned());
    }
    let mut days = BTreeSet::new();
    for item in field.split(',') {
        days.extend(expand_day_of_week_item(item)?);
    }
    Ok(days
        .into_iter()
        .filter_map(|day| DAY_NAMES.get(usize::from(day)).copied())
        .collect::<Vec<_>>()
        .join(","))
}

/// Expands one list item to weekday numbers with Sunday as `0`.
fn expand_day_of_week_item(item: &str) -> Result<Vec<u8>, String> {
    let (base, step) = match item.split_once('/') {
        Some((range, interval)) => (range, parse_step(interval)?),
        None => (item, 1),
    };
    let (first, last) = if base == "*" {
        (0, LAST_WEEKDAY)
    } else if let Some((start, end)) = base.split_once('-') {
        (day_number(start)?, day_number(end)?)
    } else if item.contains('/') {
        (day_number(base)?, LAST_WEEKDAY)
    } else {
        let day = day_number(base)?;
        (day, day)
    };
    if first > last {
        return Err(format!("day-of-week range {base} runs backwards"));
    }
    Ok((first..=last)
        .step_by(step)
        .map(|day| if day == LAST_WEEKDAY { 0 } else { day })
        .collect())
}

fn parse_step(interval: &str) -> Result<usize, String> {
    match interval.parse::<usize>() {
        Ok(step) if step > 0 => Ok(step),
        _ => Err(format!("day-of-week step {interval} must be a positive number")),
    }
}

fn day_number(token: &str) -> Result<u8, String> {
    if let Ok(number) = token.parse::<u8>() {
        if number > LAST_WEEKDAY {
            return Err(format!("day-of-week value {number} is outside 0-7"));
        }
        return Ok(number);
    }
    let upper = token.to_ascii_uppercase();
    DAY_NAMES
        .iter()
        .position(|name| *name == upper)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("unknown day-of-week {token}"))
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule")
            .field(&self.expression)
            .finish()
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for CronSchedule {}

impl TryFrom<String> for CronSchedule {
    type Error = BackupDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CronSchedule> for String {
    fn from(schedule: CronSchedule) -> Self {
        schedule.expression
    }
}
