//! Weekly trigger for the violation sweep.
//!
//! Times are naive local wall-clock times; the daemon converts "now" with
//! `chrono::Local` before asking for the next fire time.
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub at: NaiveTime,
}

impl WeeklySchedule {
    /// Parse a weekday name (`mon`, `Monday`, ...) and an `HH:MM` time.
    pub fn parse(weekday: &str, at: &str) -> Result<Self> {
        let weekday: Weekday = weekday
            .trim()
            .parse()
            .map_err(|_| anyhow!("unknown weekday {weekday:?}"))?;
        let at = NaiveTime::parse_from_str(at.trim(), "%H:%M")
            .with_context(|| format!("sweep time {at:?} must be HH:MM"))?;
        Ok(Self { weekday, at })
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        date.weekday() == self.weekday
    }

    /// First fire time strictly after `now`.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        let days_ahead = (7 + self.weekday.num_days_from_monday()
            - today.weekday().num_days_from_monday())
            % 7;
        let candidate = (today + Duration::days(i64::from(days_ahead))).and_time(self.at);
        if candidate > now {
            candidate
        } else {
            candidate + Duration::days(7)
        }
    }
}
