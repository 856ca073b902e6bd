//! Recurring streamer schedule slots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One recurring slot in a streamer's schedule.
///
/// Times are `HHMM` integers in station time (`930` is 09:30). `days` uses
/// ISO weekdays, 1 = Monday through 7 = Sunday; an empty list means every day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ScheduleItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub start_time: i32,
    pub end_time: i32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days: Vec<u8>,
    pub loop_once: bool,
}

impl ScheduleItem {
    /// Normalise and check the slot. Days are sorted and deduplicated.
    pub fn validate(&mut self) -> Result<(), String> {
        validate_time(self.start_time, "start_time")?;
        validate_time(self.end_time, "end_time")?;
        if self.start_time == self.end_time {
            return Err("start_time and end_time must differ".to_string());
        }

        if let Some(day) = self.days.iter().find(|day| !(1..=7).contains(*day)) {
            return Err(format!("day {day} is outside 1 (Monday) to 7 (Sunday)"));
        }
        self.days.sort_unstable();
        self.days.dedup();

        self.start_date = normalise_date(self.start_date.take());
        self.end_date = normalise_date(self.end_date.take());

        let start = parse_date(self.start_date.as_deref(), "start_date")?;
        let end = parse_date(self.end_date.as_deref(), "end_date")?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err("start_date must not be after end_date".to_string());
            }
        }

        Ok(())
    }

    /// Human readable `HH:MM-HH:MM`.
    pub fn time_range(&self) -> String {
        format!(
            "{}-{}",
            format_time(self.start_time),
            format_time(self.end_time)
        )
    }
}

fn validate_time(value: i32, field: &str) -> Result<(), String> {
    if !(0..=2359).contains(&value) || value % 100 >= 60 {
        return Err(format!(
            "{field} must be an HHMM time between 0000 and 2359, got {value}"
        ));
    }
    Ok(())
}

fn normalise_date(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, String> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| format!("{field} must be a YYYY-MM-DD date, got '{raw}'"))
        })
        .transpose()
}

pub fn format_time(value: i32) -> String {
    format!("{:02}:{:02}", value / 100, value % 100)
}
