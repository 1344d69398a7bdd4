//! Calendar bucketing for session reports.
//!
//! Biweekly periods are the 1st-15th and the 16th-end of each month, so they
//! run 15 or 13-16 days rather than a fixed fourteen.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingMode {
    #[default]
    Weekly,
    Biweekly,
    Monthly,
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupingMode::Weekly => "weekly",
            GroupingMode::Biweekly => "biweekly",
            GroupingMode::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

/// Most recent Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_sunday()))
}

/// The 1st for days 1-15, the 16th otherwise.
pub fn biweek_start(date: NaiveDate) -> NaiveDate {
    let day = date.day();
    let anchor = if day <= 15 { 1 } else { 16 };
    date - Days::new(u64::from(day - anchor))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day() - 1))
}

impl GroupingMode {
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            GroupingMode::Weekly => week_start(date),
            GroupingMode::Biweekly => biweek_start(date),
            GroupingMode::Monthly => month_start(date),
        }
    }

    /// Last day of the period starting at `start`.
    pub fn period_end(self, start: NaiveDate) -> NaiveDate {
        match self {
            GroupingMode::Weekly => start + Days::new(6),
            GroupingMode::Biweekly if start.day() < 16 => start + Days::new(14),
            GroupingMode::Biweekly | GroupingMode::Monthly => month_start(start)
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(start),
        }
    }

    pub fn label(self, start: NaiveDate) -> String {
        match self {
            GroupingMode::Weekly => format!("Week of {}", start.format("%b %-d, %Y")),
            GroupingMode::Biweekly => format!(
                "{} {}-{}, {}",
                start.format("%b"),
                start.day(),
                self.period_end(start).day(),
                start.year()
            ),
            GroupingMode::Monthly => start.format("%B %Y").to_string(),
        }
    }
}

/// Period start for an instant, judged by the calendar date in `tz`.
pub fn period_start<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz, mode: GroupingMode) -> NaiveDate {
    mode.period_start(timestamp.with_timezone(tz).date_naive())
}
