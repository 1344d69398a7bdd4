use crate::report::period::{GroupingMode, period_start};
use crate::session::Session;
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

/// Completed sessions that share a period start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodGroup {
    #[serde(rename = "periodStart")]
    pub period_start: NaiveDate,
    pub sessions: Vec<Session>,
    #[serde(rename = "totalMinutes")]
    pub total_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub mode: GroupingMode,
    /// Newest period first.
    pub groups: Vec<PeriodGroup>,
    #[serde(rename = "totalMinutes")]
    pub total_minutes: i64,
}

impl PeriodSummary {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Bucket completed sessions by period in `tz` and total their minutes.
///
/// Open sessions carry no duration and are left out. Groups are keyed by the
/// ISO date of their period start, so two instants landing on the same
/// calendar date always share a group. Sessions keep their input order inside
/// each group.
pub fn aggregate<Tz: TimeZone>(sessions: &[Session], mode: GroupingMode, tz: &Tz) -> PeriodSummary {
    let mut buckets: BTreeMap<String, PeriodGroup> = BTreeMap::new();
    let mut total_minutes = 0;

    for session in sessions {
        let Some(minutes) = session.duration_minutes else {
            continue;
        };

        let start = period_start(session.start_time, tz, mode);
        let group = buckets
            .entry(start.format("%Y-%m-%d").to_string())
            .or_insert_with(|| PeriodGroup {
                period_start: start,
                sessions: Vec::new(),
                total_minutes: 0,
            });
        group.sessions.push(session.clone());
        group.total_minutes += minutes;
        total_minutes += minutes;
    }

    let mut groups: Vec<PeriodGroup> = buckets.into_values().collect();
    groups.sort_by(|a, b| b.period_start.cmp(&a.period_start));

    PeriodSummary {
        mode,
        groups,
        total_minutes,
    }
}
