use crate::OutputFormat;
use crate::commands::print_json;
use crate::report::{GroupingMode, PeriodSummary, aggregate, format_date, format_duration, format_time};
use crate::session::Session;
use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt::Write;

/// JSON view of a [`PeriodSummary`] with display strings alongside raw minutes.
#[derive(Debug, Serialize)]
pub struct TotalsReport<'a> {
    pub mode: GroupingMode,
    pub groups: Vec<GroupReport<'a>>,
    #[serde(rename = "totalMinutes")]
    pub total_minutes: i64,
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct GroupReport<'a> {
    #[serde(rename = "periodStart")]
    pub period_start: NaiveDate,
    pub label: String,
    #[serde(rename = "totalMinutes")]
    pub total_minutes: i64,
    pub total: String,
    pub sessions: &'a [Session],
}

impl<'a> TotalsReport<'a> {
    pub fn new(summary: &'a PeriodSummary) -> Self {
        Self {
            mode: summary.mode,
            groups: summary
                .groups
                .iter()
                .map(|group| GroupReport {
                    period_start: group.period_start,
                    label: summary.mode.label(group.period_start),
                    total_minutes: group.total_minutes,
                    total: format_duration(Some(group.total_minutes)),
                    sessions: &group.sessions,
                })
                .collect(),
            total_minutes: summary.total_minutes,
            total: format_duration(Some(summary.total_minutes)),
        }
    }
}

/// Plain-text rendering: one block per period, newest first, then the grand total.
pub fn render_summary(summary: &PeriodSummary, tz: &Tz) -> String {
    let mut out = String::new();

    if summary.is_empty() {
        out.push_str("No completed sessions yet.\n");
        return out;
    }

    for group in &summary.groups {
        let _ = writeln!(
            out,
            "{:<40} {:>8}",
            summary.mode.label(group.period_start),
            format_duration(Some(group.total_minutes))
        );
        for session in &group.sessions {
            let _ = writeln!(
                out,
                "  {:<11} {:>11} - {:<11} {:>8}  {}",
                format_date(Some(session.start_time), tz),
                format_time(Some(session.start_time), tz),
                format_time(session.end_time, tz),
                format_duration(session.duration_minutes),
                session.job_name
            );
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "{:<40} {:>8}",
        "Total",
        format_duration(Some(summary.total_minutes))
    );
    out
}

pub fn totals(snapshot: &[Session], mode: GroupingMode, tz: &Tz, format: OutputFormat) -> Result<()> {
    let summary = aggregate(snapshot, mode, tz);

    match format {
        OutputFormat::Json => print_json(&TotalsReport::new(&summary))?,
        OutputFormat::Text => print!("{}", render_summary(&summary, tz)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(id: &str, start: &str, minutes: i64, job: &str) -> Session {
        let start_time: chrono::DateTime<chrono::Utc> = start.parse().unwrap();
        Session {
            id: id.to_string(),
            start_time,
            end_time: Some(start_time + chrono::Duration::minutes(minutes)),
            duration_minutes: Some(minutes),
            job_name: job.to_string(),
        }
    }

    #[test]
    fn test_render_summary_lists_periods_and_total() {
        let sessions = vec![
            completed("a", "2026-10-19T09:00:00Z", 90, "Client A"),
            completed("b", "2026-10-13T14:00:00Z", 45, "Client B"),
        ];
        let summary = aggregate(&sessions, GroupingMode::Weekly, &Tz::UTC);
        let text = render_summary(&summary, &Tz::UTC);

        let week_18 = text.find("Week of Oct 18, 2026").unwrap();
        let week_11 = text.find("Week of Oct 11, 2026").unwrap();
        assert!(week_18 < week_11, "newest period first");
        assert!(text.contains("Client A"));
        assert!(text.contains("10:30:00 AM"));
        assert!(text.lines().last().unwrap().starts_with("Total"));
        assert!(text.lines().last().unwrap().ends_with("2:15"));
    }

    #[test]
    fn test_render_empty_summary() {
        let summary = aggregate(&[], GroupingMode::Monthly, &Tz::UTC);
        assert_eq!(render_summary(&summary, &Tz::UTC), "No completed sessions yet.\n");
    }

    #[test]
    fn test_totals_report_formats_durations() {
        let sessions = vec![completed("a", "2026-10-19T09:00:00Z", 135, "Client A")];
        let summary = aggregate(&sessions, GroupingMode::Biweekly, &Tz::UTC);
        let json = serde_json::to_value(TotalsReport::new(&summary)).unwrap();

        assert_eq!(json["mode"], "biweekly");
        assert_eq!(json["total"], "2:15");
        assert_eq!(json["groups"][0]["periodStart"], "2026-10-16");
        assert_eq!(json["groups"][0]["label"], "Oct 16-31, 2026");
        assert_eq!(json["groups"][0]["sessions"][0]["jobName"], "Client A");
    }
}
