use crate::OutputFormat;
use crate::commands::print_json;
use crate::report::{format_date, format_duration, format_time};
use crate::session::{
    Activity, DeleteConfirmation, DeleteOutcome, Session, SessionLifecycle, StartOutcome,
    StopOutcome, UserId, activity, elapsed_minutes,
};
use crate::store::SessionStore;
use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use serde_json::json;
use std::io::{BufRead, Write};

pub fn start<S: SessionStore + ?Sized>(
    store: &S,
    user: &UserId,
    snapshot: &[Session],
    job_name: &str,
    tz: &Tz,
    format: OutputFormat,
) -> Result<()> {
    let outcome = SessionLifecycle::new(store, user).start(snapshot, job_name)?;

    match (format, &outcome) {
        (OutputFormat::Json, StartOutcome::Started(session)) => {
            print_json(&json!({ "status": "started", "session": session }))?
        }
        (OutputFormat::Json, StartOutcome::AlreadyActive(session)) => {
            print_json(&json!({ "status": "already_active", "session": session }))?
        }
        (OutputFormat::Text, StartOutcome::Started(session)) => println!(
            "✓ Started '{}' at {}",
            session.job_name,
            format_time(Some(session.start_time), tz)
        ),
        (OutputFormat::Text, StartOutcome::AlreadyActive(session)) => println!(
            "Already tracking '{}' since {}. Run 'wtally stop' first.",
            session.job_name,
            format_time(Some(session.start_time), tz)
        ),
    }
    Ok(())
}

pub fn stop<S: SessionStore + ?Sized>(
    store: &S,
    user: &UserId,
    snapshot: &[Session],
    format: OutputFormat,
) -> Result<()> {
    let outcome = SessionLifecycle::new(store, user).stop(snapshot)?;

    match (format, &outcome) {
        (OutputFormat::Json, StopOutcome::Stopped(session)) => {
            print_json(&json!({ "status": "stopped", "session": session }))?
        }
        (OutputFormat::Json, StopOutcome::NotActive) => print_json(&json!({ "status": "idle" }))?,
        (OutputFormat::Text, StopOutcome::Stopped(session)) => println!(
            "✓ Stopped '{}' ({})",
            session.job_name,
            format_duration(session.duration_minutes)
        ),
        (OutputFormat::Text, StopOutcome::NotActive) => println!("No active session to stop."),
    }
    Ok(())
}

pub fn status(snapshot: &[Session], tz: &Tz, format: OutputFormat) -> Result<()> {
    let now = Utc::now();
    match (format, activity(snapshot)) {
        (OutputFormat::Json, Activity::Active(session)) => print_json(&json!({
            "status": "active",
            "session": session,
            "elapsedMinutes": elapsed_minutes(session.start_time, now),
        }))?,
        (OutputFormat::Json, Activity::Idle) => print_json(&json!({ "status": "idle" }))?,
        (OutputFormat::Text, Activity::Active(session)) => {
            println!("Tracking: {}", session.job_name);
            println!("  Started: {}", format_time(Some(session.start_time), tz));
            println!(
                "  Elapsed: {}",
                format_duration(Some(elapsed_minutes(session.start_time, now)))
            );
        }
        (OutputFormat::Text, Activity::Idle) => println!("Not tracking."),
    }
    Ok(())
}

pub fn list(snapshot: &[Session], limit: usize, tz: &Tz, format: OutputFormat) -> Result<()> {
    let shown: Vec<&Session> = snapshot.iter().take(limit).collect();

    if let OutputFormat::Json = format {
        return print_json(&shown);
    }

    if shown.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    println!(
        "{:<12} {:<12} {:<12} {:>8}  {:<30} {}",
        "Date", "Start", "End", "Duration", "Job", "ID"
    );
    println!("{}", "-".repeat(100));
    for session in shown {
        let end = if session.is_open() {
            "running".to_string()
        } else {
            format_time(session.end_time, tz)
        };
        println!(
            "{:<12} {:<12} {:<12} {:>8}  {:<30} {}",
            format_date(Some(session.start_time), tz),
            format_time(Some(session.start_time), tz),
            end,
            format_duration(session.duration_minutes),
            truncate(&session.job_name, 30),
            session.id
        );
    }
    Ok(())
}

/// Ask on `output` whether to delete `session`, reading the answer from `input`.
pub fn confirm_delete<R: BufRead, W: Write>(
    session: &Session,
    tz: &Tz,
    input: &mut R,
    output: &mut W,
) -> Result<Option<DeleteConfirmation>> {
    write!(
        output,
        "Delete '{}' from {} {} ({})? [y/N] ",
        session.job_name,
        format_date(Some(session.start_time), tz),
        format_time(Some(session.start_time), tz),
        format_duration(session.duration_minutes)
    )?;
    output.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(DeleteConfirmation::from_answer(&session.id, &answer))
}

pub fn delete<S: SessionStore + ?Sized>(
    store: &S,
    user: &UserId,
    snapshot: &[Session],
    session_id: &str,
    assume_yes: bool,
    tz: &Tz,
    format: OutputFormat,
) -> Result<()> {
    let Some(target) = snapshot.iter().find(|s| s.id == session_id) else {
        anyhow::bail!("No session with id '{}'", session_id);
    };

    let confirmation = if assume_yes {
        Some(DeleteConfirmation::assume_yes(session_id))
    } else {
        let stdin = std::io::stdin();
        confirm_delete(target, tz, &mut stdin.lock(), &mut std::io::stderr())?
    };
    let Some(confirmation) = confirmation else {
        match format {
            OutputFormat::Json => print_json(&json!({ "status": "cancelled" }))?,
            OutputFormat::Text => println!("Cancelled."),
        }
        return Ok(());
    };

    let outcome = SessionLifecycle::new(store, user).delete(snapshot, confirmation)?;
    match (format, outcome) {
        (OutputFormat::Json, DeleteOutcome::Deleted { session, was_active }) => print_json(
            &json!({ "status": "deleted", "session": session, "wasActive": was_active }),
        )?,
        (OutputFormat::Json, DeleteOutcome::NotFound) => {
            print_json(&json!({ "status": "not_found" }))?
        }
        (OutputFormat::Text, DeleteOutcome::Deleted { session, was_active }) => {
            println!("✓ Deleted '{}'", session.job_name);
            if was_active {
                println!("  It was running; nothing is being tracked now.");
            }
        }
        (OutputFormat::Text, DeleteOutcome::NotFound) => {
            println!("Session '{}' no longer exists.", session_id)
        }
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
