use crate::OutputFormat;
use crate::commands::report::{TotalsReport, render_summary};
use crate::commands::Backend;
use crate::error::TrackerError;
use crate::report::{GroupingMode, aggregate, format_duration, format_time};
use crate::session::{Activity, Session, activity, elapsed_minutes};
use crate::store::feed;
use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

/// Upper bound for one poll, which is also how long Ctrl+C can wait on it.
const FEED_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub enum FeedEvent {
    Snapshot(Vec<Session>),
    Error(TrackerError),
}

/// Follow the session feed, re-rendering on every snapshot until Ctrl+C.
pub fn watch(backend: Backend, mode: GroupingMode, interval: Duration, format: OutputFormat) -> Result<()> {
    let Backend {
        store, identity, tz, ..
    } = backend;

    let store = store.with_timeout(FEED_REQUEST_TIMEOUT)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();

    let subscription = feed::subscribe(
        store,
        identity.user_id,
        interval,
        move |snapshot| {
            let _ = tx.send(FeedEvent::Snapshot(snapshot));
        },
        move |err| {
            let _ = error_tx.send(FeedEvent::Error(err));
        },
    );

    if let OutputFormat::Text = format {
        println!("Watching sessions ({} totals). Press Ctrl+C to stop.", mode);
    }

    let result = tokio::runtime::Runtime::new()?.block_on(event_loop(rx, mode, tz, format));

    subscription.unsubscribe();
    debug!("watch finished");
    result
}

async fn event_loop(
    mut events: UnboundedReceiver<FeedEvent>,
    mode: GroupingMode,
    tz: Tz,
    format: OutputFormat,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(FeedEvent::Snapshot(snapshot)) => render(&snapshot, mode, &tz, format)?,
                Some(FeedEvent::Error(err)) => eprintln!("⚠ {}", feed_error_message(&err)),
                None => break,
            },
        }
    }
    Ok(())
}

/// The feed keeps the last rendered snapshot on screen while it retries.
fn feed_error_message(err: &TrackerError) -> String {
    match err {
        TrackerError::Subscription(source) => format!(
            "Lost connection to the session store ({}). Showing last known data while retrying",
            source
        ),
        other => other.user_message(),
    }
}

fn render(snapshot: &[Session], mode: GroupingMode, tz: &Tz, format: OutputFormat) -> Result<()> {
    let now = Utc::now();
    let summary = aggregate(snapshot, mode, tz);

    if let OutputFormat::Json = format {
        let active = match activity(snapshot) {
            Activity::Active(session) => json!({
                "session": session,
                "elapsedMinutes": elapsed_minutes(session.start_time, now),
            }),
            Activity::Idle => serde_json::Value::Null,
        };
        // One compact object per line so consumers can stream it.
        println!(
            "{}",
            serde_json::to_string(&json!({
                "active": active,
                "totals": TotalsReport::new(&summary),
            }))?
        );
        return Ok(());
    }

    println!("\n== Updated {} ==", format_time(Some(now), tz));
    match activity(snapshot) {
        Activity::Active(session) => println!(
            "Tracking '{}' since {} ({})",
            session.job_name,
            format_time(Some(session.start_time), tz),
            format_duration(Some(elapsed_minutes(session.start_time, now)))
        ),
        Activity::Idle => println!("Not tracking."),
    }
    println!();
    print!("{}", render_summary(&summary, tz));
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_feed_outage_keeps_last_data_on_screen() {
        let err = TrackerError::read(StoreError::Unavailable("offline".to_string()));
        assert!(feed_error_message(&err).contains("Showing last known data"));
    }

    #[test]
    fn test_feed_auth_rejection_points_at_login() {
        let err = TrackerError::read(StoreError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: String::new(),
        });
        assert!(feed_error_message(&err).contains("wtally auth login"));
    }
}
