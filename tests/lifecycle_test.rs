use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use worktally::error::{TrackerError, WriteAction};
use worktally::session::{
    Activity, DEFAULT_JOB_NAME, DeleteConfirmation, DeleteOutcome, FixedClock, SessionLifecycle,
    StartOutcome, StopOutcome, UserId, activity,
};
use worktally::store::SessionStore;
use worktally::store::memory::MemoryStore;

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn user() -> UserId {
    UserId::new("user-1")
}

#[test]
fn test_start_blank_job_defaults_to_unspecified_project() {
    let store = MemoryStore::new();
    let user = user();
    let lifecycle = SessionLifecycle::new(&store, &user).with_clock(FixedClock(at("2026-10-19T09:00:00Z")));

    let outcome = lifecycle.start(&[], "").unwrap();

    let StartOutcome::Started(session) = outcome else {
        panic!("expected a new session, got {:?}", outcome);
    };
    assert_eq!(session.job_name, DEFAULT_JOB_NAME);
    assert_eq!(session.start_time, at("2026-10-19T09:00:00Z"));
    assert!(session.end_time.is_none());
    assert!(session.duration_minutes.is_none());

    let stored = store.list(&user).unwrap();
    assert_eq!(stored, vec![session]);
}

#[test]
fn test_start_trims_job_name() {
    let store = MemoryStore::new();
    let user = user();

    SessionLifecycle::new(&store, &user).start(&[], "  Client A \n").unwrap();

    assert_eq!(store.list(&user).unwrap()[0].job_name, "Client A");
}

#[test]
fn test_double_start_is_rejected() {
    let store = MemoryStore::new();
    let user = user();
    let lifecycle = SessionLifecycle::new(&store, &user);

    lifecycle.start(&[], "first").unwrap();
    let snapshot = store.list(&user).unwrap();
    let outcome = lifecycle.start(&snapshot, "second").unwrap();

    match outcome {
        StartOutcome::AlreadyActive(current) => assert_eq!(current.job_name, "first"),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(store.list(&user).unwrap().len(), 1);
}

#[test]
fn test_stop_sets_end_time_and_rounded_duration() {
    let store = MemoryStore::new();
    let user = user();
    let start = at("2026-10-19T09:00:00Z");

    SessionLifecycle::new(&store, &user)
        .with_clock(FixedClock(start))
        .start(&[], "Client A")
        .unwrap();
    let snapshot = store.list(&user).unwrap();

    let stop_at = start + Duration::minutes(89) + Duration::seconds(31);
    let outcome = SessionLifecycle::new(&store, &user)
        .with_clock(FixedClock(stop_at))
        .stop(&snapshot)
        .unwrap();

    let StopOutcome::Stopped(stopped) = outcome else {
        panic!("expected stop");
    };
    assert_eq!(stopped.end_time, Some(stop_at));
    assert_eq!(stopped.duration_minutes, Some(90));

    let stored = store.list(&user).unwrap();
    assert_eq!(stored[0], stopped);
    assert_eq!(activity(&stored), Activity::Idle);
}

#[test]
fn test_stop_when_idle_is_a_noop() {
    let store = MemoryStore::new();
    let user = user();

    let outcome = SessionLifecycle::new(&store, &user).stop(&[]).unwrap();

    assert_eq!(outcome, StopOutcome::NotActive);
    assert!(store.list(&user).unwrap().is_empty());
}

#[test]
fn test_failed_create_reports_write_error_and_stays_idle() {
    let store = MemoryStore::new();
    let user = user();
    store.set_fail_writes(true);

    let err = SessionLifecycle::new(&store, &user).start(&[], "x").unwrap_err();

    assert!(matches!(
        err,
        TrackerError::Write {
            action: WriteAction::Create,
            ..
        }
    ));
    store.set_fail_writes(false);
    assert_eq!(activity(&store.list(&user).unwrap()), Activity::Idle);
}

#[test]
fn test_failed_stop_leaves_session_open() {
    let store = MemoryStore::new();
    let user = user();
    SessionLifecycle::new(&store, &user).start(&[], "x").unwrap();
    let snapshot = store.list(&user).unwrap();

    store.set_fail_writes(true);
    let err = SessionLifecycle::new(&store, &user).stop(&snapshot).unwrap_err();
    store.set_fail_writes(false);

    assert!(matches!(
        err,
        TrackerError::Write {
            action: WriteAction::Update,
            ..
        }
    ));
    assert!(activity(&store.list(&user).unwrap()).is_active());
}

#[test]
fn test_delete_active_session_returns_to_idle() {
    let store = MemoryStore::new();
    let user = user();
    let lifecycle = SessionLifecycle::new(&store, &user);
    lifecycle.start(&[], "oops").unwrap();
    let snapshot = store.list(&user).unwrap();
    let id = snapshot[0].id.clone();

    let outcome = lifecycle
        .delete(&snapshot, DeleteConfirmation::assume_yes(&id))
        .unwrap();

    match outcome {
        DeleteOutcome::Deleted { session, was_active } => {
            assert_eq!(session.id, id);
            assert!(was_active);
        }
        other => panic!("expected delete, got {:?}", other),
    }
    assert_eq!(activity(&store.list(&user).unwrap()), Activity::Idle);
}

#[test]
fn test_delete_completed_session_keeps_active_one() {
    let store = MemoryStore::new();
    let user = user();
    let t0 = at("2026-10-19T08:00:00Z");

    let lifecycle = SessionLifecycle::new(&store, &user).with_clock(FixedClock(t0));
    lifecycle.start(&[], "done").unwrap();
    SessionLifecycle::new(&store, &user)
        .with_clock(FixedClock(t0 + Duration::minutes(30)))
        .stop(&store.list(&user).unwrap())
        .unwrap();
    SessionLifecycle::new(&store, &user)
        .with_clock(FixedClock(t0 + Duration::hours(1)))
        .start(&store.list(&user).unwrap(), "running")
        .unwrap();

    let snapshot = store.list(&user).unwrap();
    let done_id = snapshot.iter().find(|s| s.job_name == "done").unwrap().id.clone();
    let outcome = lifecycle
        .delete(&snapshot, DeleteConfirmation::assume_yes(&done_id))
        .unwrap();

    assert!(matches!(outcome, DeleteOutcome::Deleted { was_active: false, .. }));
    let remaining = store.list(&user).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].job_name, "running");
    assert!(activity(&remaining).is_active());
}

#[test]
fn test_delete_unknown_id_issues_no_write() {
    let store = MemoryStore::new();
    let user = user();
    store.set_fail_writes(true);

    let outcome = SessionLifecycle::new(&store, &user)
        .delete(&[], DeleteConfirmation::assume_yes("missing"))
        .unwrap();

    assert_eq!(outcome, DeleteOutcome::NotFound);
}

#[derive(Debug, Clone)]
enum Command {
    Start(String),
    Stop,
    Delete(usize),
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        2 => "[a-z ]{0,12}".prop_map(Command::Start),
        2 => Just(Command::Stop),
        1 => any::<usize>().prop_map(Command::Delete),
    ]
}

proptest! {
    #[test]
    fn test_at_most_one_open_session_over_any_command_sequence(
        steps in prop::collection::vec((arb_command(), 0i64..180), 0..200)
    ) {
        let store = MemoryStore::new();
        let user = user();
        let mut now = at("2026-01-01T00:00:00Z");

        for (step, (command, advance)) in steps.into_iter().enumerate() {
            now += Duration::minutes(advance);
            let snapshot = store.list(&user).unwrap();
            let lifecycle = SessionLifecycle::new(&store, &user).with_clock(FixedClock(now));

            match command {
                Command::Start(job) => {
                    lifecycle.start(&snapshot, &job).unwrap();
                }
                Command::Stop => {
                    lifecycle.stop(&snapshot).unwrap();
                }
                Command::Delete(pick) => {
                    if !snapshot.is_empty() {
                        let victim = &snapshot[pick % snapshot.len()];
                        let confirmation = DeleteConfirmation::assume_yes(&victim.id);
                        lifecycle.delete(&snapshot, confirmation).unwrap();
                    }
                }
            }

            let after = store.list(&user).unwrap();
            let open = after.iter().filter(|s| s.is_open()).count();
            prop_assert!(open <= 1, "step {} left {} open sessions", step, open);
            for session in &after {
                prop_assert_eq!(session.end_time.is_some(), session.duration_minutes.is_some());
                prop_assert!(session.duration_minutes.unwrap_or(0) >= 0);
            }
        }
    }
}
