pub mod lifecycle;
pub mod models;

pub use lifecycle::{
    Activity, Clock, DeleteConfirmation, DeleteOutcome, FixedClock, SessionLifecycle,
    StartOutcome, StopOutcome, SystemClock, activity, elapsed_minutes,
};
pub use models::{DEFAULT_JOB_NAME, NewSession, Session, SessionPatch, UserId};
