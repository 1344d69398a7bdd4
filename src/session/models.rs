use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_JOB_NAME: &str = "Unspecified Project";

/// Stable identifier handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked work session as stored in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    /// `None` while the session is still running.
    #[serde(rename = "endTime", default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "durationMinutes", default)]
    pub duration_minutes: Option<i64>,
    #[serde(rename = "jobName", default = "default_job_name")]
    pub job_name: String,
}

fn default_job_name() -> String {
    DEFAULT_JOB_NAME.to_string()
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.duration_minutes.is_some()
    }
}

/// Request body for creating a session. Both end fields serialize as explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSession {
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "durationMinutes")]
    pub duration_minutes: Option<i64>,
    #[serde(rename = "jobName")]
    pub job_name: String,
}

impl NewSession {
    pub fn open(start_time: DateTime<Utc>, job_name: &str) -> Self {
        Self {
            start_time,
            end_time: None,
            duration_minutes: None,
            job_name: normalize_job_name(job_name),
        }
    }

    pub fn into_session(self, id: String) -> Session {
        Session {
            id,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            job_name: self.job_name,
        }
    }
}

/// Partial update issued on stop. End time and duration always travel together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPatch {
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "durationMinutes")]
    pub duration_minutes: i64,
}

impl SessionPatch {
    pub fn apply(&self, session: &mut Session) {
        session.end_time = Some(self.end_time);
        session.duration_minutes = Some(self.duration_minutes);
    }
}

/// Trimmed job label, or the default label when nothing but whitespace was given.
pub fn normalize_job_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_JOB_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
