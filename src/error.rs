use std::fmt;
use thiserror::Error;

/// Failures reported by a [`crate::store::SessionStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to session store failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("session store returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("could not decode session store response: {0}")]
    Decode(String),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// The store refused the credentials rather than failing the request.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::Status { status, .. }
                if *status == reqwest::StatusCode::UNAUTHORIZED
                    || *status == reqwest::StatusCode::FORBIDDEN
        )
    }
}

/// The write a failed [`TrackerError::Write`] was attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            WriteAction::Create => "create",
            WriteAction::Update => "update",
            WriteAction::Delete => "delete",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Missing or invalid backend settings. Fatal to startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("sign-in failed: {0}")]
    Authentication(String),

    /// The session feed failed; the last snapshot is stale until it recovers.
    #[error("session feed failed: {0}")]
    Subscription(#[source] StoreError),

    /// A create/update/delete was not confirmed by the store.
    #[error("could not {action} session: {source}")]
    Write {
        action: WriteAction,
        #[source]
        source: StoreError,
    },
}

impl TrackerError {
    /// A failed write. Rejected credentials are an authentication problem instead.
    pub fn write(action: WriteAction, source: StoreError) -> Self {
        if source.is_auth_rejection() {
            return TrackerError::Authentication(source.to_string());
        }
        TrackerError::Write { action, source }
    }

    /// A failed session read. Rejected credentials are an authentication problem instead.
    pub fn read(source: StoreError) -> Self {
        if source.is_auth_rejection() {
            return TrackerError::Authentication(source.to_string());
        }
        TrackerError::Subscription(source)
    }

    /// Message shown to the user when this error reaches the CLI boundary.
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::Configuration(detail) => format!(
                "Configuration problem: {}. Check ~/.worktally/config.toml",
                detail
            ),
            TrackerError::Authentication(detail) => format!(
                "Could not sign in ({}). Run 'wtally auth login' to try again",
                detail
            ),
            TrackerError::Subscription(source) => format!(
                "Could not load sessions from the store ({}). Repeat the command to retry",
                source
            ),
            TrackerError::Write { action, source } => format!(
                "Could not {} the session ({}). Nothing was changed; repeat the command to retry",
                action, source
            ),
        }
    }
}
