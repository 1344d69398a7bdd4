use crate::error::TrackerError;
use crate::session::UserId;
use crate::state::{State, with_state_lock};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Signed-in user as cached in the state file.
///
/// `user_id` never changes for a given account; `id_token` is short-lived
/// and is renewed with `refresh_token`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SignUpRequest {
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(rename = "idToken")]
    id_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
}

pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Helper for testing to override base URL
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T, TrackerError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .map_err(|e| TrackerError::Authentication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TrackerError::Authentication(format!(
                "identity provider returned status {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .map_err(|e| TrackerError::Authentication(format!("unexpected response: {}", e)))
    }

    /// Create a new anonymous account and return its identity.
    pub fn sign_in_anonymously(&self) -> Result<Identity, TrackerError> {
        let body: SignUpResponse = self.post(
            "accounts:signUp",
            &SignUpRequest {
                return_secure_token: true,
            },
        )?;

        if body.local_id.trim().is_empty() {
            return Err(TrackerError::Authentication(
                "identity provider returned an empty user id".to_string(),
            ));
        }

        Ok(Identity {
            user_id: UserId::new(body.local_id),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            signed_in_at: Utc::now(),
        })
    }

    /// Exchange the refresh token for a new id token on the same account.
    pub fn refresh(&self, identity: &Identity) -> Result<Identity, TrackerError> {
        let Some(refresh_token) = identity.refresh_token.as_deref() else {
            return Err(TrackerError::Authentication(
                "the cached identity has no refresh token".to_string(),
            ));
        };

        let body: RefreshResponse = self.post(
            "token",
            &RefreshRequest {
                grant_type: "refresh_token",
                refresh_token,
            },
        )?;

        if body.user_id != identity.user_id.as_str() {
            return Err(TrackerError::Authentication(format!(
                "token refresh answered for user {} instead of {}",
                body.user_id, identity.user_id
            )));
        }
        debug!(user = %identity.user_id, "id token refreshed");

        Ok(Identity {
            user_id: identity.user_id.clone(),
            id_token: body.id_token,
            refresh_token: Some(body.refresh_token),
            signed_in_at: identity.signed_in_at,
        })
    }
}

/// Cached identity, or a fresh anonymous sign-in that gets cached.
pub fn ensure_identity(
    client: &IdentityClient,
    lock_path: &Path,
    state_path: &Path,
) -> anyhow::Result<Identity> {
    if let Some(identity) = State::load(state_path)?.identity {
        return Ok(identity);
    }

    with_state_lock(lock_path, state_path, |state| {
        // Another process may have signed in while we waited for the lock.
        if let Some(identity) = &state.identity {
            return Ok(identity.clone());
        }
        let identity = client.sign_in_anonymously()?;
        info!(user = %identity.user_id, "signed in");
        state.identity = Some(identity.clone());
        Ok(identity)
    })
}

/// Renew the cached identity's token and cache the result. The user id is kept.
pub fn refresh_identity(
    client: &IdentityClient,
    lock_path: &Path,
    state_path: &Path,
) -> anyhow::Result<Identity> {
    with_state_lock(lock_path, state_path, |state| {
        let Some(cached) = &state.identity else {
            return Err(TrackerError::Authentication("not signed in".to_string()).into());
        };
        let renewed = client.refresh(cached)?;
        state.identity = Some(renewed.clone());
        Ok(renewed)
    })
}
