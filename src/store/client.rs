use crate::error::StoreError;
use crate::session::{NewSession, Session, SessionPatch, UserId};
use crate::store::{SessionStore, sort_newest_first};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// REST client for the session document store.
///
/// Documents live under `{base_url}/users/{user}/sessions/{id}`.
pub struct DocumentStoreClient {
    client: Client,
    base_url: String,
    api_key: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    id: String,
}

impl DocumentStoreClient {
    pub fn new(base_url: &str, api_key: &str, id_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            id_token: id_token.to_string(),
        }
    }

    /// Bound every request to `timeout`, so a stalled call cannot outlive it.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, StoreError> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Helper for testing to override base URL (e.g. wiremock)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn collection_url(&self, user: &UserId) -> String {
        format!("{}/users/{}/sessions", self.base_url, user)
    }

    fn document_url(&self, user: &UserId, id: &str) -> String {
        format!("{}/{}", self.collection_url(user), id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.id_token)
            .header("X-Api-Key", &self.api_key)
    }

    fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Status { status, body })
    }
}

impl SessionStore for DocumentStoreClient {
    fn list(&self, user: &UserId) -> Result<Vec<Session>, StoreError> {
        let url = self.collection_url(user);
        debug!(%url, "listing sessions");

        let response = Self::check(self.authorized(self.client.get(&url)).send()?)?;
        let mut sessions = response
            .json::<Vec<Session>>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        sort_newest_first(&mut sessions);
        Ok(sessions)
    }

    fn create(&self, user: &UserId, session: &NewSession) -> Result<String, StoreError> {
        let url = self.collection_url(user);

        let response = Self::check(
            self.authorized(self.client.post(&url))
                .json(session)
                .send()?,
        )?;
        let created = response
            .json::<CreatedDocument>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(created.id)
    }

    fn update(&self, user: &UserId, id: &str, patch: &SessionPatch) -> Result<(), StoreError> {
        let url = self.document_url(user, id);
        Self::check(self.authorized(self.client.patch(&url)).json(patch).send()?)?;
        Ok(())
    }

    fn remove(&self, user: &UserId, id: &str) -> Result<(), StoreError> {
        let url = self.document_url(user, id);
        Self::check(self.authorized(self.client.delete(&url)).send()?)?;
        Ok(())
    }
}
