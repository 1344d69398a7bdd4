pub mod auth;
pub mod config;
pub mod report;
pub mod session;
pub mod watch;

use crate::config::Config;
use crate::error::TrackerError;
use crate::identity::{Identity, IdentityClient, ensure_identity, refresh_identity};
use crate::platform::StatePaths;
use crate::session::Session;
use crate::state::with_state_lock;
use crate::store::SessionStore;
use crate::store::client::DocumentStoreClient;
use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

/// Everything a session command needs once the user is signed in.
pub struct Backend {
    pub store: DocumentStoreClient,
    pub identity: Identity,
    pub tz: Tz,
    pub paths: StatePaths,
    identity_client: IdentityClient,
    base_url: String,
    api_key: String,
}

impl Backend {
    /// Validate settings, sign in if needed and build the store client.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let api_key = config.get_api_key()?;
        let tz = config.display.timezone()?;
        let paths = StatePaths::resolve(config.state.state_dir_override.as_deref())?;

        let identity_client = IdentityClient::new(config.store.auth_url(), &api_key);
        let identity = ensure_identity(&identity_client, &paths.lock, &paths.state)?;

        let store = DocumentStoreClient::new(&config.store.base_url, &api_key, &identity.id_token);

        Ok(Self {
            store,
            identity,
            tz,
            paths,
            identity_client,
            base_url: config.store.base_url.clone(),
            api_key,
        })
    }

    /// Latest full list of the user's sessions, newest first.
    ///
    /// A rejected id token is refreshed once and the read repeated.
    pub fn snapshot(&mut self) -> Result<Vec<Session>> {
        let listed = match self.store.list(&self.identity.user_id) {
            Err(e) if e.is_auth_rejection() && self.identity.refresh_token.is_some() => {
                debug!(user = %self.identity.user_id, "id token rejected, refreshing");
                self.refresh()?;
                self.store.list(&self.identity.user_id)
            }
            other => other,
        };
        let sessions = listed.map_err(TrackerError::read)?;

        with_state_lock(&self.paths.lock, &self.paths.state, |state| {
            state.last_sync = Some(Utc::now());
            Ok(())
        })?;

        Ok(sessions)
    }

    fn refresh(&mut self) -> Result<()> {
        self.identity = refresh_identity(&self.identity_client, &self.paths.lock, &self.paths.state)?;
        self.store = DocumentStoreClient::new(&self.base_url, &self.api_key, &self.identity.id_token);
        Ok(())
    }
}

/// Treat a failed config load as a configuration error, keeping typed causes intact.
pub fn require_config(loaded: Result<Config>) -> Result<Config> {
    loaded.map_err(|e| {
        if e.downcast_ref::<TrackerError>().is_some() {
            e
        } else {
            TrackerError::Configuration(format!("{:#}", e)).into()
        }
    })
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
