use crate::OutputFormat;
use crate::commands::print_json;
use crate::config::Config;
use crate::error::TrackerError;
use crate::identity::IdentityClient;
use crate::platform::StatePaths;
use crate::state::{State, with_state_lock};
use anyhow::Result;
use serde_json::json;
use tracing::info;

/// Renew the cached identity's token, keeping its user id.
///
/// Without a cached identity this signs in anonymously. `new_account` always
/// creates a fresh anonymous account, which leaves earlier sessions with the old one.
pub fn login(config: &Config, new_account: bool, format: OutputFormat) -> Result<()> {
    config.store.validate()?;
    let api_key = config.get_api_key()?;
    let paths = StatePaths::resolve(config.state.state_dir_override.as_deref())?;
    let client = IdentityClient::new(config.store.auth_url(), &api_key);

    let (identity, created) = with_state_lock(&paths.lock, &paths.state, |state| {
        let outcome = match (&state.identity, new_account) {
            (Some(cached), false) if cached.refresh_token.is_some() => (client.refresh(cached)?, false),
            (Some(cached), false) => {
                return Err(TrackerError::Authentication(format!(
                    "identity {} cannot be renewed; pass --new-account to start a new account \
                     (sessions recorded under {} will no longer be shown)",
                    cached.user_id, cached.user_id
                ))
                .into());
            }
            _ => (client.sign_in_anonymously()?, true),
        };
        state.identity = Some(outcome.0.clone());
        Ok(outcome)
    })?;
    info!(user = %identity.user_id, created, "signed in");

    match format {
        OutputFormat::Json => print_json(&json!({
            "userId": identity.user_id,
            "newAccount": created,
        }))?,
        OutputFormat::Text if created => println!("✓ Signed in as new user {}", identity.user_id),
        OutputFormat::Text => println!("✓ Renewed sign-in for {}", identity.user_id),
    }
    Ok(())
}

pub fn status(config: &Config, format: OutputFormat) -> Result<()> {
    let paths = StatePaths::resolve(config.state.state_dir_override.as_deref())?;
    let state = State::load(&paths.state)?;

    match (format, &state.identity) {
        (OutputFormat::Json, identity) => print_json(&json!({
            "signedIn": identity.is_some(),
            "userId": identity.as_ref().map(|i| &i.user_id),
            "signedInAt": identity.as_ref().map(|i| i.signed_in_at),
            "lastSync": state.last_sync,
        }))?,
        (OutputFormat::Text, Some(identity)) => {
            println!("✓ Signed in as {}", identity.user_id);
            println!("  Since: {}", identity.signed_in_at.to_rfc3339());
            match state.last_sync {
                Some(at) => println!("  Last sync: {}", at.to_rfc3339()),
                None => println!("  Last sync: never"),
            }
        }
        (OutputFormat::Text, None) => {
            println!("✗ Not signed in. Run 'wtally auth login' or any session command.")
        }
    }
    Ok(())
}

/// Forget the cached identity, and optionally the API key in the keyring.
pub fn logout(config: &Config, forget_key: bool) -> Result<()> {
    let paths = StatePaths::resolve(config.state.state_dir_override.as_deref())?;
    let had_identity = with_state_lock(&paths.lock, &paths.state, |state| {
        state.last_sync = None;
        Ok(state.identity.take().is_some())
    })?;

    if forget_key {
        if crate::keyring::delete_api_key()? {
            println!("✓ Removed API key from secure storage");
        } else {
            println!("No API key in secure storage.");
        }
    }

    if had_identity {
        println!("✓ Signed out");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}
