//! CLI configuration: thin wrapper around `sensorlink_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --token, --insecure, --timeout).

use secrecy::SecretString;

use sensorlink_core::{AuthCredentials, ClientConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use sensorlink_config::{
    Config, Profile, config_path, load_config_or_default, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Merge flag overrides onto the active profile.
///
/// With no matching profile, `--api-url` alone is enough; an explicitly
/// requested `--profile` that doesn't exist is an error.
fn effective_profile(global: &GlobalOpts) -> Result<(String, Profile), CliError> {
    let cfg = load_config_or_default();
    let name = active_profile_name(global, &cfg);

    let mut profile = match (cfg.profiles.get(&name), &global.api_url) {
        (Some(p), _) => p.clone(),
        (None, Some(url)) if global.profile.is_none() => Profile::new(url.clone()),
        (None, _) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name,
                available: cfg.profile_names(),
            });
        }
        (None, _) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if let Some(ref url) = global.stream_url {
        profile.stream_url = Some(url.clone());
    }
    if global.insecure || cfg.defaults.insecure {
        profile.insecure = Some(true);
    }
    profile.timeout = global
        .timeout
        .or(profile.timeout)
        .or(Some(cfg.defaults.timeout));

    Ok((name, profile))
}

/// Build a `ClientConfig` from the config file, profile, and CLI overrides.
pub fn build_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let (name, profile) = effective_profile(global)?;

    if let Some(ref token) = global.token {
        let mut config = sensorlink_config::connection_config(&profile)?;
        config.auth = AuthCredentials::Token(SecretString::from(token.clone()));
        return Ok(config);
    }

    Ok(sensorlink_config::profile_to_client_config(&profile, &name)?)
}

/// Like [`build_client_config`] but without credentials, for `login`.
pub fn build_anonymous_config(
    global: &GlobalOpts,
) -> Result<(String, Profile, ClientConfig), CliError> {
    let (name, profile) = effective_profile(global)?;
    let config = sensorlink_config::connection_config(&profile)?;
    Ok((name, profile, config))
}
