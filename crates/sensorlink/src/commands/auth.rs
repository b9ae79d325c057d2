//! `login` / `logout`: session token lifecycle.

use std::io::BufRead;

use dialoguer::Input;
use secrecy::SecretString;

use sensorlink_core::Dashboard;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config;
use crate::error::CliError;

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn read_password_stdin() -> Result<SecretString, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "empty password on stdin".into(),
        });
    }
    Ok(SecretString::from(password.to_owned()))
}

pub async fn login(args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (profile_name, profile, client_config) = config::build_anonymous_config(global)?;

    let username = match args
        .username
        .or_else(|| sensorlink_config::resolve_username(&profile))
    {
        Some(name) => name,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(prompt_err)?,
    };

    let password = if args.password_stdin {
        read_password_stdin()?
    } else if let Ok(pw) = sensorlink_config::resolve_password(&profile, &profile_name) {
        pw
    } else {
        SecretString::from(rpassword::prompt_password("Password: ").map_err(prompt_err)?)
    };

    let dashboard = Dashboard::new(client_config)?;
    let session = dashboard.login(&username, &password).await?;

    match session.token {
        Some(ref token) => {
            if let Err(e) = sensorlink_config::store_token(&profile_name, token) {
                tracing::warn!(error = %e, "could not cache session token");
                eprintln!("warning: token not cached ({e}); pass --token to reuse it");
            }
        }
        None => tracing::debug!("backend issued no token"),
    }

    if !global.quiet {
        let role = session.role.as_deref().unwrap_or("user");
        eprintln!("✓ Logged in as {} ({role}) on profile '{profile_name}'", session.username);
    }
    Ok(())
}

pub fn logout(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);
    sensorlink_config::clear_token(&profile_name)?;
    if !global.quiet {
        eprintln!("✓ Session token cleared for profile '{profile_name}'");
    }
    Ok(())
}
