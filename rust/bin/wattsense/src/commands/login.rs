//! Login / logout commands.

use std::path::Path;

use anyhow::Result;

use super::{explain, open, print_json, Output};

/// Email/password login, or Google when `google_token` is given.
pub async fn login(
    email: &str,
    password: &str,
    google_token: Option<&str>,
    client_config_path: &Path,
) -> Result<()> {
    let (config, dash) = open(client_config_path)?;
    let session = match google_token {
        Some(token) => dash.login_google(token).await,
        None => dash.login(email, password).await,
    }
    .map_err(explain)?;

    println!("Logged in as {} ({}).", session.email, session.role.as_str());
    println!("Session saved to {}.", config.session_path().display());
    dash.dispose();
    Ok(())
}

/// Forget the cached session.
pub fn logout(client_config_path: &Path) -> Result<()> {
    let (_, dash) = open(client_config_path)?;
    let who = dash.session().current().map(|s| s.email);
    dash.logout().map_err(explain)?;
    match who {
        Some(email) => println!("Logged out {}.", email),
        None => println!("Not logged in."),
    }
    dash.dispose();
    Ok(())
}

pub fn whoami(output: Output, client_config_path: &Path) -> Result<()> {
    let (_, dash) = open(client_config_path)?;
    match (dash.session().current(), output) {
        (Some(s), Output::Json) => print_json(&serde_json::json!({
            "email": s.email,
            "role": s.role.as_str(),
        }))?,
        (Some(s), Output::Table) => println!("{} ({})", s.email, s.role.as_str()),
        (None, _) => println!("Not logged in."),
    }
    dash.dispose();
    Ok(())
}
