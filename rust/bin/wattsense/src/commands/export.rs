//! `wattsense export`: download one user's data.

use std::path::Path;

use anyhow::Result;

use super::{explain, open, require_login};

/// Write the export rows as a JSON array to `out`, or stdout.
pub async fn export(email: &str, out: Option<&Path>, client_config_path: &Path) -> Result<()> {
    let (_, dash) = open(client_config_path)?;
    require_login(&dash)?;
    let rows = dash
        .store()
        .export_user_data(email.trim())
        .await
        .map_err(explain)?;

    let body = serde_json::to_string_pretty(&rows)?;
    match out {
        Some(path) => {
            std::fs::write(path, body)?;
            eprintln!("Wrote {} row(s) to {}.", rows.len(), path.display());
        }
        None => println!("{}", body),
    }
    dash.dispose();
    Ok(())
}
