//! `wattsense config`: view and edit the client config file.

use std::path::Path;

use anyhow::Result;

use crate::config::ClientConfig;

pub fn show(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;
    println!("# {}", client_config_path.display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn set_url(url: &str, client_config_path: &Path) -> Result<()> {
    let url = url.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("API URL must start with http:// or https://");
    }
    let mut config = ClientConfig::load(client_config_path)?;
    config.api_url = url.to_string();
    config.save(client_config_path)?;
    println!("API URL set to {}.", url);
    Ok(())
}

pub fn set_page_size(size: usize, client_config_path: &Path) -> Result<()> {
    if size == 0 {
        anyhow::bail!("Page size must be at least 1.");
    }
    let mut config = ClientConfig::load(client_config_path)?;
    config.page_size = size;
    config.save(client_config_path)?;
    println!("Page size set to {}.", size);
    Ok(())
}

pub fn set_timeout(secs: Option<u64>, client_config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(client_config_path)?;
    config.timeout_secs = secs.filter(|s| *s > 0);
    config.save(client_config_path)?;
    match config.timeout_secs {
        Some(s) => println!("Request timeout set to {}s.", s),
        None => println!("Request timeout cleared."),
    }
    Ok(())
}
