//! Common paths for feedline data storage
//!
//! All data is stored under ~/.config/feedline/ on all platforms:
//! - config.toml - User configuration
//! - credentials.enc - Encrypted refresh token

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the feedline data directory (~/.config/feedline/)
pub fn feedline_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("feedline");
    fs::create_dir_all(&dir).context("Failed to create feedline directory")?;
    Ok(dir)
}

/// Get the config file path (~/.config/feedline/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(feedline_dir()?.join("config.toml"))
}

/// Get the credentials file path (~/.config/feedline/credentials.enc)
pub fn credentials_path() -> Result<PathBuf> {
    Ok(feedline_dir()?.join("credentials.enc"))
}
