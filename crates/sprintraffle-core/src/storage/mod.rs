mod config;
pub mod credentials;
pub mod database;

pub use config::{AdsConfig, ApiConfig, Config, RaffleConfig, SprintConfig, UiConfig};
pub use credentials::{CredentialStore, User, UserRole};
pub use database::Database;

use std::path::PathBuf;

/// Returns `~/.config/sprintraffle[-dev]/` based on SPRINTRAFFLE_ENV.
///
/// Set SPRINTRAFFLE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SPRINTRAFFLE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("sprintraffle-dev")
    } else {
        base_dir.join("sprintraffle")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
