mod config;
pub mod database;

pub use config::{Config, DebugConfig, NotificationsConfig, SyncConfig, TimerConfig};
pub use database::{Database, KeyValueStore};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `TWENY_DATA_DIR` wins when set. Otherwise `~/.config/tweny`, or
/// `~/.config/tweny-dev` when `TWENY_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("TWENY_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TWENY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("tweny-dev")
            } else {
                base_dir.join("tweny")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
