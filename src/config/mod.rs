//! Configuration module for quadlet-backup
//!
//! Two kinds of files live under the configuration root
//! (`~/.config/quadlet-helper` by default):
//!
//! - `backups/<name>.yaml`: one file per backup job ([`BackupConfig`])
//! - `config.toml`: process-wide [`Settings`] (email defaults, logging, locks)
//!
//! ## Example Usage
//!
//! ```no_run
//! use quadlet_backup::config::{ConfigStore, Settings};
//!
//! let store = ConfigStore::new("/home/user/.config/quadlet-helper");
//! let settings = Settings::load(&store.root().join("config.toml"))?;
//!
//! for name in store.list()? {
//!     let backup = store.load(&name)?;
//!     backup.validate_with(&settings.email)?;
//!     println!("{}: {} -> {}", name, backup.backup_type(), backup.destination());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod settings;
mod store;
mod types;
mod validate;

pub use settings::{
    default_config_root, EmailOverrides, EmailSettings, LoggingSettings, ResolvedEmail, Settings,
    SettingsError,
};
pub use store::ConfigStore;
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
