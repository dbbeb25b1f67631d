use super::types::BackupConfig;
use crate::error::{BackupError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory of per-backup YAML files (`<root>/backups/<name>.yaml`)
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// File a backup named `name` lives in
    pub fn path(&self, name: &str) -> PathBuf {
        self.backups_dir().join(format!("{}.yaml", name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Read and parse a backup configuration. No validation is performed.
    pub fn load(&self, name: &str) -> Result<BackupConfig> {
        let path = self.path(name);
        debug!("Loading backup configuration from {:?}", path);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackupError::ConfigNotFound {
                    name: name.to_string(),
                    path,
                });
            }
            Err(source) => return Err(BackupError::Io { path, source }),
        };

        let mut config: BackupConfig = serde_yaml::from_str(&contents)
            .map_err(|source| BackupError::ConfigParse { path: path.clone(), source })?;

        if config.name.is_empty() {
            config.name = name.to_string();
        }

        Ok(config)
    }

    /// Write a configuration to `<name>.yaml`, replacing any existing file
    pub fn save(&self, config: &BackupConfig) -> Result<PathBuf> {
        let dir = self.backups_dir();
        fs::create_dir_all(&dir).map_err(|source| BackupError::Io {
            path: dir.clone(),
            source,
        })?;

        let yaml = serde_yaml::to_string(config)
            .map_err(|e| BackupError::Validation(format!("cannot serialize configuration: {}", e)))?;

        let path = self.path(&config.name);
        fs::write(&path, yaml).map_err(|source| BackupError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Saved backup configuration to {:?}", path);
        Ok(path)
    }

    /// Names of all stored backups, sorted. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = self.backups_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(BackupError::Io { path: dir, source }),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().map(|ext| ext == "yaml").unwrap_or(false))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();

        names.sort();
        Ok(names)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BackupError::ConfigNotFound {
                name: name.to_string(),
                path,
            }),
            Err(source) => Err(BackupError::Io { path, source }),
        }
    }
}
