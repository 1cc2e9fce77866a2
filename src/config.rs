//! Persisted course configuration.
//!
//! The configuration is a small TOML document kept in the per-user
//! configuration directory:
//!
//! ```toml
//! base_directory = "/home/user/University"
//!
//! [courses]
//! cs = "/home/user/University/Computer Science"
//! ma = "/home/user/University/Mathematics"
//! ```
//!
//! Every save also writes a backup copy next to the primary document (when
//! the platform keeps one) and marks the primary read-only. [`ConfigStore`]
//! never caches: each call goes back to disk.

use crate::platform::{Platform, PlatformError};
use crate::prompt::{Prompter, confirm};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the primary configuration document.
pub const PRIMARY_FILE_NAME: &str = "course_config.toml";

/// Default editor when `EDITOR` is not set.
pub const DEFAULT_EDITOR: &str = "nano";

/// Ordered prefix → destination mapping. Order decides which prefix wins.
pub type Courses = IndexMap<String, PathBuf>;

/// Errors that can occur while reading, writing or deleting the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the primary nor the backup document exists.
    #[error("No configuration or backup file found in {}", dir.display())]
    NotFound { dir: PathBuf },
    /// The primary document is unusable and the backup was refused.
    #[error("Backup configuration not used. You can use '--reset' to reset your config file.")]
    BackupDeclined,
    /// A document exists but does not hold a valid configuration.
    #[error("Invalid configuration in {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    /// IO error while touching a configuration document.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration could not be turned into TOML.
    #[error("Could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Permission or attribute change failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Process-wide settings, built once at start-up and passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding the primary and backup documents.
    pub config_dir: PathBuf,
    /// Editor command used by `--edit` on POSIX systems.
    pub editor: String,
}

impl Settings {
    /// Builds settings from an optional directory override and the
    /// platform defaults.
    pub fn new(config_dir: Option<PathBuf>, editor: Option<String>, platform: &dyn Platform) -> Self {
        Self {
            config_dir: config_dir.unwrap_or_else(|| platform.config_dir()),
            editor: editor
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EDITOR.to_string()),
        }
    }

    /// Full path of the primary document.
    pub fn primary_path(&self) -> PathBuf {
        self.config_dir.join(PRIMARY_FILE_NAME)
    }
}

/// The persisted course configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Directory the destination folders were declared under.
    pub base_directory: PathBuf,
    /// Prefix → destination folder, in declaration order.
    #[serde(default)]
    pub courses: Courses,
}

impl Configuration {
    pub fn new(base_directory: PathBuf, courses: Courses) -> Self {
        Self {
            base_directory,
            courses,
        }
    }

    /// Lower-cases every prefix, rejecting empty prefixes and prefixes that
    /// collide once lower-cased.
    ///
    /// # Errors
    ///
    /// Returns the offending prefix and the reason.
    pub fn normalized(self) -> Result<Self, String> {
        let mut courses = Courses::with_capacity(self.courses.len());
        for (prefix, destination) in self.courses {
            let key = prefix.trim().to_lowercase();
            if key.is_empty() {
                return Err("course prefixes must not be empty".to_string());
            }
            if courses.insert(key.clone(), destination).is_some() {
                return Err(format!("duplicate course prefix '{}'", key));
            }
        }
        Ok(Self {
            base_directory: self.base_directory,
            courses,
        })
    }
}

/// Paths written by a successful [`ConfigStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedConfig {
    pub primary: PathBuf,
    pub backup: Option<PathBuf>,
}

/// Outcome of [`ConfigStore::reset`], one flag per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetReport {
    pub primary_removed: bool,
    pub backup_removed: bool,
}

/// Loads, saves and deletes the configuration documents in one directory.
pub struct ConfigStore<'a> {
    dir: PathBuf,
    platform: &'a dyn Platform,
}

impl<'a> ConfigStore<'a> {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>, platform: &'a dyn Platform) -> Self {
        Self {
            dir: dir.into(),
            platform,
        }
    }

    /// Directory this store reads from and writes to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the primary document.
    pub fn primary_path(&self) -> PathBuf {
        self.dir.join(PRIMARY_FILE_NAME)
    }

    /// Path of the backup document, if this platform keeps one.
    pub fn backup_path(&self) -> Option<PathBuf> {
        self.platform.backup_file_name().map(|name| self.dir.join(name))
    }

    /// Writes the configuration to the primary document and the backup.
    ///
    /// The primary document is left owner-read-only; a previous read-only
    /// primary is made writable first so that setup can be re-run.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, a document cannot
    /// be written, or permissions cannot be adjusted.
    pub fn save(&self, config: &Configuration) -> ConfigResult<SavedConfig> {
        fs::create_dir_all(&self.dir).map_err(|source| ConfigError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let document = toml::to_string_pretty(config)?;

        let primary = self.primary_path();
        if primary.exists() {
            self.platform.set_writable(&primary)?;
        }
        write_document(&primary, &document)?;
        log::debug!("wrote primary configuration {}", primary.display());

        let backup = match self.backup_path() {
            Some(path) => {
                if path.exists() {
                    // Hidden or read-only files refuse a plain overwrite on Windows.
                    remove_document(&path, self.platform)?;
                }
                write_document(&path, &document)?;
                self.platform.hide_file(&path)?;
                log::debug!("wrote backup configuration {}", path.display());
                Some(path)
            }
            None => {
                log::info!(
                    "no backup kept on the {} platform",
                    self.platform.name()
                );
                None
            }
        };

        self.platform.set_read_only(&primary)?;

        Ok(SavedConfig { primary, backup })
    }

    /// Reads the configuration.
    ///
    /// A missing or unreadable primary document falls back to the backup,
    /// but only after `prompter` agrees to it.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::NotFound`] when neither document exists.
    /// * [`ConfigError::BackupDeclined`] when the backup was refused.
    /// * [`ConfigError::Corrupt`] / [`ConfigError::Io`] when the document that
    ///   was read is unusable.
    pub fn load(&self, prompter: &mut dyn Prompter) -> ConfigResult<Configuration> {
        let primary = self.primary_path();
        let primary_error = if primary.exists() {
            match read_document(&primary) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("primary configuration unusable: {}", e);
                    Some(e)
                }
            }
        } else {
            None
        };

        let backup = self.backup_path().filter(|path| path.exists());
        let Some(backup) = backup else {
            return Err(primary_error.unwrap_or_else(|| ConfigError::NotFound {
                dir: self.dir.clone(),
            }));
        };

        let answer = prompter
            .ask("Your main config file is missing or corrupted. Do you want to use the backup? (yes/no):")
            .map_err(|source| ConfigError::Io {
                path: backup.clone(),
                source,
            })?;

        if confirm(&answer) {
            read_document(&backup)
        } else {
            Err(ConfigError::BackupDeclined)
        }
    }

    /// Deletes the primary and backup documents, each independently.
    ///
    /// # Errors
    ///
    /// Returns the first deletion failure.
    pub fn reset(&self) -> ConfigResult<ResetReport> {
        let mut report = ResetReport::default();

        let primary = self.primary_path();
        if primary.exists() {
            remove_document(&primary, self.platform)?;
            report.primary_removed = true;
        }

        if let Some(backup) = self.backup_path()
            && backup.exists()
        {
            remove_document(&backup, self.platform)?;
            report.backup_removed = true;
        }

        Ok(report)
    }
}

fn write_document(path: &Path, document: &str) -> ConfigResult<()> {
    fs::write(path, document).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_document(path: &Path) -> ConfigResult<Configuration> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Configuration = toml::from_str(&content).map_err(|e| ConfigError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    config.normalized().map_err(|reason| ConfigError::Corrupt {
        path: path.to_path_buf(),
        reason,
    })
}

fn remove_document(path: &Path, platform: &dyn Platform) -> ConfigResult<()> {
    // Read-only files cannot be deleted on Windows.
    platform.set_writable(path)?;
    fs::remove_file(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
