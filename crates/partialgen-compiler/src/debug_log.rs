//! Development-time pipeline log
//!
//! An append-only text file of pipeline lifecycle events. It only exists in
//! builds with debug assertions and only when enabled in the configuration;
//! nothing depends on it and write failures are ignored.

use crate::config::DebugLogSettings;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Serialised append-only log file
#[derive(Debug)]
pub struct DebugLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl DebugLog {
    /// Open `path` for appending, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// The log configured by `settings`, if any
    pub fn from_settings(settings: &DebugLogSettings) -> Option<Self> {
        if !cfg!(debug_assertions) || !settings.enabled {
            return None;
        }
        let path = settings.path.clone().or_else(Self::default_path)?;
        match Self::open(&path) {
            Ok(log) => Some(log),
            Err(e) => {
                log::warn!("Could not open debug log {:?}: {}", path, e);
                None
            }
        }
    }

    /// Per-user default location
    pub fn default_path() -> Option<PathBuf> {
        if cfg!(windows) {
            std::env::var_os("LOCALAPPDATA").map(|dir| PathBuf::from(dir).join("partialgen").join("pipeline.log"))
        } else {
            std::env::var_os("HOME").map(|dir| PathBuf::from(dir).join(".partialgen").join("pipeline.log"))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line
    pub fn record(&self, stage: &str, message: &str) {
        let line = format!(
            "{} [{}] {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            stage,
            message
        );
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = file.write_all(line.as_bytes()) {
            log::debug!("Debug log write failed: {}", e);
        }
    }
}
