//! Sentinel configuration directory
//!
//! Owns where settings files live (`~/.config/sentinel/` by default) and what
//! happens when they are missing: reads fall back to the type's defaults and
//! writes refuse to clobber an existing file unless asked to.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Name of the application directory inside the platform config dir
const APP_DIR: &str = "sentinel";

/// Where a loaded value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    /// No file existed; the type's defaults were used
    Defaults,
}

/// A value read from the config directory, tagged with its origin
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub source: Source,
}

/// A directory of JSON settings files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// The per-user Sentinel directory, if the platform has a config dir
    pub fn user() -> Option<Self> {
        dirs::config_dir().map(|p| Self::at(p.join(APP_DIR)))
    }

    /// A directory at an explicit location
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `filename` inside this directory
    pub fn file(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Create the directory (and parents) if needed
    pub fn ensure(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create config directory: {}", self.root.display())
        })?;
        Ok(&self.root)
    }

    /// Read `filename`, or fall back to `T::default()` when it does not exist
    ///
    /// A file that exists but cannot be read or parsed is an error, never a
    /// silent fallback.
    pub fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        filename: &str,
    ) -> Result<Loaded<T>> {
        let path = self.file(filename);
        if !path.exists() {
            log::debug!("{} not found; using defaults", path.display());
            return Ok(Loaded {
                value: T::default(),
                source: Source::Defaults,
            });
        }

        Ok(Loaded {
            value: read_json(&path)?,
            source: Source::File(path),
        })
    }

    /// Write `value` to `filename` as pretty JSON
    ///
    /// Fails when the file already exists and `overwrite` is false. Returns
    /// the path written.
    pub fn create<T: Serialize>(&self, filename: &str, value: &T, overwrite: bool) -> Result<PathBuf> {
        let path = self.file(filename);
        if path.exists() && !overwrite {
            anyhow::bail!("{} already exists", path.display());
        }

        self.ensure()?;
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }
}

/// Read and parse a JSON file from an arbitrary path
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
