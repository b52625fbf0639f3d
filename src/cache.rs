use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::error::{EngineError, Result};

/// Plugin source copy written by the loader
pub static APPLICATION_FILE: &str = "application.yaml";
/// Base config copy written by the loader
pub static CONFIG_FILE: &str = "jobbergate.yaml";
/// Assembled parameter document
pub static PARAM_DICT_FILE: &str = "param_dict.json";

/// Scratch directory holding copies of everything the engine consumed or produced
///
/// Single writer: concurrent CLI invocations sharing one cache path will clobber each other.
#[derive(Debug, Clone)]
pub struct WorkingDirectory {
    pub path: PathBuf,
}

impl WorkingDirectory {
    pub fn new(path: impl Into<PathBuf>) -> WorkingDirectory {
        WorkingDirectory { path: path.into() }
    }

    /// `$XDG_CACHE_HOME/jobbergate` or the platform equivalent, falling back to the temp dir
    pub fn default_location() -> WorkingDirectory {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        WorkingDirectory { path: base.join("jobbergate") }
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write a file into the cache, creating the directory first
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.path).map_err(|err| EngineError::io(&self.path, err))?;
        let out_path = self.file(name);
        info!("Writing {} to cache", out_path.display());
        fs::write(&out_path, contents).map_err(|err| EngineError::io(&out_path, err))?;
        Ok(out_path)
    }

    /// Like [`WorkingDirectory::write`], but a failure is only logged
    pub fn write_for_inspection(&self, name: &str, contents: &str) -> Option<PathBuf> {
        match self.write(name, contents) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("Can't write scratch copy of {name}: {err}");
                None
            }
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }
}
