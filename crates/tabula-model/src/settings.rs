//! Grid settings loaded from TOML.
//!
//! ```toml
//! debounce_ms = 300
//! default_limit = 10
//! page_size_options = [10, 20, 50, 100]
//! indent_size = 16
//! default_expanded = false
//! search_fields = ["name"]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ModelError, Result};

/// Tunables shared by every grid instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Delay before free-text input becomes part of the query.
    pub debounce_ms: u64,
    /// Rows per page for a fresh query.
    pub default_limit: usize,
    /// Choices offered by the page-size selector.
    pub page_size_options: Vec<usize>,
    /// Indentation per tree depth level, in pixels.
    pub indent_size: u16,
    /// Whether tree rows start expanded on first load.
    pub default_expanded: bool,
    /// Fields the realtime matcher searches when a cache entry has a search term.
    pub search_fields: Vec<String>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            default_limit: 10,
            page_size_options: vec![10, 20, 50, 100],
            indent_size: 16,
            default_expanded: false,
            search_fields: vec!["name".to_string()],
        }
    }
}

impl GridSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Parses settings from TOML text; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads settings from `path`.
    ///
    /// A missing file yields the defaults; unreadable or malformed files are
    /// errors so a typo never silently changes behaviour.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings file found at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ModelError::SettingsIo {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let settings = Self::from_toml_str(&content).map_err(|source| ModelError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        tracing::debug!("Loaded grid settings from {:?}", path);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 {
            return Err(ModelError::InvalidSettings(
                "default_limit must be greater than zero".to_string(),
            ));
        }
        if self.page_size_options.contains(&0) {
            return Err(ModelError::InvalidSettings(
                "page_size_options must not contain zero".to_string(),
            ));
        }
        Ok(())
    }
}
