use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Directory holding Technique Lens state, relative to the project root.
pub const LENS_DIR: &str = ".lens";

/// Top-level configuration, matching `.lens/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LensConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub export: ExportSection,
    #[serde(default)]
    pub view: ViewSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    /// Database location, relative to the project root unless absolute.
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(LENS_DIR).join("history.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: String,
    /// Base URL of a remote history endpoint used by signed-in clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7878".to_string(),
            remote: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSection {
    pub dir: PathBuf,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(LENS_DIR).join("exports"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSection {
    /// Characters of input text shown per row before truncation.
    pub preview_chars: usize,
    /// Technique badges shown per row before the `+N` overflow badge.
    pub badge_limit: usize,
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            preview_chars: 80,
            badge_limit: 3,
        }
    }
}

impl LensConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from a file. A missing file is an error; use
    /// [`LensConfig::load_or_default`] when defaults are acceptable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view.preview_chars == 0 {
            return Err(ConfigError::Invalid(
                "view.preview_chars must be greater than zero".to_string(),
            ));
        }
        if self.view.badge_limit == 0 {
            return Err(ConfigError::Invalid(
                "view.badge_limit must be greater than zero".to_string(),
            ));
        }
        self.bind_addr()?;
        if let Some(remote) = &self.server.remote {
            if !(remote.starts_with("http://") || remote.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "server.remote must be an http(s) URL, got '{remote}'"
                )));
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "server.bind '{}' is not a socket address (e.g. 127.0.0.1:7878)",
                self.server.bind
            ))
        })
    }

    /// Resolve the database path against a project root.
    pub fn db_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.store.path)
    }

    /// Resolve the export directory against a project root.
    pub fn export_dir(&self, root: &Path) -> PathBuf {
        resolve(root, &self.export.dir)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
