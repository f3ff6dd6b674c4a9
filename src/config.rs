use crate::exports::OutputFormat;
use crate::{Result, VaultEnvError};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// User configuration for vaultenv.
///
/// Stored in the user's config directory and holds defaults that apply to
/// every invocation. Tokens are never written here.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(default)]
    pub defaults: GlobalDefaults,
}

/// Default settings in the user configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GlobalDefaults {
    /// Secret store URL used when neither --url nor VAULT_ADDR is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Output format used when --format is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl GlobalConfig {
    /// Gets the path to the configuration file.
    ///
    /// Typically `~/.config/vaultenv/config.toml` on Linux.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined
    pub fn path() -> io::Result<PathBuf> {
        use directories::ProjectDirs;
        let dirs = ProjectDirs::from("", "", "vaultenv").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Loads the configuration from its default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, or if there is no home
    /// directory to look in.
    pub fn load() -> Result<Option<Self>> {
        match Self::path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => Ok(None),
        }
    }

    /// Loads the configuration from `path`, `Ok(None)` if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    /// Saves the configuration to its default location, returning the path.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Saves the configuration to `path`, creating parent directories.
    ///
    /// On Unix the file is restricted to the owner (mode 600).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = std::fs::metadata(path)?.permissions();
            permissions.set_mode(0o600);
            std::fs::set_permissions(path, permissions)?;
        }

        Ok(())
    }
}

/// Where to connect and how to authenticate.
pub struct ConnectionSettings {
    pub url: String,
    pub token: SecretString,
}

impl ConnectionSettings {
    /// Resolves connection settings.
    ///
    /// `url` and `token` are the values from the command line (which already
    /// fall back to `VAULT_ADDR` and `VAULT_TOKEN`). A missing URL falls back
    /// to the configured default; an empty one is kept and rejected when the
    /// first request is built.
    pub fn resolve(
        url: Option<String>,
        token: Option<String>,
        config: Option<&GlobalConfig>,
    ) -> Result<Self> {
        let url = url
            .or_else(|| config.and_then(|c| c.defaults.url.clone()))
            .ok_or(VaultEnvError::MissingUrl)?;
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(VaultEnvError::MissingToken)?;

        Ok(Self {
            url,
            token: SecretString::from(token),
        })
    }
}
