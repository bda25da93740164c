//! Import configuration file support
//!
//! Handles parsing of `.resource-import.toml` configuration files and
//! environment variable overrides.

use crate::import::ImportOptions;
use crate::models::{ImportChoice, ImportOption};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".resource-import.toml";

/// Environment variable for the downloadable URI schemes (comma separated)
pub const ENV_DOWNLOAD_SCHEMES: &str = "RESOURCE_IMPORT_DOWNLOAD_SCHEMES";

/// Environment variable for failing on ambiguous namespaces
pub const ENV_FAIL_ON_DUPLICATE_NAMESPACE: &str = "RESOURCE_IMPORT_FAIL_ON_DUPLICATE_NAMESPACE";

/// Environment variable for the download timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "RESOURCE_IMPORT_TIMEOUT_SECS";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Choice '{choice}' is not allowed for option {option:?}")]
    InvalidChoice {
        option: ImportOption,
        choice: ImportChoice,
    },
}

/// Default choice per conflict class, `none` leaves the choice to the selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoicesSection {
    #[serde(default)]
    pub ambiguous_target_namespace: ImportChoice,

    #[serde(default)]
    pub ambiguous_public_id: ImportChoice,

    #[serde(default)]
    pub conflicting_uri: ImportChoice,

    #[serde(default)]
    pub conflicting_target_namespace: ImportChoice,

    #[serde(default)]
    pub conflicting_public_id: ImportChoice,

    #[serde(default)]
    pub missing_resource: ImportChoice,
}

impl ChoicesSection {
    /// The configured choice for an option
    pub fn get(&self, option: ImportOption) -> ImportChoice {
        match option {
            ImportOption::AmbiguousTargetNamespace => self.ambiguous_target_namespace,
            ImportOption::AmbiguousPublicId => self.ambiguous_public_id,
            ImportOption::ConflictingUri => self.conflicting_uri,
            ImportOption::ConflictingTargetNamespace => self.conflicting_target_namespace,
            ImportOption::ConflictingPublicId => self.conflicting_public_id,
            ImportOption::MissingResource => self.missing_resource,
        }
    }
}

/// Registry lookup configuration section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Fail when a namespace or public identifier matches several resources
    #[serde(default)]
    pub fail_on_duplicate_namespace: bool,
}

/// Download configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSection {
    /// URI schemes the registry server downloads
    #[serde(default = "default_schemes")]
    pub schemes: Vec<String>,

    /// Timeout for direct HTTP fetches
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            schemes: default_schemes(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.resource-import.toml` configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub choices: ChoicesSection,

    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub download: DownloadSection,
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a workspace directory
    ///
    /// Looks for `.resource-import.toml` in the workspace directory.
    /// Falls back to defaults if not found.
    pub fn load(workspace_path: &Path) -> Result<Self, ConfigError> {
        let config_path = workspace_path.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(format!("Failed to read config: {}", e)))?;
            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a workspace directory
    pub fn save(&self, workspace_path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        std::fs::write(workspace_path.join(CONFIG_FILENAME), content)
            .map_err(|e| ConfigError::Io(format!("Failed to write config: {}", e)))
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup, unparsable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(schemes) = lookup(ENV_DOWNLOAD_SCHEMES) {
            self.download.schemes = schemes
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(fail) = lookup(ENV_FAIL_ON_DUPLICATE_NAMESPACE)
            && let Ok(fail) = fail.trim().parse()
        {
            self.registry.fail_on_duplicate_namespace = fail;
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS)
            && let Ok(timeout) = timeout.trim().parse()
        {
            self.download.timeout_secs = timeout;
        }
    }

    /// The configured choices as validated import options
    pub fn to_import_options(&self) -> Result<ImportOptions, ConfigError> {
        let mut options = ImportOptions::new();
        for option in ImportOption::ALL {
            let choice = self.choices.get(option);
            options
                .set(option, choice)
                .map_err(|_| ConfigError::InvalidChoice { option, choice })?;
        }
        Ok(options)
    }

    /// Check if configuration exists in a workspace
    pub fn exists(workspace_path: &Path) -> bool {
        workspace_path.join(CONFIG_FILENAME).exists()
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Resource import configuration

[choices]
# Default choice per conflict, "none" asks the selector each time
# ambiguous_target_namespace = "existing"
# ambiguous_public_id = "existing"
# conflicting_uri = "existing"
# conflicting_target_namespace = "existing"
# conflicting_public_id = "existing"
# missing_resource = "skip"

[registry]
# Fail when a namespace or public identifier matches several resources
fail_on_duplicate_namespace = false

[download]
# URI schemes downloaded through the registry server
schemes = ["http", "https"]

# Timeout in seconds for direct HTTP fetches
timeout_secs = 30
"#
}
