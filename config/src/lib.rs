//! Ferry configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! ```text
//! config file  (--config PATH | ./ferry.toml | ~/.ferry/config.toml)
//!   └─► environment (FERRY_DATABASE, FERRY_CHANGELOG, FERRY_CONTEXT)
//!         └─► command-line flags
//! ```
//!
//! Path values in a config file may reference environment variables as
//! `${VAR}`; relative paths resolve against the file's directory.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use ferry_types::RunContext;

pub const ENV_DATABASE: &str = "FERRY_DATABASE";
pub const ENV_CHANGELOG: &str = "FERRY_CHANGELOG";
pub const ENV_CONTEXT: &str = "FERRY_CONTEXT";

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ferry.toml";

const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no {what} configured (set it in the config file, {env}, or on the command line)")]
    Missing {
        what: &'static str,
        env: &'static str,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct FerryConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub changelog: ChangelogConfig,
    #[serde(default)]
    pub run: RunConfig,
    /// File this configuration was read from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub path: Option<PathBuf>,
    /// Name shown in logs. Defaults to the file stem.
    pub name: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangelogConfig {
    /// Master changelog file.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    pub context: Option<String>,
    /// Applied to changesets that do not set `fail_on_error` themselves.
    #[serde(default = "default_true")]
    pub fail_on_error: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            context: None,
            fail_on_error: true,
        }
    }
}

/// Values that replace whatever the config file said.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub changelog: Option<PathBuf>,
    pub context: Option<String>,
    pub fail_on_error: Option<bool>,
}

impl Overrides {
    /// Read the `FERRY_*` variables through `lookup`.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            database: non_empty(ENV_DATABASE).map(PathBuf::from),
            changelog: non_empty(ENV_CHANGELOG).map(PathBuf::from),
            // An empty FERRY_CONTEXT still counts: it clears a configured context.
            context: lookup(ENV_CONTEXT),
            fail_on_error: None,
        }
    }

    #[must_use]
    pub fn from_process_env() -> Self {
        Self::from_env(|name| env::var(name).ok())
    }
}

impl FerryConfig {
    /// Load the first config found, or defaults when there is none.
    ///
    /// An explicit path must exist; the implicit candidates are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        for candidate in config_candidates() {
            if candidate.is_file() {
                return Self::from_path(&candidate);
            }
        }
        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!(path = %path.display(), %source, "Failed to read config");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let mut config = Self::parse(&content, path)?;
        config.resolve_paths(path, |name| env::var(name).ok());
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse config text without touching the filesystem.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|source| {
            tracing::warn!(path = %path.display(), %source, "Failed to parse config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Expand `${VAR}` references and anchor relative paths at the file's directory.
    pub fn resolve_paths(&mut self, file: &Path, lookup: impl Fn(&str) -> Option<String>) {
        let base = file.parent().unwrap_or_else(|| Path::new(""));
        let resolve = |path: &PathBuf| {
            let expanded = PathBuf::from(expand_env_vars(&path.to_string_lossy(), &lookup));
            if expanded.is_relative() {
                base.join(expanded)
            } else {
                expanded
            }
        };
        self.database.path = self.database.path.as_ref().map(&resolve);
        self.changelog.path = self.changelog.path.as_ref().map(&resolve);
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.database {
            self.database.path = Some(path);
        }
        if let Some(path) = overrides.changelog {
            self.changelog.path = Some(path);
        }
        if let Some(context) = overrides.context {
            self.run.context = Some(context);
        }
        if let Some(fail_on_error) = overrides.fail_on_error {
            self.run.fail_on_error = fail_on_error;
        }
        self
    }

    pub fn database_path(&self) -> Result<&Path, ConfigError> {
        self.database
            .path
            .as_deref()
            .ok_or(ConfigError::Missing {
                what: "database path",
                env: ENV_DATABASE,
            })
    }

    pub fn changelog_path(&self) -> Result<&Path, ConfigError> {
        self.changelog
            .path
            .as_deref()
            .ok_or(ConfigError::Missing {
                what: "changelog path",
                env: ENV_CHANGELOG,
            })
    }

    /// Run context; blank values mean "no context".
    #[must_use]
    pub fn run_context(&self) -> Option<RunContext> {
        RunContext::from_optional(self.run.context.as_deref())
    }
}

/// Implicit lookup order after an explicit `--config`.
#[must_use]
pub fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(path) = user_config_path() {
        candidates.push(path);
    }
    candidates
}

#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ferry").join("config.toml"))
}

/// Replace `${VAR}` with `lookup(VAR)`; unknown variables become empty.
///
/// An unterminated `${` and an empty `${}` are kept as written.
pub fn expand_env_vars(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(0) => {
                out.push_str("${}");
                rest = &after[1..];
            }
            Some(end) => {
                out.push_str(&lookup(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
