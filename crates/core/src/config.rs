//! TOML-based configuration for groupsync.
//!
//! The Canvas access token is stored as a `token_env` field that references
//! an environment variable name. The actual secret is resolved at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging and general settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Canvas instance, course and group category.
    pub canvas: CanvasConfig,

    /// Locations of the groups file and the student id cache.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Student id cache behaviour.
    #[serde(default)]
    pub cache: CacheConfig,
}

// ---------------------------------------------------------------------------
// General
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Which Canvas user field holds the local id.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocalIdField {
    /// The user's login name.
    #[default]
    LoginId,
    /// The institution's SIS identifier.
    SisUserId,
}

/// Canvas API and course settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Canvas base URL (e.g. `https://canvas.example.edu`).
    pub api_url: String,

    /// Environment variable holding the Canvas access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Course whose students and groups are reconciled.
    pub course_id: u64,

    /// Group category (group set) the configured groups live in.
    pub group_category_id: u64,

    /// Canvas user field used as the local id.
    #[serde(default)]
    pub local_id_field: LocalIdField,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_token_env() -> String {
    "CANVAS_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON file with the configured groups.
    #[serde(default = "default_groups_file")]
    pub groups_file: PathBuf,

    /// JSON snapshot of the student id mapping.
    #[serde(default = "default_student_cache")]
    pub student_cache: PathBuf,
}

fn default_groups_file() -> PathBuf {
    PathBuf::from("config/groups.json")
}
fn default_student_cache() -> PathBuf {
    PathBuf::from("config/students.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            groups_file: default_groups_file(),
            student_cache: default_student_cache(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Student id cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Snapshots older than this many hours are refetched. 0 disables expiry.
    #[serde(default)]
    pub max_age_hours: u64,
}

impl CacheConfig {
    pub fn max_age(&self) -> Option<chrono::Duration> {
        match self.max_age_hours {
            0 => None,
            hours => i64::try_from(hours).ok().map(chrono::Duration::hours),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `*_env` fields from environment variables.
    ///
    /// A missing variable logs a warning but does **not** fail -- commands
    /// that talk to Canvas call [`require_token`](Self::require_token).
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");
        self.canvas.token = resolve_optional_env(&self.canvas.token_env, "canvas.token_env");
        debug!("environment variable resolution complete");
        Ok(())
    }

    /// The resolved Canvas token, or an error naming the unset variable.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.canvas
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: self.canvas.token_env.clone(),
                field: "canvas.token_env".into(),
            })
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.canvas.api_url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "canvas.api_url".into(),
                detail: "Canvas URL must not be empty".into(),
            });
        }
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(ConfigError::InvalidValue {
                field: "canvas.api_url".into(),
                detail: "Canvas URL must start with http:// or https://".into(),
            });
        }
        if self.canvas.token_env.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "canvas.token_env".into(),
                detail: "token variable name must not be empty".into(),
            });
        }
        if self.canvas.course_id == 0 {
            return Err(ConfigError::InvalidValue {
                field: "canvas.course_id".into(),
                detail: "course id must be > 0".into(),
            });
        }
        if self.canvas.group_category_id == 0 {
            return Err(ConfigError::InvalidValue {
                field: "canvas.group_category_id".into(),
                detail: "group category id must be > 0".into(),
            });
        }
        if self.paths.groups_file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "paths.groups_file".into(),
                detail: "groups file path must not be empty".into(),
            });
        }
        if self.paths.student_cache.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "paths.student_cache".into(),
                detail: "student cache path must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[general]
log_level = "debug"

[canvas]
api_url = "https://canvas.example.edu"
token_env = "CANVAS_TOKEN"
course_id = 1234
group_category_id = 567
local_id_field = "sis_user_id"

[paths]
groups_file = "conf/groups.json"
student_cache = "conf/students.json"

[cache]
max_age_hours = 24
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.canvas.course_id, 1234);
        assert_eq!(config.canvas.group_category_id, 567);
        assert_eq!(config.canvas.local_id_field, LocalIdField::SisUserId);
        assert_eq!(config.paths.groups_file, PathBuf::from("conf/groups.json"));
        assert_eq!(config.cache.max_age(), Some(chrono::Duration::hours(24)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groupsync.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.canvas.api_url, "https://canvas.example.edu");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/groupsync.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.canvas.api_url = String::new();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "canvas.api_url"
        ));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.canvas.api_url = "canvas.example.edu".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_category() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.canvas.group_category_id = 0;
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "canvas.group_category_id"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("TEST_GROUPSYNC_TOKEN", "tok_abc");

        let toml_str = r#"
[canvas]
api_url = "https://canvas.example.edu"
token_env = "TEST_GROUPSYNC_TOKEN"
course_id = 1
group_category_id = 2
"#;
        let mut config: AppConfig = toml::from_str(toml_str).unwrap();
        config.resolve_env_vars().unwrap();

        assert_eq!(config.canvas.token.as_deref(), Some("tok_abc"));
        assert_eq!(config.require_token().unwrap(), "tok_abc");

        std::env::remove_var("TEST_GROUPSYNC_TOKEN");
    }

    #[test]
    fn test_require_token_names_missing_variable() {
        let toml_str = r#"
[canvas]
api_url = "https://canvas.example.edu"
token_env = "TEST_GROUPSYNC_UNSET_TOKEN"
course_id = 1
group_category_id = 2
"#;
        let mut config: AppConfig = toml::from_str(toml_str).unwrap();
        config.resolve_env_vars().unwrap();

        assert!(matches!(
            config.require_token(),
            Err(ConfigError::EnvVarMissing { ref var, .. }) if var == "TEST_GROUPSYNC_UNSET_TOKEN"
        ));
    }

    #[test]
    fn test_defaults() {
        let minimal = r#"
[canvas]
api_url = "https://canvas.example.edu"
course_id = 1
group_category_id = 2
"#;
        let config: AppConfig = toml::from_str(minimal).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.canvas.token_env, "CANVAS_TOKEN");
        assert_eq!(config.canvas.local_id_field, LocalIdField::LoginId);
        assert_eq!(config.paths.groups_file, PathBuf::from("config/groups.json"));
        assert_eq!(config.paths.student_cache, PathBuf::from("config/students.json"));
        assert_eq!(config.cache.max_age(), None);
        assert!(config.validate().is_ok());
    }
}
