use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Environment variable overriding `store.snapshot_path`.
pub const SNAPSHOT_ENV: &str = "USER_STORE_SNAPSHOT";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_create_parent_dirs")]
    pub create_parent_dirs: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { snapshot_path: default_snapshot_path(), create_parent_dirs: default_create_parent_dirs() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Used when `RUST_LOG` is not set.
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format(), filter: None }
    }
}

fn default_snapshot_path() -> PathBuf { PathBuf::from("data/snapshot.users.json") }
fn default_create_parent_dirs() -> bool { true }
fn default_log_format() -> String { "compact".into() }

pub fn config_path() -> PathBuf {
    std::env::var("CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("config.toml"))
}

pub fn load_from_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content).with_context(|| format!("invalid config file {}", path.display()))
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::metadata(path) {
            Ok(_) => load_from_file(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(anyhow!("cannot stat config {}: {e}", path.display())),
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.normalize_and_validate_with(None)
    }

    /// Like `normalize_and_validate`, with a command-line snapshot path that
    /// takes precedence over both the file and the environment.
    pub fn normalize_and_validate_with(&mut self, snapshot_override: Option<PathBuf>) -> Result<()> {
        self.store.normalize_from_env();
        if let Some(path) = snapshot_override {
            self.store.snapshot_path = path;
        }
        self.store.validate()?;
        self.logging.normalize()?;
        Ok(())
    }
}

impl StoreConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(path) = std::env::var(SNAPSHOT_ENV) {
            if !path.trim().is_empty() {
                self.snapshot_path = PathBuf::from(path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(anyhow!("store.snapshot_path is empty; set it in config.toml or {SNAPSHOT_ENV}"));
        }
        if self.snapshot_path.file_name().is_none() {
            return Err(anyhow!("store.snapshot_path must name a file: {}", self.snapshot_path.display()));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn normalize(&mut self) -> Result<()> {
        let format = self.format.trim().to_ascii_lowercase();
        match format.as_str() {
            "compact" | "json" => {
                self.format = format;
                Ok(())
            }
            other => Err(anyhow!("logging.format must be \"compact\" or \"json\", got {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() -> Result<()> {
        let cfg = parse("")?;
        assert_eq!(cfg.store.snapshot_path, PathBuf::from("data/snapshot.users.json"));
        assert!(cfg.store.create_parent_dirs);
        assert_eq!(cfg.logging.format, "compact");
        assert!(cfg.logging.filter.is_none());
        Ok(())
    }

    #[test]
    fn parses_sections() -> Result<()> {
        let cfg = parse(
            r#"
            [store]
            snapshot_path = "/var/lib/users/snapshot.json"
            create_parent_dirs = false

            [logging]
            format = "JSON"
            filter = "debug"
            "#,
        )?;
        assert_eq!(cfg.store.snapshot_path, PathBuf::from("/var/lib/users/snapshot.json"));
        assert!(!cfg.store.create_parent_dirs);
        assert_eq!(cfg.logging.filter.as_deref(), Some("debug"));

        let mut cfg = cfg;
        cfg.logging.normalize()?;
        assert_eq!(cfg.logging.format, "json");
        Ok(())
    }

    #[test]
    fn rejects_bad_values() {
        let mut store = StoreConfig { snapshot_path: PathBuf::new(), create_parent_dirs: true };
        assert!(store.validate().is_err());
        store.snapshot_path = PathBuf::from("/");
        assert!(store.validate().is_err());

        let mut logging = LoggingConfig { format: "xml".into(), filter: None };
        assert!(logging.normalize().is_err());
    }

    #[test]
    fn snapshot_override_is_validated() -> Result<()> {
        let mut cfg = parse("")?;
        assert!(cfg.clone().normalize_and_validate_with(Some(PathBuf::from("/"))).is_err());
        assert!(cfg.clone().normalize_and_validate_with(Some(PathBuf::new())).is_err());

        cfg.normalize_and_validate_with(Some(PathBuf::from("/tmp/override/users.json")))?;
        assert_eq!(cfg.store.snapshot_path, PathBuf::from("/tmp/override/users.json"));
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let cfg = AppConfig::load_or_default(Path::new("/nonexistent-config-for-tests.toml"))?;
        assert_eq!(cfg.logging.format, "compact");
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error() -> Result<()> {
        let tmp = std::env::temp_dir().join(format!("configs_bad_{}.toml", std::process::id()));
        std::fs::write(&tmp, "[store\nsnapshot_path = 1")?;
        assert!(AppConfig::load_or_default(&tmp).is_err());
        let _ = std::fs::remove_file(&tmp);
        Ok(())
    }
}
