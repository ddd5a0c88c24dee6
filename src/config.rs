use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub max_depth: usize,

    pub keyword: String,
}

impl Default for Scan {
    fn default() -> Self {
        Scan {
            max_depth: default_max_depth(),
            keyword: default_keyword(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub root: String,
}

impl Default for Backup {
    fn default() -> Self {
        Backup {
            root: default_backup_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,

    #[serde(default)]
    pub json_output: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_log_level(),
            json_output: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: Scan,

    #[serde(default)]
    pub backup: Backup,

    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        std::env::var_os("PLUGSWEEP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("plugsweep")
                    .join("config.toml")
            })
    }

    pub fn backup_root(&self) -> PathBuf {
        PathBuf::from(&self.backup.root)
    }

    pub fn max_depth(&self) -> usize {
        self.scan.max_depth
    }

    pub fn keyword(&self) -> &str {
        &self.scan.keyword
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }

    pub fn json_output(&self) -> bool {
        self.logging.json_output
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PLUGSWEEP_BACKUP_ROOT") {
            self.backup.root = val;
        }
        if let Ok(val) = std::env::var("PLUGSWEEP_KEYWORD") {
            self.scan.keyword = val;
        }
        if let Ok(val) = std::env::var("PLUGSWEEP_MAX_DEPTH") {
            if let Ok(depth) = val.parse() {
                self.scan.max_depth = depth;
            }
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.level = val;
        }
    }
}

fn default_max_depth() -> usize {
    6
}

fn default_keyword() -> String {
    "augment".to_string()
}

fn default_backup_root() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plugsweep_backups")
        .to_string_lossy()
        .into_owned()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    // Env vars are process-global; these tests must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn config_loads_default_when_missing() {
        let _env = env_guard();
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");

        unsafe {
            std::env::remove_var("PLUGSWEEP_BACKUP_ROOT");
            std::env::remove_var("PLUGSWEEP_KEYWORD");
            std::env::remove_var("PLUGSWEEP_MAX_DEPTH");
            std::env::set_var("PLUGSWEEP_CONFIG", config_path);
        }

        let config = Config::load().unwrap();

        assert_eq!(config.scan.max_depth, 6);
        assert_eq!(config.scan.keyword, "augment");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.json_output, false);

        unsafe {
            std::env::remove_var("PLUGSWEEP_CONFIG");
        }
    }

    #[test]
    fn config_loads_from_file() {
        let _env = env_guard();
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");

        let config_content = r#"
[scan]
max_depth = 4
keyword = "otherplugin"

[backup]
root = "/custom/backups"

[logging]
level = "debug"
json_output = true
"#;

        fs::write(&config_path, config_content).unwrap();
        unsafe {
            std::env::remove_var("PLUGSWEEP_BACKUP_ROOT");
            std::env::remove_var("PLUGSWEEP_KEYWORD");
            std::env::remove_var("PLUGSWEEP_MAX_DEPTH");
            std::env::set_var("PLUGSWEEP_CONFIG", config_path);
        }

        let config = Config::load().unwrap();

        assert_eq!(config.scan.max_depth, 4);
        assert_eq!(config.scan.keyword, "otherplugin");
        assert_eq!(config.backup.root, "/custom/backups");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.json_output, true);

        unsafe {
            std::env::remove_var("PLUGSWEEP_CONFIG");
        }
    }

    #[test]
    fn config_env_overrides_work() {
        let _env = env_guard();
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");

        fs::write(&config_path, "[backup]\nroot = \"/config/backups\"\n").unwrap();
        unsafe {
            std::env::remove_var("PLUGSWEEP_KEYWORD");
            std::env::set_var("PLUGSWEEP_CONFIG", config_path);
            std::env::set_var("PLUGSWEEP_BACKUP_ROOT", "/env/backups");
            std::env::set_var("PLUGSWEEP_MAX_DEPTH", "3");
        }

        let config = Config::load().unwrap();

        assert_eq!(config.backup.root, "/env/backups");
        assert_eq!(config.scan.max_depth, 3);

        unsafe {
            std::env::remove_var("PLUGSWEEP_CONFIG");
            std::env::remove_var("PLUGSWEEP_BACKUP_ROOT");
            std::env::remove_var("PLUGSWEEP_MAX_DEPTH");
        }
    }
}
