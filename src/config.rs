//! Where snippets live on disk.
//!
//! The data directory comes from `SNIPSTASH_DATA_DIR` if set, otherwise from
//! the config file, otherwise `~/.snipstash/snippets`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const DATA_DIR_ENV: &str = "SNIPSTASH_DATA_DIR";
pub const CONFIG_PATH_ENV: &str = "SNIPSTASH_CONFIG_PATH";

const APP_DIR: &str = "snipstash";
const CONFIG_FILE: &str = "config.toml";

static ENV_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("valid env var regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub data_directory: PathBuf,
}

/// The environment a configuration is resolved against.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub home: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    vars: Vec<(String, String)>,
    /// Reads from the process environment when set.
    process: bool,
}

impl Environment {
    /// The running process: real home, config directory and variables.
    pub fn current() -> Self {
        Self {
            home: dirs::home_dir(),
            config_dir: dirs::config_dir(),
            vars: Vec::new(),
            process: true,
        }
    }

    /// An isolated environment with no variables set.
    pub fn isolated(home: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            config_dir: Some(config_dir.into()),
            vars: Vec::new(),
            process: false,
        }
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some((_, value)) = self.vars.iter().rev().find(|(k, _)| k == key) {
            return Some(value.clone());
        }
        if self.process {
            return std::env::var(key).ok();
        }
        None
    }

    /// Config file location: `SNIPSTASH_CONFIG_PATH`, else `<config_dir>/snipstash/config.toml`.
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.get(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Some(expand_path(&path, self));
        }
        self.config_dir
            .as_ref()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    fn default_data_directory(&self) -> Result<PathBuf> {
        let home = self
            .home
            .as_ref()
            .context("Failed to get home directory")?;
        Ok(home.join(".snipstash").join("snippets"))
    }
}

/// Expands a leading `~` and `$VAR` / `${VAR}` references. Unset variables become empty.
pub fn expand_path(raw: &str, env: &Environment) -> PathBuf {
    let expanded = ENV_VAR.replace_all(raw, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        env.get(name).unwrap_or_default()
    });

    match (expanded.strip_prefix('~'), env.home.as_ref()) {
        (Some(""), Some(home)) => home.clone(),
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(&rest[1..])
        }
        _ => PathBuf::from(&*expanded),
    }
}

impl Config {
    /// Resolves the configuration for the running process.
    pub fn load() -> Result<Self> {
        Self::resolve(&Environment::current())
    }

    pub fn resolve(env: &Environment) -> Result<Self> {
        if let Some(dir) = env.get(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            tracing::debug!("data directory from {}", DATA_DIR_ENV);
            return Ok(Self {
                data_directory: expand_path(&dir, env),
            });
        }

        if let Some(path) = env.config_path() {
            if let Some(config) = Self::read_file(&path)? {
                tracing::debug!("data directory from {}", path.display());
                return Ok(Self {
                    data_directory: expand_path(&config.data_directory.to_string_lossy(), env),
                });
            }
        }

        Ok(Self {
            data_directory: env.default_data_directory()?,
        })
    }

    /// `Ok(None)` when the file does not exist.
    fn read_file(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()));
            }
        };
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Writes the config file for `env`, creating parent directories.
    pub fn save(&self, env: &Environment) -> Result<PathBuf> {
        let path = env
            .config_path()
            .context("Failed to get config directory")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(dir: &Path) -> Environment {
        Environment::isolated(dir.join("home"), dir.join("config"))
    }

    #[test]
    fn defaults_to_home_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::resolve(&env(dir.path())).unwrap();
        assert_eq!(
            config.data_directory,
            dir.path().join("home").join(".snipstash").join("snippets")
        );
    }

    #[test]
    fn env_var_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let e = env(dir.path());
        Config {
            data_directory: "/from/file".into(),
        }
        .save(&e)
        .unwrap();

        let e = e.var(DATA_DIR_ENV, "/from/env");
        assert_eq!(
            Config::resolve(&e).unwrap().data_directory,
            PathBuf::from("/from/env")
        );
    }

    #[test]
    fn file_is_used_and_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let e = env(dir.path()).var("NOTES", "notes");
        Config {
            data_directory: "~/${NOTES}/snippets".into(),
        }
        .save(&e)
        .unwrap();

        assert_eq!(
            Config::resolve(&e).unwrap().data_directory,
            dir.path().join("home").join("notes/snippets")
        );
    }

    #[test]
    fn save_round_trips_through_config_path_override() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("elsewhere").join("snip.toml");
        let e = env(dir.path()).var(CONFIG_PATH_ENV, custom.to_string_lossy());
        let written = Config {
            data_directory: "/data".into(),
        }
        .save(&e)
        .unwrap();

        assert_eq!(written, custom);
        assert_eq!(
            Config::resolve(&e).unwrap().data_directory,
            PathBuf::from("/data")
        );
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let e = env(dir.path());
        let path = e.config_path().unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "data_directory = [").unwrap();
        assert!(Config::resolve(&e).is_err());
    }

    #[test]
    fn expands_tilde_and_variables() {
        let e = Environment::isolated("/home/me", "/cfg").var("A", "alpha");
        assert_eq!(expand_path("~", &e), PathBuf::from("/home/me"));
        assert_eq!(expand_path("~/x", &e), PathBuf::from("/home/me/x"));
        assert_eq!(expand_path("/p/$A/q", &e), PathBuf::from("/p/alpha/q"));
        assert_eq!(expand_path("/p/${A}q", &e), PathBuf::from("/p/alphaq"));
        assert_eq!(expand_path("/p/$MISSING/q", &e), PathBuf::from("/p//q"));
        assert_eq!(expand_path("~user/x", &e), PathBuf::from("~user/x"));
    }
}
