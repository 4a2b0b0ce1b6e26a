use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::Deserialize;

use crate::manager::orchestrator::SETUP_TASK_NAME;
use crate::worker::pool::effective_workers;
use crate::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "applications.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub common: Common,
    #[serde(default)]
    pub applications: BTreeMap<String, Application>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Common {
    #[serde(default)]
    pub setup_scripts: Vec<String>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub steps: Vec<String>,
    pub command: String,
    /// Absent means enabled; only an explicit `false` disables.
    pub enabled: Option<bool>,
}

impl Common {
    pub fn worker_count(&self) -> usize {
        effective_workers(self.workers)
    }
}

impl Application {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Config::load path={}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = raw.parse()?;
        debug!(
            "Config loaded: {} setup steps, {} applications, workers={:?}",
            config.common.setup_scripts.len(),
            config.applications.len(),
            config.common.workers
        );
        Ok(config)
    }

    pub fn enabled_applications(&self) -> Vec<(&str, &Application)> {
        self.applications
            .iter()
            .filter(|(_, app)| app.is_enabled())
            .map(|(name, app)| (name.as_str(), app))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        for name in self.applications.keys() {
            if name.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "application name must not be empty".to_string(),
                ));
            }
            if name == SETUP_TASK_NAME {
                return Err(Error::InvalidConfig(format!(
                    "application name {:?} is reserved for setup steps",
                    name
                )));
            }
            if name.contains(':') || name.contains('\n') {
                return Err(Error::InvalidConfig(format!(
                    "application name {:?} must not contain ':' or newlines",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[common]
setup_scripts = ["echo setup", "true"]
workers = 2

[applications.web]
steps = ["true"]
command = "bin/web"

[applications.api]
steps = ["make api"]
command = "bin/api --port 8080"
enabled = true

[applications.legacy]
steps = ["false"]
command = "bin/legacy"
enabled = false
"#;

    #[test]
    fn test_parse_sample() {
        let config: Config = SAMPLE.parse().unwrap();
        assert_eq!(config.common.setup_scripts, vec!["echo setup", "true"]);
        assert_eq!(config.common.worker_count(), 2);
        assert_eq!(config.applications.len(), 3);
        assert_eq!(config.applications["api"].command, "bin/api --port 8080");
    }

    #[test]
    fn test_enabled_flag_defaults_to_true() {
        let config: Config = SAMPLE.parse().unwrap();
        assert!(config.applications["web"].enabled.is_none());
        assert!(config.applications["web"].is_enabled());
        assert!(!config.applications["legacy"].is_enabled());

        let names: Vec<&str> = config
            .enabled_applications()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["api", "web"]);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = "".parse().unwrap();
        assert!(config.common.setup_scripts.is_empty());
        assert!(config.applications.is_empty());
        assert_eq!(config.common.worker_count(), 5);

        let config: Config = "[common]\nworkers = 0\n".parse().unwrap();
        assert_eq!(config.common.worker_count(), 5);
    }

    #[test]
    fn test_rejects_malformed_config() {
        assert!(matches!(
            "[applications.web]\nsteps = [\"true\"]\n".parse::<Config>(),
            Err(Error::TomlParse(_))
        ));
        assert!(matches!(
            "[common]\nworkers = -1\n".parse::<Config>(),
            Err(Error::TomlParse(_))
        ));
        assert!(matches!(
            "[applications.\"a:b\"]\ncommand = \"x\"\n".parse::<Config>(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_setup_task_name() {
        let raw = "[applications.\"common setup\"]\ncommand = \"bin/x\"\n";
        let err = raw.parse::<Config>().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("reserved")));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
