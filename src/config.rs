use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::reconcile::DEFAULT_PREVIEW_CHARS;
use crate::sources::ThreadKey;

pub const DEFAULT_CONFIG_FILE: &str = "revtally.toml";
pub const DATA_DIR_ENV: &str = "REVTALLY_DATA_DIR";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RepositoryEntry {
    pub owner: String,
    pub repo: String,
    pub pull_request: u64,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub name: Option<String>,
    pub data_dir: Option<String>,
    pub cache_ttl: Option<u64>,
    pub preview_chars: Option<usize>,
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub name: String,
    pub data_dir: PathBuf,
    pub cache_ttl: Duration,
    pub preview_chars: usize,
    pub repositories: Vec<ThreadKey>,
}

impl Config {
    /// Resolve the effective config: CLI flags, then `REVTALLY_DATA_DIR`,
    /// then the file, then defaults. Only an explicitly named file has to exist.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match &cli.config {
            Some(path) => read_config(Path::new(path))?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    read_config(path)?
                } else {
                    ConfigFile::default()
                }
            }
        };
        let env_data_dir = std::env::var(DATA_DIR_ENV).ok().filter(|v| !v.is_empty());
        Ok(merge(file_config, cli, env_data_dir))
    }
}

fn read_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ttl) = config.cache_ttl
        && ttl == 0
    {
        return Err(Error::ConfigValidation(
            "cache_ttl must be > 0".to_string(),
        ));
    }
    if let Some(chars) = config.preview_chars
        && chars == 0
    {
        return Err(Error::ConfigValidation(
            "preview_chars must be > 0".to_string(),
        ));
    }
    for (i, entry) in config.repositories.iter().enumerate() {
        if entry.owner.trim().is_empty() || entry.repo.trim().is_empty() {
            return Err(Error::ConfigValidation(format!(
                "repositories[{i}]: owner and repo must not be empty"
            )));
        }
        if entry.pull_request == 0 {
            return Err(Error::ConfigValidation(format!(
                "repositories[{i}]: pull_request must be > 0"
            )));
        }
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli, env_data_dir: Option<String>) -> Config {
    Config {
        name: file.name.unwrap_or_else(|| "Audit Review".to_string()),
        data_dir: PathBuf::from(
            cli.data_dir
                .clone()
                .or(env_data_dir)
                .or(file.data_dir)
                .unwrap_or_else(|| ".revtally".to_string()),
        ),
        cache_ttl: Duration::from_secs(file.cache_ttl.unwrap_or(30)),
        preview_chars: file.preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS),
        repositories: file
            .repositories
            .into_iter()
            .map(|r| ThreadKey::new(r.owner, r.repo, r.pull_request))
            .collect(),
    }
}
