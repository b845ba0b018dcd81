use std::fmt;
use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::CkanError;
use crate::extract::{ExternalTool, ExtractionStrategy, InProcessZip, NoExtraction};

pub const CONFIG_FILE_NAME: &str = "ckan-dl.json";
pub const API_KEY_ENV: &str = "CKAN_API_KEY";
pub const DEFAULT_EXTRACT_COMMAND: &str = "unzip";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategyKind {
    InProcess,
    ExternalTool,
    #[default]
    None,
}

impl fmt::Display for ExtractionStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStrategyKind::InProcess => write!(f, "in-process"),
            ExtractionStrategyKind::ExternalTool => write!(f, "external-tool"),
            ExtractionStrategyKind::None => write!(f, "none"),
        }
    }
}

impl ExtractionStrategyKind {
    pub fn build(self, extract_command: &str) -> Box<dyn ExtractionStrategy> {
        match self {
            ExtractionStrategyKind::InProcess => Box::new(InProcessZip),
            ExtractionStrategyKind::ExternalTool => Box::new(ExternalTool::new(extract_command)),
            ExtractionStrategyKind::None => Box::new(NoExtraction),
        }
    }
}

/// Validated settings for a [`Downloader`](crate::downloader::Downloader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    catalog_url: String,
    api_key: Option<String>,
    download_dir: Utf8PathBuf,
    extract_dir: Option<Utf8PathBuf>,
    strategy: ExtractionStrategyKind,
    extract_command: String,
}

impl DownloadConfig {
    pub fn new(
        catalog_url: impl Into<String>,
        download_dir: impl Into<Utf8PathBuf>,
    ) -> Result<Self, CkanError> {
        let catalog_url = catalog_url.into().trim().to_string();
        if catalog_url.is_empty() {
            return Err(CkanError::Configuration("catalog URL not set".to_string()));
        }
        let download_dir = download_dir.into();
        if download_dir.as_str().trim().is_empty() {
            return Err(CkanError::Configuration(
                "download directory not set".to_string(),
            ));
        }

        let catalog_url = if catalog_url.ends_with('/') {
            catalog_url
        } else {
            format!("{catalog_url}/")
        };

        Ok(Self {
            catalog_url,
            api_key: None,
            download_dir,
            extract_dir: None,
            strategy: ExtractionStrategyKind::None,
            extract_command: DEFAULT_EXTRACT_COMMAND.to_string(),
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    pub fn with_extract_dir(mut self, extract_dir: Option<Utf8PathBuf>) -> Self {
        self.extract_dir = extract_dir.filter(|dir| !dir.as_str().trim().is_empty());
        self
    }

    pub fn with_strategy(mut self, strategy: ExtractionStrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_extract_command(mut self, command: impl Into<String>) -> Self {
        let command = command.into();
        if !command.trim().is_empty() {
            self.extract_command = command.trim().to_string();
        }
        self
    }

    pub fn catalog_url(&self) -> &str {
        &self.catalog_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn download_dir(&self) -> &Utf8Path {
        &self.download_dir
    }

    pub fn extract_dir(&self) -> &Utf8Path {
        self.extract_dir.as_deref().unwrap_or(&self.download_dir)
    }

    pub fn strategy(&self) -> ExtractionStrategyKind {
        self.strategy
    }

    pub fn extract_command(&self) -> &str {
        &self.extract_command
    }
}

/// On-disk shape of `ckan-dl.json`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub download_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub extract_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub strategy: Option<ExtractionStrategyKind>,
    #[serde(default)]
    pub extract_command: Option<String>,
}

/// Values given on the command line; each one beats the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub catalog_url: Option<String>,
    pub api_key: Option<String>,
    pub download_dir: Option<Utf8PathBuf>,
    pub extract_dir: Option<Utf8PathBuf>,
    pub strategy: Option<ExtractionStrategyKind>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file, if any, and merges it with `overrides`.
    ///
    /// An explicit `path` must exist. Without one, `ckan-dl.json` in the working directory and
    /// then `<config dir>/ckan-dl/config.json` are tried, and a missing file is not an error.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<DownloadConfig, CkanError> {
        let file = match path {
            Some(path) => Self::read(PathBuf::from(path))?,
            None => match default_config_path() {
                Some(path) => Self::read(path)?,
                None => ConfigFile::default(),
            },
        };
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::resolve_config(file, overrides, env_key)
    }

    pub fn resolve_config(
        file: ConfigFile,
        overrides: ConfigOverrides,
        env_api_key: Option<String>,
    ) -> Result<DownloadConfig, CkanError> {
        let catalog_url = overrides.catalog_url.or(file.catalog_url).unwrap_or_default();
        let download_dir = overrides
            .download_dir
            .or(file.download_dir)
            .unwrap_or_default();

        let mut config = DownloadConfig::new(catalog_url, download_dir)?
            .with_api_key(overrides.api_key.or(file.api_key).or(env_api_key))
            .with_extract_dir(overrides.extract_dir.or(file.extract_dir))
            .with_strategy(overrides.strategy.or(file.strategy).unwrap_or_default());
        if let Some(command) = file.extract_command {
            config = config.with_extract_command(command);
        }
        Ok(config)
    }

    fn read(path: PathBuf) -> Result<ConfigFile, CkanError> {
        let content = fs::read_to_string(&path).map_err(|err| CkanError::ConfigRead {
            path: path.clone(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|err| CkanError::ConfigParse(err.to_string()))
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("ckan-dl").join("config.json"))
        .filter(|path| path.exists())
}
