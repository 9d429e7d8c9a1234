use crate::catalog::CatalogSource;
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const APP_DIR_NAME: &str = "dokkan-checklist";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// File path or http(s) URL of the unit catalog.
    #[serde(default)]
    pub catalog_source: Option<String>,
    #[serde(default = "default_true")]
    pub copy_export_to_clipboard: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_source: None,
            copy_export_to_clipboard: true,
        }
    }
}

impl AppConfig {
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).context("create app data dir")?;
        let path = config_path(data_dir);
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            return Ok(config);
        }

        let config = AppConfig::default();
        config.save(data_dir)?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir).context("create app data dir")?;
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(config_path(data_dir), raw).context("write app config")?;
        Ok(())
    }

    /// `--catalog` wins over the config file, which wins over the bundled
    /// `units.json` in the data dir.
    pub fn catalog_source(&self, paths: &AppPaths, override_source: Option<&str>) -> CatalogSource {
        override_source
            .or(self.catalog_source.as_deref())
            .filter(|value| !value.trim().is_empty())
            .map(CatalogSource::parse)
            .unwrap_or_else(|| CatalogSource::File(paths.default_catalog()))
    }
}

/// Everything the app reads or writes on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

impl AppPaths {
    pub fn resolve() -> Result<Self> {
        Ok(Self {
            data_dir: base_data_dir()?,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        config_path(&self.data_dir)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("dokkan-checklist.log")
    }

    pub fn default_catalog(&self) -> PathBuf {
        self.data_dir.join("units.json")
    }
}

fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.json")
}

fn default_true() -> bool {
    true
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join(APP_DIR_NAME))
}
