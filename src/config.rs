// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aggregate::SavingsThresholds;
use crate::db::project_dirs;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: Option<PathBuf>,
    pub log_filter: String,
    pub rates: RatesConfig,
    pub savings: SavingsThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_filter: "info".to_string(),
            rates: RatesConfig::default(),
            savings: SavingsThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub url: String,
    /// All fetched rates are expressed per one unit of this currency.
    pub base: String,
    pub timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            url: "https://open.er-api.com/v6/latest".to_string(),
            base: "USD".to_string(),
            timeout_secs: 15,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("PURSELINE_CONFIG") {
        return Some(PathBuf::from(p));
    }
    project_dirs().map(|p| p.config_dir().join("config.toml"))
}

/// Loads `config.toml` (if present) and applies environment overrides.
pub fn load() -> Result<AppConfig> {
    let mut cfg = match config_path() {
        Some(path) if path.exists() => load_file(&path)?,
        _ => {
            debug!("no config file found, using defaults");
            AppConfig::default()
        }
    };
    apply_env(&mut cfg);
    Ok(cfg)
}

pub fn load_file(path: &Path) -> Result<AppConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Read config at {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&raw).with_context(|| format!("Parse config at {}", path.display()))?;
    info!(path = %path.display(), "loaded configuration");
    Ok(cfg)
}

fn apply_env(cfg: &mut AppConfig) {
    if let Ok(p) = env::var("PURSELINE_DB") {
        cfg.database_path = Some(PathBuf::from(p));
    }
    if let Ok(u) = env::var("PURSELINE_RATES_URL") {
        cfg.rates.url = u;
    }
}
