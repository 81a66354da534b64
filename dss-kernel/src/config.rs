use crate::datasets::StaticDatasets;
use crate::sources::DataSource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KernelConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Remplace le registre échantillon si présent
    #[serde(default)]
    pub sources: Option<Vec<DataSource>>,
    /// Remplace les jeux de données échantillons si présent
    #[serde(default)]
    pub datasets: Option<StaticDatasets>,
}

fn default_bind() -> String {
    DEFAULT_BIND.into()
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self { bind: default_bind(), api_key: None, sources: None, datasets: None }
    }
}

impl KernelConfig {
    /// DSS_BIND / DSS_API_KEY écrasent le fichier
    pub fn apply_env(mut self) -> Self {
        if let Ok(bind) = std::env::var("DSS_BIND") {
            if !bind.trim().is_empty() {
                self.bind = bind;
            }
        }
        if let Ok(key) = std::env::var("DSS_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        self
    }
}

pub fn parse_config(txt: &str) -> Result<KernelConfig, ConfigError> {
    if txt.trim().is_empty() {
        return Ok(KernelConfig::default());
    }
    Ok(serde_yaml::from_str(txt)?)
}

pub async fn read_config<P: AsRef<Path>>(path: P) -> Result<KernelConfig, ConfigError> {
    let txt = fs::read_to_string(path).await?;
    parse_config(&txt)
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("DSS_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    let cfg = if Path::new(&path).exists() {
        read_config(&path).await.unwrap_or_else(|e| {
            warn!("[kernel] config invalide ({path}): {e}");
            KernelConfig::default()
        })
    } else {
        info!("[kernel] pas de {path}, usage config par défaut");
        KernelConfig::default()
    };
    cfg.apply_env()
}
