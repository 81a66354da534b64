/**
 * SOURCES - Modèle des sources de données externes
 *
 * RÔLE :
 * Décrit un système externe avec lequel le DSS pourrait échanger des données :
 * app analytique (notebook), base relationnelle, API ERP, fichier.
 *
 * FONCTIONNEMENT :
 * - `SourceConfig` = union taggée par kind, chaque variante ne porte que ses champs
 * - Sur le fil : {"kind": "database", "config": {...}}
 * - Un kind incohérent avec sa config échoue à la désérialisation
 */

use crate::datasets::DatasetKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Connected,
    Disconnected,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    NotebookApp,
    Database,
    HttpApi,
    File,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::NotebookApp => "notebook-app",
            SourceKind::Database => "database",
            SourceKind::HttpApi => "http-api",
            SourceKind::File => "file",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub id: String,
    pub name: String,
    pub status: SourceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub last_sync: OffsetDateTime,   // jamais mis à jour par un sync
    #[serde(flatten)]
    pub config: SourceConfig,
}

impl DataSource {
    pub fn kind(&self) -> SourceKind {
        self.config.kind()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "kebab-case")]
pub enum SourceConfig {
    NotebookApp(NotebookConfig),
    Database(DatabaseConfig),
    HttpApi(ApiConfig),
    File(FileConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceConfig::NotebookApp(_) => SourceKind::NotebookApp,
            SourceConfig::Database(_) => SourceKind::Database,
            SourceConfig::HttpApi(_) => SourceKind::HttpApi,
            SourceConfig::File(_) => SourceKind::File,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotebookConfig {
    pub url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoints: NotebookEndpoints,
}

/// Chemins exposés par l'app notebook pour chaque jeu de données
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookEndpoints {
    pub projects: String,
    pub clients: String,
    pub kpis: String,
    pub service_areas: String,
}

impl NotebookEndpoints {
    pub fn path_for(&self, kind: DatasetKind) -> &str {
        match kind {
            DatasetKind::Kpis => &self.kpis,
            DatasetKind::Projects => &self.projects,
            DatasetKind::Clients => &self.clients,
            DatasetKind::ServiceAreas => &self.service_areas,
        }
    }
}

impl Default for NotebookEndpoints {
    fn default() -> Self {
        Self {
            projects: "/api/projects".into(),
            clients: "/api/clients".into(),
            kpis: "/api/kpis".into(),
            service_areas: "/api/service-areas".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)] // jamais renvoyé par l'API
    pub password: Option<String>,
    #[serde(default)]
    pub ssl: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub path: String,
}
