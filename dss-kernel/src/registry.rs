/**
 * REGISTRE DES SOURCES - Catalogue des systèmes externes connus
 *
 * RÔLE : Liste ordonnée des DataSource avec leur dernier statut observé.
 * Lecture seule : aucun sync ni test de connexion n'y réécrit quoi que ce soit.
 *
 * UTILITÉ : Alimente le panneau d'intégration (liste, compteurs, test, sync).
 */

use crate::sources::{
    ApiConfig, DataSource, DatabaseConfig, NotebookConfig, NotebookEndpoints, SourceConfig,
    SourceStatus,
};
use serde::Serialize;
use std::collections::HashSet;
use time::macros::datetime;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate source id: {0}")]
    DuplicateId(String),
}

/// Compteurs affichés en tête du panneau d'intégration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub total: usize,
    pub connected: usize,
    pub disconnected: usize, // tout ce qui n'est pas "connected", erreurs comprises
}

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<DataSource>, // ordre d'insertion = ordre d'affichage
}

impl SourceRegistry {
    pub fn new(sources: Vec<DataSource>) -> Result<Self, RegistryError> {
        {
            let mut seen = HashSet::new();
            for src in &sources {
                if !seen.insert(src.id.as_str()) {
                    return Err(RegistryError::DuplicateId(src.id.clone()));
                }
            }
        }
        Ok(Self { sources })
    }

    /// Les trois sources échantillons : app analytique, PostgreSQL, API ERP
    pub fn sample() -> Self {
        Self {
            sources: vec![
                DataSource {
                    id: "streamlit-main".into(),
                    name: "Streamlit Analytics".into(),
                    status: SourceStatus::Connected,
                    last_sync: datetime!(2024-01-15 10:30:00 UTC),
                    config: SourceConfig::NotebookApp(NotebookConfig {
                        url: "https://vv-analytics.streamlit.app".into(),
                        api_key: None,
                        endpoints: NotebookEndpoints::default(),
                    }),
                },
                DataSource {
                    id: "postgres-main".into(),
                    name: "PostgreSQL Principal".into(),
                    status: SourceStatus::Connected,
                    last_sync: datetime!(2024-01-15 11:00:00 UTC),
                    config: SourceConfig::Database(DatabaseConfig {
                        host: "localhost".into(),
                        port: 5432,
                        database: "vv_corporacion".into(),
                        username: None,
                        password: None,
                        ssl: true,
                    }),
                },
                DataSource {
                    id: "erp-api".into(),
                    name: "ERP System".into(),
                    status: SourceStatus::Disconnected,
                    last_sync: datetime!(2024-01-14 15:20:00 UTC),
                    config: SourceConfig::HttpApi(ApiConfig {
                        base_url: "https://erp.vvcorporacion.com/api".into(),
                        version: "v1".into(),
                    }),
                },
            ],
        }
    }

    pub fn list(&self) -> &[DataSource] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&DataSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn summary(&self) -> RegistrySummary {
        let connected = self
            .sources
            .iter()
            .filter(|s| s.status == SourceStatus::Connected)
            .count();
        RegistrySummary {
            total: self.sources.len(),
            connected,
            disconnected: self.sources.len() - connected,
        }
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FileConfig, SourceKind};

    #[test]
    fn test_sample_registry_order_and_kinds() {
        let reg = SourceRegistry::sample();
        let kinds: Vec<SourceKind> = reg.list().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![SourceKind::NotebookApp, SourceKind::Database, SourceKind::HttpApi]);
        assert_eq!(reg.get("erp-api").map(|s| s.name.as_str()), Some("ERP System"));
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn test_summary_counts_errors_as_disconnected() {
        let mut sources = SourceRegistry::sample().list().to_vec();
        sources.push(DataSource {
            id: "exports".into(),
            name: "CSV exports".into(),
            status: SourceStatus::Error,
            last_sync: datetime!(2024-01-10 08:00:00 UTC),
            config: SourceConfig::File(FileConfig { path: "/srv/exports".into() }),
        });
        let reg = SourceRegistry::new(sources).unwrap();

        assert_eq!(
            reg.summary(),
            RegistrySummary { total: 4, connected: 2, disconnected: 2 }
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut sources = SourceRegistry::sample().list().to_vec();
        sources.push(sources[0].clone());
        match SourceRegistry::new(sources) {
            Err(RegistryError::DuplicateId(id)) => assert_eq!(id, "streamlit-main"),
            other => panic!("expected duplicate id error, got {:?}", other.map(|r| r.len())),
        }
    }
}
