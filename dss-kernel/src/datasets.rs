/**
 * DATASETS - Jeux de données échantillons servis par /api/data
 *
 * RÔLE :
 * Définit les quatre documents du tableau de bord (kpis, projects, clients,
 * service-areas) et l'interface commune pour les lire.
 *
 * FONCTIONNEMENT :
 * - DatasetStore trait = point de remplacement pour un vrai stockage
 * - StaticDatasets = implémentation échantillon, remplaçable via kernel.yaml
 * - DatasetKind = les quatre valeurs reconnues du paramètre `type`
 */

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("unknown data type: {0}")]
    UnknownKind(String),
    #[error("dataset unavailable: {0}")]
    Unavailable(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Kpis,
    Projects,
    Clients,
    ServiceAreas,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Kpis,
        DatasetKind::Projects,
        DatasetKind::Clients,
        DatasetKind::ServiceAreas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Kpis => "kpis",
            DatasetKind::Projects => "projects",
            DatasetKind::Clients => "clients",
            DatasetKind::ServiceAreas => "service-areas",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DatasetError::UnknownKind(s.to_string()))
    }
}

/// Indicateurs globaux, horodatés à la lecture
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSnapshot {
    #[serde(flatten)]
    pub figures: KpiFigures,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiFigures {
    pub revenue: u64,
    pub active_projects: u32,
    pub client_satisfaction: f64,
    pub efficiency: f64,
    pub monthly_growth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub client: String,
    pub status: String,
    pub progress: u8,
    pub budget: u64,
    pub spent: u64,
    pub area: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: String,
    pub name: String,
    pub tier: String,
    pub revenue: u64,
    pub projects: u32,
    pub satisfaction: u8,
    pub risk_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAreaRecord {
    pub area: String,
    pub revenue: u64,
    pub projects: u32,
    pub efficiency: u8,
    pub growth: f64,
}

/// Interface commune de lecture des jeux de données
pub trait DatasetStore: Send + Sync {
    fn kpis(&self) -> Result<KpiSnapshot, DatasetError>;
    fn projects(&self) -> Result<Vec<ProjectRecord>, DatasetError>;
    fn clients(&self) -> Result<Vec<ClientRecord>, DatasetError>;
    fn service_areas(&self) -> Result<Vec<ServiceAreaRecord>, DatasetError>;

    /// Document JSON tel que renvoyé par GET /api/data?type=...
    fn document(&self, kind: DatasetKind) -> Result<serde_json::Value, DatasetError> {
        let value = match kind {
            DatasetKind::Kpis => serde_json::to_value(self.kpis()?)?,
            DatasetKind::Projects => serde_json::to_value(self.projects()?)?,
            DatasetKind::Clients => serde_json::to_value(self.clients()?)?,
            DatasetKind::ServiceAreas => serde_json::to_value(self.service_areas()?)?,
        };
        Ok(value)
    }
}

/// Données échantillons en mémoire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticDatasets {
    pub kpis: KpiFigures,
    pub projects: Vec<ProjectRecord>,
    pub clients: Vec<ClientRecord>,
    pub service_areas: Vec<ServiceAreaRecord>,
}

impl DatasetStore for StaticDatasets {
    fn kpis(&self) -> Result<KpiSnapshot, DatasetError> {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| DatasetError::Unavailable(e.to_string()))?;
        Ok(KpiSnapshot { figures: self.kpis.clone(), timestamp })
    }

    fn projects(&self) -> Result<Vec<ProjectRecord>, DatasetError> {
        Ok(self.projects.clone())
    }

    fn clients(&self) -> Result<Vec<ClientRecord>, DatasetError> {
        Ok(self.clients.clone())
    }

    fn service_areas(&self) -> Result<Vec<ServiceAreaRecord>, DatasetError> {
        Ok(self.service_areas.clone())
    }
}

impl Default for StaticDatasets {
    fn default() -> Self {
        Self {
            kpis: KpiFigures {
                revenue: 2_850_000,
                active_projects: 24,
                client_satisfaction: 94.2,
                efficiency: 87.5,
                monthly_growth: 12.3,
            },
            projects: vec![
                ProjectRecord {
                    id: "P001".into(),
                    name: "ABB Electrical System Upgrade".into(),
                    client: "ABB".into(),
                    status: "In Progress".into(),
                    progress: 75,
                    budget: 450_000,
                    spent: 337_500,
                    area: "Electrical".into(),
                    start_date: "2024-01-15".into(),
                    end_date: "2024-03-30".into(),
                },
                ProjectRecord {
                    id: "P002".into(),
                    name: "Siemens Preventive Maintenance".into(),
                    client: "Siemens".into(),
                    status: "Completed".into(),
                    progress: 100,
                    budget: 280_000,
                    spent: 275_000,
                    area: "Maintenance".into(),
                    start_date: "2024-02-01".into(),
                    end_date: "2024-02-28".into(),
                },
            ],
            clients: vec![
                client("C001", "ABB", "Premium", 850_000, 8, 96, "Low"),
                client("C002", "Siemens", "Premium", 720_000, 6, 94, "Low"),
            ],
            service_areas: vec![
                area("Electrical", 980_000, 8, 92, 15.2),
                area("Automation", 750_000, 6, 88, 18.7),
                area("Maintenance", 620_000, 10, 85, 8.3),
            ],
        }
    }
}

fn client(
    id: &str,
    name: &str,
    tier: &str,
    revenue: u64,
    projects: u32,
    satisfaction: u8,
    risk: &str,
) -> ClientRecord {
    ClientRecord {
        id: id.into(),
        name: name.into(),
        tier: tier.into(),
        revenue,
        projects,
        satisfaction,
        risk_level: risk.into(),
    }
}

fn area(
    name: &str,
    revenue: u64,
    projects: u32,
    efficiency: u8,
    growth: f64,
) -> ServiceAreaRecord {
    ServiceAreaRecord { area: name.into(), revenue, projects, efficiency, growth }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("service-areas".parse::<DatasetKind>().unwrap(), DatasetKind::ServiceAreas);
        assert_eq!("kpis".parse::<DatasetKind>().unwrap(), DatasetKind::Kpis);
        assert!(matches!(
            "bogus".parse::<DatasetKind>(),
            Err(DatasetError::UnknownKind(k)) if k == "bogus"
        ));
        assert!("KPIS".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_kpi_document_shape() {
        let doc = StaticDatasets::default().document(DatasetKind::Kpis).unwrap();
        let fields = [
            "revenue",
            "activeProjects",
            "clientSatisfaction",
            "efficiency",
            "monthlyGrowth",
            "timestamp",
        ];
        for field in fields {
            assert!(doc.get(field).is_some(), "missing {field}");
        }
        let ts = doc["timestamp"].as_str().unwrap();
        assert!(OffsetDateTime::parse(ts, &Rfc3339).is_ok());
    }

    #[test]
    fn test_list_documents_are_arrays() {
        let store = StaticDatasets::default();
        let projects = store.document(DatasetKind::Projects).unwrap();
        assert_eq!(projects.as_array().map(Vec::len), Some(2));
        assert_eq!(projects[0]["startDate"], "2024-01-15");

        let clients = store.document(DatasetKind::Clients).unwrap();
        assert_eq!(clients[1]["riskLevel"], "Low");

        let areas = store.document(DatasetKind::ServiceAreas).unwrap();
        assert_eq!(areas.as_array().map(Vec::len), Some(3));
        assert_eq!(areas[1]["area"], "Automation");
    }
}
