/**
 * SERVICE D'INTÉGRATION - Lecture, sync et test des sources externes
 *
 * RÔLE :
 * Opérations sans état sur une DataSource : lire un endpoint distant,
 * produire les synchronisations simulées, tester l'accessibilité.
 *
 * FONCTIONNEMENT :
 * - Une seule tentative par appel : pas de retry, pas de timeout, pas de backoff
 * - fetch : erreurs typées (Remote = statut non-2xx, Transport = envoi/JSON)
 * - test_connection : Reachability avec la raison de l'échec
 * - Aucun résultat n'est réécrit dans le registre (status / lastSync)
 */

use crate::sources::{ApiConfig, DataSource, NotebookConfig, SourceConfig, SourceKind};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("remote {url} answered with status {status}")]
    Remote { url: String, status: u16 },
    #[error("transport error on {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("source kind {0} cannot be fetched over HTTP")]
    UnsupportedKind(SourceKind),
    #[error("invalid endpoint {endpoint:?} for base {base}")]
    InvalidEndpoint { base: String, endpoint: String },
}

/// Adresse de base + jeton optionnel pour un appel sortant
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub base_address: String,
    pub bearer_token: Option<String>,
}

impl From<&NotebookConfig> for ConnectionConfig {
    fn from(cfg: &NotebookConfig) -> Self {
        Self { base_address: cfg.url.clone(), bearer_token: cfg.api_key.clone() }
    }
}

impl From<&ApiConfig> for ConnectionConfig {
    fn from(cfg: &ApiConfig) -> Self {
        Self { base_address: cfg.base_url.clone(), bearer_token: None }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCounts {
    pub active: u32,
    pub completed: u32,
    pub pending: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCounts {
    pub total: u32,
    pub active: u32,
    pub new: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    pub revenue: u64,
    pub projects: ProjectCounts,
    pub clients: ClientCounts,
    pub satisfaction: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub progress: u8,
    pub client: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub projects: Vec<ProjectSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub revenue: u64,
    pub satisfaction: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    pub clients: Vec<ClientSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// Résultat de l'action "sync" du panneau d'intégration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub source_id: String,
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SummaryMetrics>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnreachableReason {
    /// La sonde a répondu, mais hors 2xx
    Status(u16),
    /// Envoi impossible (DNS, refus de connexion, TLS...)
    Transport(String),
    UnsupportedKind(SourceKind),
}

impl fmt::Display for UnreachableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnreachableReason::Status(code) => write!(f, "health check returned status {code}"),
            UnreachableReason::Transport(msg) => write!(f, "transport error: {msg}"),
            UnreachableReason::UnsupportedKind(kind) => {
                write!(f, "no reachability check for kind {kind}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable(UnreachableReason),
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable)
    }

    pub fn reason(&self) -> Option<&UnreachableReason> {
        match self {
            Reachability::Reachable => None,
            Reachability::Unreachable(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntegrationService {
    client: reqwest::Client,
}

impl IntegrationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// GET `base_address + endpoint_path`, corps décodé en JSON.
    /// Le jeton ne part jamais vers un autre hôte que celui de la base.
    pub async fn fetch_remote_data(
        &self,
        endpoint_path: &str,
        conn: &ConnectionConfig,
    ) -> Result<serde_json::Value, IntegrationError> {
        let target = resolve_endpoint(&conn.base_address, endpoint_path)?;
        let url = target.to_string();
        debug!("[integration] fetching {url}");

        let mut req = self.client.get(target).header(CONTENT_TYPE, "application/json");
        if let Some(token) = &conn.bearer_token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = req.send().await.map_err(|source| {
            error!("[integration] fetch {url} failed: {source}");
            IntegrationError::Transport { url: url.clone(), source }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("[integration] fetch {url} rejected with status {status}");
            return Err(IntegrationError::Remote { url, status: status.as_u16() });
        }

        response.json::<serde_json::Value>().await.map_err(|source| {
            error!("[integration] invalid JSON body from {url}: {source}");
            IntegrationError::Transport { url, source }
        })
    }

    /// Lecture depuis une source HTTP du registre (notebook ou API)
    pub async fn fetch_from_source(
        &self,
        source: &DataSource,
        endpoint_path: &str,
    ) -> Result<serde_json::Value, IntegrationError> {
        let conn = match &source.config {
            SourceConfig::NotebookApp(cfg) => ConnectionConfig::from(cfg),
            SourceConfig::HttpApi(cfg) => ConnectionConfig::from(cfg),
            other => return Err(IntegrationError::UnsupportedKind(other.kind())),
        };
        self.fetch_remote_data(endpoint_path, &conn).await
    }

    pub fn sync_summary_metrics(&self) -> SummaryMetrics {
        SummaryMetrics {
            revenue: 2_450_000,
            projects: ProjectCounts { active: 24, completed: 156, pending: 8 },
            clients: ClientCounts { total: 89, active: 67, new: 12 },
            satisfaction: 94.2,
            last_updated: OffsetDateTime::now_utc(),
        }
    }

    pub fn sync_project_snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            projects: vec![ProjectSummary {
                id: "P001".into(),
                name: "ABB Plant Automation".into(),
                status: "In Progress".into(),
                progress: 75,
                client: "ABB".into(),
            }],
            last_updated: OffsetDateTime::now_utc(),
        }
    }

    pub fn sync_client_snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            clients: vec![ClientSummary {
                id: "C001".into(),
                name: "ABB".into(),
                status: "Active".into(),
                revenue: 1_250_000,
                satisfaction: 96,
            }],
            last_updated: OffsetDateTime::now_utc(),
        }
    }

    /// Seules les apps notebook déclenchent un sync (KPIs) ; le registre n'est pas modifié
    pub fn sync_source(&self, source: &DataSource) -> SyncOutcome {
        info!("[integration] syncing data from source {}", source.id);
        let data = match source.kind() {
            SourceKind::NotebookApp => Some(self.sync_summary_metrics()),
            _ => None,
        };
        SyncOutcome { source_id: source.id.clone(), synced: data.is_some(), data }
    }

    pub async fn test_connection(&self, source: &DataSource) -> Reachability {
        info!("[integration] testing connection for source {}", source.id);
        let result = match &source.config {
            SourceConfig::NotebookApp(cfg) => self.check_health(&cfg.url).await,
            SourceConfig::HttpApi(cfg) => self.check_health(&cfg.base_url).await,
            // pas de vraie tentative de connexion côté base
            SourceConfig::Database(_) => Reachability::Reachable,
            other => Reachability::Unreachable(UnreachableReason::UnsupportedKind(other.kind())),
        };
        info!("[integration] connection test for {}: {:?}", source.id, result);
        result
    }

    async fn check_health(&self, base: &str) -> Reachability {
        let url = join_url(base, "/health");
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Reachability::Reachable,
            Ok(resp) => {
                Reachability::Unreachable(UnreachableReason::Status(resp.status().as_u16()))
            }
            Err(e) => {
                warn!("[integration] connection test failed for {url}: {e}");
                Reachability::Unreachable(UnreachableReason::Transport(e.to_string()))
            }
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Chemin absolu uniquement ; l'URL finale doit garder schéma, hôte, port et
/// userinfo de la base (sinon `@autre-hote/...` détournerait la requête)
fn resolve_endpoint(base: &str, endpoint_path: &str) -> Result<Url, IntegrationError> {
    let invalid = || IntegrationError::InvalidEndpoint {
        base: base.to_string(),
        endpoint: endpoint_path.to_string(),
    };
    if !endpoint_path.starts_with('/') {
        return Err(invalid());
    }

    let base_url = Url::parse(base).map_err(|_| invalid())?;
    let target = Url::parse(&join_url(base, endpoint_path)).map_err(|_| invalid())?;

    let same_origin = target.scheme() == base_url.scheme()
        && target.host_str() == base_url.host_str()
        && target.port_or_known_default() == base_url.port_or_known_default()
        && target.username() == base_url.username()
        && target.password() == base_url.password();
    if !same_origin {
        return Err(invalid());
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;
    use crate::sources::{FileConfig, SourceStatus};
    use dss_devkit::MockSource;
    use serde_json::json;
    use time::macros::datetime;

    fn notebook_source(url: String, api_key: Option<&str>) -> DataSource {
        DataSource {
            id: "nb".into(),
            name: "Notebook".into(),
            status: SourceStatus::Connected,
            last_sync: datetime!(2024-01-15 10:30:00 UTC),
            config: SourceConfig::NotebookApp(NotebookConfig {
                url,
                api_key: api_key.map(str::to_string),
                endpoints: Default::default(),
            }),
        }
    }

    fn api_source(base_url: String) -> DataSource {
        DataSource {
            id: "erp".into(),
            name: "ERP".into(),
            status: SourceStatus::Disconnected,
            last_sync: datetime!(2024-01-14 15:20:00 UTC),
            config: SourceConfig::HttpApi(ApiConfig { base_url, version: "v1".into() }),
        }
    }

    /// Adresse sur laquelle rien n'écoute
    async fn dead_address() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a/", "/health"), "http://a/health");
        assert_eq!(join_url("http://a/api", "/health"), "http://a/api/health");
    }

    #[test]
    fn test_resolve_endpoint_keeps_base_origin() {
        let url = resolve_endpoint("http://127.0.0.1:8000/api", "/v1/kpis").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/v1/kpis");

        for endpoint in ["@127.0.0.1:9999/steal", "x", "", ".evil.example/x"] {
            assert!(
                matches!(
                    resolve_endpoint("http://127.0.0.1:8000", endpoint),
                    Err(IntegrationError::InvalidEndpoint { .. })
                ),
                "endpoint {endpoint:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_token_never_leaves_base_host() {
        let legit = MockSource::start().await.unwrap();
        let foreign = MockSource::start().await.unwrap();
        foreign.respond_json("/steal", 200, json!({"owned": true}));

        let conn = ConnectionConfig {
            base_address: legit.base_url(),
            bearer_token: Some("nb-secret".into()),
        };
        let endpoint = format!("@{}/steal", foreign.base_url().trim_start_matches("http://"));
        let res = IntegrationService::new().fetch_remote_data(&endpoint, &conn).await;

        assert!(matches!(res, Err(IntegrationError::InvalidEndpoint { .. })));
        assert!(foreign.requests().is_empty());
        assert!(legit.requests().is_empty());
    }

    #[tokio::test]
    async fn test_database_is_always_reachable() {
        let reg = SourceRegistry::sample();
        let db = reg.get("postgres-main").unwrap();
        assert_eq!(IntegrationService::new().test_connection(db).await, Reachability::Reachable);
    }

    #[tokio::test]
    async fn test_file_kind_is_unsupported() {
        let src = DataSource {
            id: "f".into(),
            name: "File".into(),
            status: SourceStatus::Connected,
            last_sync: datetime!(2024-01-01 00:00:00 UTC),
            config: SourceConfig::File(FileConfig { path: "/tmp/x.csv".into() }),
        };
        let res = IntegrationService::new().test_connection(&src).await;
        let expected = UnreachableReason::UnsupportedKind(SourceKind::File);
        assert_eq!(res, Reachability::Unreachable(expected));
        assert!(!res.is_reachable());
    }

    #[tokio::test]
    async fn test_health_check_success_and_failure() {
        let healthy = MockSource::start().await.unwrap();
        let service = IntegrationService::new();
        let notebook = notebook_source(healthy.base_url(), None);
        assert!(service.test_connection(&notebook).await.is_reachable());
        assert!(service.test_connection(&api_source(healthy.base_url())).await.is_reachable());
        assert_eq!(healthy.hits("/health"), 2);

        let failing = MockSource::start().await.unwrap();
        failing.set_health_status(503);
        let res = service.test_connection(&api_source(failing.base_url())).await;
        assert_eq!(res, Reachability::Unreachable(UnreachableReason::Status(503)));
    }

    #[tokio::test]
    async fn test_health_check_transport_error() {
        let res = IntegrationService::new()
            .test_connection(&notebook_source(dead_address().await, None))
            .await;
        assert!(matches!(res, Reachability::Unreachable(UnreachableReason::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_errors_are_distinguishable() {
        let service = IntegrationService::new();
        let mock = MockSource::start().await.unwrap();
        mock.respond_json("/api/kpis", 500, json!({"error": "boom"}));

        let conn = ConnectionConfig { base_address: mock.base_url(), bearer_token: None };
        match service.fetch_remote_data("/api/kpis", &conn).await {
            Err(IntegrationError::Remote { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected remote error, got {other:?}"),
        }

        let dead = ConnectionConfig { base_address: dead_address().await, bearer_token: None };
        assert!(matches!(
            service.fetch_remote_data("/api/kpis", &dead).await,
            Err(IntegrationError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_non_json_body_is_transport_error() {
        let mock = MockSource::start().await.unwrap();
        mock.respond_text("/api/projects", 200, "<html>not json</html>");
        let conn = ConnectionConfig { base_address: mock.base_url(), bearer_token: None };
        assert!(matches!(
            IntegrationService::new().fetch_remote_data("/api/projects", &conn).await,
            Err(IntegrationError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn test_bearer_header_only_when_configured() {
        let mock = MockSource::start().await.unwrap();
        mock.respond_json("/api/clients", 200, json!([{"id": "C001"}]));
        let service = IntegrationService::new();

        let body = service
            .fetch_from_source(&notebook_source(mock.base_url(), Some("s3cret")), "/api/clients")
            .await
            .unwrap();
        assert_eq!(body[0]["id"], "C001");
        assert_eq!(mock.last_authorization("/api/clients").as_deref(), Some("Bearer s3cret"));

        service
            .fetch_from_source(&notebook_source(mock.base_url(), None), "/api/clients")
            .await
            .unwrap();
        assert_eq!(mock.last_authorization("/api/clients"), None);
    }

    #[tokio::test]
    async fn test_fetch_from_database_is_unsupported() {
        let reg = SourceRegistry::sample();
        let db = reg.get("postgres-main").unwrap();
        assert!(matches!(
            IntegrationService::new().fetch_from_source(db, "/x").await,
            Err(IntegrationError::UnsupportedKind(SourceKind::Database))
        ));
    }

    #[test]
    fn test_canned_syncs() {
        let service = IntegrationService::new();
        let metrics = service.sync_summary_metrics();
        assert_eq!(metrics.revenue, 2_450_000);
        assert_eq!(metrics.projects.completed, 156);
        assert_eq!(metrics.clients.new, 12);

        let projects = service.sync_project_snapshot();
        assert_eq!(projects.projects.len(), 1);
        assert_eq!(projects.projects[0].client, "ABB");

        let clients = service.sync_client_snapshot();
        assert_eq!(clients.clients[0].id, "C001");
        assert_eq!(clients.clients[0].revenue, 1_250_000);

        let json = serde_json::to_value(&metrics).unwrap();
        assert!(json.get("lastUpdated").is_some());
    }

    #[test]
    fn test_sync_source_only_for_notebook() {
        let service = IntegrationService::new();
        let reg = SourceRegistry::sample();

        let nb = service.sync_source(reg.get("streamlit-main").unwrap());
        assert!(nb.synced);
        assert!(nb.data.is_some());

        let erp = service.sync_source(reg.get("erp-api").unwrap());
        assert!(!erp.synced);
        assert!(erp.data.is_none());
    }
}
