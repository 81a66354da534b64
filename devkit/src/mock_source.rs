/*!
Source externe simulée pour tests sans réseau réel

Démarre un petit serveur HTTP sur un port éphémère qui joue le rôle d'une
app analytique ou d'une API ERP : sonde `/health` configurable, routes JSON
paramétrables, et enregistrement de toutes les requêtes reçues.
*/

use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
struct CannedResponse {
    status: u16,
    content_type: &'static str,
    body: String,
}

struct MockState {
    health_status: u16,
    routes: HashMap<String, CannedResponse>,
    requests: Vec<RecordedRequest>,
}

type SharedMock = Arc<Mutex<MockState>>;

/// Serveur HTTP simulé ; arrêté quand la valeur est droppée
pub struct MockSource {
    addr: SocketAddr,
    state: SharedMock,
    handle: JoinHandle<()>,
}

impl MockSource {
    /// Démarre le serveur ; `/health` répond 200 par défaut
    pub async fn start() -> Result<Self> {
        let state: SharedMock = Arc::new(Mutex::new(MockState {
            health_status: 200,
            routes: HashMap::new(),
            requests: Vec::new(),
        }));

        let app = Router::new().fallback(handle_any).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("[mock] server stopped: {}", e);
            }
        });

        log::info!("[mock] external source listening on {}", addr);
        Ok(Self { addr, state, handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_health_status(&self, status: u16) {
        self.state.lock().unwrap().health_status = status;
    }

    /// Enregistre une réponse JSON pour un chemin
    pub fn respond_json(&self, path: &str, status: u16, body: Value) {
        self.insert(path, CannedResponse {
            status,
            content_type: "application/json",
            body: body.to_string(),
        });
    }

    /// Enregistre une réponse texte brut (pour simuler un corps non-JSON)
    pub fn respond_text(&self, path: &str, status: u16, body: &str) {
        self.insert(path, CannedResponse {
            status,
            content_type: "text/plain",
            body: body.to_string(),
        });
    }

    fn insert(&self, path: &str, response: CannedResponse) {
        self.state.lock().unwrap().routes.insert(path.to_string(), response);
    }

    /// Toutes les requêtes reçues, dans l'ordre
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Header Authorization de la dernière requête reçue sur `path`
    pub fn last_authorization(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .rev()
            .find(|r| r.path == path)
            .and_then(|r| r.authorization.clone())
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().requests.clear();
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_any(State(state): State<SharedMock>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let canned = {
        let mut st = state.lock().unwrap();
        st.requests.push(RecordedRequest {
            method: req.method().to_string(),
            path: path.clone(),
            authorization,
        });

        match st.routes.get(&path) {
            Some(r) => r.clone(),
            None if path == "/health" => CannedResponse {
                status: st.health_status,
                content_type: "text/plain",
                body: "ok".into(),
            },
            None => CannedResponse {
                status: 404,
                content_type: "application/json",
                body: r#"{"error":"not found"}"#.into(),
            },
        }
    };

    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, canned.content_type)], canned.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_and_routes() {
        let mock = MockSource::start().await.unwrap();
        let client = reqwest::Client::new();

        let resp = client.get(format!("{}/health", mock.base_url())).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        mock.set_health_status(500);
        let resp = client.get(format!("{}/health", mock.base_url())).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 500);

        mock.respond_json("/api/kpis", 200, serde_json::json!({"revenue": 1}));
        let body: Value = client
            .get(format!("{}/api/kpis", mock.base_url()))
            .bearer_auth("tok")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["revenue"], 1);

        assert_eq!(mock.hits("/health"), 2);
        assert_eq!(mock.last_authorization("/api/kpis").as_deref(), Some("Bearer tok"));
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let mock = MockSource::start().await.unwrap();
        let resp = reqwest::get(format!("{}/nope", mock.base_url())).await.unwrap();
        assert_eq!(resp.status().as_u16(), 404);
        mock.clear();
        assert!(mock.requests().is_empty());
    }
}
