/*!
Test Harness pour le kernel DSS

Facilite l'écriture de tests end-to-end avec:
- Service d'un `Router` axum sur un port éphémère
- Requêtes GET/POST (JSON ou corps brut)
- Assertions sur les champs JSON des réponses
*/

use anyhow::Result;
use axum::Router;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Réponse capturée : statut + corps (JSON si parsable)
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: u16,
    pub text: String,
    pub json: Value,
}

impl TestResponse {
    /// Assert qu'un champ existe (chemin pointé, ex: "summary.total")
    pub fn assert_field_exists(&self, field_path: &str) -> Result<&Value> {
        match get_nested_field(&self.json, field_path) {
            Some(v) => {
                log::info!("✅ Field '{}' exists", field_path);
                Ok(v)
            }
            None => anyhow::bail!("Field '{}' not found in response: {}", field_path, self.text),
        }
    }

    /// Assert qu'un champ a une valeur spécifique
    pub fn assert_field_equals(&self, field_path: &str, expected: &Value) -> Result<()> {
        let actual = self.assert_field_exists(field_path)?;
        if actual != expected {
            anyhow::bail!(
                "Field '{}' mismatch: expected {:?}, got {:?}",
                field_path,
                expected,
                actual
            );
        }
        Ok(())
    }
}

/// Harness de test : sert un router et l'interroge en HTTP
pub struct TestHarness {
    addr: SocketAddr,
    client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestHarness {
    pub async fn serve(app: Router) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("[harness] server stopped: {}", e);
            }
        });

        Ok(Self { addr, client: reqwest::Client::new(), handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        let resp = self.client.get(self.url(path)).send().await?;
        capture(resp).await
    }

    pub async fn get_with_key(&self, path: &str, api_key: &str) -> Result<TestResponse> {
        let resp = self.client.get(self.url(path)).header("x-api-key", api_key).send().await?;
        capture(resp).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<TestResponse> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        capture(resp).await
    }

    /// POST d'un corps brut, éventuellement invalide
    pub async fn post_raw(&self, path: &str, body: &str) -> Result<TestResponse> {
        let resp = self
            .client
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await?;
        capture(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn capture(resp: reqwest::Response) -> Result<TestResponse> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let json = serde_json::from_str(&text).unwrap_or(Value::Null);
    log::info!("📨 {} {}", status, text);
    Ok(TestResponse { status, text, json })
}

pub fn get_nested_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use serde_json::json;

    #[test]
    fn test_nested_field_lookup() {
        let v = json!({"a": {"b": [ {"c": 1} ]}});
        assert_eq!(get_nested_field(&v, "a.b.0.c"), Some(&json!(1)));
        assert!(get_nested_field(&v, "a.x").is_none());
        assert!(get_nested_field(&v, "a.b.7").is_none());
    }

    #[tokio::test]
    async fn test_harness_basic_functionality() {
        let app = Router::new().route("/ping", get(|| async { axum::Json(json!({"pong": true})) }));
        let harness = TestHarness::serve(app).await.unwrap();

        let resp = harness.get("/ping").await.unwrap();
        assert_eq!(resp.status, 200);
        resp.assert_field_equals("pong", &json!(true)).unwrap();
        assert!(resp.assert_field_exists("missing").is_err());

        let resp = harness.get("/nope").await.unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.json, Value::Null);
    }
}
