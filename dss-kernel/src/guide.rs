//! Guide d'intégration de l'app analytique (notebook) avec le DSS.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationGuide {
    pub title: &'static str,
    pub setup_instructions: &'static str,
    pub sample_code: &'static str,
}

pub fn notebook_guide() -> IntegrationGuide {
    IntegrationGuide {
        title: "Notebook analytics app integration",
        setup_instructions: SETUP_INSTRUCTIONS,
        sample_code: SAMPLE_CODE,
    }
}

const SETUP_INSTRUCTIONS: &str = r#"# Notebook analytics app integration

## 1. Dependencies
pip install streamlit pandas plotly requests

## 2. Expose one JSON endpoint per dataset
- /api/kpis           revenue, project counts, satisfaction, timestamp
- /api/projects       list of { id, name, status, progress }
- /api/clients        list of { id, name, tier, revenue }
- /api/service-areas  list of { area, revenue, projects, efficiency, growth }

## 3. Expose a health endpoint
GET /health must answer 2xx when the app is up; the kernel uses it for
POST /api/sources/{id}/test.

## 4. Register the app
Add a `notebook-app` source to kernel.yaml with its deployed `url`
(and `apiKey` if the endpoints require a bearer token).
"#;

const SAMPLE_CODE: &str = r#"import requests
from datetime import datetime

def push_to_dss(kind, payload):
    body = {"type": kind, "payload": payload}
    response = requests.post("http://localhost:8080/api/data", json=body)
    return response.json()

push_to_dss("kpis", {"revenue": 2450000, "timestamp": datetime.now().isoformat()})
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guide_mentions_health_and_push_endpoint() {
        let guide = notebook_guide();
        assert!(guide.setup_instructions.contains("/health"));
        assert!(guide.sample_code.contains("/api/data"));
    }
}
