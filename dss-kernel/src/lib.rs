//! DSS kernel : API de données du tableau de bord + intégration des sources externes.

pub mod config;
pub mod datasets;
pub mod guide;
pub mod health;
pub mod http;
pub mod integration;
pub mod registry;
pub mod sources;

pub use http::{build_router, AppState};
