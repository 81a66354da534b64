/**
 * DSS KERNEL - Point d'entrée principal du serveur
 *
 * RÔLE : Orchestration des modules : config, registre des sources, datasets, HTTP.
 * Bootstrap du système complet avec gestion d'erreurs et logging.
 *
 * UTILITÉ : Source unique des données du tableau de bord et du panneau d'intégration.
 */

use anyhow::Context;
use dss_kernel::config::load_config;
use dss_kernel::{build_router, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dss_kernel=info")),
        )
        .init();

    let cfg = load_config().await;
    let app_state = AppState::from_config(&cfg).context("invalid source registry")?;

    let summary = app_state.registry.summary();
    info!(
        "[kernel] loaded {} sources ({} connected, {} disconnected)",
        summary.total, summary.connected, summary.disconnected
    );
    if app_state.api_key.is_some() {
        info!("[kernel] x-api-key required on every route except /health");
    }

    let app = build_router(app_state);

    let addr: SocketAddr = cfg
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", cfg.bind))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("[kernel] listening on http://{addr}");
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}
