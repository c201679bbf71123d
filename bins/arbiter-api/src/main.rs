mod handlers;
mod routes;

use anyhow::Context;
use arbiter_common::{JudgeConfig, LanguageRegistry};
use arbiter_engine::{Executor, JudgeClient};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub executor: Executor,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Log registry aliases the judge does not offer. Never fatal.
async fn verify_languages(client: &JudgeClient, registry: &LanguageRegistry) {
    match client.list_languages().await {
        Ok(available) => {
            let missing = registry.verify_against(&available);
            if missing.is_empty() {
                info!(languages = available.len(), "Judge supports every registered language");
            }
            for entry in missing {
                warn!(
                    language = %entry.name,
                    target = entry.target.id(),
                    "Registered language is not offered by the judge"
                );
            }
        }
        Err(e) => warn!(error = %e, "Could not list judge languages, skipping verification"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Arbiter API booting...");

    let config = JudgeConfig::from_env().context("Invalid judge configuration")?;
    let registry = LanguageRegistry::builtin().context("Language table is inconsistent")?;
    let client = JudgeClient::new(config.clone()).context("Failed to build judge client")?;

    info!(
        judge_url = %config.base_url,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        max_poll_attempts = config.max_poll_attempts,
        max_retries = config.max_retries,
        "Judge client configured"
    );

    verify_languages(&client, &registry).await;

    let state = Arc::new(AppState {
        executor: Executor::new(Arc::new(client), registry, config.poll_settings()),
    });

    let app = routes::routes().with_state(state);

    let addr = std::env::var("ARBITER_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
