use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ai::build_provider;
use common::{logging, AppConfig, AppError};
use github::client::{ReqwestExecutor, RestGithubClient};
use github::token::AppAuth;
use server::routes::{build_router, AppState};
use worker::budget::BudgetStore;
use worker::{build_queue, BudgetGuard, LimiterRegistry, MemoryBudgetStore, MemoryDedup, Processor};

#[tokio::main]
async fn main() -> common::Result<()> {
    let config = AppConfig::load()?;
    logging::init_logging(&config.log_level);
    info!(env = %config.env, port = config.port, "starting ai review service");

    let http = Arc::new(ReqwestExecutor::new());
    let auth = Arc::new(AppAuth::new(
        config.github_app_id.clone(),
        config.github_app_installation_id.clone(),
        config.github_app_private_key_path.clone(),
        http.clone(),
    ));
    let forge = Arc::new(RestGithubClient::new(http, auth));

    let provider = build_provider(&config);
    let queue = build_queue(&config).await?;

    let budget_store: Option<Arc<dyn BudgetStore>> = config
        .budget_enabled
        .then(|| Arc::new(MemoryBudgetStore::new()) as Arc<dyn BudgetStore>);
    let budget = Arc::new(BudgetGuard::new(
        config.budget_enabled,
        config.budget_daily_usd,
        config.budget_per_pr_usd,
        budget_store,
    ));

    let processor = Arc::new(Processor::new(
        queue.clone(),
        forge.clone(),
        forge,
        provider,
        Arc::new(MemoryDedup::new()),
        Arc::new(LimiterRegistry::new(
            config.rate_limit_rps,
            config.rate_limit_burst,
        )),
        budget,
    ));

    let shutdown = CancellationToken::new();
    let worker_handle = processor.spawn(shutdown.clone());

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_shutdown.cancel();
        }
    });

    let state = Arc::new(AppState {
        webhook_secret: config.github_webhook_secret.clone(),
        queue,
    });
    let app = build_router(state);

    let addr: SocketAddr = config.bind_addr().parse().context("parsing bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::http)?;
    info!(%addr, "http server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await
        .map_err(AppError::http)?;

    shutdown.cancel();
    let _ = worker_handle.await;
    info!("shutdown complete");
    Ok(())
}
