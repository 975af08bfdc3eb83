//! Process start-up: environment, logging, store and mailer selection, the
//! HTTP router and the background jobs.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    app_state::AppState,
    config::{Config, StoreBackend},
    db, jobs,
    notify::{LogMailer, Mailer, SmtpMailer},
    routes,
    store::{MemoryStore, PgStore, Store},
    swagger,
};

/// Loads `.env` when present. Variables already set in the process win.
pub fn init_env() {
    let _ = dotenvy::dotenv();
}

/// Log filter from `RUST_LOG`, `info` by default.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn build_store(config: &Config) -> Result<Arc<dyn Store>> {
    match &config.store {
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            tracing::info!("Running migrations...");
            let applied = db::run_migrations_blocking(db::MIGRATIONS, database_url).await?;
            tracing::info!("Run {} new migrations successfully", applied);

            let store = PgStore::connect(database_url, *max_connections)
                .await
                .context("Failed to create the database pool")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn build_mailer(config: &Config) -> Result<Arc<dyn Mailer>> {
    match &config.smtp {
        Some(smtp) => {
            let mailer = SmtpMailer::new(smtp).context("Failed to configure SMTP")?;
            tracing::info!(host = %smtp.host, port = smtp.port, "Mail goes through SMTP");
            Ok(Arc::new(mailer))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, mail is only logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// API routes, Swagger UI and request tracing.
pub fn build_router(state: AppState) -> Router {
    let (api, mut openapi) = routes::routes_with_openapi().split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("PharmaConnect API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();

    Router::new()
        .merge(api)
        .merge(swagger::create_swagger_ui(openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the low-stock job on its fixed delay and the expiry job on its cron.
pub fn spawn_jobs(state: &AppState) -> Vec<JoinHandle<()>> {
    let low_stock = state.low_stock_job.clone();
    let delay = low_stock.interval();
    let low_stock_handle = jobs::spawn_fixed_delay("low-stock", delay, move || {
        let job = low_stock.clone();
        async move {
            if let Err(err) = job.run().await {
                tracing::error!(error = %err, "Low-stock job failed");
            }
        }
    });

    let expiry = state.expiry_job.clone();
    let schedule = expiry.schedule().clone();
    let expiry_handle = jobs::spawn_cron("expiry", schedule, move |fired_at| {
        let job = expiry.clone();
        async move {
            tracing::debug!(%fired_at, "Expiry job fired");
            if let Err(err) = job.run().await {
                tracing::error!(error = %err, "Expiry job failed");
            }
        }
    });

    vec![low_stock_handle, expiry_handle]
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Wires everything together and serves until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    tracing::info!("Bootstrapping...");
    let store = build_store(&config).await?;
    let mailer = build_mailer(&config)?;
    let addr = config.socket_addr();

    let state = AppState::new(store, mailer, config);
    let job_handles = spawn_jobs(&state);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("PharmaConnect listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    for handle in job_handles {
        handle.abort();
    }
    Ok(())
}
