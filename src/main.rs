use std::sync::Arc;
use std::time::Instant;

use actix_web::{dev::Service as _, web, App, HttpServer};
use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod db;
mod domain;
mod event_sourcing;
mod metrics;
mod storage;
mod utils;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::storage::Storage;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,food_delivery=debug")),
        )
        .init();

    tracing::info!("🚀 Starting food delivery service");

    // === 1. Configuration ===
    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    // === 2. Storage ===
    let storage = match config.database.url.as_deref() {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let pool = db::connect(&config.database, url).await?;
            db::migrate(&pool).await?;
            Storage::postgres(pool)
        }
        None => {
            tracing::warn!("No database url configured, using in-memory storage; data is lost on restart");
            Storage::in_memory()
        }
    };

    // === 3. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let state = AppState::new(storage, &config.auth, metrics.clone());

    // === 4. Platform administrator ===
    match (&config.bootstrap.admin_email, &config.bootstrap.admin_password) {
        (Some(email), Some(password)) => {
            if state.identity.ensure_platform_admin(email, password).await? {
                tracing::info!(email = %email, "✅ Platform administrator created");
            }
        }
        _ => tracing::debug!("No bootstrap administrator configured"),
    }

    // === 5. HTTP server ===
    let (host, port) = config.bind_address();
    tracing::info!(host = %host, port, "🌐 HTTP server listening");

    let state = web::Data::new(state);
    let metrics_data = web::Data::new(metrics.clone());
    let mut server = HttpServer::new(move || {
        let metrics = metrics.clone();
        App::new()
            .app_data(state.clone())
            .app_data(metrics_data.clone())
            .wrap_fn(move |req, srv| {
                let started = Instant::now();
                let method = req.method().to_string();
                let path = req.path().to_string();
                let metrics = metrics.clone();
                let fut = srv.call(req);
                async move {
                    let res = fut.await?;
                    let status = res.status().as_u16();
                    let elapsed = started.elapsed();
                    metrics.record_http_request(&method, status, elapsed.as_secs_f64());
                    tracing::debug!(
                        method = %method,
                        path = %path,
                        status,
                        latency_ms = elapsed.as_millis() as u64,
                        "Request handled"
                    );
                    Ok(res)
                }
            })
            .configure(metrics::configure)
            .configure(api::configure)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {host}:{port}"))?;

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.run().await?;
    tracing::info!("👋 Server stopped");
    Ok(())
}
