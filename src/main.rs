use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use social_graph_service::config::Config;
use social_graph_service::repository::PostgresGraphStore;

async fn ready(store: web::Data<Arc<PostgresGraphStore>>) -> impl Responder {
    match store.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "ready" })),
        Err(e) => HttpResponse::ServiceUnavailable().body(format!("error: {}", e)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting social-graph-service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: env={}, http_port={}",
        config.app.env, config.app.http_port
    );

    // Initialize database pool with prepared statement caching disabled for PgBouncer compatibility
    let connect_options = PgConnectOptions::from_str(&config.database.url)
        .context("Failed to parse DATABASE_URL")?
        .statement_cache_capacity(0);

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_with(connect_options)
        .await
        .context("Failed to connect to database")?;

    // Verify database connection
    sqlx::query("SELECT 1")
        .execute(&pg_pool)
        .await
        .context("Failed to verify database connection")?;
    info!("Database pool created and verified");

    // Run database migrations
    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let store = Arc::new(PostgresGraphStore::new(pg_pool));
    info!("Relationship store initialized");

    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);
    info!("HTTP health checks: http://{}", http_addr);

    let store_data = web::Data::new(store);
    HttpServer::new(move || {
        App::new()
            .app_data(store_data.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/ready", web::get().to(ready))
    })
    .bind(&http_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    info!("social-graph-service shutting down");
    Ok(())
}
