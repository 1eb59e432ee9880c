use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use valet_dispatch::app_state::AppState;
use valet_dispatch::config::AppConfig;
use valet_dispatch::{db, routes};

fn describe_metrics() {
    metrics::describe_counter!(
        "job_transitions_total",
        "Committed job instance transitions, by transition"
    );
    metrics::describe_counter!(
        "job_conflicts_total",
        "Transitions rejected by a row version conflict, by transition"
    );
    metrics::describe_counter!(
        "unit_verifications_total",
        "Unit photo verifications, by outcome"
    );
    metrics::describe_counter!(
        "escalation_actions_total",
        "Actions taken by the escalation sweep, by action"
    );
    metrics::describe_histogram!(
        "escalation_sweep_seconds",
        "Wall time of one escalation sweep"
    );
    metrics::describe_counter!(
        "maintenance_instances_created_total",
        "Job instances created by seeding and daily maintenance"
    );
    metrics::describe_histogram!(
        "maintenance_run_seconds",
        "Wall time of one daily maintenance run"
    );
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing valet-dispatch server");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    describe_metrics();

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let state = AppState::from_config(&config, db_pool).expect("Failed to build application state");

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/jobs/open", get(routes::jobs::list_open))
        .route("/api/v1/jobs/mine", get(routes::jobs::list_mine))
        .route("/api/v1/jobs/{instance_id}/accept", post(routes::jobs::accept))
        .route("/api/v1/jobs/{instance_id}/start", post(routes::jobs::start))
        .route("/api/v1/jobs/{instance_id}/unaccept", post(routes::jobs::unaccept))
        .route("/api/v1/jobs/{instance_id}/cancel", post(routes::jobs::cancel))
        .route("/api/v1/jobs/{instance_id}/dump", post(routes::jobs::dump))
        .route(
            "/api/v1/jobs/{instance_id}/units/{unit_id}/photo",
            post(routes::jobs::upload_unit_photo),
        )
        .route("/api/v1/job-definitions", post(routes::definitions::create))
        .route(
            "/api/v1/job-definitions/{definition_id}",
            put(routes::definitions::update).delete(routes::definitions::delete),
        )
        .route(
            "/api/v1/job-definitions/{definition_id}/status",
            put(routes::definitions::change_status),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)); // 10 MB photos

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
