// reorg telemetry read API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use reorg_telemetry::config::AppConfig;
use reorg_telemetry::{db, errors, routes};

/// OpenAPI document for the read API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "reorg telemetry API",
        version = "0.1.0",
        description = "Read-only access to the documents written by the ingestion jobs: \
            indoor sensor metrics, regional weather and ranked weekend surf sessions.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Dashboard", description = "Recently ingested documents"),
    ),
    paths(
        routes::health::health_check,
        routes::dashboard::get_dashboard,
        routes::dashboard::get_collection,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::dashboard::DashboardResponse,
            routes::dashboard::CollectionResponse,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    reorg_telemetry::init_tracing();

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config.database_url).await?;

    // Read-only API
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/dashboard", get(routes::dashboard::get_dashboard))
        .route(
            "/api/v1/collections/:name",
            get(routes::dashboard::get_collection),
        )
        .with_state(pool)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
