use actix_web::{web, App, HttpResponse, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fakturera::config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fakturera=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");

    tracing::info!("Starting Fakturera");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    // Apply pending schema migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let workers = config.server.workers;
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(db_pool.clone()))
            .route("/health", web::get().to(health_check))
    })
    .workers(workers)
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "fakturera"
    }))
}
