use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lagoon::{
    api,
    config::Settings,
    payments::GatewayClient,
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lagoon=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting Lagoon server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // Payment gateway
    let gateway = GatewayClient::new(&settings.gateway)?;
    if gateway.is_configured() {
        tracing::info!("Payment gateway configured at {}", settings.gateway.base_url);
    } else {
        tracing::warn!("Payment gateway secret key not set; refunds and sync will fail");
    }

    if settings.gateway.webhook_secret.is_none() {
        tracing::warn!("Webhook secret not set; incoming webhooks are not signature checked");
    }
    if settings.admin.api_token.is_none() {
        tracing::warn!("Admin API token not set; admin routes are disabled");
    }

    // Create service context
    let service_context = Arc::new(ServiceContext::sqlite(
        db_pool,
        Arc::new(gateway),
        settings.refund_policy.clone(),
        settings.gateway.webhook_secret.clone(),
    ));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
