mod config;
mod error;
mod routes;

use config::AppConfig;
use routes::{app_router, AppState};
use sharelist_core::remote::SupabaseClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sharelist_api=info".parse()?)
                .add_directive("sharelist_core=info".parse()?),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting sharelist-api with config: {:?}", config);

    let backend = SupabaseClient::from_config(&config.client)?;
    let router = app_router(AppState::new(backend));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("sharelist-api listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
