// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;

use quizmaster::config::Config;
use quizmaster::db;
use quizmaster::routes;
use quizmaster::services::generator::GeminiClient;
use quizmaster::state::AppState;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let pool = db::connect(&config.database_url).await?;
    tracing::info!("Database connected...");

    db::init(&pool, &config).await?;

    // Built once here and shared; nothing else constructs a generator.
    let generator = GeminiClient::from_config(&config)?;
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; quiz generation will fail");
    }

    let addr: SocketAddr = config.bind_addr.parse()?;

    let state = AppState {
        pool,
        config,
        generator: Arc::new(generator),
    };

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}
