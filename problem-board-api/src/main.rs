mod routes;

use problem_board_app::{AppContext, Config};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let app_context = AppContext::from_config(&config);

    let app = routes::router(app_context)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", config.addr);
    tracing::info!(
        "Integrity root: {}, baseline: {}",
        config.integrity_root.display(),
        config.baseline_path.display()
    );

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
