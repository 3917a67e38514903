use axum::{routing::get, Router};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use signalpost::{
    cli::{self, Cli, Commands},
    config::Config,
    dispatcher::Dispatcher,
    websocket::{health_check, websocket_handler},
};

#[tokio::main]
async fn main() {
    // Default to INFO level if RUST_LOG is not set
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Check if running as probe client
    if let Some(Commands::Probe { url, room }) = cli.command {
        if let Err(e) = cli::run_probe(url, room).await {
            error!("Probe client error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Otherwise, run as relay server
    let config = Config::from_env();
    info!("Starting signalpost relay on port {}", config.port);

    let dispatcher = Dispatcher::new();

    // Browser clients are served from a different origin; CORS stays open.
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/socket", get(websocket_handler))
        .with_state(dispatcher)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!("signalpost listening on {}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
