use clap::Parser;
use linkdeck::app;
use linkdeck::config::{Cli, Config};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    if args.dev {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
    }
    tracing::info!("linkdeck.svc starting");

    let cfg = Config::resolve(args.config_path.as_deref()).unwrap_or_else(|e| {
        tracing::error!(error = %format!("{e:#}"), path = ?args.config_path, "failed to load config");
        std::process::exit(1);
    });

    let state = app::build_state(&cfg).await.unwrap_or_else(|e| {
        tracing::error!(error = %format!("{e:#}"), "failed to initialize service");
        std::process::exit(1);
    });
    let ttl_hours = state.tokens.ttl().num_hours();

    let router = app::router(state, &cfg.server, args.dev).unwrap_or_else(|e| {
        tracing::error!(error = %format!("{e:#}"), "failed to build router");
        std::process::exit(1);
    });

    let address = format!("0.0.0.0:{}", cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!(token_ttl_hours = ttl_hours, dev = args.dev, "linkdeck.svc running on {}", &address);
    if let Err(err) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server stopped unexpectedly");
        std::process::exit(1);
    }

    tracing::info!("linkdeck.svc going off, graceful shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    tracing::info!("ctrl+c signal received, preparing to shutdown");
}
