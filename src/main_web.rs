use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;

use blender_chat::web::logger::setup_logging;
use blender_chat::web::{handle_request, load_at_startup, AppState, Cli, OnnxModelLoader, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(&cli)?;
    setup_logging(&config.log_level, config.log_dir.as_deref())?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    let loader = Arc::new(OnnxModelLoader::new(config.clone()));
    let state = AppState::new(config, loader);

    // Load before binding so the first request already sees the outcome.
    let startup_state = state.clone();
    tokio::task::spawn_blocking(move || load_at_startup(&startup_state))
        .await
        .context("model loading task panicked")?;

    let make_svc = make_service_fn({
        let state = state.clone();
        move |_conn| {
            let state = state.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| handle_request(req, state.clone())))
            }
        }
    });

    let server = Server::try_bind(&addr)
        .with_context(|| format!("failed to bind {addr}"))?
        .serve(make_svc);

    log::info!("BlenderBot Chat server starting on http://{addr}");
    log::info!("Available endpoints:");
    log::info!("  GET  /              - Chat page");
    log::info!("  GET  /static/*      - Static assets");
    log::info!("  POST /chatbot       - Chat with the model");
    log::info!("  GET  /health        - Health check");
    log::info!("  POST /model/reload  - Reload the model");

    server.await.context("server error")?;
    Ok(())
}
