//! Server and informational command handlers.

use sandcode_core::Config;
use sandcode_server::{create_router, AppState};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

/// Run the HTTP server until interrupted.
pub async fn run_server(config: &Config, address: Option<SocketAddr>) -> anyhow::Result<()> {
    let address = address
        .map(|address| address.to_string())
        .unwrap_or_else(|| config.server_address());

    let state = AppState::from_config(config).await?;
    let sandbox = state.sandbox.clone();
    let app = create_router(state, &config.cors_origins());

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    sandbox.lock().await.stop_dev().await;
    Ok(())
}

/// List model labels.
pub fn list_models(config: &Config) {
    let catalog = config.catalog();
    println!("Available models:");
    println!();
    for (label, entry) in catalog.entries() {
        let marker = if label == catalog.default_label() {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {:<12} {}/{}{}",
            label, entry.provider, entry.model, marker
        );
    }
}

/// Show configuration.
pub async fn show_config(cwd: &Path, extra: Option<&Path>) -> anyhow::Result<()> {
    let (_, mut sources) = Config::load(Some(cwd)).await?;
    if let Some(path) = extra {
        sources.push(path.to_path_buf());
    }
    let config = crate::load_config(cwd, extra).await?;

    println!("Configuration sources:");
    if sources.is_empty() {
        println!("  (none)");
    } else {
        for source in &sources {
            println!("  {}", source.display());
        }
    }
    println!();

    println!("Current configuration:");
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
