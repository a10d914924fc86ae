use std::sync::Arc;

use seo_data_mcp::{
    build_app,
    config::Config,
    dataforseo_client::DataForSeoClient,
    domain::{fields::FieldFilter, tools::ToolCatalog},
    logging,
    mcp::factory::McpServerFactory,
    AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();
    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "starting MCP server"
    );

    let config = Config::from_env()?;
    let api = Arc::new(DataForSeoClient::new(config.api_base_url.clone())?);
    let fields = match config.field_config_path.as_deref() {
        Some(path) => {
            let fields = FieldFilter::load(path)?;
            info!(
                path = %path.display(),
                tools = fields.tools().count(),
                "field configuration loaded"
            );
            fields
        }
        None => FieldFilter::default(),
    };
    let catalog = ToolCatalog::new(&config.enabled_modules).with_fields(fields);
    info!(
        tools = catalog.len(),
        modules = %config
            .enabled_modules
            .iter()
            .map(|module| module.as_str())
            .collect::<Vec<_>>()
            .join(","),
        "tool catalog loaded"
    );

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(
        config.default_credentials.clone(),
        Arc::new(McpServerFactory::new(api, catalog)),
    );
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        default_credentials = config.default_credentials.is_some(),
        "MCP stateless streamable HTTP server listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
