use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

use trellis_config::ConfigLoader;
use trellis_core::{BufferedResponse, SessionRegistry};
use trellis_web::{
    cli::{Cli, Command},
    demo::demo_app,
    start_server, AppState, PageRequest,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = format!(
        "trellis={},trellis_web={},trellis_core={},tower_http={}",
        log_level, log_level, log_level, log_level
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(env_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ConfigLoader::load(cli.config.as_deref()).await?;
    let registry = Arc::new(SessionRegistry::new());

    match cli.command.unwrap_or_default() {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.validate()?;

            info!("Starting trellis");
            let app = Arc::new(demo_app(&config, Arc::clone(&registry)));
            start_server(&config, AppState::new(app, registry)).await?;
        }
        Command::Render { url, locale } => {
            let app = demo_app(&config, registry);
            let request = PageRequest {
                url,
                locale: locale.unwrap_or_else(|| config.default_locale.clone()),
                ..PageRequest::default()
            };
            let response = BufferedResponse::new();
            let outcome = app.render_http(request, response.clone());
            let state = response.snapshot();
            info!(status = state.status, complete = outcome.is_complete(), "Rendered page");
            if let Some(location) = state.location {
                println!("Redirect ({}) to {}", state.status, location);
            } else {
                println!("{}", state.body);
            }
        }
    }

    Ok(())
}
