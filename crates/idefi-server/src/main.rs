//! idefi Server Binary
//!
//! Standalone server for the idefi agent API.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use idefi_core::{IdefiConfig, Secrets, Services};
use idefi_server::{serve, AppState};

const DEFAULT_FILTER: &str = "idefi_server=info,idefi_core=info,tower_http=info";

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = IdefiConfig::from_env()?;
    let services = Services::from_config(&config, &Secrets::from_env())?;
    let state = Arc::new(AppState::new(config, services)?);
    serve(state).await
}
