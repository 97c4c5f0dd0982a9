//! Main entry point for the fencekv server.

use std::sync::Arc;

use fencekv_server::{
    model::{common::AppState, config::Configuration},
    startup,
};
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::load()?;
    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    let storage_type = configuration.storage_type()?;
    info!("Storage type: {}", storage_type);
    let store = startup::create_storage(&configuration).await?;

    let app_state = Arc::new(AppState::new(store));

    let address = configuration.server_address();
    let port = configuration.server_port();
    info!("Starting fencekv server on {}:{}", address, port);

    startup::main_server(app_state, address, port)?.await?;

    info!("fencekv server shutdown complete");
    Ok(())
}
