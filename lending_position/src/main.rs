use std::sync::Arc;

use anyhow::{Context, Result};
use lending_position::{
    api_server::{self, ApiState},
    blockchain_manager::BlockchainManager,
    config::LocalConfig,
    lending_session::LendingSession,
    utils,
};
use tracing::{error, info};

/// Main entry point for the lending position service
///
/// This function performs the following steps:
/// 1. Initializes the pre-run environment
/// 2. Connects to the lending pool with the configured signer
/// 3. Opens the lending session and loads the position
/// 4. Serves the session over HTTP until ctrl-c
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_pre_run()?;

    info!("Starting the lending position service");

    let local_config = LocalConfig::load_from_env()?;
    info!("Loaded configuration: {:?}", local_config);

    let (provider, signer_address) = BlockchainManager::get_provider(&local_config)?;
    let pool_client = Arc::new(BlockchainManager::get_pool_client(
        provider,
        signer_address,
        &local_config,
    ));
    info!("Connected wallet: {}", signer_address);

    let mut session = LendingSession::from_config(pool_client, &local_config);
    session.open().await;

    let shutdown = session.cancellation();
    let state = ApiState::new(session);
    let session = state.session.clone();

    let server = tokio::spawn(api_server::serve(
        state,
        local_config.port,
        shutdown.clone(),
    ));

    tokio::select! {
        result = server => {
            match result {
                Ok(Ok(())) => info!("Server stopped"),
                Ok(Err(e)) => {
                    let error_message = e.chain().map(|e| e.to_string()).collect::<Vec<_>>().join(" -> ");
                    error!("Server failed with error: {}", error_message);
                    return Err(anyhow::anyhow!("Server failed: {}", error_message));
                }
                Err(e) => {
                    error!("Server task panicked: {}", e);
                    return Err(anyhow::anyhow!("Server task panicked: {}", e));
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received ctrl-c, shutting down");
        }
    }

    // Cancel first so a pending refresh pass releases the session
    shutdown.cancel();
    session.lock().await.close();

    Ok(())
}

/// Initializes the pre-run environment
///
/// This function performs the following steps:
/// 1. Loads environment variables from the `.env` file, if there is one
/// 2. Sets up the logger
///
/// # Returns
/// * `Result<()>` - Success or error if any step fails
fn init_pre_run() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    utils::logger::setup_logger().context("Failed to setup logger")?;

    if let Err(e) = dotenv {
        info!("No .env file loaded ({}), using the process environment", e);
    }

    Ok(())
}
