use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use perisentez_core::{CoreConfig, config::model_path_from_env_value};

/// Main entry point for the Perisentez application
///
/// Resolves configuration once, loads the prediction model when one is configured and serves
/// the REST API.
///
/// # Environment Variables
/// - `PERISENTEZ_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PERISENTEZ_DATA_DIR`: Directory for credentials and patient records (default: "perisentez_data")
/// - `PERISENTEZ_MODEL_PATH`: Classifier JSON artifact (optional; predictions disabled without it)
///
/// # Errors
/// Returns an error if:
/// - the logging configuration cannot be initialised,
/// - the data directory cannot be created or the model file is missing or malformed,
/// - the server address cannot be bound, or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("perisentez=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("PERISENTEZ_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("PERISENTEZ_DATA_DIR")
        .unwrap_or_else(|_| perisentez_core::DEFAULT_DATA_DIR.into());
    let model_path = model_path_from_env_value(std::env::var("PERISENTEZ_MODEL_PATH").ok());

    let cfg = Arc::new(CoreConfig::new(PathBuf::from(data_dir), model_path)?);
    tracing::info!("++ Data directory: {}", cfg.data_dir().display());

    let state = AppState::new(cfg)?;
    api_rest::serve(&rest_addr, state).await
}
