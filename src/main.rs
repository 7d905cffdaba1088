//! Cluster Estimator - Main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cluster_estimator::{
    CustomerClusterEstimator, EstimatorConfig, api, metrics, models::FeatureRow, store,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "cluster-estimator")]
#[command(about = "Customer segmentation model service", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "json", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the prediction API (default)
    Serve {
        /// Override API port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Predict clusters for rows read from a JSON file (`[[f64, ...], ...]`)
    Predict {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Upload a trained model artifact to the configured location
    Upload {
        path: PathBuf,

        /// Delete the local file after a successful upload
        #[arg(long)]
        remove: bool,
    },
    /// Check whether an object exists in the model bucket
    Exists {
        /// Object key (defaults to the configured model key)
        key: Option<String>,
    },
    /// List objects in the model bucket
    List { prefix: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .json()
                .init();
        }
    }

    let mut config = EstimatorConfig::load(cli.config)?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.api_port = port;
            }
            config.validate()?;
            serve(config).await
        }
        Command::Predict { input } => {
            config.validate()?;
            let content = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read input file: {:?}", input))?;
            let rows: Vec<FeatureRow> =
                serde_json::from_str(&content).context("Input must be a JSON array of rows")?;

            let estimator = CustomerClusterEstimator::new(&config);
            let labels = estimator.predict(&rows).await?;
            println!("{}", serde_json::to_string(&labels)?);
            Ok(())
        }
        Command::Upload { path, remove } => {
            config.validate()?;
            let estimator = CustomerClusterEstimator::new(&config);
            estimator.save_model(&path, remove).await?;
            println!("Uploaded {} to {}", path.display(), estimator.location());
            Ok(())
        }
        Command::Exists { key } => {
            config.validate()?;
            let estimator = CustomerClusterEstimator::new(&config);
            let key = key.unwrap_or_else(|| config.model.key.clone());
            println!("{}", estimator.is_model_present(&key).await);
            Ok(())
        }
        Command::List { prefix } => {
            config.validate()?;
            // Listing is a diagnostic: a missing store is an error here
            let store = store::connect(&config.store).context("Artifact store unavailable")?;
            let keys = store::with_timeout(
                config.store.timeout(),
                "list",
                store.list(&config.model.bucket, prefix.as_deref()),
            )
            .await?;
            if keys.is_empty() {
                println!("NO_OBJECTS");
            }
            for key in keys {
                println!("{}", key);
            }
            Ok(())
        }
    }
}

async fn serve(config: EstimatorConfig) -> Result<()> {
    tracing::info!("Starting Cluster Estimator");
    tracing::info!(
        api_port = config.api_port,
        bucket = %config.model.bucket,
        key = %config.model.key,
        backend = ?config.store.backend,
        "Configuration loaded"
    );

    // Setup metrics
    let prometheus_handle = metrics::setup_metrics()?;

    let estimator = Arc::new(CustomerClusterEstimator::new(&config));
    if !estimator.is_connected() {
        tracing::warn!("Serving without an artifact store; predictions will be demo results");
    }

    tokio::fs::create_dir_all(&config.model.staging_dir)
        .await
        .with_context(|| format!("Failed to create staging dir {:?}", config.model.staging_dir))?;
    tracing::info!(staging_dir = ?config.model.staging_dir, "Accepting model uploads from staging dir");

    let app = api::create_router(api::AppState {
        estimator,
        prometheus_handle,
        staging_dir: config.model.staging_dir.clone(),
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind API server")?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
