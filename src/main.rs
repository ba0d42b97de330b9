use anyhow::{Context, Result};
use std::{fs, path::Path, sync::Arc};
use swift_fs::{
    backends::local::LocalStore,
    client::ObjectClient,
    config::AppConfig,
    handlers,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup (stdout carries command output) ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config + subcommand ---
    let (cfg, command) = AppConfig::from_env_and_args()?;
    tracing::debug!("Running {:?} with config: {:?}", command, cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)
            .with_context(|| format!("creating storage directory {}", cfg.storage_dir))?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // Create the database's parent directory if needed
    let db_path = cfg
        .database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() && !db_path.starts_with(":memory:") {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // --- Initialize the store ---
    let store = LocalStore::connect(&cfg.database_url, cfg.storage_dir.clone())
        .await
        .with_context(|| format!("opening store at {}", cfg.database_url))?;
    let client: Arc<dyn ObjectClient> = Arc::new(store);

    // --- Run the command ---
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    handlers::run(command, client, cfg.fs, &mut out).await
}
