use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use veins_evi_bridge::application::run_bridge;
use veins_evi_bridge::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Config path: first argument, then VEINS_EVI_CONFIG, then ./config.toml if present
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VEINS_EVI_CONFIG").ok())
        .map(PathBuf::from)
        .or_else(|| {
            let default = PathBuf::from("config.toml");
            default.exists().then_some(default)
        });
    let config = Config::load(path.as_deref())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting veins-evi bridge on {}", config.evi_address());
    if let Some(path) = &path {
        info!("Configuration loaded from {}", path.display());
    }

    match run_bridge(&config).await {
        Ok(summary) => {
            info!("Bridge stopped: {}", serde_json::to_string(&summary)?);
            Ok(())
        }
        Err(err) => {
            error!("Bridge failed: {:#}", err);
            Err(err)
        }
    }
}
