// src/main.rs
use freight_packer::api;
use freight_packer::config::AppConfig;
use log::{error, info, warn};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    info!("🚀 Packing service starting...");
    if let Err(err) = api::start_api_server(app_config.api, app_config.engine).await {
        error!("❌ API server terminated with an error: {err}");
        std::process::exit(1);
    }
}
