//! COVID data tracker runtime
//!
//! Fetches the configured case/death/vaccination sources on a fixed
//! cycle, repairs and derives the series, writes CSV/README outputs,
//! and pushes them to the output checkout.
//!
//! Usage:
//!   cargo run --release --bin covidflow
//!
//! Environment variables: see `Config::from_env` (COVIDFLOW_*).

use covidflow::config::Config;
use dotenv::dotenv;
use log::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::from_env();

    info!("🚀 Starting covidflow");
    info!("   ├─ Cache dir: {}", config.cache_dir);
    info!("   ├─ Output dir: {}", config.output_dir);
    info!("   ├─ Cooldown: {}s", config.cooldown_secs);
    info!(
        "   ├─ Retries: {} × {}s",
        config.max_retries, config.retry_delay_secs
    );
    info!("   └─ Git publishing: {}", config.git_enabled);

    if let Err(e) = covidflow::run(config).await {
        error!("❌ Fatal: {}", e);
        std::process::exit(1);
    }
}
