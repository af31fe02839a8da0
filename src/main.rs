pub mod config;
pub mod content_store;
pub mod extract;
pub mod fetch;
pub mod publish;
pub mod retry;
pub mod scheduler;
pub mod series;
pub mod sources;

use {
    config::Config,
    content_store::ContentStore,
    fetch::{Fetcher, HttpSource},
    publish::FilePublisher,
    retry::RetryPolicy,
    scheduler::Scheduler,
    std::path::Path,
};

/// Wire up the pipeline from config and run it until a fatal error.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let policy = RetryPolicy::new(config.max_retries, config.retry_delay_secs);

    let store = ContentStore::new(Path::new(&config.cache_dir));
    let source = HttpSource::new(config.http_timeout_secs)?;
    let fetcher = Fetcher::new(source, store, policy);

    let publisher = FilePublisher::new(&config.output_dir, config.git_enabled, policy);

    let registry = sources::registry();
    log::info!("📊 Tracking {} sources:", registry.len());
    for source in &registry {
        log::info!("   ├─ {}: {}", source.name, source.url);
    }

    let scheduler = Scheduler::new(fetcher, publisher, registry, config.cooldown_secs);
    scheduler.run().await
}
