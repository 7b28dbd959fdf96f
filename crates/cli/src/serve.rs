use std::sync::Arc;

use scrape_core::{Config, MetricsRegistry};
use scrape_executor::Executor;
use scrape_fetch::FetchStrategy;
use scrape_server::AppState;
use scrape_store::JobStore;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr.clone();
    let default_max_pages = config.max_pages;

    let strategy: Arc<dyn FetchStrategy> = build_strategy(&config)?;
    let store: Arc<dyn JobStore> = build_store(&config).await?;
    let metrics = Arc::new(MetricsRegistry::new(config.metrics_enabled));

    let executor = Executor::new(config, strategy, store, metrics);
    let app = scrape_server::create_router(AppState::new(executor, default_max_pages));

    tracing::info!(%bind_addr, "starting scrape-svc");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_strategy(config: &Config) -> anyhow::Result<Arc<dyn FetchStrategy>> {
    if config.use_headless {
        tracing::info!("using headless browser fetch strategy");
        Ok(Arc::new(scrape_fetch::HeadlessStrategy::new(
            config.browser_url.clone(),
            config.request_timeout,
        )))
    } else {
        tracing::info!("using direct HTTP fetch strategy");
        Ok(Arc::new(scrape_fetch::DirectHttpStrategy::new(
            &config.user_agent,
            config.request_timeout,
        )?))
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn JobStore>> {
    match &config.store_addr {
        Some(addr) => {
            tracing::info!("using Redis-backed job store");
            let store = scrape_store::RedisJobStore::new(addr).await?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("using in-memory job store");
            Ok(Arc::new(scrape_store::InMemoryStore::new()))
        }
    }
}
