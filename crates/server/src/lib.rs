//! HTTP surface for the scraping service: job submission, status polling,
//! health and metrics endpoints. Persistence, concurrency, and fetch
//! strategy all live behind the `Executor` handle this crate is handed.

pub mod api_types;
mod handlers;
mod routes;

use scrape_executor::Executor;

pub use routes::create_router;

#[derive(Clone)]
pub struct AppState {
    pub executor: Executor,
    pub default_max_pages: u32,
}

impl AppState {
    pub fn new(executor: Executor, default_max_pages: u32) -> Self {
        Self { executor, default_max_pages }
    }
}
