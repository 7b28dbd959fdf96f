//! Job store adapter. One trait, two implementations: an in-memory fallback
//! and a durable Redis-backed store, following the rate-limit backend
//! pattern (`RateLimitBackend` / in-memory + Redis implementations).

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis_store;

use async_trait::async_trait;
use scrape_core::{Job, JobStatus};
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryStore;
#[cfg(feature = "redis-backend")]
pub use redis_store::RedisJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
    #[error("failed to (de)serialize job record: {0}")]
    Serialization(String),
}

/// Abstract interface over durable job persistence. Reads may observe stale
/// but never torn records; `update_job` is a full-record replace.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save_job(&self, job: &Job) -> Result<(), StoreError>;
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;
    async fn update_job(&self, job: &Job) -> Result<(), StoreError>;
    async fn list_jobs(&self) -> Result<Vec<Uuid>, StoreError>;
    async fn get_jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError>;
    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError>;
}
