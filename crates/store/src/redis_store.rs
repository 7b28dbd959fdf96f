//! Durable job store on Redis: a `ConnectionManager`, a namespaced key
//! prefix, and `EXPIRE`-based TTL.

use async_trait::async_trait;
use redis::AsyncCommands;
use scrape_core::{Job, JobStatus};
use uuid::Uuid;

use crate::{JobStore, StoreError};

const KEY_PREFIX: &str = "scrape:job:";
const ALL_JOBS_KEY: &str = "scrape:jobs:all";
const JOB_TTL_SECS: i64 = 86_400;

#[derive(Clone)]
pub struct RedisJobStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisJobStore {
    pub async fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }

    fn job_key(id: Uuid) -> String {
        format!("{KEY_PREFIX}{id}")
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        self.update_job(job).await
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(Self::job_key(id))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        let json = serde_json::to_string(job).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();

        redis::pipe()
            .atomic()
            .set_ex(Self::job_key(job.id), json, JOB_TTL_SECS as u64)
            .ignore()
            .sadd(ALL_JOBS_KEY, job.id.to_string())
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn list_jobs(&self) -> Result<Vec<Uuid>, StoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .smembers(ALL_JOBS_KEY)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(ids.into_iter().filter_map(|s| Uuid::parse_str(&s).ok()).collect())
    }

    async fn get_jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let mut out = Vec::new();
        for id in self.list_jobs().await? {
            // Ids whose record has expired are silently skipped, per the
            // durable store's documented contract.
            if let Some(job) = self.get_job(id).await? {
                if job.status == status {
                    out.push(job);
                }
            }
        }
        Ok(out)
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .del(Self::job_key(id))
            .ignore()
            .srem(ALL_JOBS_KEY, id.to_string())
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
