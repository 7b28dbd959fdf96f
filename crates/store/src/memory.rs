use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use scrape_core::{Job, JobStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{JobStore, StoreError};

/// Fallback store selected when no durable address is configured. Lost on
/// restart, as documented in the job store contract.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<Uuid>, StoreError> {
        Ok(self.jobs.read().await.keys().copied().collect())
    }

    async fn get_jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect())
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError> {
        self.jobs.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrape_core::JobRequest;

    #[tokio::test]
    async fn save_then_get_returns_equal_record() {
        let store = InMemoryStore::new();
        let job = Job::new(JobRequest::Batch {
            urls: vec!["http://a".into()],
        });
        store.save_job(&job).await.unwrap();
        let fetched = store.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.status, job.status);
    }

    #[tokio::test]
    async fn update_is_last_writer_wins() {
        let store = InMemoryStore::new();
        let mut job = Job::new(JobRequest::Batch { urls: vec![] });
        store.save_job(&job).await.unwrap();

        job.mark_running();
        store.update_job(&job).await.unwrap();
        job.mark_completed();
        store.update_job(&job).await.unwrap();

        let fetched = store.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn get_jobs_by_status_filters() {
        let store = InMemoryStore::new();
        let mut running = Job::new(JobRequest::Batch { urls: vec![] });
        running.mark_running();
        let pending = Job::new(JobRequest::Batch { urls: vec![] });
        store.save_job(&running).await.unwrap();
        store.save_job(&pending).await.unwrap();

        let running_jobs = store.get_jobs_by_status(JobStatus::Running).await.unwrap();
        assert_eq!(running_jobs.len(), 1);
        assert_eq!(running_jobs[0].id, running.id);
    }

    #[tokio::test]
    async fn delete_removes_the_job() {
        let store = InMemoryStore::new();
        let job = Job::new(JobRequest::Batch { urls: vec![] });
        store.save_job(&job).await.unwrap();
        store.delete_job(job.id).await.unwrap();
        assert!(store.get_job(job.id).await.unwrap().is_none());
    }
}
