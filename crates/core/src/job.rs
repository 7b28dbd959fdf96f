use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// What a job was asked to do: either an explicit list of URLs, or a single
/// seed to follow "next page" links from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JobRequest {
    Batch { urls: Vec<String> },
    Pagination { seed_url: String, max_pages: u32 },
}

impl JobRequest {
    pub fn requested_len(&self) -> usize {
        match self {
            JobRequest::Batch { urls } => urls.len(),
            JobRequest::Pagination { max_pages, .. } => *max_pages as usize,
        }
    }
}

/// The outcome of fetching a single URL within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub url: String,
    pub title: Option<String>,
    /// HTTP status code; 0 if the transport never produced a response.
    pub status_code: u16,
    pub size: usize,
    pub error: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub next_url: Option<String>,
}

impl ScrapeResult {
    pub fn success(url: String, status_code: u16, size: usize, title: String, next_url: Option<String>) -> Self {
        Self {
            url,
            title: Some(title),
            status_code,
            size,
            error: None,
            scraped_at: Utc::now(),
            next_url,
        }
    }

    pub fn failure(url: String, error: String) -> Self {
        Self {
            url,
            title: None,
            status_code: 0,
            size: 0,
            error: Some(error),
            scraped_at: Utc::now(),
            next_url: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub request: JobRequest,
    pub results: Vec<ScrapeResult>,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(request: JobRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            request,
            results: Vec::new(),
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at.get_or_insert_with(Utc::now);
    }

    pub fn push_result(&mut self, result: ScrapeResult) {
        self.results.push(result);
        let total = self.request.requested_len().max(1);
        let done = self.results.len().min(total);
        self.progress = ((done * 100) / total) as u8;
    }

    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.progress = 100;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_pending_with_no_started_at() {
        let job = Job::new(JobRequest::Batch {
            urls: vec!["http://a".into()],
        });
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn mark_running_sets_started_at_once() {
        let mut job = Job::new(JobRequest::Batch { urls: vec![] });
        job.mark_running();
        let first = job.started_at;
        job.mark_running();
        assert_eq!(first, job.started_at);
    }

    #[test]
    fn progress_reaches_100_on_completion() {
        let mut job = Job::new(JobRequest::Batch {
            urls: vec!["http://a".into(), "http://b".into()],
        });
        job.mark_running();
        job.push_result(ScrapeResult::success("http://a".into(), 200, 10, "A".into(), None));
        assert_eq!(job.progress, 50);
        job.push_result(ScrapeResult::success("http://b".into(), 200, 10, "B".into(), None));
        job.mark_completed();
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
        assert!(job.completed_at.unwrap() >= job.started_at.unwrap());
    }
}
