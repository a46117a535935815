use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::jobs::repo::{JobDiagnosis, JobRequest, JobStatus};

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct JobListItem {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub status: JobStatus,
    pub created_at: OffsetDateTime,
}

impl From<JobRequest> for JobListItem {
    fn from(job: JobRequest) -> Self {
        Self {
            id: job.id,
            title: job.title,
            category: job.category,
            status: job.status,
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobDetails {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub status: JobStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub diagnosis: Option<JobDiagnosis>,
    pub photo_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreatedJobResponse {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    pub photo_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Untyped so an unknown status answers with a validation error.
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PhotoUrlsResponse {
    pub urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset, 0);

        let p: Pagination = serde_json::from_str(r#"{"limit":5,"offset":40}"#).unwrap();
        assert_eq!(p.limit, 5);
        assert_eq!(p.offset, 40);
    }
}
