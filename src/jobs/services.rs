use tracing::{error, info};
use uuid::Uuid;

use crate::ai::DiagnosisInput;
use crate::error::ApiError;
use crate::jobs::repo::{self, JobDiagnosis, JobRequest};
use crate::media::services::{upload_and_link_photos, UploadItem};
use crate::state::AppState;

pub struct NewJob {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
}

/// Create the job row and its photo rows in one transaction; the job id is
/// generated up front so the S3 keys can reference it.
pub async fn create_job_with_photos(
    state: &AppState,
    homeowner_id: Uuid,
    new: NewJob,
    photos: Vec<UploadItem>,
) -> Result<(JobRequest, Vec<Uuid>), ApiError> {
    let job_id = Uuid::new_v4();

    let mut tx = state.db.begin().await?;
    let job = repo::insert_tx(
        &mut tx,
        job_id,
        homeowner_id,
        &new.title,
        &new.description,
        new.category.as_deref(),
    )
    .await?;

    let photo_ids = if photos.is_empty() {
        Vec::new()
    } else {
        upload_and_link_photos(state, &mut tx, job_id, photos).await?
    };
    tx.commit().await?;

    info!(job_id = %job.id, homeowner_id = %homeowner_id, photos = photo_ids.len(), "job request created");
    Ok((job, photo_ids))
}

/// Run the AI triage for an owned job and persist the result.
pub async fn diagnose(
    state: &AppState,
    homeowner_id: Uuid,
    job_id: Uuid,
) -> Result<JobDiagnosis, ApiError> {
    let job = repo::get_owned(&state.db, homeowner_id, job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;

    let ai = state
        .ai
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("AI diagnosis is not configured".into()))?;

    let input = DiagnosisInput {
        title: job.title.clone(),
        description: job.description.clone(),
        category: job.category.clone(),
    };
    let outcome = ai.diagnose(&input).await.map_err(|e| {
        error!(error = %e, job_id = %job.id, "diagnosis call failed");
        ApiError::Internal(e)
    })?;

    let stored = repo::upsert_diagnosis(&state.db, job.id, &outcome.diagnosis, &outcome.raw).await?;

    info!(job_id = %job.id, severity = ?stored.severity, "diagnosis stored");
    Ok(stored)
}
