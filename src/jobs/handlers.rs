use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::auth::repo::UserRole;
use crate::error::ApiError;
use crate::jobs::dto::{
    CreatedJobResponse, JobDetails, JobListItem, Pagination, PhotoUrlsResponse, UpdateJobRequest,
};
use crate::jobs::repo::{self, JobStatus};
use crate::jobs::services::{self, NewJob};
use crate::media::{repo as media_repo, services::UploadItem};
use crate::state::AppState;

const PHOTO_URL_TTL_SECS: u64 = 600;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/:id", get(get_job).patch(update_job))
        .route("/jobs/:id/photos", get(list_photo_urls))
        .route("/jobs/:id/diagnosis", post(diagnose_job))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /jobs (multipart)
/// Text fields: title, description, category (optional); photo files under
/// files[].
#[instrument(skip(state, user, mp))]
async fn create_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<CreatedJobResponse>), ApiError> {
    if user.role != UserRole::Homeowner {
        return Err(ApiError::Forbidden(
            "Only homeowners can create job requests".into(),
        ));
    }

    let mut title = None;
    let mut description = None;
    let mut category = None;
    let mut photos: Vec<UploadItem> = Vec::new();

    while let Ok(Some(field)) = mp.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => title = Some(field.text().await.map_err(bad_multipart)?),
            Some("description") => description = Some(field.text().await.map_err(bad_multipart)?),
            Some("category") => category = Some(field.text().await.map_err(bad_multipart)?),
            Some("files") | Some("files[]") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field.bytes().await.map_err(bad_multipart)?;
                photos.push(UploadItem {
                    body: data,
                    content_type,
                });
            }
            _ => {}
        }
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("title is required".into()))?;
    let description = description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("description is required".into()))?;
    let category = category.filter(|c| !c.trim().is_empty());

    let (job, photo_ids) = services::create_job_with_photos(
        &state,
        user.id,
        NewJob {
            title,
            description,
            category,
        },
        photos,
    )
    .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/jobs/{}", job.id)
            .parse()
            .expect("job path is a valid header value"),
    );

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedJobResponse {
            id: job.id,
            created_at: job.created_at,
            photo_ids,
        }),
    ))
}

/// Homeowners see their own requests; providers browse open ones.
#[instrument(skip(state, user))]
async fn list_jobs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<JobListItem>>, ApiError> {
    let jobs = match user.role {
        UserRole::Homeowner => repo::list_by_owner(&state.db, user.id, p.limit, p.offset).await?,
        UserRole::ServiceProvider => repo::list_open(&state.db, p.limit, p.offset).await?,
    };
    Ok(Json(jobs.into_iter().map(JobListItem::from).collect()))
}

#[instrument(skip(state, user))]
async fn get_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDetails>, ApiError> {
    let job = repo::get_owned(&state.db, user.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;

    let diagnosis = repo::get_diagnosis(&state.db, job.id).await?;
    let photo_ids = media_repo::list_photos_by_job(&state.db, job.id)
        .await?
        .into_iter()
        .map(|(id, _)| id)
        .collect();

    Ok(Json(JobDetails {
        id: job.id,
        title: job.title,
        description: job.description,
        category: job.category,
        status: job.status,
        created_at: job.created_at,
        updated_at: job.updated_at,
        diagnosis,
        photo_ids,
    }))
}

#[instrument(skip(state, user, payload))]
async fn update_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobRequest>,
) -> Result<Json<JobDetails>, ApiError> {
    let status = payload
        .status
        .as_deref()
        .map(|s| {
            JobStatus::parse(s).ok_or_else(|| ApiError::Validation(format!("Unknown status: {s}")))
        })
        .transpose()?;

    let job = repo::update_owned(
        &state.db,
        user.id,
        id,
        payload.title.as_deref(),
        payload.description.as_deref(),
        status,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;

    let diagnosis = repo::get_diagnosis(&state.db, job.id).await?;
    let photo_ids = media_repo::list_photos_by_job(&state.db, job.id)
        .await?
        .into_iter()
        .map(|(id, _)| id)
        .collect();

    Ok(Json(JobDetails {
        id: job.id,
        title: job.title,
        description: job.description,
        category: job.category,
        status: job.status,
        created_at: job.created_at,
        updated_at: job.updated_at,
        diagnosis,
        photo_ids,
    }))
}

/// Presigned GET URLs for every photo on the job, oldest first.
#[instrument(skip(state, user))]
async fn list_photo_urls(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PhotoUrlsResponse>, ApiError> {
    let job = repo::get_owned(&state.db, user.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;

    let keys = media_repo::list_photos_by_job(&state.db, job.id)
        .await?
        .into_iter()
        .map(|(_, key)| key)
        .collect();
    let urls = crate::media::services::presign_many(&state, keys, PHOTO_URL_TTL_SECS).await?;

    Ok(Json(PhotoUrlsResponse { urls }))
}

#[instrument(skip(state, user))]
async fn diagnose_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::jobs::repo::JobDiagnosis>, ApiError> {
    let diagnosis = services::diagnose(&state, user.id, id).await?;
    Ok(Json(diagnosis))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("invalid multipart payload: {e}"))
}
