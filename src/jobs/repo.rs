use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ai::Diagnosis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Assigned,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "assigned" => Some(Self::Assigned),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A homeowner's repair request.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRequest {
    pub id: Uuid,
    pub homeowner_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub status: JobStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Stored AI triage result for a job, at most one per job. `ai_raw` keeps the
/// provider payload verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobDiagnosis {
    pub job_id: Uuid,
    pub summary: Option<String>,
    pub likely_causes: Option<serde_json::Value>,
    pub severity: Option<String>,
    pub recommended_trade: Option<String>,
    pub ai_raw: Option<serde_json::Value>,
    pub created_at: OffsetDateTime,
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    homeowner_id: Uuid,
    title: &str,
    description: &str,
    category: Option<&str>,
) -> anyhow::Result<JobRequest> {
    let job = sqlx::query_as::<_, JobRequest>(
        r#"
        INSERT INTO job_requests (id, homeowner_id, title, description, category)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, homeowner_id, title, description, category, status, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(homeowner_id)
    .bind(title)
    .bind(description)
    .bind(category)
    .fetch_one(&mut **tx)
    .await?;
    Ok(job)
}

pub async fn list_by_owner(
    db: &PgPool,
    homeowner_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<JobRequest>> {
    let rows = sqlx::query_as::<_, JobRequest>(
        r#"
        SELECT id, homeowner_id, title, description, category, status, created_at, updated_at
        FROM job_requests
        WHERE homeowner_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(homeowner_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Open requests visible to service providers.
pub async fn list_open(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<JobRequest>> {
    let rows = sqlx::query_as::<_, JobRequest>(
        r#"
        SELECT id, homeowner_id, title, description, category, status, created_at, updated_at
        FROM job_requests
        WHERE status = 'open'
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get_owned(
    db: &PgPool,
    homeowner_id: Uuid,
    job_id: Uuid,
) -> anyhow::Result<Option<JobRequest>> {
    let job = sqlx::query_as::<_, JobRequest>(
        r#"
        SELECT id, homeowner_id, title, description, category, status, created_at, updated_at
        FROM job_requests
        WHERE id = $1 AND homeowner_id = $2
        "#,
    )
    .bind(job_id)
    .bind(homeowner_id)
    .fetch_optional(db)
    .await?;
    Ok(job)
}

/// Partial update; absent fields keep their stored value. Scoped to the owner.
pub async fn update_owned(
    db: &PgPool,
    homeowner_id: Uuid,
    job_id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    status: Option<JobStatus>,
) -> anyhow::Result<Option<JobRequest>> {
    let job = sqlx::query_as::<_, JobRequest>(
        r#"
        UPDATE job_requests
        SET title       = COALESCE($3, title),
            description = COALESCE($4, description),
            status      = COALESCE($5, status),
            updated_at  = now()
        WHERE id = $1 AND homeowner_id = $2
        RETURNING id, homeowner_id, title, description, category, status, created_at, updated_at
        "#,
    )
    .bind(job_id)
    .bind(homeowner_id)
    .bind(title)
    .bind(description)
    .bind(status)
    .fetch_optional(db)
    .await?;
    Ok(job)
}

pub async fn get_diagnosis(db: &PgPool, job_id: Uuid) -> anyhow::Result<Option<JobDiagnosis>> {
    let diagnosis = sqlx::query_as::<_, JobDiagnosis>(
        r#"
        SELECT job_id, summary, likely_causes, severity, recommended_trade, ai_raw, created_at
        FROM job_diagnoses
        WHERE job_id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(db)
    .await?;
    Ok(diagnosis)
}

/// Re-running the diagnosis replaces the stored row.
pub async fn upsert_diagnosis(
    db: &PgPool,
    job_id: Uuid,
    diagnosis: &Diagnosis,
    raw: &serde_json::Value,
) -> anyhow::Result<JobDiagnosis> {
    let row = sqlx::query_as::<_, JobDiagnosis>(
        r#"
        INSERT INTO job_diagnoses (job_id, summary, likely_causes, severity, recommended_trade, ai_raw)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (job_id) DO UPDATE SET
            summary           = EXCLUDED.summary,
            likely_causes     = EXCLUDED.likely_causes,
            severity          = EXCLUDED.severity,
            recommended_trade = EXCLUDED.recommended_trade,
            ai_raw            = EXCLUDED.ai_raw,
            created_at        = now()
        RETURNING job_id, summary, likely_causes, severity, recommended_trade, ai_raw, created_at
        "#,
    )
    .bind(job_id)
    .bind(&diagnosis.summary)
    .bind(serde_json::json!(diagnosis.likely_causes))
    .bind(&diagnosis.severity)
    .bind(&diagnosis.recommended_trade)
    .bind(raw)
    .fetch_one(db)
    .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(JobStatus::parse("open"), Some(JobStatus::Open));
        assert_eq!(JobStatus::parse("assigned"), Some(JobStatus::Assigned));
        assert_eq!(JobStatus::parse("completed"), Some(JobStatus::Completed));
        assert_eq!(JobStatus::parse("cancelled"), Some(JobStatus::Cancelled));
        assert_eq!(JobStatus::parse("done"), None);
        assert_eq!(JobStatus::parse("Open"), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Open).unwrap(),
            "\"open\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
