use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Insert a new photo entry within a transaction.
pub async fn insert_photo_tx(
    tx: &mut Transaction<'_, Postgres>,
    photo_id: Uuid,
    job_id: Uuid,
    s3_key: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO job_photos (id, job_id, s3_key)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(photo_id)
    .bind(job_id)
    .bind(s3_key)
    .execute(&mut **tx)
    .await
    .context("insert job photo")?;

    Ok(())
}

/// Return all photo IDs and keys for a given job request.
pub async fn list_photos_by_job(
    db: &PgPool,
    job_id: Uuid,
) -> anyhow::Result<Vec<(Uuid, String)>> {
    let rows: Vec<(Uuid, String)> = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT id, s3_key
          FROM job_photos
         WHERE job_id = $1
         ORDER BY created_at ASC
        "#,
    )
    .bind(job_id)
    .fetch_all(db)
    .await
    .context("list photos by job")?;

    Ok(rows)
}
