use anyhow::Context;
use bytes::Bytes;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::repo;
use crate::state::AppState;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Push photo bytes to object storage and link the rows to the job inside the
/// caller's transaction, so a failed insert never leaves a half-linked job.
/// Already-uploaded objects are left behind on failure; keys are unique so
/// they are harmless orphans.
pub async fn upload_and_link_photos(
    st: &AppState,
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
    photos: Vec<UploadItem>,
) -> anyhow::Result<Vec<Uuid>> {
    anyhow::ensure!(!photos.is_empty(), "no photos provided");

    let mut ids = Vec::with_capacity(photos.len());
    for photo in photos {
        let id = Uuid::new_v4();
        let ext = ext_from_mime(&photo.content_type).unwrap_or("bin");
        let key = format!("jobs/{}/{}.{}", job_id, id, ext);
        st.storage
            .put_object(&key, photo.body, &photo.content_type)
            .await
            .with_context(|| format!("put_object {}", key))?;
        repo::insert_photo_tx(tx, id, job_id, &key).await?;
        ids.push(id);
    }

    Ok(ids)
}

pub async fn presign_many(
    st: &AppState,
    keys: Vec<String>,
    expires_seconds: u64,
) -> anyhow::Result<Vec<String>> {
    let mut out = Vec::with_capacity(keys.len());
    for k in keys {
        out.push(st.storage.presign_get(&k, expires_seconds).await?);
    }
    Ok(out)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::state::AppState;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(super::ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(super::ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(super::ext_from_mime("image/png"), Some("png"));
        assert_eq!(super::ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(super::ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(super::ext_from_mime("application/octet-stream"), None);
        assert_eq!(super::ext_from_mime("whatever/else"), None);
    }

    #[tokio::test]
    async fn test_presign_many() {
        let state = AppState::fake();

        let urls = super::presign_many(&state, vec!["a/b/c.jpg".into(), "x/y/z.png".into()], 1800)
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("a/b/c.jpg"));
        assert!(urls[1].contains("x/y/z.png"));
    }
}
