use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Stores an ad image and returns its object key.
pub async fn upload_ad_image(st: &AppState, ad_id: i64, image: UploadItem) -> anyhow::Result<String> {
    anyhow::ensure!(!image.body.is_empty(), "empty image");

    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("ads/{}/{}.{}", ad_id, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Resolves a stored key to a URL the client can fetch.
pub async fn resolve_url(st: &AppState, key: Option<&str>) -> anyhow::Result<Option<String>> {
    let Some(key) = key else {
        return Ok(None);
    };
    let url = st
        .storage
        .presign_get(key, st.config.s3.url_ttl_secs)
        .await
        .with_context(|| format!("presign url for key {}", key))?;
    Ok(Some(url))
}

/// Deletes objects whose rows are already gone. Failures only leave
/// orphaned objects behind, so they are logged and skipped.
pub async fn remove_objects(st: &AppState, keys: &[String]) {
    for key in keys {
        if let Err(e) = st.storage.delete_object(key).await {
            warn!(error = %e, key = %key, "failed to delete image object");
        }
    }
}

pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
