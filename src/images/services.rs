use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    images::{
        analysis::{analyze_best_effort, analyze_within},
        repo_types::{Image, NewImage},
    },
    state::AppState,
    storage::{is_image, object_key, PRESIGN_TTL_SECS},
};

/// Multipart field names accepted for the uploaded file.
const FILE_FIELDS: [&str; 4] = ["file", "image", "photo", "files"];

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub filename: Option<String>,
}

impl UploadItem {
    pub fn validate_image(&self) -> AppResult<()> {
        if self.body.is_empty() {
            return Err(AppError::BadRequest("uploaded file is empty".into()));
        }
        if !is_image(&self.content_type) {
            return Err(AppError::BadRequest(format!(
                "unsupported content type {}",
                self.content_type
            )));
        }
        Ok(())
    }
}

/// A parsed multipart body: at most one file plus text fields.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadItem>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut mp: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            if FILE_FIELDS.contains(&name.as_str()) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let filename = field.file_name().map(str::to_string);
                let body = field.bytes().await.map_err(bad_multipart)?;
                form.file = Some(UploadItem {
                    body,
                    content_type,
                    filename,
                });
            } else if !name.is_empty() {
                let value = field.text().await.map_err(bad_multipart)?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Trimmed, non-blank text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Takes the uploaded file, which must be a non-empty image.
    pub fn take_image(&mut self) -> AppResult<UploadItem> {
        let item = self
            .file
            .take()
            .ok_or_else(|| AppError::BadRequest("file is required".into()))?;
        item.validate_image()?;
        Ok(item)
    }
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid multipart body: {}", e))
}

fn analysis_timeout(st: &AppState) -> Duration {
    Duration::from_secs(st.config.vision.timeout_secs)
}

/// Stores the photo, records it and runs best-effort analysis.
/// An analysis failure leaves the analysis columns null.
#[instrument(skip(st, item, description), fields(bytes = item.body.len()))]
pub async fn upload_image(
    st: &AppState,
    user_id: Uuid,
    meal_id: Option<Uuid>,
    item: UploadItem,
    description: Option<String>,
) -> AppResult<Image> {
    let id = Uuid::new_v4();
    let key = object_key("images", user_id, id, &item.content_type);
    st.storage
        .put_object(&key, item.body.clone(), &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let new = NewImage {
        id,
        user_id,
        meal_id,
        s3_key: &key,
        original_filename: item.filename.as_deref(),
        content_type: &item.content_type,
        file_size: item.body.len() as i64,
        description: description.as_deref(),
    };
    let image = match Image::insert(&st.db, &new).await {
        Ok(image) => image,
        Err(e) => {
            if let Err(cleanup) = st.storage.delete_object(&key).await {
                warn!(error = %cleanup, key = %key, "orphaned object after failed insert");
            }
            return Err(e.into());
        }
    };
    info!(user_id = %user_id, image_id = %id, "image stored");

    match analyze_best_effort(
        st.analyzer.as_ref(),
        &item.body,
        &item.content_type,
        analysis_timeout(st),
    )
    .await
    {
        Some(analysis) => {
            let recorded = Image::record_analysis(&st.db, id, &analysis).await;
            Ok(settle_analysis(image, recorded))
        }
        None => Ok(image),
    }
}

/// The upload stands even when its analysis could not be saved; the stored
/// row then keeps null analysis columns.
fn settle_analysis(stored: Image, recorded: anyhow::Result<Image>) -> Image {
    match recorded {
        Ok(updated) => updated,
        Err(e) => {
            warn!(error = ?e, image_id = %stored.id, "failed to save image analysis");
            stored
        }
    }
}

/// Re-runs analysis on the stored object. Failures surface as `ExternalService`.
#[instrument(skip(st, image), fields(image_id = %image.id))]
pub async fn reanalyze(st: &AppState, image: &Image) -> AppResult<Image> {
    let body = st
        .storage
        .get_object(&image.s3_key)
        .await
        .with_context(|| format!("get_object {}", image.s3_key))?;
    let analysis = analyze_within(
        st.analyzer.as_ref(),
        &body,
        &image.content_type,
        analysis_timeout(st),
    )
    .await?;
    Ok(Image::record_analysis(&st.db, image.id, &analysis).await?)
}

/// Removes the row, then the object. A leftover object is only logged.
#[instrument(skip(st, image), fields(image_id = %image.id))]
pub async fn delete_image(st: &AppState, image: &Image) -> AppResult<()> {
    Image::delete(&st.db, image.id).await?;
    if let Err(e) = st.storage.delete_object(&image.s3_key).await {
        warn!(error = %e, key = %image.s3_key, "failed to delete stored object");
    }
    Ok(())
}

pub async fn presign(st: &AppState, s3_key: &str) -> AppResult<String> {
    let url = st
        .storage
        .presign_get(s3_key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for s3_key {}", s3_key))?;
    Ok(url)
}

pub async fn presign_many(st: &AppState, keys: &[String]) -> AppResult<Vec<String>> {
    let mut out = Vec::with_capacity(keys.len());
    for k in keys {
        out.push(presign(st, k).await?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::repo_types::sample_image;

    fn item(body: &'static [u8], ct: &str) -> UploadItem {
        UploadItem {
            body: Bytes::from_static(body),
            content_type: ct.into(),
            filename: None,
        }
    }

    #[test]
    fn only_non_empty_images_are_accepted() {
        assert!(item(b"jpg", "image/jpeg").validate_image().is_ok());
        assert!(matches!(
            item(b"", "image/png").validate_image(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            item(b"%PDF", "application/pdf").validate_image(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn form_text_is_trimmed_and_blank_is_none() {
        let mut form = UploadForm::default();
        form.fields.insert("title".into(), "  Leg day ".into());
        form.fields.insert("description".into(), "   ".into());
        assert_eq!(form.text("title").as_deref(), Some("Leg day"));
        assert_eq!(form.text("description"), None);
        assert!(matches!(form.take_image(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn unsaved_analysis_keeps_the_upload() {
        let stored = sample_image(Uuid::new_v4());
        let id = stored.id;
        let kept = settle_analysis(stored, Err(anyhow::anyhow!("connection reset")));
        assert_eq!(kept.id, id);
        assert!(kept.analysis().is_none());
    }

    #[test]
    fn saved_analysis_replaces_the_row() {
        let stored = sample_image(Uuid::new_v4());
        let mut updated = stored.clone();
        updated.is_food = Some(true);
        updated.analysis_completed = Some(time::OffsetDateTime::now_utc());
        let out = settle_analysis(stored, Ok(updated));
        assert!(out.analysis().is_some());
    }

    #[tokio::test]
    async fn presign_many_and_one() {
        let state = AppState::fake();

        let urls = presign_many(&state, &["a/b/c.jpg".into(), "x/y/z.png".into()])
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("a/b/c.jpg"));
        assert!(urls[1].contains("x/y/z.png"));

        let one = presign(&state, "q/w/e.webp").await.unwrap();
        assert!(one.contains("q/w/e.webp"));
    }
}
