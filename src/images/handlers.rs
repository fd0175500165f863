use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    images::{
        repo_types::Image,
        services::{delete_image, presign, reanalyze, upload_image, UploadForm},
    },
    state::AppState,
};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/images", get(list_images).post(upload))
        .route("/images/:id", get(get_image).delete(remove))
        .route("/images/:id/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    #[serde(flatten)]
    pub image: Image,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

async fn with_url(state: &AppState, image: Image) -> AppResult<ImageResponse> {
    let url = presign(state, &image.s3_key).await?;
    Ok(ImageResponse { image, url })
}

async fn owned_image(state: &AppState, id: Uuid, user_id: Uuid) -> AppResult<Image> {
    Image::find_owned(&state.db, id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Image"))
}

/// POST /images (multipart: `file`, optional `description`)
#[instrument(skip(state, mp))]
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> AppResult<(StatusCode, Json<ImageResponse>)> {
    let mut form = UploadForm::read(mp).await?;
    let item = form.take_image()?;
    let image = upload_image(&state, user_id, None, item, form.text("description")).await?;
    Ok((StatusCode::CREATED, Json(with_url(&state, image).await?)))
}

#[instrument(skip(state))]
pub async fn list_images(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Vec<ImageResponse>>> {
    let images = Image::list_by_user(&state.db, user_id, q.skip(), q.limit()).await?;
    let mut out = Vec::with_capacity(images.len());
    for image in images {
        out.push(with_url(&state, image).await?);
    }
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ImageResponse>> {
    let image = owned_image(&state, id, user_id).await?;
    Ok(Json(with_url(&state, image).await?))
}

/// Explicitly requested analysis: vision failures are returned as 502.
#[instrument(skip(state))]
pub async fn analyze(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ImageResponse>> {
    let image = owned_image(&state, id, user_id).await?;
    let image = reanalyze(&state, &image).await?;
    info!(user_id = %user_id, image_id = %id, is_food = ?image.is_food, "image re-analyzed");
    Ok(Json(with_url(&state, image).await?))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let image = owned_image(&state, id, user_id).await?;
    delete_image(&state, &image).await?;
    info!(user_id = %user_id, image_id = %id, "image deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRef, http::Request};
    use tower::ServiceExt;

    use crate::auth::services::JwtKeys;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart_body(field: &str, content_type: &str, data: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"x\"\r\n\
             Content-Type: {ct}\r\n\r\n{d}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = field,
            ct = content_type,
            d = data
        )
    }

    async fn post_upload(state: AppState, token: Option<String>, body: String) -> StatusCode {
        let mut req = Request::post("/images").header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
        if let Some(t) = token {
            req = req.header("authorization", format!("Bearer {}", t));
        }
        image_routes()
            .with_state(state)
            .oneshot(req.body(Body::from(body)).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn upload_requires_token() {
        let status = post_upload(
            AppState::fake(),
            None,
            multipart_body("file", "image/png", "png"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let status = post_upload(
            state,
            Some(token),
            multipart_body("file", "text/plain", "hello"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let status = post_upload(
            state,
            Some(token),
            multipart_body("description", "text/plain", "no file here"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn page_query_is_clamped() {
        let q = PageQuery {
            skip: Some(-3),
            limit: Some(1000),
        };
        assert_eq!(q.skip(), 0);
        assert_eq!(q.limit(), 100);
        assert_eq!(PageQuery::default().limit(), 20);
    }
}
