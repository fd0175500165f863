use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    images::{
        handlers::{PageQuery, MAX_UPLOAD_BYTES},
        services::{presign, UploadForm},
    },
    state::AppState,
    storage::object_key,
    vlogs::{
        dto::{validate_title, CommentRequest, LikeResponse, VlogResponse},
        repo_types::{Vlog, VlogComment},
    },
};

pub fn vlog_routes() -> Router<AppState> {
    Router::new()
        .route("/vlogs", get(list_vlogs).post(create))
        .route("/vlogs/:id", get(get_vlog).delete(remove))
        .route("/vlogs/:id/comments", get(list_comments).post(comment))
        .route("/vlogs/:id/like", post(toggle_like))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

async fn existing(state: &AppState, id: Uuid) -> AppResult<Vlog> {
    Vlog::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Vlog"))
}

async fn with_url(state: &AppState, vlog: Vlog) -> AppResult<VlogResponse> {
    let image_url = presign(state, &vlog.image_key).await?;
    Ok(VlogResponse { vlog, image_url })
}

/// A reply must point at a comment on the same vlog.
fn check_parent(parent: Option<&VlogComment>, vlog_id: Uuid) -> AppResult<()> {
    match parent {
        None => Err(AppError::not_found("Parent comment")),
        Some(p) if p.vlog_id != vlog_id => Err(AppError::BadRequest(
            "parent comment belongs to another vlog".into(),
        )),
        Some(_) => Ok(()),
    }
}

/// POST /vlogs (multipart: `file`, `title`, optional `description`)
#[instrument(skip(state, mp))]
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> AppResult<(StatusCode, Json<VlogResponse>)> {
    let mut form = UploadForm::read(mp).await?;
    let title = validate_title(form.text("title").as_deref()).map_err(AppError::BadRequest)?;
    let item = form.take_image()?;

    let id = Uuid::new_v4();
    let key = object_key("vlogs", user_id, id, &item.content_type);
    state
        .storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let description = form.text("description");
    let vlog = Vlog::create(&state.db, id, user_id, &title, &key, description.as_deref()).await?;
    info!(user_id = %user_id, vlog_id = %id, "vlog created");
    Ok((StatusCode::CREATED, Json(with_url(&state, vlog).await?)))
}

#[instrument(skip(state))]
pub async fn list_vlogs(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Vec<VlogResponse>>> {
    let vlogs = Vlog::list(&state.db, q.skip(), q.limit()).await?;
    let mut out = Vec::with_capacity(vlogs.len());
    for vlog in vlogs {
        out.push(with_url(&state, vlog).await?);
    }
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn get_vlog(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<VlogResponse>> {
    let vlog = existing(&state, id).await?;
    Ok(Json(with_url(&state, vlog).await?))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let vlog = existing(&state, id).await?;
    if vlog.user_id != user_id {
        return Err(AppError::Unauthorized);
    }
    Vlog::delete(&state.db, id).await?;
    if let Err(e) = state.storage.delete_object(&vlog.image_key).await {
        warn!(error = %e, key = %vlog.image_key, "failed to delete vlog image");
    }
    info!(user_id = %user_id, vlog_id = %id, "vlog deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<VlogComment>)> {
    payload.validate().map_err(AppError::BadRequest)?;
    existing(&state, id).await?;
    if let Some(parent_id) = payload.parent_id {
        let parent = VlogComment::find_by_id(&state.db, parent_id).await?;
        check_parent(parent.as_ref(), id)?;
    }

    let saved = VlogComment::create(
        &state.db,
        id,
        user_id,
        payload.comment.trim(),
        payload.parent_id,
    )
    .await?;
    info!(user_id = %user_id, vlog_id = %id, comment_id = %saved.id, "vlog comment added");
    Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<VlogComment>>> {
    existing(&state, id).await?;
    Ok(Json(VlogComment::list_for_vlog(&state.db, id).await?))
}

#[instrument(skip(state))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LikeResponse>> {
    existing(&state, id).await?;
    let (liked, likes) = Vlog::toggle_like(&state.db, id, user_id).await?;
    info!(user_id = %user_id, vlog_id = %id, liked, "vlog like toggled");
    Ok(Json(LikeResponse { liked, likes }))
}
