use crate::{
    error::Result,
    models::{response::ApiResponse, tag::*},
    services::Viewer,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route(
            "/:id",
            get(get_tag)
                .put(update_tag)
                .patch(update_tag)
                .delete(delete_tag),
        )
}

/// 获取所有标签
/// GET /api/tags
async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Vec<Tag>>>> {
    let tags = state.tag_service.list_tags().await?;
    debug!("Listing {} tags", tags.len());
    Ok(Json(ApiResponse::success(tags)))
}

/// POST /api/tags
async fn create_tag(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Json(request): Json<TagRequest>,
) -> Result<impl IntoResponse> {
    let tag = state.tag_service.create_tag(&viewer, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tag))))
}

/// GET /api/tags/:id
async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Tag>>> {
    let tag = state.tag_service.get_tag(id).await?;
    Ok(Json(ApiResponse::success(tag)))
}

/// Rename a tag; PUT and PATCH both take the full name.
async fn update_tag(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(request): Json<TagRequest>,
) -> Result<Json<ApiResponse<Tag>>> {
    let tag = state.tag_service.update_tag(&viewer, id, request).await?;
    Ok(Json(ApiResponse::success(tag)))
}

/// DELETE /api/tags/:id
async fn delete_tag(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.tag_service.delete_tag(&viewer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
