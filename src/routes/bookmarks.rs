use crate::{
    error::{AppError, Result},
    models::{
        bookmark::*,
        response::{ApiResponse, Paginated},
    },
    services::Viewer,
    state::AppState,
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_bookmarks).post(create_bookmark))
        .route(
            "/:id",
            get(get_bookmark)
                .put(replace_bookmark)
                .patch(update_bookmark)
                .delete(delete_bookmark),
        )
}

/// Unwrap list query parameters, turning malformed values into a 400 and
/// rejecting unknown tag names as a field error.
pub(crate) async fn list_params(
    state: &AppState,
    query: std::result::Result<Query<BookmarkListQuery>, QueryRejection>,
) -> Result<(BookmarkFilter, usize, usize)> {
    let Query(query) = query.map_err(|e| AppError::bad_request(&e.body_text()))?;
    let filter = query.filter();

    if let Some(tag) = &filter.tag {
        if state.tag_service.get_by_name(tag).await?.is_none() {
            return Err(AppError::field(
                "tags",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    tag
                ),
            ));
        }
    }

    let page = query.page.unwrap_or(1).max(1);
    let per_page = state.page_size(query.limit);
    Ok((filter, page, per_page))
}

/// List bookmarks visible to the viewer
/// GET /api/bookmarks
async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    query: std::result::Result<Query<BookmarkListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Paginated<BookmarkResponse>>>> {
    let (filter, page, per_page) = list_params(&state, query).await?;
    debug!("Listing bookmarks page {} with {:?}", page, filter);

    let bookmarks = state
        .bookmark_service
        .list_bookmarks(&viewer, &filter, page, per_page)
        .await?;

    Ok(Json(ApiResponse::success(
        bookmarks.map(|b| b.to_response()),
    )))
}

/// Create a bookmark owned by the requester
/// POST /api/bookmarks
async fn create_bookmark(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Json(request): Json<CreateBookmarkRequest>,
) -> Result<impl IntoResponse> {
    let bookmark = state
        .bookmark_service
        .create_bookmark(&viewer, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            bookmark.to_response(),
            "Bookmark created successfully",
        )),
    ))
}

/// GET /api/bookmarks/:id
async fn get_bookmark(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BookmarkResponse>>> {
    let bookmark = state.bookmark_service.get_bookmark(&viewer, id).await?;
    Ok(Json(ApiResponse::success(bookmark.to_response())))
}

/// Replace every writable field
/// PUT /api/bookmarks/:id
async fn replace_bookmark(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(request): Json<CreateBookmarkRequest>,
) -> Result<Json<ApiResponse<BookmarkResponse>>> {
    let bookmark = state
        .bookmark_service
        .update_bookmark(&viewer, id, request.into())
        .await?;

    Ok(Json(ApiResponse::success(bookmark.to_response())))
}

/// Update only the supplied fields
/// PATCH /api/bookmarks/:id
async fn update_bookmark(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(request): Json<UpdateBookmarkRequest>,
) -> Result<Json<ApiResponse<BookmarkResponse>>> {
    let bookmark = state
        .bookmark_service
        .update_bookmark(&viewer, id, request)
        .await?;

    Ok(Json(ApiResponse::success(bookmark.to_response())))
}

/// DELETE /api/bookmarks/:id
async fn delete_bookmark(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.bookmark_service.delete_bookmark(&viewer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
