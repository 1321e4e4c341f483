use crate::{
    error::Result,
    models::{
        bookmark::{BookmarkListQuery, BookmarkResponse},
        response::{ApiResponse, Paginated},
        user::*,
    },
    routes::bookmarks::list_params,
    services::Viewer,
    state::AppState,
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/:username", get(get_user))
        .route("/:username/bookmarks", get(get_user_bookmarks))
}

async fn with_bookmarks(state: &AppState, viewer: &Viewer, user: User) -> Result<UserWithBookmarks> {
    let bookmarks = state.bookmark_service.all_for_owner(viewer, user.id).await?;
    Ok(UserWithBookmarks {
        id: user.id,
        username: user.username,
        bookmarks: bookmarks.iter().map(|b| b.to_nested()).collect(),
    })
}

/// 获取用户列表
/// GET /api/users
async fn list_users(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
) -> Result<Json<ApiResponse<Vec<UserWithBookmarks>>>> {
    let users = state.user_service.list_users().await?;
    debug!("Listing {} users", users.len());

    let mut data = Vec::with_capacity(users.len());
    for user in users {
        data.push(with_bookmarks(&state, &viewer, user).await?);
    }

    Ok(Json(ApiResponse::success(data)))
}

/// 获取用户详情
/// GET /api/users/:username
async fn get_user(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserWithBookmarks>>> {
    let user = state.user_service.require_by_username(&username).await?;
    Ok(Json(ApiResponse::success(
        with_bookmarks(&state, &viewer, user).await?,
    )))
}

/// 获取用户书签
/// GET /api/users/:username/bookmarks
async fn get_user_bookmarks(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(username): Path<String>,
    query: std::result::Result<Query<BookmarkListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Paginated<BookmarkResponse>>>> {
    let owner = state.user_service.require_by_username(&username).await?;
    let (filter, page, per_page) = list_params(&state, query).await?;

    let bookmarks = state
        .bookmark_service
        .list_for_owner(&viewer, owner.id, &filter, page, per_page)
        .await?;

    Ok(Json(ApiResponse::success(
        bookmarks.map(|b| b.to_response()),
    )))
}
