use crate::{
    error::{AppError, Result},
    models::{response::ApiResponse, user::*},
    services::Viewer,
    state::AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(get_current_user))
        .route("/register", post(register))
}

/// 用户名密码登录，返回 JWT
/// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    debug!("Login attempt for {}", request.username);
    let response = state
        .auth_service
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 获取当前用户信息
/// GET /api/auth/me
async fn get_current_user(viewer: Viewer) -> Result<Json<ApiResponse<User>>> {
    match viewer {
        Viewer::User(user) => Ok(Json(ApiResponse::success(user))),
        Viewer::Anonymous => Err(AppError::unauthorized(
            "Authentication credentials were not provided",
        )),
    }
}

/// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    if !state.is_feature_enabled("registrations") {
        return Err(AppError::forbidden("Registrations are disabled"));
    }

    let user = state.user_service.create_user(request, false).await?;
    info!("Registered new user: {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(user, "Registration successful")),
    ))
}
