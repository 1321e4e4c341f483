use crate::{error::AppError, services::Viewer, state::AppState};
use axum::{
    body::Body,
    extract::State,
    headers::{Cookie, HeaderMapExt},
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// 认证中间件
///
/// Resolves the viewer for every request and stores it in the request
/// extensions. A bearer token that fails verification ends the request with
/// 401; a stale session cookie is ignored and the request continues
/// anonymously.
pub async fn auth_middleware(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    let mut viewer = Viewer::Anonymous;

    if let Some(token) = bearer_token(&headers) {
        viewer = app_state.auth_service.viewer_from_token(token).await?;
    } else if let Some(cookies) = headers.typed_get::<Cookie>() {
        if let Some(token) = cookies.get(app_state.auth_service.session_cookie_name()) {
            match app_state.auth_service.viewer_from_token(token).await {
                Ok(user) => viewer = user,
                Err(e) => debug!("Ignoring invalid session cookie: {}", e),
            }
        }
    }

    if let Some(username) = viewer.username() {
        debug!("Request authenticated as {}", username);
    }

    request.extensions_mut().insert(viewer);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// 请求 ID 中间件
pub async fn request_id_middleware(mut request: Request<Body>, next: Next<Body>) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    match HeaderValue::from_str(&request_id) {
        Ok(value) => {
            response.headers_mut().insert("x-request-id", value);
        }
        Err(e) => warn!("Could not encode request id: {}", e),
    }

    response
}

/// 请求 ID 包装器
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The request's viewer; anonymous when the auth middleware did not run.
#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}
