//! Server-rendered HTML pages.
//!
//! Anonymous visitors trying to create, edit or delete are sent to the login
//! page with `next` pointing back. Failed form submissions re-render the
//! form with field messages and never touch the database.

use crate::{
    error::{field_messages, AppError, Result},
    models::{
        bookmark::{Bookmark, BookmarkFilter, CreateBookmarkRequest},
        response::Paginated,
        tag::Tag,
    },
    services::Viewer,
    state::AppState,
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use url::form_urlencoded;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(bookmark_list))
        .route("/user/:username/", get(bookmark_user))
        .route("/create/", get(create_form).post(create_submit))
        .route("/edit/:id/", get(edit_form).post(edit_submit))
        .route("/delete/:id/", get(delete_confirm).post(delete_submit))
        .route("/login/", get(login_form).post(login_submit))
        .route("/logout/", post(logout))
}

/// Error rendered as a minimal HTML page.
#[derive(Debug)]
pub struct PageError(AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let message = handlebars::html_escape(&self.0.public_message());
        let body = format!(
            "<!DOCTYPE html>\n<html><head><title>{code}</title></head>\
             <body><h1>{code}</h1><p>{message}</p><p><a href=\"/\">Back to bookmarks</a></p></body></html>",
            code = status,
            message = message,
        );
        (status, Html(body)).into_response()
    }
}

type PageResult = std::result::Result<Response, PageError>;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(alias = "tag")]
    pub tags: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

impl PageQuery {
    fn filter(&self) -> BookmarkFilter {
        let mut filter = BookmarkFilter::default();
        if let Some(tag) = non_blank(&self.tags) {
            filter = filter.with_tag(tag);
        }
        if let Some(search) = non_blank(&self.search) {
            filter = filter.with_search(search);
        }
        filter
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Values submitted by the bookmark form.
#[derive(Debug, Clone, Default, Serialize)]
struct BookmarkForm {
    bookmark_url: String,
    title: String,
    description: String,
    is_public: bool,
    tags: Vec<String>,
}

impl BookmarkForm {
    fn blank() -> Self {
        Self {
            is_public: true,
            ..Default::default()
        }
    }

    fn from_bookmark(bookmark: &Bookmark) -> Self {
        Self {
            bookmark_url: bookmark.url.clone(),
            title: bookmark.title.clone(),
            description: bookmark.description.clone(),
            is_public: bookmark.is_public,
            tags: bookmark.tags.iter().map(|t| t.id.to_string()).collect(),
        }
    }

    /// Parse an `application/x-www-form-urlencoded` body. `tags` may repeat.
    fn parse(body: &str) -> Self {
        let mut form = Self::default();
        for (key, value) in form_urlencoded::parse(body.as_bytes()) {
            match &*key {
                "bookmark_url" => form.bookmark_url = value.into_owned(),
                "title" => form.title = value.into_owned(),
                "description" => form.description = value.into_owned(),
                "is_public" => form.is_public = is_checked(&value),
                "tags" => form.tags.push(value.into_owned()),
                _ => {}
            }
        }
        form
    }

    /// Turn the submitted tag ids into names and build a request the
    /// bookmark service understands.
    async fn to_request(&self, state: &AppState) -> Result<CreateBookmarkRequest> {
        let mut ids = Vec::with_capacity(self.tags.len());
        for raw in &self.tags {
            let id = raw.trim().parse::<i64>().map_err(|_| {
                AppError::field(
                    "tags",
                    format!("Select a valid choice. {} is not one of the available choices.", raw),
                )
            })?;
            ids.push(id);
        }

        let tags = state.tag_service.resolve_ids(&ids).await?;

        Ok(CreateBookmarkRequest {
            url: self.bookmark_url.clone(),
            title: self.title.clone(),
            description: Some(self.description.clone()),
            is_public: Some(self.is_public),
            tags: Some(tags.into_iter().map(|t| t.name).collect()),
        })
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value, "on" | "true" | "True" | "1")
}

fn form_value(body: &str, name: &str) -> String {
    form_urlencoded::parse(body.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Redirect to the login page, remembering where to come back to.
fn login_redirect(next: &str) -> Response {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    redirect(&format!("/login/?next={}", encoded.replace("%2F", "/")))
}

/// The requester's own bookmark page; `/` for anonymous viewers.
fn user_page(viewer: &Viewer) -> String {
    match viewer.username() {
        Some(username) => {
            let encoded: String = form_urlencoded::byte_serialize(username.as_bytes()).collect();
            format!("/user/{}/", encoded)
        }
        None => "/".to_string(),
    }
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") {
        next
    } else {
        "/"
    }
}

fn viewer_context(viewer: &Viewer) -> Value {
    json!({
        "username": viewer.username(),
        "is_superuser": viewer.is_superuser(),
    })
}

fn list_url(base_path: &str, query: &PageQuery, page: usize) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if let Some(tag) = non_blank(&query.tags) {
        params.append_pair("tags", tag);
    }
    if let Some(search) = non_blank(&query.search) {
        params.append_pair("search", search);
    }
    if page > 1 {
        params.append_pair("page", &page.to_string());
    }

    let params = params.finish();
    if params.is_empty() {
        base_path.to_string()
    } else {
        format!("{}?{}", base_path, params)
    }
}

fn bookmark_item(viewer: &Viewer, bookmark: &Bookmark, base_path: &str) -> Value {
    let tags: Vec<Value> = bookmark
        .tags
        .iter()
        .map(|tag| {
            let encoded: String = form_urlencoded::byte_serialize(tag.name.as_bytes()).collect();
            json!({
                "name": tag.name,
                "href": format!("{}?tags={}", base_path, encoded),
            })
        })
        .collect();

    json!({
        "id": bookmark.id,
        "url": bookmark.url,
        "title": bookmark.title,
        "description": bookmark.description,
        "is_public": bookmark.is_public,
        "owner": bookmark.owner,
        "date_created": bookmark.date_created.format("%Y-%m-%d %H:%M").to_string(),
        "tags": tags,
        "can_edit": viewer.can_write(bookmark),
    })
}

fn render_list(
    state: &AppState,
    viewer: &Viewer,
    heading: String,
    base_path: &str,
    query: &PageQuery,
    page: Paginated<Bookmark>,
) -> PageResult {
    let bookmarks: Vec<Value> = page
        .items
        .iter()
        .map(|b| bookmark_item(viewer, b, base_path))
        .collect();

    let context = json!({
        "viewer": viewer_context(viewer),
        "title": heading,
        "heading": heading,
        "base_path": base_path,
        "tag": non_blank(&query.tags),
        "search": non_blank(&query.search),
        "bookmarks": bookmarks,
        "total": page.total,
        "prev_url": page.has_prev().then(|| list_url(base_path, query, page.page - 1)),
        "next_url": page.has_next().then(|| list_url(base_path, query, page.page + 1)),
    });

    Ok(state.templates.render("bookmark_list", &context)?.into_response())
}

fn page_query(
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> std::result::Result<PageQuery, PageError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| PageError(AppError::bad_request(&e.body_text())))
}

/// GET /
async fn bookmark_list(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> PageResult {
    let query = page_query(query)?;
    let page = state
        .bookmark_service
        .list_bookmarks(
            &viewer,
            &query.filter(),
            query.page.unwrap_or(1).max(1),
            state.page_size(None),
        )
        .await?;

    render_list(&state, &viewer, "Bookmarks".to_string(), "/", &query, page)
}

/// GET /user/:username/
async fn bookmark_user(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(username): Path<String>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> PageResult {
    let query = page_query(query)?;
    let owner = state.user_service.require_by_username(&username).await?;

    let page = state
        .bookmark_service
        .list_for_owner(
            &viewer,
            owner.id,
            &query.filter(),
            query.page.unwrap_or(1).max(1),
            state.page_size(None),
        )
        .await?;

    let base_path = format!("/user/{}/", owner.username);
    render_list(
        &state,
        &viewer,
        format!("Bookmarks by {}", owner.username),
        &base_path,
        &query,
        page,
    )
}

async fn render_form(
    state: &AppState,
    viewer: &Viewer,
    action: &str,
    form: &BookmarkForm,
    errors: BTreeMap<String, Vec<String>>,
) -> PageResult {
    let all_tags: Vec<Tag> = state.tag_service.list_tags().await?;
    let tags: Vec<Value> = all_tags
        .iter()
        .map(|tag| {
            json!({
                "id": tag.id,
                "name": tag.name,
                "selected": form.tags.iter().any(|t| t.trim() == tag.id.to_string()),
            })
        })
        .collect();

    let create = action == "/create/";
    let page_title = if create { "Create bookmark" } else { "Edit bookmark" };
    let context = json!({
        "viewer": viewer_context(viewer),
        "title": page_title,
        "create": create,
        "action": action,
        "form": form,
        "errors": errors,
        "tags": tags,
    });

    Ok(state.templates.render("bookmark_form", &context)?.into_response())
}

/// Field errors keyed by form input name.
fn form_errors(err: &AppError) -> Option<BTreeMap<String, Vec<String>>> {
    let AppError::ValidatorError(errors) = err else {
        return None;
    };

    Some(
        field_messages(errors)
            .into_iter()
            .map(|(field, messages)| match field.as_str() {
                "url" => ("bookmark_url".to_string(), messages),
                _ => (field, messages),
            })
            .collect(),
    )
}

/// GET /create/
async fn create_form(State(state): State<Arc<AppState>>, viewer: Viewer) -> PageResult {
    if !viewer.is_authenticated() {
        return Ok(login_redirect("/create/"));
    }

    render_form(&state, &viewer, "/create/", &BookmarkForm::blank(), BTreeMap::new()).await
}

/// POST /create/
async fn create_submit(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    body: String,
) -> PageResult {
    if !viewer.is_authenticated() {
        return Ok(login_redirect("/create/"));
    }

    let form = BookmarkForm::parse(&body);
    let result = match form.to_request(&state).await {
        Ok(request) => state.bookmark_service.create_bookmark(&viewer, request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(bookmark) => {
            debug!("Created bookmark {} from form", bookmark.id);
            Ok(redirect(&user_page(&viewer)))
        }
        Err(e) => match form_errors(&e) {
            Some(errors) => render_form(&state, &viewer, "/create/", &form, errors).await,
            None => Err(e.into()),
        },
    }
}

/// GET /edit/:id/
async fn edit_form(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> PageResult {
    let action = format!("/edit/{}/", id);
    if !viewer.is_authenticated() {
        return Ok(login_redirect(&action));
    }

    let bookmark = state.bookmark_service.get_for_edit(&viewer, id).await?;
    render_form(
        &state,
        &viewer,
        &action,
        &BookmarkForm::from_bookmark(&bookmark),
        BTreeMap::new(),
    )
    .await
}

/// POST /edit/:id/
async fn edit_submit(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
    body: String,
) -> PageResult {
    let action = format!("/edit/{}/", id);
    if !viewer.is_authenticated() {
        return Ok(login_redirect(&action));
    }

    // 先检查权限，避免向无权用户泄露表单校验结果
    state.bookmark_service.get_for_edit(&viewer, id).await?;

    let form = BookmarkForm::parse(&body);
    let result = match form.to_request(&state).await {
        Ok(request) => {
            state
                .bookmark_service
                .update_bookmark(&viewer, id, request.into())
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(redirect(&user_page(&viewer))),
        Err(e) => match form_errors(&e) {
            Some(errors) => render_form(&state, &viewer, &action, &form, errors).await,
            None => Err(e.into()),
        },
    }
}

/// GET /delete/:id/
async fn delete_confirm(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> PageResult {
    if !viewer.is_authenticated() {
        return Ok(login_redirect(&format!("/delete/{}/", id)));
    }

    let bookmark = state.bookmark_service.get_for_edit(&viewer, id).await?;
    let context = json!({
        "viewer": viewer_context(&viewer),
        "title": "Delete bookmark",
        "bookmark": {
            "id": bookmark.id,
            "title": bookmark.title,
            "url": bookmark.url,
        },
    });

    Ok(state.templates.render("bookmark_delete", &context)?.into_response())
}

/// POST /delete/:id/
async fn delete_submit(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> PageResult {
    if !viewer.is_authenticated() {
        return Ok(login_redirect(&format!("/delete/{}/", id)));
    }

    state.bookmark_service.delete_bookmark(&viewer, id).await?;
    Ok(redirect("/"))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

fn render_login(
    state: &AppState,
    viewer: &Viewer,
    next: &str,
    username: &str,
    error: Option<&str>,
) -> PageResult {
    let context = json!({
        "viewer": viewer_context(viewer),
        "title": "Login",
        "next": next,
        "username": username,
        "error": error,
    });

    Ok(state.templates.render("login", &context)?.into_response())
}

/// GET /login/
async fn login_form(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Query(query): Query<LoginQuery>,
) -> PageResult {
    let next = safe_next(query.next.as_deref().unwrap_or("/"));
    render_login(&state, &viewer, next, "", None)
}

/// POST /login/
async fn login_submit(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    body: String,
) -> PageResult {
    let username = form_value(&body, "username");
    let password = form_value(&body, "password");
    let next = form_value(&body, "next");
    let next = safe_next(&next);

    match state.auth_service.login(&username, &password).await {
        Ok(login) => {
            info!("{} logged in through the web form", login.user.username);
            let cookie = state.auth_service.session_cookie(&login.token);
            Ok((
                StatusCode::FOUND,
                [
                    (header::LOCATION, next.to_string()),
                    (header::SET_COOKIE, cookie),
                ],
            )
                .into_response())
        }
        Err(AppError::Authentication(_)) => render_login(
            &state,
            &viewer,
            next,
            &username,
            Some("Please enter a correct username and password."),
        ),
        Err(e) => Err(e.into()),
    }
}

/// POST /logout/
async fn logout(State(state): State<Arc<AppState>>) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, state.auth_service.clear_session_cookie()),
        ],
    )
        .into_response()
}
