#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use marcador::{
    config::Config,
    models::{bookmark::CreateBookmarkRequest, bookmark::Bookmark, tag::TagRequest, user::{RegisterRequest, User}},
    services::{Database, Viewer},
    state::AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let state = Arc::new(AppState::with_database(config, db).await.unwrap());
        let router = marcador::app(state.clone());
        Self { router, state }
    }

    pub async fn user(&self, username: &str, is_superuser: bool) -> User {
        self.state
            .user_service
            .create_user(
                RegisterRequest {
                    username: username.to_string(),
                    password: "password123".to_string(),
                },
                is_superuser,
            )
            .await
            .unwrap()
    }

    pub fn token(&self, user: &User) -> String {
        self.state.auth_service.issue_token(user).unwrap()
    }

    pub fn cookie(&self, user: &User) -> String {
        format!(
            "{}={}",
            self.state.config.session_cookie_name,
            self.token(user)
        )
    }

    pub async fn tag(&self, name: &str) {
        let admin = Viewer::User(User {
            id: 0,
            username: "bootstrap".to_string(),
            is_superuser: true,
            date_joined: chrono::Utc::now(),
        });
        self.state
            .tag_service
            .create_tag(&admin, TagRequest { name: name.to_string() })
            .await
            .unwrap();
    }

    pub async fn bookmark(&self, owner: &User, title: &str, is_public: bool, tags: &[&str]) -> Bookmark {
        self.state
            .bookmark_service
            .create_bookmark(
                &Viewer::User(owner.clone()),
                CreateBookmarkRequest {
                    url: format!("https://example.com/{}", title),
                    title: title.to_string(),
                    description: None,
                    is_public: Some(is_public),
                    tags: Some(tags.iter().map(|t| t.to_string()).collect()),
                },
            )
            .await
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// JSON request with an optional bearer token.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// HTML request with an optional session cookie and form body.
    pub async fn page(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        form: Option<&str>,
    ) -> (StatusCode, Option<String>, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match form {
            Some(form) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, location, String::from_utf8(bytes.to_vec()).unwrap())
    }
}

pub fn titles(list: &Value) -> Vec<String> {
    list["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect()
}
