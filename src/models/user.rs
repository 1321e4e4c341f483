use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::models::bookmark::NestedBookmark;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

/// Row used only for login; the hash never leaves the service layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom = "crate::utils::validation::validate_username")]
    pub username: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters."))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// A user together with the bookmarks the current viewer may read.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserWithBookmarks {
    pub id: i64,
    pub username: String,
    pub bookmarks: Vec<NestedBookmark>,
}
