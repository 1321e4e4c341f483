use crate::{
    error::{AppError, Result},
    models::user::*,
    services::Database,
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
const USER_COLUMNS: &str = "id, username, is_superuser, date_joined";

#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    pub async fn create_user(&self, request: RegisterRequest, is_superuser: bool) -> Result<User> {
        debug!("Creating user: {}", request.username);

        request.validate()?;

        if self.get_by_username(&request.username).await?.is_some() {
            return Err(AppError::field("username", DUPLICATE_USERNAME));
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();

        let id = sqlx::query(
            "INSERT INTO users (username, password_hash, is_superuser, date_joined) VALUES (?, ?, ?, ?)",
        )
        .bind(&request.username)
        .bind(&password_hash)
        .bind(is_superuser)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(|e| AppError::unique_violation(e, "username", DUPLICATE_USERNAME))?
        .last_insert_rowid();

        info!("Created user: {} ({})", request.username, id);

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::internal("Failed to create user"))
    }

    /// Create the configured superuser on first start; an existing account is
    /// left untouched.
    pub async fn ensure_superuser(&self, username: &str, password: &str) -> Result<User> {
        if let Some(existing) = self.get_by_username(username).await? {
            debug!("Superuser {} already exists", username);
            return Ok(existing);
        }

        self.create_user(
            RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
            },
            true,
        )
        .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(user)
    }

    pub async fn require_by_username(&self, username: &str) -> Result<User> {
        self.get_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// All users in primary key order.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(users)
    }

    /// Check a username/password pair.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<User> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, password_hash FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(credentials) = credentials else {
            debug!("Login attempt for unknown user: {}", username);
            return Err(AppError::unauthorized("Invalid username or password"));
        };

        if !verify_password(password, &credentials.password_hash) {
            debug!("Wrong password for user: {}", username);
            return Err(AppError::unauthorized("Invalid username or password"));
        }

        self.get_by_id(credentials.id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid username or password"))
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> UserService {
        let db = Arc::new(Database::in_memory().await.unwrap());
        UserService::new(db).await.unwrap()
    }

    fn request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: "password123".to_string(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret-pass", "not-a-hash"));
    }

    #[tokio::test]
    async fn creates_and_finds_users() {
        let users = service().await;
        let dummy = users.create_user(request("dummy"), false).await.unwrap();
        assert!(!dummy.is_superuser);

        let found = users.get_by_username("dummy").await.unwrap().unwrap();
        assert_eq!(found, dummy);
        assert!(users.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_field_error() {
        let users = service().await;
        users.create_user(request("dummy"), false).await.unwrap();
        let err = users.create_user(request("dummy"), false).await.unwrap_err();
        assert!(matches!(err, AppError::ValidatorError(_)));

        // same outcome when the insert itself hits the constraint
        let err = sqlx::query(
            "INSERT INTO users (username, password_hash, is_superuser, date_joined) VALUES (?, ?, ?, ?)",
        )
        .bind("dummy")
        .bind("x")
        .bind(false)
        .bind(Utc::now())
        .execute(users.db.pool())
        .await
        .map_err(|e| AppError::unique_violation(e, "username", DUPLICATE_USERNAME))
        .unwrap_err();
        assert!(matches!(err, AppError::ValidatorError(_)));
    }

    #[tokio::test]
    async fn verifies_credentials() {
        let users = service().await;
        users.create_user(request("dummy"), false).await.unwrap();

        assert!(users.verify_credentials("dummy", "password123").await.is_ok());
        assert!(matches!(
            users.verify_credentials("dummy", "nope").await.unwrap_err(),
            AppError::Authentication(_)
        ));
        assert!(users.verify_credentials("ghost", "password123").await.is_err());
    }

    #[tokio::test]
    async fn ensure_superuser_is_idempotent() {
        let users = service().await;
        let first = users.ensure_superuser("admin", "adminpass1").await.unwrap();
        let second = users.ensure_superuser("admin", "other-pass").await.unwrap();
        assert!(first.is_superuser);
        assert_eq!(first.id, second.id);
        assert_eq!(users.list_users().await.unwrap().len(), 1);
    }
}
