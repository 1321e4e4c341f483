use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::{LoginResponse, User},
    services::{policy::Viewer, user::UserService},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AuthService {
    config: Config,
    user_service: UserService,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // 用户ID
    pub username: String, // 用户名
    pub exp: i64,         // 过期时间
    pub iat: i64,         // 签发时间
}

impl AuthService {
    pub async fn new(config: &Config, user_service: UserService) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            user_service,
        })
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.jwt_expiry_hours)).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )?;

        Ok(token)
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_ref());
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                debug!("JWT token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("JWT verification failed: {}", e);
                Err(AppError::Authentication("Invalid token".to_string()))
            }
        }
    }

    /// Resolve a token to the user it was issued for. Tokens of deleted
    /// users are rejected.
    pub async fn viewer_from_token(&self, token: &str) -> Result<Viewer> {
        let claims = self.verify_jwt(token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid token subject"))?;

        let user = self
            .user_service
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

        Ok(Viewer::User(user))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let user = self.user_service.verify_credentials(username, password).await?;
        let token = self.issue_token(&user)?;
        info!("User logged in: {}", user.username);

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiry_hours * 3600,
            user,
        })
    }

    pub fn session_cookie_name(&self) -> &str {
        &self.config.session_cookie_name
    }

    /// `Set-Cookie` value carrying a session token.
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.config.session_cookie_name,
            token,
            self.config.jwt_expiry_hours * 3600
        );
        if self.config.is_production() {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_session_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.config.session_cookie_name
        )
    }
}
