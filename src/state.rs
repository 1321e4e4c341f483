use crate::{
    config::Config,
    error::Result,
    services::{
        auth::AuthService,
        bookmark::BookmarkService,
        database::Database,
        tag::TagService,
        user::UserService,
    },
    utils::templates::Templates,
};
use std::sync::Arc;
use tracing::info;

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 数据库连接
    pub db: Arc<Database>,

    /// 认证服务
    pub auth_service: AuthService,

    /// 用户服务
    pub user_service: UserService,

    /// 标签服务
    pub tag_service: TagService,

    /// 书签服务
    pub bookmark_service: BookmarkService,

    /// HTML 模板
    pub templates: Templates,
}

impl AppState {
    /// Connect, migrate and build every service.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(Database::new(&config).await?);
        db.verify_connection().await?;
        db.migrate().await?;
        Self::with_database(config, db).await
    }

    pub async fn with_database(config: Config, db: Arc<Database>) -> Result<Self> {
        let user_service = UserService::new(db.clone()).await?;
        let auth_service = AuthService::new(&config, user_service.clone()).await?;
        let tag_service = TagService::new(db.clone()).await?;
        let bookmark_service = BookmarkService::new(db.clone(), tag_service.clone()).await?;
        let templates = Templates::new()?;

        if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
            let admin = user_service.ensure_superuser(username, password).await?;
            info!("Superuser available: {}", admin.username);
        }

        Ok(Self {
            config,
            db,
            auth_service,
            user_service,
            tag_service,
            bookmark_service,
            templates,
        })
    }

    /// 检查功能是否启用
    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        match feature {
            "registrations" => self.config.enable_registrations,
            _ => false,
        }
    }

    /// Page size for a request, clamped to configured bounds.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        self.config.page_size(requested)
    }
}
