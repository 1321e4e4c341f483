use crate::config::Config;
use crate::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, error, info};

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// 创建新的数据库实例
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection to {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // 内存数据库只存在于单个连接中，必须保持这个连接不被回收
        let in_memory = config.database_url.contains(":memory:")
            || config.database_url.contains("mode=memory");

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.database_max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;

        Ok(Self { pool })
    }

    /// Fresh in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::new(&Config::default()).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// 执行嵌入的数据库迁移
    pub async fn migrate(&self) -> Result<()> {
        debug!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
