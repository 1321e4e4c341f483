pub mod database;
pub mod policy;
pub mod auth;
pub mod user;
pub mod tag;
pub mod bookmark;

// 重新导出常用类型
pub use database::Database;
pub use policy::{Owned, Scope, Viewer};
pub use auth::AuthService;
pub use user::UserService;
pub use tag::TagService;
pub use bookmark::BookmarkService;
