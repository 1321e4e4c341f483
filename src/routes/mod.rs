pub mod auth;
pub mod bookmarks;
pub mod pages;
pub mod tags;
pub mod users;
