use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use validator::Validate;

use crate::models::tag::Tag;
use crate::services::policy::Owned;
use crate::utils::serde_helpers::flexible_datetime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    pub owner_id: i64,
    pub owner: String,
    pub tags: Vec<Tag>,
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.url)
    }
}

impl Owned for Bookmark {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn is_public(&self) -> bool {
        self.is_public
    }
}

impl Bookmark {
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    pub fn to_response(&self) -> BookmarkResponse {
        BookmarkResponse {
            id: self.id,
            url: self.url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            is_public: self.is_public,
            date_created: self.date_created,
            date_updated: self.date_updated,
            owner: self.owner.clone(),
            tags: self.tag_names(),
        }
    }

    pub fn to_nested(&self) -> NestedBookmark {
        NestedBookmark {
            id: self.id,
            url: self.url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            is_public: self.is_public,
            date_created: self.date_created,
            date_updated: self.date_updated,
            tags: self.tags.clone(),
        }
    }
}

/// Bookmark row joined with its owner's username, before tags are attached.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookmarkRow {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    pub owner_id: i64,
    pub owner_username: String,
}

impl BookmarkRow {
    pub fn into_bookmark(self, tags: Vec<Tag>) -> Bookmark {
        Bookmark {
            id: self.id,
            url: self.url,
            title: self.title,
            description: self.description,
            is_public: self.is_public,
            date_created: self.date_created,
            date_updated: self.date_updated,
            owner_id: self.owner_id,
            owner: self.owner_username,
            tags,
        }
    }
}

/// Body of `POST /bookmarks` and `PUT /bookmarks/:id`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookmarkRequest {
    #[validate(custom = "crate::utils::validation::validate_bookmark_url")]
    pub url: String,

    #[validate(custom = "crate::utils::validation::validate_title")]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub is_public: Option<bool>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Body of `PATCH /bookmarks/:id`; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateBookmarkRequest {
    #[validate(custom = "crate::utils::validation::validate_bookmark_url")]
    pub url: Option<String>,

    #[validate(custom = "crate::utils::validation::validate_title")]
    pub title: Option<String>,

    pub description: Option<String>,

    pub is_public: Option<bool>,

    pub tags: Option<Vec<String>>,
}

impl From<CreateBookmarkRequest> for UpdateBookmarkRequest {
    // PUT replaces every writable field
    fn from(request: CreateBookmarkRequest) -> Self {
        Self {
            url: Some(request.url),
            title: Some(request.title),
            description: Some(request.description.unwrap_or_default()),
            is_public: Some(request.is_public.unwrap_or(true)),
            tags: Some(request.tags.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkResponse {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    pub owner: String,
    pub tags: Vec<String>,
}

/// Bookmark embedded under its owner, tags expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedBookmark {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

/// Query string accepted by the bookmark list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookmarkListQuery {
    #[serde(alias = "tag")]
    pub tags: Option<String>,
    pub search: Option<String>,
    #[serde(default, deserialize_with = "flexible_datetime::deserialize")]
    pub date_created_after: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_datetime::deserialize")]
    pub date_created_before: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_datetime::deserialize")]
    pub date_updated_after: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_datetime::deserialize")]
    pub date_updated_before: Option<DateTime<Utc>>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl BookmarkListQuery {
    pub fn filter(&self) -> BookmarkFilter {
        BookmarkFilter {
            owner_id: None,
            tag: non_blank(&self.tags),
            search: non_blank(&self.search),
            date_created_after: self.date_created_after,
            date_created_before: self.date_created_before,
            date_updated_after: self.date_updated_after,
            date_updated_before: self.date_updated_before,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Filters intersected with the viewer's listing scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkFilter {
    pub owner_id: Option<i64>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub date_created_after: Option<DateTime<Utc>>,
    pub date_created_before: Option<DateTime<Utc>>,
    pub date_updated_after: Option<DateTime<Utc>>,
    pub date_updated_before: Option<DateTime<Utc>>,
}

impl BookmarkFilter {
    pub fn with_owner(mut self, owner_id: i64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Search terms split on whitespace and commas; each must match.
    pub fn search_terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .unwrap_or_default()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    }
}
