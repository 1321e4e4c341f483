use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TagRequest {
    #[validate(custom = "crate::utils::validation::validate_tag_name")]
    pub name: String,
}

/// Tag as linked to a bookmark, used when loading tag sets in bulk.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagLink {
    pub bookmark_id: i64,
    pub id: i64,
    pub name: String,
}

impl From<TagLink> for Tag {
    fn from(link: TagLink) -> Self {
        Tag {
            id: link.id,
            name: link.name,
        }
    }
}
