use crate::{
    error::{AppError, Result},
    models::tag::*,
    services::{policy::Viewer, Database},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

const DUPLICATE_TAG: &str = "tag with this name already exists.";

#[derive(Clone)]
pub struct TagService {
    db: Arc<Database>,
}

impl TagService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    pub async fn create_tag(&self, viewer: &Viewer, request: TagRequest) -> Result<Tag> {
        viewer.require_superuser()?;
        request.validate()?;

        let name = request.name.trim().to_string();
        debug!("Creating tag: {}", name);
        self.ensure_name_free(&name, None).await?;

        let id = sqlx::query("INSERT INTO tags (name) VALUES (?)")
            .bind(&name)
            .execute(self.db.pool())
            .await
            .map_err(|e| AppError::unique_violation(e, "name", DUPLICATE_TAG))?
            .last_insert_rowid();

        info!("Created tag: {} ({})", name, id);
        Ok(Tag { id, name })
    }

    pub async fn update_tag(&self, viewer: &Viewer, id: i64, request: TagRequest) -> Result<Tag> {
        viewer.require_superuser()?;
        request.validate()?;

        let mut tag = self.get_tag(id).await?;
        let name = request.name.trim().to_string();
        self.ensure_name_free(&name, Some(id)).await?;

        sqlx::query("UPDATE tags SET name = ? WHERE id = ?")
            .bind(&name)
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(|e| AppError::unique_violation(e, "name", DUPLICATE_TAG))?;

        info!("Renamed tag {} from {} to {}", id, tag.name, name);
        tag.name = name;
        Ok(tag)
    }

    /// Deleting a tag removes it from every bookmark.
    pub async fn delete_tag(&self, viewer: &Viewer, id: i64) -> Result<()> {
        viewer.require_superuser()?;

        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Tag"));
        }

        info!("Deleted tag {}", id);
        Ok(())
    }

    pub async fn get_tag(&self, id: i64) -> Result<Tag> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::not_found("Tag"))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(tag)
    }

    /// All tags in name order.
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;

        Ok(tags)
    }

    /// Look up tags by name, failing on the first unknown one. Duplicates
    /// collapse.
    pub async fn resolve_names(&self, names: &[String]) -> Result<Vec<Tag>> {
        let by_name: HashMap<String, Tag> = self
            .list_tags()
            .await?
            .into_iter()
            .map(|tag| (tag.name.clone(), tag))
            .collect();

        let mut resolved: Vec<Tag> = Vec::with_capacity(names.len());
        for name in names {
            let tag = by_name.get(name.trim()).ok_or_else(|| {
                AppError::field(
                    "tags",
                    format!("Object with name={} does not exist.", name.trim()),
                )
            })?;
            if !resolved.contains(tag) {
                resolved.push(tag.clone());
            }
        }

        Ok(resolved)
    }

    /// Look up tags by id for the HTML form's multi-select.
    pub async fn resolve_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        let by_id: HashMap<i64, Tag> = self
            .list_tags()
            .await?
            .into_iter()
            .map(|tag| (tag.id, tag))
            .collect();

        let mut resolved: Vec<Tag> = Vec::with_capacity(ids.len());
        for id in ids {
            let tag = by_id.get(id).ok_or_else(|| {
                AppError::field(
                    "tags",
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        id
                    ),
                )
            })?;
            if !resolved.contains(tag) {
                resolved.push(tag.clone());
            }
        }

        Ok(resolved)
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i64>) -> Result<()> {
        match self.get_by_name(name).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(AppError::field("name", DUPLICATE_TAG))
            }
            _ => Ok(()),
        }
    }
}
