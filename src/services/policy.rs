//! Who may read, edit or delete a bookmark, and which bookmarks a viewer
//! may list.
//!
//! An existing resource the viewer is not allowed to touch is always
//! reported as [`AppError::Authorization`] (403). Missing ids are the
//! caller's concern and surface as 404.

use crate::{
    error::{AppError, Result},
    models::user::User,
};

/// Anything with an owner and a visibility flag.
pub trait Owned {
    fn owner_id(&self) -> i64;
    fn is_public(&self) -> bool;
}

/// The identity a request is evaluated for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(User),
}

/// Subset of bookmarks a viewer may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Public,
    PublicOrOwnedBy(i64),
    All,
}

impl Scope {
    pub fn admits<R: Owned + ?Sized>(&self, resource: &R) -> bool {
        match self {
            Scope::Public => resource.is_public(),
            Scope::PublicOrOwnedBy(id) => resource.is_public() || resource.owner_id() == *id,
            Scope::All => true,
        }
    }
}

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(user) => Some(user),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    pub fn username(&self) -> Option<&str> {
        self.user().map(|u| u.username.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }

    pub fn is_superuser(&self) -> bool {
        self.user().map_or(false, |u| u.is_superuser)
    }

    pub fn is(&self, user_id: i64) -> bool {
        self.id() == Some(user_id)
    }

    pub fn can_read<R: Owned + ?Sized>(&self, resource: &R) -> bool {
        resource.is_public() || self.is(resource.owner_id()) || self.is_superuser()
    }

    pub fn can_write<R: Owned + ?Sized>(&self, resource: &R) -> bool {
        self.is(resource.owner_id()) || self.is_superuser()
    }

    pub fn can_delete<R: Owned + ?Sized>(&self, resource: &R) -> bool {
        self.can_write(resource)
    }

    /// Listing scope across all owners.
    pub fn scope(&self) -> Scope {
        match self {
            Viewer::Anonymous => Scope::Public,
            Viewer::User(user) if user.is_superuser => Scope::All,
            Viewer::User(user) => Scope::PublicOrOwnedBy(user.id),
        }
    }

    /// Listing scope when looking at a single owner's bookmarks.
    pub fn scope_for_owner(&self, owner_id: i64) -> Scope {
        if self.is(owner_id) || self.is_superuser() {
            Scope::All
        } else {
            Scope::Public
        }
    }

    pub fn require_authenticated(&self) -> Result<&User> {
        self.user()
            .ok_or_else(|| AppError::forbidden("Authentication credentials were not provided"))
    }

    pub fn require_superuser(&self) -> Result<&User> {
        match self.user() {
            Some(user) if user.is_superuser => Ok(user),
            _ => Err(AppError::forbidden("Only superusers may perform this action")),
        }
    }

    pub fn require_read<R: Owned + ?Sized>(&self, resource: &R) -> Result<()> {
        if self.can_read(resource) {
            Ok(())
        } else {
            Err(AppError::forbidden("You do not have permission to view this bookmark"))
        }
    }

    pub fn require_write<R: Owned + ?Sized>(&self, resource: &R) -> Result<()> {
        if self.can_write(resource) {
            Ok(())
        } else {
            Err(AppError::forbidden("You can only edit your own bookmarks"))
        }
    }

    pub fn require_delete<R: Owned + ?Sized>(&self, resource: &R) -> Result<()> {
        if self.can_delete(resource) {
            Ok(())
        } else {
            Err(AppError::forbidden("You can only delete your own bookmarks"))
        }
    }
}
