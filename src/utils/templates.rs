//! Server-side HTML rendering.
//!
//! Templates are compiled into the binary and registered once at startup.

use crate::error::{AppError, Result};
use axum::response::Html;
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const PARTIALS: &[(&str, &str)] = &[
    ("header", include_str!("../../templates/header.hbs")),
    ("footer", include_str!("../../templates/footer.hbs")),
    ("bookmark_items", include_str!("../../templates/bookmark_items.hbs")),
];

const PAGES: &[(&str, &str)] = &[
    ("bookmark_list", include_str!("../../templates/bookmark_list.hbs")),
    ("bookmark_form", include_str!("../../templates/bookmark_form.hbs")),
    ("bookmark_delete", include_str!("../../templates/bookmark_delete.hbs")),
    ("login", include_str!("../../templates/login.hbs")),
];

/// 模板注册表
#[derive(Clone)]
pub struct Templates {
    registry: Arc<Handlebars<'static>>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);

        for (name, source) in PARTIALS {
            registry
                .register_partial(name, *source)
                .map_err(|e| AppError::Internal(format!("Invalid partial {}: {}", name, e)))?;
        }

        for (name, source) in PAGES {
            registry
                .register_template_string(name, *source)
                .map_err(|e| AppError::Internal(format!("Invalid template {}: {}", name, e)))?;
        }

        debug!("Registered {} templates", PAGES.len());

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<Html<String>> {
        Ok(Html(self.registry.render(name, context)?))
    }
}
