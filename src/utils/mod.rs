pub mod middleware;
pub mod serde_helpers;
pub mod templates;
pub mod validation;
