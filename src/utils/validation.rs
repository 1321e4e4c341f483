use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use url::Url;
use validator::ValidationError;

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_TAG_NAME_LENGTH: usize = 50;

const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Bookmarked URLs must be absolute with a host and a web/ftp scheme.
pub fn validate_bookmark_url(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid("required", "This field is required."));
    }

    let parsed = Url::parse(value).map_err(|_| invalid("url", "Enter a valid URL."))?;

    if !ALLOWED_URL_SCHEMES.contains(&parsed.scheme()) {
        return Err(invalid("url", "Enter a valid URL."));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid("url", "Enter a valid URL.")),
    }
}

pub fn validate_title(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "This field is required."));
    }

    if value.chars().count() > MAX_TITLE_LENGTH {
        return Err(invalid(
            "length",
            "Ensure this field has no more than 255 characters.",
        ));
    }

    Ok(())
}

pub fn validate_tag_name(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "This field is required."));
    }

    if value.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(invalid(
            "length",
            "Ensure this field has no more than 50 characters.",
        ));
    }

    Ok(())
}

/// 用户名只能包含字母、数字、下划线和连字符
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();

    if username.len() < 3 || username.len() > 30 {
        return Err(invalid(
            "length",
            "Username must be between 3 and 30 characters.",
        ));
    }

    let pattern = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_-]+$").expect("username pattern is valid")
    });

    if !pattern.is_match(username) {
        return Err(invalid(
            "username",
            "Username may only contain letters, digits, underscores and hyphens.",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bookmark_url() {
        assert!(validate_bookmark_url("http://localhost:8000").is_ok());
        assert!(validate_bookmark_url("https://example.com/path?q=1").is_ok());
        assert!(validate_bookmark_url("ftp://files.example.com/pub").is_ok());

        assert!(validate_bookmark_url("").is_err());
        assert!(validate_bookmark_url("not a url").is_err());
        assert!(validate_bookmark_url("example.com").is_err());
        assert!(validate_bookmark_url("javascript:alert(1)").is_err());
        assert!(validate_bookmark_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("localhost").is_ok());
        assert!(validate_title(&"a".repeat(255)).is_ok());

        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_tag_name() {
        assert!(validate_tag_name("rust").is_ok());
        assert!(validate_tag_name("").is_err());
        assert!(validate_tag_name(&"t".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("user123").is_ok());
        assert!(validate_username("test_user").is_ok());
        assert!(validate_username("user-name").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("user@name").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn errors_carry_messages() {
        let err = validate_bookmark_url("nope").unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Enter a valid URL."));
    }
}
