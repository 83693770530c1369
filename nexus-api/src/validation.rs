//! Custom `validator` rules shared by the request payloads

use std::borrow::Cow;

use nexus_shared::auth::password::validate_password_length;
use validator::{ValidateUrl, ValidationError};

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// `#rgb` or `#rrggbb`
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

pub fn hex_color(value: &str) -> Result<(), ValidationError> {
    if is_hex_color(value) {
        Ok(())
    } else {
        Err(error("hex_color", "must be a hex color like #1a2b3c"))
    }
}

/// Board backgrounds are a hex color or an image URL
pub fn color_or_url(value: &str) -> Result<(), ValidationError> {
    if is_hex_color(value) || value.validate_url() {
        Ok(())
    } else {
        Err(error("color_or_url", "must be a hex color or a URL"))
    }
}

pub fn board_visibility(value: &str) -> Result<(), ValidationError> {
    match value {
        "private" | "team" | "public" => Ok(()),
        _ => Err(error("visibility", "must be one of private, team, public")),
    }
}

pub fn project_status(value: &str) -> Result<(), ValidationError> {
    match value {
        "active" | "archived" | "completed" => Ok(()),
        _ => Err(error("status", "must be one of active, archived, completed")),
    }
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    validate_password_length(value).map_err(|message| error("password_length", message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#1A2b3C"));
        assert!(!is_hex_color("fff"));
        assert!(!is_hex_color("#ggg"));
        assert!(!is_hex_color("#12345"));
    }

    #[test]
    fn test_color_or_url() {
        assert!(color_or_url("#000000").is_ok());
        assert!(color_or_url("https://images.example.com/bg.png").is_ok());
        assert!(color_or_url("blue").is_err());
    }

    #[test]
    fn test_enumerated_values() {
        assert!(board_visibility("team").is_ok());
        assert!(board_visibility("secret").is_err());
        assert!(project_status("completed").is_ok());
        assert!(project_status("done").is_err());
    }

    #[test]
    fn test_password_rule_counts_characters() {
        assert!(password("ünïcödé!").is_ok());
        assert!(password("short").is_err());
        assert!(password(&"x".repeat(73)).is_err());
    }
}
