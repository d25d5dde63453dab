//! Format checks for personal configuration values bound into the page.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;
use validator::ValidateUrl;

pub const EMAIL_PLACEHOLDER: &str = "your@email.com";
pub const GITHUB_PLACEHOLDER: &str = "https://github.com";
pub const LINKEDIN_PLACEHOLDER: &str = "https://linkedin.com";

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex pattern"))
}

pub fn is_email(value: &str) -> bool {
    email_regex().is_match(value)
}

/// Check a config value against the format implied by its key.
///
/// Keys containing `email` must hold an address, keys containing `_url` an
/// absolute URL. A failing value is replaced by a safe placeholder; other keys
/// pass through untouched.
pub fn config_value<'a>(key: &str, value: &'a str) -> &'a str {
    if key.contains("email") && !is_email(value) {
        warn!("Invalid email format for {}: {}", key, value);
        return EMAIL_PLACEHOLDER;
    }

    if key.contains("_url") && !value.validate_url() {
        warn!("Invalid URL format for {}: {}", key, value);
        return if key.contains("github") {
            GITHUB_PLACEHOLDER
        } else {
            LINKEDIN_PLACEHOLDER
        };
    }

    value
}
