//! YAML config loader with `${VAR}` / `${VAR:default}` substitution.

use dotenvy::dotenv;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::ConfigError;

fn var_regex() -> &'static Regex {
    static VAR_REGEX: OnceLock<Regex> = OnceLock::new();
    VAR_REGEX.get_or_init(|| {
        Regex::new(r"\$\{([A-Z0-9_]+)(?::([^\}]*))?\}").expect("Invalid regex pattern")
    })
}

fn any_var_regex() -> &'static Regex {
    static ANY_VAR_REGEX: OnceLock<Regex> = OnceLock::new();
    ANY_VAR_REGEX.get_or_init(|| Regex::new(r"\$\{[^\}]*\}?").expect("Invalid regex pattern"))
}

/// Replace environment placeholders in raw YAML text.
///
/// A `${...}` that is not a well-formed `${NAME}` or `${NAME:default}` is rejected
/// instead of being passed through to the YAML parser.
fn replace_vars(yaml_content: &str) -> Result<String, ConfigError> {
    // A missing .env is normal outside development.
    let _ = dotenv();

    let strict = var_regex();
    if let Some(bad) = any_var_regex()
        .find_iter(yaml_content)
        .map(|m| m.as_str())
        .find(|candidate| !strict.is_match(candidate))
    {
        return Err(ConfigError::InvalidVariable(bad.to_string()));
    }

    let result = strict.replace_all(yaml_content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str());

        match env::var(var_name) {
            Ok(val) => val,
            Err(_) => default.unwrap_or("").to_string(),
        }
    });

    Ok(result.into_owned())
}

/// Load and deserialize a YAML file.
pub fn load_from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)?;
    load_from_str(&content)
}

/// Deserialize YAML text after variable substitution.
pub fn load_from_str<T: DeserializeOwned>(yaml_content: &str) -> Result<T, ConfigError> {
    let replaced = replace_vars(yaml_content)?;
    let data = serde_yaml::from_str(&replaced)?;
    Ok(data)
}
