use thiserror::Error;
use validator::ValidationErrors;

/// Errors raised while loading or checking `site.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("Invalid variable format: {0}")]
    InvalidVariable(String),
    #[error("Invalid config: {0}")]
    Validate(#[from] ValidationErrors),
    #[error("Unsupported language code: {0}")]
    BadLanguage(String),
    #[error("Default language {0} is not in the supported list")]
    DefaultNotSupported(String),
    #[error("View {path} has an empty {field}")]
    EmptyView { path: String, field: &'static str },
}
