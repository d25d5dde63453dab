use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP {status}: {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },
}

/// A resource (template or translation file) could not be obtained.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no <template id=\"...\"> found in {0}")]
    MalformedTemplate(String),
    #[error("template {0} was already attempted and failed")]
    PreviouslyFailed(String),
    #[error("invalid JSON in {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("template element {0} not found after loading")]
    TemplateMissing(String),
    #[error("mount point #{0} not found")]
    MountPointMissing(String),
}

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("widget markup {0} has no root element")]
    EmptyMarkup(String),
    #[error("invalid mail link: {0}")]
    MailLink(#[from] url::ParseError),
}
