pub mod error;
pub mod site;
pub mod validate;
pub mod yaml;

pub use error::ConfigError;
pub use site::SiteConfig;
