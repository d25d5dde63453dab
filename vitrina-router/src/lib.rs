pub mod dom;
pub mod error;
pub mod fetch;
pub mod i18n;
pub mod page;
pub mod router;
pub mod signal;
pub mod site;
pub mod template;
pub mod views;
pub mod widget;

pub use error::{FetchError, LoadError, RouteError, WidgetError};
pub use fetch::{Fetcher, FsFetcher, MemoryFetcher};
pub use i18n::{LocaleStore, Translation, TranslationTree};
pub use page::{MemoryStorage, Page, Storage};
pub use router::{RouteOutcome, Router};
pub use site::{Site, SiteBuilder};
pub use views::{ViewDescriptor, ViewRegistry};
pub use widget::{Widget, WidgetHost};
