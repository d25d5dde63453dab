//! Static resource fetching.
//!
//! The page host supplies a [`Fetcher`]; everything that crosses a network
//! boundary (view templates, translation files, icon map, widget markup) goes
//! through it. Futures are not `Send`: the page runs on one thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use tracing::debug;

use crate::error::FetchError;

pub trait Fetcher {
    fn fetch_text<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<String, FetchError>>;
}

/// Serves a built site directory, mapping `base_url` onto `root`.
pub struct FsFetcher {
    root: PathBuf,
    base_url: String,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let relative = url.strip_prefix(self.base_url.as_str()).unwrap_or(url);
        self.root.join(relative.trim_start_matches('/'))
    }
}

impl Fetcher for FsFetcher {
    fn fetch_text<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<String, FetchError>> {
        async move {
            let path = self.path_for(url);
            debug!("Reading {} from {}", url, path.display());
            tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
                ErrorKind::NotFound => FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                },
                _ => FetchError::Network {
                    url: url.to_string(),
                    reason: e.to_string(),
                },
            })
        }
        .boxed_local()
    }
}

#[derive(Debug, Clone)]
struct Canned {
    body: Result<String, u16>,
    delay: Option<Duration>,
}

/// In-memory fetcher that records how often each URL was requested.
///
/// Unknown URLs answer 404. A per-URL delay (driven by `tokio::time`) lets
/// tests interleave slow and fast responses.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    responses: RefCell<HashMap<String, Canned>>,
    counts: RefCell<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<String>) {
        self.responses.borrow_mut().insert(
            url.into(),
            Canned {
                body: Ok(body.into()),
                delay: None,
            },
        );
    }

    pub fn insert_status(&self, url: impl Into<String>, status: u16) {
        self.responses.borrow_mut().insert(
            url.into(),
            Canned {
                body: Err(status),
                delay: None,
            },
        );
    }

    pub fn delay(&self, url: &str, delay: Duration) {
        if let Some(canned) = self.responses.borrow_mut().get_mut(url) {
            canned.delay = Some(delay);
        }
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.counts.borrow().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.counts.borrow().values().sum()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch_text<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<String, FetchError>> {
        async move {
            *self.counts.borrow_mut().entry(url.to_string()).or_default() += 1;
            let canned = self.responses.borrow().get(url).cloned();
            let Some(canned) = canned else {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                });
            };
            if let Some(delay) = canned.delay {
                tokio::time::sleep(delay).await;
            }
            canned.body.map_err(|status| FetchError::Status {
                url: url.to_string(),
                status,
            })
        }
        .boxed_local()
    }
}
