use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, info};

use crate::dom;
use crate::error::LoadError;
use crate::fetch::Fetcher;
use crate::page::Page;

/// Fetches view templates into the document, at most once per id.
pub struct TemplateLoader {
    page: Rc<Page>,
    fetcher: Rc<dyn Fetcher>,
    attempted: RefCell<HashSet<String>>,
}

impl TemplateLoader {
    pub fn new(page: Rc<Page>, fetcher: Rc<dyn Fetcher>) -> Self {
        Self {
            page,
            fetcher,
            attempted: RefCell::new(HashSet::new()),
        }
    }

    pub fn is_attempted(&self, template_id: &str) -> bool {
        self.attempted.borrow().contains(template_id)
    }

    /// Make sure `<template id="template_id">` exists in the document.
    ///
    /// Present templates return at once. An id that was attempted before and
    /// is still absent fails without fetching again. Concurrent first calls for
    /// the same id are not merged.
    pub async fn ensure_template_available(
        &self,
        template_id: &str,
        source: &str,
    ) -> Result<(), LoadError> {
        if self.page.document().element_by_id(template_id).is_some() {
            return Ok(());
        }
        if self.is_attempted(template_id) {
            debug!("Template {} already attempted", template_id);
            return Err(LoadError::PreviouslyFailed(template_id.to_string()));
        }

        let result = self.fetch_into_document(source).await;
        let mut attempted = self.attempted.borrow_mut();
        attempted.insert(template_id.to_string());
        let loaded = result?;
        attempted.insert(loaded);
        Ok(())
    }

    async fn fetch_into_document(&self, source: &str) -> Result<String, LoadError> {
        let body = self.fetcher.fetch_text(source).await?;
        let mut doc = self.page.document_mut();
        let (id, template) = dom::parse_template(&mut doc, &body)
            .ok_or_else(|| LoadError::MalformedTemplate(source.to_string()))?;
        let body_node = doc.body();
        doc.append_child(body_node, template);
        info!("Loaded template {} from {}", id, source);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::MemoryFetcher;

    const HOME: &str = r#"<template id="view-home"><h1>Home</h1></template>"#;

    fn loader(fetcher: &Rc<MemoryFetcher>) -> (TemplateLoader, Rc<Page>) {
        let page = Rc::new(Page::default());
        (TemplateLoader::new(page.clone(), fetcher.clone()), page)
    }

    #[tokio::test]
    async fn successful_load_is_not_repeated() {
        let fetcher = Rc::new(MemoryFetcher::new());
        fetcher.insert("/views/home.html", HOME);
        let (loader, page) = loader(&fetcher);

        loader.ensure_template_available("view-home", "/views/home.html").await.unwrap();
        loader.ensure_template_available("view-home", "/views/home.html").await.unwrap();

        assert_eq!(fetcher.fetch_count("/views/home.html"), 1);
        assert!(page.document().element_by_id("view-home").is_some());
    }

    #[tokio::test]
    async fn failed_load_is_not_retried() {
        let fetcher = Rc::new(MemoryFetcher::new());
        fetcher.insert_status("/views/about.html", 503);
        let (loader, _) = loader(&fetcher);

        let first = loader.ensure_template_available("view-about", "/views/about.html").await;
        assert!(matches!(
            first,
            Err(LoadError::Fetch(FetchError::Status { status: 503, .. }))
        ));
        let second = loader.ensure_template_available("view-about", "/views/about.html").await;
        assert!(matches!(second, Err(LoadError::PreviouslyFailed(_))));
        assert_eq!(fetcher.fetch_count("/views/about.html"), 1);
    }

    #[tokio::test]
    async fn body_without_template_is_malformed() {
        let fetcher = Rc::new(MemoryFetcher::new());
        fetcher.insert("/views/blog.html", "<h1>not a template</h1>");
        let (loader, _) = loader(&fetcher);

        let result = loader.ensure_template_available("view-blog", "/views/blog.html").await;
        assert!(matches!(result, Err(LoadError::MalformedTemplate(_))));
        assert!(loader.is_attempted("view-blog"));
    }
}
