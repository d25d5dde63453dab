//! Hash router.
//!
//! A pass reads the fragment, makes sure it carries a supported language
//! prefix (rewriting it when it does not), syncs the active language, resolves
//! the logical path and mounts the view. Passes are numbered; a pass that
//! resumes from a fetch after a newer pass has started gives up without
//! touching the mount point.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, error, info, warn};
use vitrina_core::SiteConfig;

use crate::error::RouteError;
use crate::fetch::Fetcher;
use crate::i18n::{LanguagePrefix, LocaleStore, annotate};
use crate::page::{MountAnnouncement, Page};
use crate::template::TemplateLoader;
use crate::views::{ViewDescriptor, ViewRegistry};

/// Path announced when the not-found view is mounted as a fallback.
pub const NOT_FOUND_PATH: &str = "404";

pub const ACTIVE_NAV_CLASS: &str = "active";

/// A rewritten fragment can only be rewritten again if the language set
/// changed underneath; stop after this many.
const MAX_REWRITES: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The fragment lacked a language prefix and was replaced by this one.
    Redirected(String),
    Mounted(MountAnnouncement),
    /// A newer pass started while this one was waiting.
    Stale,
}

pub struct Router {
    config: Rc<SiteConfig>,
    page: Rc<Page>,
    locale: Rc<LocaleStore>,
    views: ViewRegistry,
    templates: TemplateLoader,
    prefix: LanguagePrefix,
    generation: Cell<u64>,
}

impl Router {
    pub fn new(
        config: Rc<SiteConfig>,
        page: Rc<Page>,
        locale: Rc<LocaleStore>,
        fetcher: Rc<dyn Fetcher>,
        views: ViewRegistry,
    ) -> Self {
        let prefix = LanguagePrefix::new(&config.i18n.supported);
        Self {
            templates: TemplateLoader::new(page.clone(), fetcher),
            config,
            page,
            locale,
            views,
            prefix,
            generation: Cell::new(0),
        }
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    pub fn templates(&self) -> &TemplateLoader {
        &self.templates
    }

    pub fn prefix(&self) -> &LanguagePrefix {
        &self.prefix
    }

    /// Route the current fragment (initial page load).
    pub async fn start(&self) -> Result<RouteOutcome, RouteError> {
        self.run().await
    }

    /// Write `fragment` and route it.
    pub async fn navigate(&self, fragment: &str) -> Result<RouteOutcome, RouteError> {
        self.page.set_fragment(fragment);
        self.run().await
    }

    /// Change language and re-route the current logical path under it.
    pub async fn switch_language(&self, lang: &str) -> Result<Option<RouteOutcome>, RouteError> {
        if !self.locale.set_language(lang).await {
            return Ok(None);
        }
        let target = self.prefix.relocalize(&self.page.fragment(), lang);
        self.navigate(&target).await.map(Some)
    }

    /// Re-enter once per rewrite, as a browser would on the resulting
    /// location change.
    async fn run(&self) -> Result<RouteOutcome, RouteError> {
        let mut rewrites = 0;
        loop {
            match self.handle_route().await? {
                RouteOutcome::Redirected(target) if rewrites < MAX_REWRITES => {
                    rewrites += 1;
                    debug!("Re-entering after rewrite to {}", target);
                }
                RouteOutcome::Redirected(target) => {
                    warn!("Giving up after rewriting to {}", target);
                    return Ok(RouteOutcome::Redirected(target));
                }
                outcome => return Ok(outcome),
            }
        }
    }

    fn begin_pass(&self) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        generation
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.get() != generation
    }

    /// One pass of the state machine over the current fragment.
    pub async fn handle_route(&self) -> Result<RouteOutcome, RouteError> {
        let generation = self.begin_pass();
        let fragment = self.page.fragment();
        let hash = match fragment.trim_start_matches('#') {
            "" => "/",
            hash => hash,
        };

        let Some((lang, path)) = self.prefix.split(hash) else {
            let lang = self.locale.language();
            let target = format!("#/{}/{}", lang, hash.trim_start_matches('/'));
            info!("Rewriting {} to {}", hash, target);
            self.page.set_fragment(&target);
            return Ok(RouteOutcome::Redirected(target));
        };

        if lang != self.locale.language() {
            self.locale.set_language(lang).await;
            if self.is_stale(generation) {
                debug!("Route pass {} superseded during language sync", generation);
                return Ok(RouteOutcome::Stale);
            }
        }

        let view = self.views.resolve(path);
        let found = self.views.get(path).is_some();
        match self.render(view, path, generation).await {
            Ok(Some(announcement)) => {
                self.update_active_nav(lang, path);
                Ok(RouteOutcome::Mounted(announcement))
            }
            Ok(None) => Ok(RouteOutcome::Stale),
            Err(e) if self.is_stale(generation) => {
                debug!("Ignoring failure of superseded pass {}: {}", generation, e);
                Ok(RouteOutcome::Stale)
            }
            Err(e) if found => {
                error!("Error loading {}: {}", path, e);
                match self.render(self.views.not_found(), NOT_FOUND_PATH, generation).await? {
                    Some(announcement) => Ok(RouteOutcome::Mounted(announcement)),
                    None => Ok(RouteOutcome::Stale),
                }
            }
            Err(e) => {
                error!("Error loading not-found view: {}", e);
                Err(e)
            }
        }
    }

    /// Mount `view` at the mount point. `Ok(None)` when the pass went stale.
    async fn render(
        &self,
        view: &ViewDescriptor,
        path: &str,
        generation: u64,
    ) -> Result<Option<MountAnnouncement>, RouteError> {
        let mount_id = &self.config.mount_point;
        {
            let mut doc = self.page.document_mut();
            let mount = doc
                .element_by_id(mount_id)
                .ok_or_else(|| RouteError::MountPointMissing(mount_id.clone()))?;
            doc.clear_children(mount);
        }

        self.templates
            .ensure_template_available(&view.template_id, &view.source)
            .await?;
        if self.is_stale(generation) {
            debug!("Route pass {} superseded while loading {}", generation, path);
            return Ok(None);
        }

        let mount = {
            let mut doc = self.page.document_mut();
            let mount = doc
                .element_by_id(mount_id)
                .ok_or_else(|| RouteError::MountPointMissing(mount_id.clone()))?;
            let template = doc
                .element_by_id(&view.template_id)
                .filter(|t| doc.tag(*t) == Some("template"))
                .ok_or_else(|| RouteError::TemplateMissing(view.template_id.clone()))?;
            doc.clear_children(mount);
            doc.clone_children_into(template, mount);

            let root = doc.html();
            annotate::apply_all(&mut doc, &*self.locale, root);
            annotate::apply_meta(&mut doc, &*self.locale);
            annotate::prefix_internal_links(&mut doc, mount, &self.locale.language(), &self.prefix);
            mount
        };

        if let Some(hook) = view.on_mount() {
            hook(&*self.page, mount);
        }

        let announcement = MountAnnouncement {
            path: path.to_string(),
            template_id: view.template_id.clone(),
            mount,
        };
        info!("Mounted {} ({})", path, view.template_id);
        self.page.signals.route_mounted.emit(&announcement);
        self.page.scroll_to(0.0);
        Ok(Some(announcement))
    }

    /// Mark the nav link pointing at `#/<lang><path>` as current.
    fn update_active_nav(&self, lang: &str, path: &str) {
        let current = format!("#/{lang}{path}");
        let mut doc = self.page.document_mut();
        let root = doc.html();
        let links: Vec<_> = doc
            .query_all(root, |el| {
                el.tag() == "a" && el.attr("href").is_some_and(|h| h.starts_with("#/"))
            })
            .into_iter()
            .filter(|link| doc.closest(*link, |el| el.tag() == "nav").is_some())
            .collect();

        for link in links {
            if doc.attr(link, "href") == Some(current.as_str()) {
                doc.set_attr(link, "aria-current", "page");
                doc.add_class(link, ACTIVE_NAV_CLASS);
            } else {
                doc.remove_attr(link, "aria-current");
                doc.remove_class(link, ACTIVE_NAV_CLASS);
            }
        }
    }
}
