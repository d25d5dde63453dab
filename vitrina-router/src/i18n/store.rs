use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, error, info, warn};
use vitrina_core::SiteConfig;

use super::tree::{Translation, TranslationTree};
use super::{DetectContext, Lookup, annotate, detect_initial_language};
use crate::error::LoadError;
use crate::fetch::Fetcher;
use crate::page::{LanguageChanged, Page};

/// The active language and its tree. Written only by [`LocaleStore`].
#[derive(Debug, Clone)]
pub struct ActiveLocale {
    pub language: String,
    pub tree: Rc<TranslationTree>,
}

pub struct LocaleStore {
    config: Rc<SiteConfig>,
    page: Rc<Page>,
    fetcher: Rc<dyn Fetcher>,
    active: RefCell<ActiveLocale>,
    cache: RefCell<HashMap<String, Rc<TranslationTree>>>,
    failed: RefCell<HashSet<String>>,
    icons: RefCell<HashMap<String, String>>,
    icons_loaded: Cell<bool>,
    /// Bumped by every language switch; a switch that resumes from its fetch
    /// with a stale ticket leaves the state to the newer one.
    changes: Cell<u64>,
}

impl LocaleStore {
    /// Build the store and pick the initial language from storage, the
    /// current fragment and the navigator language. No fetch happens here.
    pub fn new(config: Rc<SiteConfig>, page: Rc<Page>, fetcher: Rc<dyn Fetcher>) -> Self {
        let language = {
            let i18n = &config.i18n;
            let stored = page.storage().get(&i18n.storage_key);
            let fragment = page.fragment();
            detect_initial_language(&DetectContext {
                stored: stored.as_deref(),
                fragment: &fragment,
                navigator: page.navigator_language(),
                supported: &i18n.supported,
                default: &i18n.default,
            })
        };
        debug!("Initial language: {}", language);

        Self {
            config,
            page,
            fetcher,
            active: RefCell::new(ActiveLocale {
                language,
                tree: Rc::new(TranslationTree::empty()),
            }),
            cache: RefCell::new(HashMap::new()),
            failed: RefCell::new(HashSet::new()),
            icons: RefCell::new(HashMap::new()),
            icons_loaded: Cell::new(false),
            changes: Cell::new(0),
        }
    }

    pub fn language(&self) -> String {
        self.active.borrow().language.clone()
    }

    pub fn active(&self) -> ActiveLocale {
        self.active.borrow().clone()
    }

    pub fn supported(&self) -> &[String] {
        &self.config.i18n.supported
    }

    pub fn is_supported(&self, lang: &str) -> bool {
        self.supported().iter().any(|s| s == lang)
    }

    /// Load the icon map and the tree for the initial language, then annotate
    /// the whole document.
    pub async fn init(&self) {
        self.load_icons().await;

        let ticket = self.changes.get();
        let language = self.language();
        let tree = self.load_translations(&language).await;
        if self.changes.get() != ticket {
            debug!("Language switched during init, keeping {}", self.language());
            return;
        }
        self.active.borrow_mut().tree = tree;

        let mut doc = self.page.document_mut();
        doc.set_lang(&language);
        let root = doc.html();
        annotate::apply_all(&mut doc, self, root);
        annotate::apply_meta(&mut doc, self);
        info!("Locale initialized: {}", language);
    }

    async fn load_icons(&self) {
        if self.icons_loaded.replace(true) {
            return;
        }
        let Some(path) = self.config.i18n.icons_path.as_deref() else {
            return;
        };
        let url = self.config.resolve_url(path);
        let icons = match self.fetcher.fetch_text(&url).await {
            Ok(body) => serde_json::from_str::<HashMap<String, String>>(&body).unwrap_or_else(|e| {
                error!("Invalid icon map {}: {}", url, e);
                HashMap::new()
            }),
            Err(e) => {
                error!("Failed to load icons: {}", e);
                HashMap::new()
            }
        };
        *self.icons.borrow_mut() = icons;
    }

    /// Tree for `lang`, falling back to the default language and then to an
    /// empty tree. A language that failed once is not fetched again.
    pub async fn load_translations(&self, lang: &str) -> Rc<TranslationTree> {
        if let Some(tree) = self.try_load(lang).await {
            return tree;
        }
        let default = self.config.i18n.default.as_str();
        if lang != default {
            warn!("Falling back to default language {} for {}", default, lang);
            if let Some(tree) = self.try_load(default).await {
                return tree;
            }
        }
        Rc::new(TranslationTree::empty())
    }

    async fn try_load(&self, lang: &str) -> Option<Rc<TranslationTree>> {
        if let Some(tree) = self.cache.borrow().get(lang) {
            return Some(tree.clone());
        }
        if self.failed.borrow().contains(lang) {
            debug!("Translations for {} failed earlier, skipping fetch", lang);
            return None;
        }
        match self.fetch_tree(lang).await {
            Ok(tree) => {
                let tree = Rc::new(tree);
                self.cache.borrow_mut().insert(lang.to_string(), tree.clone());
                Some(tree)
            }
            Err(e) => {
                error!("Error loading translations for {}: {}", lang, e);
                self.failed.borrow_mut().insert(lang.to_string());
                None
            }
        }
    }

    async fn fetch_tree(&self, lang: &str) -> Result<TranslationTree, LoadError> {
        let url = self.config.locale_url(lang);
        let body = self.fetcher.fetch_text(&url).await?;
        TranslationTree::from_json(&body).map_err(|source| LoadError::Json { url, source })
    }

    /// Switch the active language. Returns `false` for unsupported codes and
    /// when a newer switch started while this one was loading.
    pub async fn set_language(&self, lang: &str) -> bool {
        if !self.is_supported(lang) {
            error!("Unsupported language: {}", lang);
            return false;
        }

        let ticket = self.changes.get() + 1;
        self.changes.set(ticket);
        self.active.borrow_mut().language = lang.to_string();
        let tree = self.load_translations(lang).await;
        if self.changes.get() != ticket {
            debug!("Switch to {} superseded by {}", lang, self.language());
            return false;
        }
        self.active.borrow_mut().tree = tree.clone();
        self.page.storage().set(&self.config.i18n.storage_key, lang);

        {
            let mut doc = self.page.document_mut();
            doc.set_lang(lang);
            let root = doc.html();
            annotate::apply_all(&mut doc, self, root);
            annotate::apply_meta(&mut doc, self);
        }

        info!("Language changed to {}", lang);
        self.page.signals.language_changed.emit(&LanguageChanged {
            language: lang.to_string(),
            tree,
        });
        true
    }

    pub fn t(&self, key: &str, vars: &[(&str, &str)]) -> Translation {
        self.active.borrow().tree.translate(key, vars)
    }

    /// String form of [`t`](Self::t); structured values yield the key.
    pub fn text(&self, key: &str) -> String {
        self.t(key, &[]).into_text().unwrap_or_else(|| key.to_string())
    }

    pub fn config(&self, key: &str) -> Translation {
        self.t(key, &[])
    }

    pub fn guide(&self, key: &str) -> Translation {
        self.t(key, &[])
    }
}

impl Lookup for LocaleStore {
    fn lookup(&self, key: &str) -> Translation {
        self.t(key, &[])
    }

    fn icon(&self, name: &str) -> String {
        self.icons.borrow().get(name).cloned().unwrap_or_default()
    }
}
