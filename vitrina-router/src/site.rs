use std::rc::Rc;

use tracing::{error, info};
use vitrina_core::SiteConfig;

use crate::dom::NodeId;
use crate::error::RouteError;
use crate::fetch::Fetcher;
use crate::i18n::LocaleStore;
use crate::i18n::render::Renderer;
use crate::page::Page;
use crate::router::{RouteOutcome, Router};
use crate::views::ViewRegistry;
use crate::widget::{self, InstantScheduler, Scheduler, Widget, WidgetContext, WidgetHost};

/// Builder for a [`Site`]. Mount hooks and the scheduler can only be set here.
pub struct SiteBuilder {
    config: SiteConfig,
    page: Page,
    fetcher: Rc<dyn Fetcher>,
    scheduler: Option<Rc<dyn Scheduler>>,
    hooks: Vec<(String, Box<dyn Fn(&Page, NodeId)>)>,
}

impl SiteBuilder {
    pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn on_mount(mut self, path: &str, hook: impl Fn(&Page, NodeId) + 'static) -> Self {
        self.hooks.push((path.to_string(), Box::new(hook)));
        self
    }

    pub fn build(self) -> Site {
        let config = Rc::new(self.config);
        let page = Rc::new(self.page);
        let fetcher = self.fetcher;
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Rc::new(InstantScheduler::new()));

        let locale = Rc::new(LocaleStore::new(config.clone(), page.clone(), fetcher.clone()));
        let views = self
            .hooks
            .into_iter()
            .fold(ViewRegistry::from_config(&config), |views, (path, hook)| {
                views.with_hook(&path, hook)
            });
        let router = Router::new(config.clone(), page.clone(), locale.clone(), fetcher.clone(), views);
        let ctx = WidgetContext {
            config: config.clone(),
            page: page.clone(),
            locale: locale.clone(),
            fetcher,
            scheduler,
        };
        let shell = config
            .shell
            .iter()
            .map(|spec| widget::build(spec, &ctx))
            .collect();
        let widgets = WidgetHost::new(ctx);
        widgets.attach();
        let renderer = Renderer::attach(page.clone(), &locale);

        Site {
            config,
            page,
            locale,
            router,
            widgets,
            shell,
            _renderer: renderer,
        }
    }
}

/// Everything one page needs, wired together.
pub struct Site {
    config: Rc<SiteConfig>,
    page: Rc<Page>,
    locale: Rc<LocaleStore>,
    router: Router,
    widgets: Rc<WidgetHost>,
    shell: Vec<Rc<dyn Widget>>,
    _renderer: Renderer,
}

impl Site {
    pub fn builder(config: SiteConfig, page: Page, fetcher: Rc<dyn Fetcher>) -> SiteBuilder {
        SiteBuilder {
            config,
            page,
            fetcher,
            scheduler: None,
            hooks: Vec::new(),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn page(&self) -> &Rc<Page> {
        &self.page
    }

    pub fn locale(&self) -> &Rc<LocaleStore> {
        &self.locale
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn widgets(&self) -> &Rc<WidgetHost> {
        &self.widgets
    }

    /// Widgets living outside the mount point, e.g. the language selector.
    pub fn shell(&self) -> &[Rc<dyn Widget>] {
        &self.shell
    }

    pub fn find_shell(&self, name: &str) -> Option<Rc<dyn Widget>> {
        self.shell.iter().find(|w| w.name() == name).cloned()
    }

    /// Initial page load: locale, shell widgets, then the current fragment.
    pub async fn boot(&self) -> Result<RouteOutcome, RouteError> {
        self.locale.init().await;
        for widget in &self.shell {
            if let Err(e) = widget.init().await {
                error!("Failed to initialize shell widget {}: {}", widget.name(), e);
            }
        }
        let outcome = self.router.start().await;
        self.widgets.init_pending().await;
        info!("Site booted at {}", self.page.fragment());
        outcome
    }

    /// Route whatever the fragment holds now, as after a `hashchange`.
    pub async fn location_changed(&self) -> Result<RouteOutcome, RouteError> {
        let outcome = self.router.start().await;
        self.widgets.init_pending().await;
        outcome
    }

    pub async fn navigate(&self, fragment: &str) -> Result<RouteOutcome, RouteError> {
        let outcome = self.router.navigate(fragment).await;
        self.widgets.init_pending().await;
        outcome
    }

    /// The language selector: switch language and stay on the same view.
    pub async fn select_language(&self, lang: &str) -> Result<Option<RouteOutcome>, RouteError> {
        let outcome = self.router.switch_language(lang).await;
        self.widgets.init_pending().await;
        outcome
    }

    /// Markup currently mounted at the mount point.
    pub fn mounted_html(&self) -> String {
        let doc = self.page.document();
        doc.element_by_id(&self.config.mount_point)
            .map(|mount| doc.inner_html(mount))
            .unwrap_or_default()
    }
}

impl Drop for Site {
    fn drop(&mut self) {
        for widget in &self.shell {
            widget.destroy();
        }
    }
}
