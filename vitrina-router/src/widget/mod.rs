//! Widgets that live inside one mounted view or in the page shell.
//!
//! The [`WidgetHost`] listens for mount announcements. Each announcement
//! destroys the widgets of the previous view before the ones configured for
//! the new template are built, so no listener outlives its view. Shell
//! widgets are built once by the site and live as long as the page.

mod accordion;
mod contact_form;
mod language_selector;
mod mobile_menu;
mod modal;
pub mod timeline;

pub use accordion::Accordion;
pub use contact_form::{ContactForm, ContactMessage};
pub use language_selector::LanguageSelector;
pub use mobile_menu::MobileMenu;
pub use modal::Modal;
pub use timeline::{AnimationId, InstantScheduler, Offset, Scheduler, Step, TimedScheduler, Timeline};

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use tracing::{debug, error};
use vitrina_core::SiteConfig;
use vitrina_core::site::WidgetSpec;

use crate::error::WidgetError;
use crate::fetch::Fetcher;
use crate::i18n::LocaleStore;
use crate::page::{MountAnnouncement, Page};
use crate::signal::SubscriptionId;

pub trait Widget {
    fn name(&self) -> &str;
    /// Fetch markup and wire listeners. Leaves the widget hidden or collapsed.
    fn init(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>>;
    /// Open a modal, or toggle an accordion member. `target` selects what.
    fn activate(&self, target: Option<&str>);
    fn close(&self);
    /// Drop listeners, stop animations and remove owned markup.
    fn destroy(&self);
}

/// Shared handles every widget is built from.
#[derive(Clone)]
pub struct WidgetContext {
    pub config: Rc<SiteConfig>,
    pub page: Rc<Page>,
    pub locale: Rc<LocaleStore>,
    pub fetcher: Rc<dyn Fetcher>,
    pub scheduler: Rc<dyn Scheduler>,
}

/// Construct the widget a config entry describes. Nothing is wired until `init`.
pub fn build(spec: &WidgetSpec, ctx: &WidgetContext) -> Rc<dyn Widget> {
    let ctx = ctx.clone();
    match spec {
        WidgetSpec::Modal(spec) => Modal::new(spec.clone(), ctx),
        WidgetSpec::Accordion(spec) => Accordion::new(spec.clone(), ctx),
        WidgetSpec::LanguageSelector(spec) => LanguageSelector::new(spec.clone(), ctx),
        WidgetSpec::MobileMenu(spec) => MobileMenu::new(spec.clone(), ctx),
        WidgetSpec::ContactForm(spec) => ContactForm::new(spec.clone(), ctx),
    }
}

pub struct WidgetHost {
    ctx: WidgetContext,
    active: RefCell<Vec<Rc<dyn Widget>>>,
    pending: RefCell<Vec<Rc<dyn Widget>>>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl WidgetHost {
    pub fn new(ctx: WidgetContext) -> Rc<Self> {
        Rc::new(Self {
            ctx,
            active: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
            subscription: Cell::new(None),
        })
    }

    /// Start following route mounts. Calling it twice has no effect.
    pub fn attach(self: &Rc<Self>) {
        if self.subscription.get().is_some() {
            return;
        }
        let host: Weak<Self> = Rc::downgrade(self);
        let id = self.ctx.page.signals.route_mounted.subscribe(move |announcement| {
            if let Some(host) = host.upgrade() {
                host.on_mount(announcement);
            }
        });
        self.subscription.set(Some(id));
    }

    pub fn detach(&self) {
        if let Some(id) = self.subscription.take() {
            self.ctx.page.signals.route_mounted.unsubscribe(id);
        }
        self.teardown();
    }

    fn on_mount(&self, announcement: &MountAnnouncement) {
        self.teardown();
        let Some(specs) = self.ctx.config.widgets.get(&announcement.template_id) else {
            return;
        };
        let widgets: Vec<Rc<dyn Widget>> = specs.iter().map(|spec| build(spec, &self.ctx)).collect();
        debug!(
            "Built {} widget(s) for {}",
            widgets.len(),
            announcement.template_id
        );
        self.pending.borrow_mut().extend(widgets.iter().cloned());
        *self.active.borrow_mut() = widgets;
    }

    /// Initialize widgets built by the last mount. Failures are logged and the
    /// widget stays inert.
    pub async fn init_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for widget in pending {
            if let Err(e) = widget.init().await {
                error!("Failed to initialize widget {}: {}", widget.name(), e);
            }
        }
    }

    /// Destroy every widget of the current view.
    pub fn teardown(&self) {
        self.pending.borrow_mut().clear();
        let widgets = std::mem::take(&mut *self.active.borrow_mut());
        for widget in widgets {
            widget.destroy();
        }
    }

    pub fn widgets(&self) -> Vec<Rc<dyn Widget>> {
        self.active.borrow().clone()
    }

    pub fn find(&self, name: &str) -> Option<Rc<dyn Widget>> {
        self.active.borrow().iter().find(|w| w.name() == name).cloned()
    }
}

impl Drop for WidgetHost {
    fn drop(&mut self) {
        self.detach();
    }
}
