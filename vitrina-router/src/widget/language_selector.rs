use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use tracing::{debug, info};
use vitrina_core::site::LanguageSelectorSpec;

use super::{Widget, WidgetContext};
use crate::dom::NodeId;
use crate::error::WidgetError;
use crate::i18n::LanguagePrefix;
use crate::page::{EventKind, ListenTarget, ListenerId};
use crate::signal::SubscriptionId;

pub const OPTION_CLASS: &str = "lang-option";
pub const CHECK_CLASS: &str = "lang-check";
pub const HIDDEN_CLASS: &str = "hidden";
const LANG_ATTR: &str = "data-lang";

#[derive(Debug, Clone, Copy)]
struct Parts {
    button: NodeId,
    menu: NodeId,
    label: NodeId,
}

#[derive(Default)]
struct SelectorState {
    parts: Option<Parts>,
    listeners: Vec<ListenerId>,
    subscription: Option<SubscriptionId>,
}

/// Shell dropdown that moves the current view to another language.
///
/// Picking a language only rewrites the fragment; the router syncs the
/// locale on the following pass and the selector repaints itself from the
/// language-changed signal.
pub struct LanguageSelector {
    spec: LanguageSelectorSpec,
    ctx: WidgetContext,
    prefix: LanguagePrefix,
    state: RefCell<SelectorState>,
    me: Weak<LanguageSelector>,
}

impl LanguageSelector {
    pub fn new(spec: LanguageSelectorSpec, ctx: WidgetContext) -> Rc<Self> {
        let prefix = LanguagePrefix::new(&ctx.config.i18n.supported);
        Rc::new_cyclic(|me| Self {
            spec,
            ctx,
            prefix,
            state: RefCell::new(SelectorState::default()),
            me: me.clone(),
        })
    }

    fn parts(&self) -> Option<Parts> {
        self.state.borrow().parts
    }

    pub fn is_open(&self) -> bool {
        self.parts()
            .is_some_and(|p| !self.ctx.page.document().has_class(p.menu, HIDDEN_CLASS))
    }

    fn options(&self, menu: NodeId) -> Vec<NodeId> {
        self.ctx
            .page
            .document()
            .query_all(menu, |el| el.has_class(OPTION_CLASS))
    }

    fn setup(&self) {
        if self.parts().is_some() {
            return;
        }

        let parts = {
            let doc = self.ctx.page.document();
            let find = |id: &str| doc.element_by_id(id);
            match (
                find(&self.spec.button_id),
                find(&self.spec.menu_id),
                find(&self.spec.label_id),
            ) {
                (Some(button), Some(menu), Some(label)) => Parts { button, menu, label },
                _ => {
                    debug!("No language selector in this page");
                    return;
                }
            }
        };

        self.state.borrow_mut().parts = Some(parts);
        self.refresh(&self.ctx.locale.language());
        let listeners = self.wire(parts);

        let me = self.me.clone();
        let subscription = self.ctx.page.signals.language_changed.subscribe(move |changed| {
            if let Some(selector) = me.upgrade() {
                selector.refresh(&changed.language);
            }
        });

        let mut state = self.state.borrow_mut();
        state.listeners = listeners;
        state.subscription = Some(subscription);
        info!("Language selector ready");
    }

    fn wire(&self, parts: Parts) -> Vec<ListenerId> {
        let page = &self.ctx.page;
        let mut listeners = Vec::new();

        let me = self.me.clone();
        listeners.push(page.listen(ListenTarget::Node(parts.button), EventKind::Click, move |_| {
            if let Some(selector) = me.upgrade() {
                selector.toggle();
            }
        }));

        for option in self.options(parts.menu) {
            let Some(lang) = page.document().attr(option, LANG_ATTR).map(str::to_string) else {
                continue;
            };
            let me = self.me.clone();
            listeners.push(page.listen(ListenTarget::Node(option), EventKind::Click, move |_| {
                if let Some(selector) = me.upgrade() {
                    selector.select(&lang);
                }
            }));
        }

        // Clicks that bubble up from the button or the menu are already handled.
        let me = self.me.clone();
        listeners.push(page.listen(ListenTarget::Document, EventKind::Click, move |event| {
            let Some(selector) = me.upgrade() else { return };
            let inside = event.target().is_some_and(|target| {
                let doc = selector.ctx.page.document();
                doc.contains(parts.button, target) || doc.contains(parts.menu, target)
            });
            if !inside {
                selector.close_menu();
            }
        }));

        let me = self.me.clone();
        listeners.push(page.listen(ListenTarget::Document, EventKind::KeyDown, move |event| {
            if let Some(selector) = me.upgrade()
                && event.key() == Some("Escape")
            {
                selector.close_menu();
            }
        }));

        listeners
    }

    fn toggle(&self) {
        if self.is_open() {
            self.close_menu();
        } else {
            self.open_menu();
        }
    }

    fn open_menu(&self) {
        let Some(parts) = self.parts() else { return };
        let first = self.options(parts.menu).first().copied();
        let mut doc = self.ctx.page.document_mut();
        doc.remove_class(parts.menu, HIDDEN_CLASS);
        doc.set_attr(parts.button, "aria-expanded", "true");
        if let Some(first) = first {
            doc.focus(first);
        }
    }

    fn close_menu(&self) {
        let Some(parts) = self.parts() else { return };
        let mut doc = self.ctx.page.document_mut();
        doc.add_class(parts.menu, HIDDEN_CLASS);
        doc.set_attr(parts.button, "aria-expanded", "false");
    }

    /// Point the fragment at the current view under `lang` and close.
    pub fn select(&self, lang: &str) {
        if self.parts().is_none() {
            return;
        }
        let locale = &self.ctx.locale;
        if lang != locale.language() && locale.is_supported(lang) {
            let target = self.prefix.relocalize(&self.ctx.page.fragment(), lang);
            debug!("Language selector moving to {}", target);
            self.ctx.page.set_fragment(&target);
        }
        self.close_menu();
    }

    /// Uppercase code in the label, check mark on the active option only.
    fn refresh(&self, language: &str) {
        let Some(parts) = self.parts() else { return };
        let mut doc = self.ctx.page.document_mut();
        doc.set_text_content(parts.label, &language.to_uppercase());
        let options = doc.query_all(parts.menu, |el| el.has_class(OPTION_CLASS));
        for option in options {
            let active = doc.attr(option, LANG_ATTR) == Some(language);
            let Some(check) = doc.query_first(option, |el| el.has_class(CHECK_CLASS)) else {
                continue;
            };
            if active {
                doc.remove_class(check, HIDDEN_CLASS);
            } else {
                doc.add_class(check, HIDDEN_CLASS);
            }
        }
    }
}

impl Widget for LanguageSelector {
    fn name(&self) -> &str {
        &self.spec.button_id
    }

    fn init(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>> {
        self.setup();
        future::ready(Ok(())).boxed_local()
    }

    /// With a language code, select it; otherwise toggle the menu.
    fn activate(&self, target: Option<&str>) {
        match target {
            Some(lang) => self.select(lang),
            None => self.toggle(),
        }
    }

    fn close(&self) {
        self.close_menu();
    }

    fn destroy(&self) {
        let (listeners, subscription) = {
            let mut state = self.state.borrow_mut();
            state.parts = None;
            (std::mem::take(&mut state.listeners), state.subscription.take())
        };
        for id in listeners {
            self.ctx.page.unlisten(id);
        }
        if let Some(id) = subscription {
            self.ctx.page.signals.language_changed.unsubscribe(id);
        }
    }
}
