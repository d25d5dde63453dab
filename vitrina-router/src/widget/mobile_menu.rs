use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use tracing::debug;
use vitrina_core::site::MobileMenuSpec;

use super::{Widget, WidgetContext};
use crate::dom::NodeId;
use crate::error::WidgetError;
use crate::page::{EventKind, ListenTarget, ListenerId};

#[derive(Default)]
struct MenuState {
    parts: Option<(NodeId, NodeId)>,
    listeners: Vec<ListenerId>,
}

/// Off-canvas shell navigation. Any link inside it, or a click on the
/// overlay itself, closes it again.
pub struct MobileMenu {
    spec: MobileMenuSpec,
    ctx: WidgetContext,
    state: RefCell<MenuState>,
    me: Weak<MobileMenu>,
}

impl MobileMenu {
    pub fn new(spec: MobileMenuSpec, ctx: WidgetContext) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            spec,
            ctx,
            state: RefCell::new(MenuState::default()),
            me: me.clone(),
        })
    }

    pub fn is_open(&self) -> bool {
        let Some((_, menu)) = self.state.borrow().parts else {
            return false;
        };
        self.ctx.page.document().attr(menu, "aria-hidden") == Some("false")
    }

    fn setup(&self) {
        if self.state.borrow().parts.is_some() {
            return;
        }
        let found = {
            let doc = self.ctx.page.document();
            doc.element_by_id(&self.spec.button_id)
                .zip(doc.element_by_id(&self.spec.menu_id))
        };
        let Some((button, menu)) = found else {
            debug!("No mobile menu in this page");
            return;
        };
        self.state.borrow_mut().parts = Some((button, menu));

        let page = &self.ctx.page;
        let mut listeners = Vec::new();

        let me = self.me.clone();
        listeners.push(page.listen(ListenTarget::Node(button), EventKind::Click, move |_| {
            if let Some(menu) = me.upgrade() {
                menu.toggle();
            }
        }));

        // Links and the bare overlay both close; clicks on other content do not.
        let me = self.me.clone();
        listeners.push(page.listen(ListenTarget::Node(menu), EventKind::Click, move |event| {
            let Some(this) = me.upgrade() else { return };
            let Some(target) = event.target() else { return };
            let on_link = this
                .ctx
                .page
                .document()
                .closest(target, |el| el.tag() == "a")
                .is_some();
            if target == menu || on_link {
                this.set_open(false);
            }
        }));

        self.state.borrow_mut().listeners = listeners;
        debug!("Mobile menu ready");
    }

    fn toggle(&self) {
        self.set_open(!self.is_open());
    }

    fn set_open(&self, open: bool) {
        let Some((button, menu)) = self.state.borrow().parts else {
            return;
        };
        let mut doc = self.ctx.page.document_mut();
        if open {
            doc.remove_class(menu, &self.spec.hidden_class);
        } else {
            doc.add_class(menu, &self.spec.hidden_class);
        }
        doc.set_attr(menu, "aria-hidden", if open { "false" } else { "true" });
        doc.set_attr(button, "aria-expanded", if open { "true" } else { "false" });
    }
}

impl Widget for MobileMenu {
    fn name(&self) -> &str {
        &self.spec.menu_id
    }

    fn init(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>> {
        self.setup();
        future::ready(Ok(())).boxed_local()
    }

    fn activate(&self, _target: Option<&str>) {
        self.toggle();
    }

    fn close(&self) {
        self.set_open(false);
    }

    fn destroy(&self) {
        let listeners = {
            let mut state = self.state.borrow_mut();
            state.parts = None;
            std::mem::take(&mut state.listeners)
        };
        for id in listeners {
            self.ctx.page.unlisten(id);
        }
    }
}
