use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use vitrina_core::site::{ModalContent, ModalSpec};

use super::timeline::{AnimationId, Offset, Timeline};
use super::{Widget, WidgetContext};
use crate::dom::{self, Document, NodeId};
use crate::error::{LoadError, WidgetError};
use crate::i18n::{Translation, annotate};
use crate::page::{EventKind, ListenTarget, ListenerId, PageEvent};

pub const BODY_OPEN_CLASS: &str = "modal-open";
const CONTENT_CLASS: &str = "modal-content";
const CLOSE_CLASS: &str = "modal-close";
const SECTION_CLASS: &str = "modal-section";

#[derive(Default)]
struct ModalState {
    root: Option<NodeId>,
    content: Option<NodeId>,
    listeners: Vec<ListenerId>,
    animation: Option<AnimationId>,
    is_open: bool,
    /// Scroll offset recorded by the most recent `open`.
    saved_scroll: Option<f64>,
    current: Option<String>,
    destroyed: bool,
}

/// Overlay dialog whose markup is fetched from its own template resource.
pub struct Modal {
    spec: ModalSpec,
    source: String,
    ctx: WidgetContext,
    state: RefCell<ModalState>,
    me: Weak<Modal>,
}

impl Modal {
    pub fn new(spec: ModalSpec, ctx: WidgetContext) -> Rc<Self> {
        let source = ctx.config.resolve_url(&spec.source);
        Rc::new_cyclic(|me| Self {
            spec,
            source,
            ctx,
            state: RefCell::new(ModalState::default()),
            me: me.clone(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open
    }

    /// Id passed to the last `open`, if any.
    pub fn current(&self) -> Option<String> {
        self.state.borrow().current.clone()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.state.borrow().root
    }

    async fn load(&self) -> Result<(), WidgetError> {
        let body = self
            .ctx
            .fetcher
            .fetch_text(&self.source)
            .await
            .map_err(LoadError::from)?;
        if self.state.borrow().destroyed {
            debug!("Modal {} destroyed before its markup arrived", self.spec.template_id);
            return Ok(());
        }

        let (root, content, close_button) = {
            let mut doc = self.ctx.page.document_mut();
            let (id, template) = dom::parse_template(&mut doc, &body)
                .ok_or_else(|| LoadError::MalformedTemplate(self.source.clone()))?;
            if id != self.spec.template_id {
                warn!("Expected template {} in {}, found {}", self.spec.template_id, self.source, id);
            }
            let first = doc
                .children(template)
                .iter()
                .copied()
                .find(|c| doc.element(*c).is_some());
            let root = first.and_then(|first| doc.deep_clone(first));
            doc.remove(template);
            let root = root.ok_or_else(|| WidgetError::EmptyMarkup(self.spec.template_id.clone()))?;
            let body_node = doc.body();
            doc.append_child(body_node, root);
            doc.set_style(root, "display", "none");
            let content = doc.query_first(root, |el| el.has_class(CONTENT_CLASS));
            let close_button = doc.query_first(root, |el| el.has_class(CLOSE_CLASS));
            (root, content, close_button)
        };

        let listeners = self.wire(root, close_button);
        let mut state = self.state.borrow_mut();
        state.root = Some(root);
        state.content = content;
        state.listeners = listeners;
        info!("Modal {} ready", self.spec.template_id);
        Ok(())
    }

    fn wire(&self, root: NodeId, close_button: Option<NodeId>) -> Vec<ListenerId> {
        let page = &self.ctx.page;
        let mut listeners = Vec::new();

        if let Some(button) = close_button {
            let me = self.me.clone();
            listeners.push(page.listen(ListenTarget::Node(button), EventKind::Click, move |_| {
                if let Some(modal) = me.upgrade() {
                    modal.close();
                }
            }));
        }

        // Backdrop: only clicks that land on the overlay itself.
        let me = self.me.clone();
        listeners.push(page.listen(ListenTarget::Node(root), EventKind::Click, move |event| {
            if let Some(modal) = me.upgrade()
                && event.target() == Some(root)
            {
                modal.close();
            }
        }));

        let me = self.me.clone();
        listeners.push(page.listen(ListenTarget::Document, EventKind::KeyDown, move |event| {
            if let Some(modal) = me.upgrade()
                && event.key() == Some("Escape")
                && modal.is_open()
            {
                modal.close();
            }
        }));

        if let Some(attr) = self.spec.trigger_attr.clone() {
            let mount = page.document().element_by_id(&self.ctx.config.mount_point);
            match mount {
                Some(mount) => {
                    let me = self.me.clone();
                    listeners.push(page.listen(ListenTarget::Node(mount), EventKind::Click, move |event| {
                        let Some(modal) = me.upgrade() else { return };
                        if let Some(value) = modal.trigger_value(event, &attr) {
                            debug!("Opening modal for {}", value);
                            modal.open(Some(&value));
                        }
                    }));
                }
                None => debug!("No mount point for {} triggers", self.spec.template_id),
            }
        }

        listeners
    }

    fn trigger_value(&self, event: &PageEvent, attr: &str) -> Option<String> {
        let doc = self.ctx.page.document();
        let card = doc.closest(event.target()?, |el| el.has_attr(attr))?;
        doc.attr(card, attr).map(str::to_string)
    }

    pub fn open(&self, target: Option<&str>) {
        let (root, content) = {
            let state = self.state.borrow();
            if state.is_open || state.destroyed {
                return;
            }
            let Some(root) = state.root else {
                debug!("Modal {} opened before init", self.spec.template_id);
                return;
            };
            (root, state.content)
        };

        let scroll = self.ctx.page.scroll_y();
        {
            let mut state = self.state.borrow_mut();
            state.is_open = true;
            state.current = target.map(str::to_string);
            state.saved_scroll = Some(scroll);
        }

        if let (ModalContent::Project, Some(id)) = (self.spec.content, target) {
            self.fill_project(root, id);
        }

        {
            let mut doc = self.ctx.page.document_mut();
            let body = doc.body();
            doc.set_style(body, "position", "fixed");
            doc.set_style(body, "top", &format!("-{scroll}px"));
            doc.set_style(body, "width", "100%");
            doc.add_class(body, BODY_OPEN_CLASS);
        }

        let timeline = self.entrance(root, content);
        let id = self.ctx.scheduler.play(&self.ctx.page, timeline);
        self.replace_animation(Some(id));

        if let Some(content) = content {
            self.ctx.page.document_mut().focus(content);
        }
    }

    fn entrance(&self, root: NodeId, content: Option<NodeId>) -> Timeline {
        let ms = Duration::from_millis;
        let mut timeline = Timeline::new("modal-enter")
            .set(root, &[("display", "flex"), ("opacity", "0")])
            .to(root, &[("opacity", "1")], ms(400), "power2.out");
        if let Some(content) = content {
            timeline = timeline
                .set(content, &[("opacity", "0"), ("transform", "scale(0.7) translateY(100px)")])
                .step(
                    content,
                    &[("opacity", "1"), ("transform", "none")],
                    ms(600),
                    "back.out(2)",
                    Offset::Overlap(ms(200)),
                );
        }
        let sections = self
            .ctx
            .page
            .document()
            .query_all(root, |el| el.has_class(SECTION_CLASS));
        for section in sections {
            timeline = timeline.step(
                section,
                &[("opacity", "1"), ("transform", "none")],
                ms(400),
                "power2.out",
                Offset::Overlap(ms(300)),
            );
        }
        timeline
    }

    fn exit(&self, root: NodeId, content: Option<NodeId>) -> Timeline {
        let ms = Duration::from_millis;
        let mut timeline = Timeline::new("modal-exit");
        if let Some(content) = content {
            timeline = timeline.to(
                content,
                &[("opacity", "0"), ("transform", "scale(0.8) translateY(-50px)")],
                ms(400),
                "power2.in",
            );
        }
        timeline
            .step(root, &[("opacity", "0")], ms(300), "power2.in", Offset::Overlap(ms(200)))
            .set(root, &[("display", "none")])
    }

    fn replace_animation(&self, next: Option<AnimationId>) {
        let previous = std::mem::replace(&mut self.state.borrow_mut().animation, next);
        if let Some(previous) = previous {
            self.ctx.scheduler.kill(previous);
        }
    }

    fn restore_body(&self, scroll: Option<f64>) {
        {
            let mut doc = self.ctx.page.document_mut();
            let body = doc.body();
            for prop in ["position", "top", "width"] {
                doc.set_style(body, prop, "");
            }
            doc.remove_class(body, BODY_OPEN_CLASS);
        }
        if let Some(y) = scroll {
            self.ctx.page.scroll_to(y);
        }
    }

    pub fn close(&self) {
        let (root, content, scroll) = {
            let mut state = self.state.borrow_mut();
            if !state.is_open {
                return;
            }
            state.is_open = false;
            let Some(root) = state.root else { return };
            (root, state.content, state.saved_scroll)
        };

        self.restore_body(scroll);
        self.replace_animation(None);
        let id = self.ctx.scheduler.play(&self.ctx.page, self.exit(root, content));
        self.state.borrow_mut().animation = Some(id);
    }

    fn fill_project(&self, root: NodeId, id: &str) {
        let locale = &self.ctx.locale;
        let Translation::Structured(data) = locale.t(&format!("projects.detailed.{id}"), &[]) else {
            error!("Project data not found for: {}", id);
            return;
        };
        let title_key = format!("projects.{id}.title");
        let title = locale.text(&title_key);
        let alt_prefix = match locale.t("projects.modal.image_alt_prefix", &[]) {
            Translation::Text(prefix) if prefix != "projects.modal.image_alt_prefix" => prefix,
            _ => "Project screenshot".to_string(),
        };
        let field = |name: &str| data.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
        let list = |name: &str| -> Vec<String> {
            data.get(name)
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default()
        };

        let mut doc = self.ctx.page.document_mut();
        let doc = &mut *doc;
        if let Some(el) = doc.query_first(root, |el| el.has_class("modal-title")) {
            doc.set_text_content(el, &title);
            doc.set_attr(el, "data-i18n", &title_key);
        }
        if let Some(img) = doc.query_first(root, |el| el.has_class("modal-image")) {
            doc.set_attr(img, "src", &field("image"));
            doc.set_attr(img, "alt", &format!("{alt_prefix}: {title}"));
        }
        if let Some(el) = doc.query_first(root, |el| el.has_class("modal-description")) {
            bind_text(doc, el, &field("fullDescription"), &format!("projects.detailed.{id}.fullDescription"));
        }
        let texts = doc.query_all(root, |el| el.has_class("modal-text"));
        for (el, name) in texts.into_iter().zip(["challenge", "solution", "results"]) {
            bind_text(doc, el, &field(name), &format!("projects.detailed.{id}.{name}"));
        }
        fill_list(doc, root, "modal-technologies", "span", "modal-tech-badge", &list("technologies"));
        fill_list(doc, root, "modal-features", "li", "modal-feature-item", &list("features"));

        annotate::apply_translations(doc, &**locale, root);
    }
}

fn bind_text(doc: &mut Document, el: NodeId, text: &str, key: &str) {
    doc.set_text_content(el, text);
    doc.set_attr(el, "data-i18n", key);
}

fn fill_list(doc: &mut Document, root: NodeId, container_id: &str, tag: &str, class: &str, items: &[String]) {
    let Some(container) = doc.query_first(root, |el| el.id() == Some(container_id)) else {
        return;
    };
    doc.clear_children(container);
    for item in items {
        let node = doc.create_element(tag);
        doc.set_attr(node, "class", class);
        doc.set_text_content(node, item);
        doc.append_child(container, node);
    }
}

impl Widget for Modal {
    fn name(&self) -> &str {
        &self.spec.template_id
    }

    fn init(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>> {
        self.load().boxed_local()
    }

    fn activate(&self, target: Option<&str>) {
        self.open(target);
    }

    fn close(&self) {
        Modal::close(self);
    }

    fn destroy(&self) {
        let (listeners, root, scroll) = {
            let mut state = self.state.borrow_mut();
            state.destroyed = true;
            let was_open = std::mem::take(&mut state.is_open);
            (
                std::mem::take(&mut state.listeners),
                state.root.take(),
                state.saved_scroll.filter(|_| was_open),
            )
        };
        for id in listeners {
            self.ctx.page.unlisten(id);
        }
        self.replace_animation(None);
        if let Some(root) = root {
            self.ctx.page.document_mut().remove(root);
        }
        self.restore_body(scroll);
        debug!("Modal {} destroyed", self.spec.template_id);
    }
}
