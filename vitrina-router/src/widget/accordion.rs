use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use tracing::debug;
use vitrina_core::site::{AccordionSpec, InitialOpen};

use super::timeline::{AnimationId, Offset, Timeline};
use super::{Widget, WidgetContext};
use crate::dom::{Document, NodeId};
use crate::error::WidgetError;
use crate::page::{EventKind, ListenTarget, ListenerId};

pub const OPEN_CLASS: &str = "accordion-open";
const ICON_CLASS: &str = "accordion-icon";

#[derive(Debug, Clone, Copy)]
struct Member {
    item: NodeId,
    header: NodeId,
    content: NodeId,
    icon: Option<NodeId>,
    open: bool,
}

#[derive(Default)]
struct AccordionState {
    members: Vec<Member>,
    listeners: Vec<ListenerId>,
    /// Latest timeline per member index.
    animations: HashMap<usize, AnimationId>,
    initialized: bool,
}

/// Group of collapsible sections found under the mount point.
pub struct Accordion {
    spec: AccordionSpec,
    ctx: WidgetContext,
    state: RefCell<AccordionState>,
    me: Weak<Accordion>,
}

impl Accordion {
    pub fn new(spec: AccordionSpec, ctx: WidgetContext) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            spec,
            ctx,
            state: RefCell::new(AccordionState::default()),
            me: me.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.state.borrow().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indices of the members currently open.
    pub fn open_members(&self) -> Vec<usize> {
        self.state
            .borrow()
            .members
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.open.then_some(i))
            .collect()
    }

    fn scan(&self) -> Vec<Member> {
        let doc = self.ctx.page.document();
        let Some(mount) = doc.element_by_id(&self.ctx.config.mount_point) else {
            return Vec::new();
        };
        doc.query_all(mount, |el| el.has_class(&self.spec.item_class))
            .into_iter()
            .filter_map(|item| {
                Some(Member {
                    item,
                    header: doc.query_first(item, |el| el.has_class(&self.spec.header_class))?,
                    content: doc.query_first(item, |el| el.has_class(&self.spec.content_class))?,
                    icon: doc.query_first(item, |el| el.has_class(ICON_CLASS)),
                    open: false,
                })
            })
            .collect()
    }

    fn setup(&self) {
        if self.state.borrow().initialized {
            return;
        }
        let mut members = self.scan();
        for (i, member) in members.iter_mut().enumerate() {
            member.open = match self.spec.initially_open {
                InitialOpen::All => true,
                InitialOpen::First => i == 0,
                InitialOpen::None => false,
            };
            self.paint(member);
        }
        let listeners = self.wire(&members);
        debug!(
            "Accordion {} with {} member(s)",
            self.spec.item_class,
            members.len()
        );

        let mut state = self.state.borrow_mut();
        state.members = members;
        state.listeners = listeners;
        state.initialized = true;
    }

    /// Write the resting state of `member` without animating.
    fn paint(&self, member: &Member) {
        let mut doc = self.ctx.page.document_mut();
        let (height, opacity, rotation) = if member.open {
            ("auto", "1", "rotate(180deg)")
        } else {
            ("0", "0", "rotate(0deg)")
        };
        doc.set_style(member.content, "height", height);
        doc.set_style(member.content, "opacity", opacity);
        if let Some(icon) = member.icon {
            doc.set_style(icon, "transform", rotation);
        }
        self.mark(&mut doc, member);
    }

    fn mark(&self, doc: &mut Document, member: &Member) {
        doc.set_attr(member.header, "aria-expanded", if member.open { "true" } else { "false" });
        if member.open {
            doc.add_class(member.item, OPEN_CLASS);
        } else {
            doc.remove_class(member.item, OPEN_CLASS);
        }
    }

    fn wire(&self, members: &[Member]) -> Vec<ListenerId> {
        let page = &self.ctx.page;
        let mut listeners = Vec::new();
        for (index, member) in members.iter().enumerate() {
            let me = self.me.clone();
            listeners.push(page.listen(ListenTarget::Node(member.header), EventKind::Click, move |_| {
                if let Some(accordion) = me.upgrade() {
                    accordion.toggle(index);
                }
            }));
            let me = self.me.clone();
            listeners.push(page.listen(ListenTarget::Node(member.header), EventKind::KeyDown, move |event| {
                if let Some(accordion) = me.upgrade()
                    && matches!(event.key(), Some("Enter" | " "))
                {
                    accordion.toggle(index);
                }
            }));
        }

        let controls = [
            (self.spec.expand_all.as_deref(), true),
            (self.spec.collapse_all.as_deref(), false),
        ];
        for (action, expand) in controls {
            let Some(action) = action else { continue };
            let control = {
                let doc = page.document();
                doc.query_first(doc.html(), |el| el.attr("data-action") == Some(action))
            };
            let Some(control) = control else {
                debug!("No control for data-action={}", action);
                continue;
            };
            let me = self.me.clone();
            listeners.push(page.listen(ListenTarget::Node(control), EventKind::Click, move |_| {
                if let Some(accordion) = me.upgrade() {
                    if expand {
                        accordion.expand_all();
                    } else {
                        accordion.collapse_all();
                    }
                }
            }));
        }
        listeners
    }

    /// Open a closed member or close an open one. In a single-open group every
    /// other open member is closed before the target opens.
    pub fn toggle(&self, index: usize) {
        let Some(member) = self.member(index) else {
            return;
        };
        if member.open {
            self.set_open(index, false);
            return;
        }
        if self.spec.single_open {
            for other in self.open_members() {
                if other != index {
                    self.set_open(other, false);
                }
            }
        }
        self.set_open(index, true);
    }

    pub fn expand_all(&self) {
        for index in 0..self.len() {
            self.set_open(index, true);
        }
    }

    pub fn collapse_all(&self) {
        for index in self.open_members() {
            self.set_open(index, false);
        }
    }

    fn member(&self, index: usize) -> Option<Member> {
        self.state.borrow().members.get(index).copied()
    }

    fn set_open(&self, index: usize, open: bool) {
        let member = {
            let mut state = self.state.borrow_mut();
            let Some(member) = state.members.get_mut(index) else {
                return;
            };
            if member.open == open {
                return;
            }
            member.open = open;
            *member
        };
        self.mark(&mut self.ctx.page.document_mut(), &member);

        let previous = self.state.borrow_mut().animations.remove(&index);
        if let Some(previous) = previous {
            self.ctx.scheduler.kill(previous);
        }
        let timeline = if open { self.opening(&member) } else { self.closing(&member) };
        let id = self.ctx.scheduler.play(&self.ctx.page, timeline);
        self.state.borrow_mut().animations.insert(index, id);
    }

    fn opening(&self, member: &Member) -> Timeline {
        let ms = Duration::from_millis;
        let mut timeline = Timeline::new("accordion-open")
            .to(member.content, &[("height", "auto")], ms(400), "power2.out")
            .step(member.content, &[("opacity", "1")], ms(300), "none", Offset::Overlap(ms(200)));
        if let Some(icon) = member.icon {
            timeline = timeline.step(
                icon,
                &[("transform", "rotate(180deg)")],
                ms(300),
                "none",
                Offset::At(Duration::ZERO),
            );
        }
        timeline
    }

    fn closing(&self, member: &Member) -> Timeline {
        let ms = Duration::from_millis;
        let mut timeline = Timeline::new("accordion-close").to(
            member.content,
            &[("height", "0"), ("opacity", "0")],
            ms(300),
            "power2.inOut",
        );
        if let Some(icon) = member.icon {
            timeline = timeline.step(
                icon,
                &[("transform", "rotate(0deg)")],
                ms(300),
                "none",
                Offset::At(Duration::ZERO),
            );
        }
        timeline
    }
}

impl Widget for Accordion {
    fn name(&self) -> &str {
        &self.spec.item_class
    }

    fn init(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>> {
        self.setup();
        future::ready(Ok(())).boxed_local()
    }

    /// `target` is the member index; without one the first member toggles.
    fn activate(&self, target: Option<&str>) {
        let index = target.and_then(|t| t.parse().ok()).unwrap_or(0);
        self.toggle(index);
    }

    fn close(&self) {
        self.collapse_all();
    }

    fn destroy(&self) {
        let (listeners, animations) = {
            let mut state = self.state.borrow_mut();
            state.members.clear();
            (
                std::mem::take(&mut state.listeners),
                std::mem::take(&mut state.animations),
            )
        };
        for id in listeners {
            self.ctx.page.unlisten(id);
        }
        for id in animations.into_values() {
            self.ctx.scheduler.kill(id);
        }
        debug!("Accordion {} destroyed", self.spec.item_class);
    }
}
