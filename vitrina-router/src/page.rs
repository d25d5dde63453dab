//! The page host: document, location fragment, persisted storage, scroll
//! position, event listeners and the page-wide signals.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::dom::{Document, NodeId};
use crate::i18n::TranslationTree;
use crate::signal::Channel;

/// Key/value persistence that outlives a page load (e.g. `localStorage`).
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.set(key, value);
        storage
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
    }
}

impl<S: Storage + ?Sized> Storage for Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }
}

/// Location fragment plus the entries it went through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    fragment: String,
    history: Vec<String>,
}

impl Location {
    /// The full fragment including the leading `#`, or empty.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

/// Emitted after the active language has changed and the page was re-annotated.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageChanged {
    pub language: String,
    pub tree: Rc<TranslationTree>,
}

/// Emitted after a view has been cloned into the mount point and annotated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountAnnouncement {
    pub path: String,
    pub template_id: String,
    pub mount: NodeId,
}

#[derive(Debug, Default)]
pub struct Signals {
    pub language_changed: Channel<LanguageChanged>,
    pub route_mounted: Channel<MountAnnouncement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    KeyDown,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenTarget {
    Document,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Click { target: NodeId },
    KeyDown { target: Option<NodeId>, key: String },
    Submit { target: NodeId },
}

impl PageEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PageEvent::Click { .. } => EventKind::Click,
            PageEvent::KeyDown { .. } => EventKind::KeyDown,
            PageEvent::Submit { .. } => EventKind::Submit,
        }
    }

    pub fn target(&self) -> Option<NodeId> {
        match self {
            PageEvent::Click { target } | PageEvent::Submit { target } => Some(*target),
            PageEvent::KeyDown { target, .. } => *target,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            PageEvent::KeyDown { key, .. } => Some(key),
            PageEvent::Click { .. } | PageEvent::Submit { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&PageEvent)>;

struct Registered {
    id: ListenerId,
    target: ListenTarget,
    kind: EventKind,
    handler: Listener,
}

pub struct Page {
    document: RefCell<Document>,
    location: RefCell<Location>,
    storage: Box<dyn Storage>,
    navigator_language: Option<String>,
    scroll_y: Cell<f64>,
    assigned: RefCell<Vec<String>>,
    next_listener: Cell<u64>,
    listeners: RefCell<Vec<Registered>>,
    pub signals: Signals,
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl Page {
    pub fn new(document: Document) -> Self {
        Self {
            document: RefCell::new(document),
            location: RefCell::new(Location::default()),
            storage: Box::new(MemoryStorage::new()),
            navigator_language: None,
            scroll_y: Cell::new(0.0),
            assigned: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            signals: Signals::default(),
        }
    }

    pub fn with_storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    /// Preferred language tag reported by the host, e.g. `es-MX`.
    pub fn with_navigator_language(mut self, language: impl Into<String>) -> Self {
        self.navigator_language = Some(language.into());
        self
    }

    pub fn with_fragment(self, fragment: &str) -> Self {
        self.location.borrow_mut().fragment = normalize_fragment(fragment);
        self
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.document.borrow_mut()
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn navigator_language(&self) -> Option<&str> {
        self.navigator_language.as_deref()
    }

    pub fn fragment(&self) -> String {
        self.location.borrow().fragment.clone()
    }

    pub fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    /// Navigate to a new fragment, recording a history entry.
    pub fn set_fragment(&self, fragment: &str) {
        let fragment = normalize_fragment(fragment);
        let mut location = self.location.borrow_mut();
        if location.fragment == fragment {
            return;
        }
        let previous = std::mem::replace(&mut location.fragment, fragment);
        location.history.push(previous);
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    pub fn scroll_to(&self, y: f64) {
        self.scroll_y.set(y.max(0.0));
    }

    /// Hand a non-fragment URL (`mailto:`, external links) to the host.
    pub fn assign(&self, url: &str) {
        trace!("Assigning {}", url);
        self.assigned.borrow_mut().push(url.to_string());
    }

    /// Every URL passed to [`Page::assign`], oldest first.
    pub fn assigned(&self) -> Vec<String> {
        self.assigned.borrow().clone()
    }

    pub fn listen(
        &self,
        target: ListenTarget,
        kind: EventKind,
        handler: impl Fn(&PageEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push(Registered {
            id,
            target,
            kind,
            handler: Rc::new(handler),
        });
        id
    }

    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn is_listening(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|l| l.id == id)
    }

    /// Deliver `event` to node listeners from the target up through its
    /// ancestors, then to document listeners.
    ///
    /// Handlers run with no document borrow held and may freely mutate the
    /// page or register and remove listeners.
    pub fn dispatch(&self, event: PageEvent) {
        let kind = event.kind();
        let path: Vec<NodeId> = {
            let doc = self.document.borrow();
            let mut path = Vec::new();
            let mut current = event.target();
            while let Some(node) = current {
                path.push(node);
                current = doc.parent(node);
            }
            path
        };
        trace!("Dispatching {:?} along {} nodes", kind, path.len());

        let targets = path
            .into_iter()
            .map(ListenTarget::Node)
            .chain(std::iter::once(ListenTarget::Document));
        for target in targets {
            let matching: Vec<(ListenerId, Listener)> = self
                .listeners
                .borrow()
                .iter()
                .filter(|l| l.kind == kind && l.target == target)
                .map(|l| (l.id, l.handler.clone()))
                .collect();
            for (id, handler) in matching {
                if self.is_listening(id) {
                    handler(&event);
                }
            }
        }
    }

    pub fn click(&self, target: NodeId) {
        self.dispatch(PageEvent::Click { target });
    }

    pub fn submit(&self, form: NodeId) {
        self.dispatch(PageEvent::Submit { target: form });
    }

    /// Key press delivered to the focused element, or the document when
    /// nothing has focus.
    pub fn key_down(&self, key: &str) {
        let target = self.document.borrow().focused();
        self.dispatch(PageEvent::KeyDown {
            target,
            key: key.to_string(),
        });
    }
}

fn normalize_fragment(fragment: &str) -> String {
    match fragment {
        "" | "#" => String::new(),
        f if f.starts_with('#') => f.to_string(),
        f => format!("#{f}"),
    }
}
