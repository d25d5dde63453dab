use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<T> = Rc<dyn Fn(&T)>;

/// Page-wide notification channel.
///
/// Delivery is synchronous and in subscription order. A handler removed while
/// an emission is in progress is not called for the rest of that emission, and
/// a handler added during it only sees later emissions.
pub struct Channel<T> {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, Handler<T>)>>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow().iter().any(|(sid, _)| *sid == id)
    }

    pub fn emit(&self, payload: &T) {
        let snapshot: Vec<_> = self.subscribers.borrow().clone();
        for (id, handler) in snapshot {
            if self.is_subscribed(id) {
                handler(payload);
            }
        }
    }
}
