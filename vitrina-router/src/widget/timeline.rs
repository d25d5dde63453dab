//! Animation as data: an ordered list of style steps and a scheduler that
//! plays them without blocking the caller.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use crate::dom::NodeId;
use crate::page::Page;

/// When a step starts relative to the end of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    After,
    /// Starts this long before the previous step ends.
    Overlap(Duration),
    /// Absolute position from the start of the timeline.
    At(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub target: NodeId,
    pub props: Vec<(String, String)>,
    pub duration: Duration,
    pub ease: &'static str,
    pub offset: Offset,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    label: String,
    steps: Vec<Step>,
}

fn props(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl Timeline {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            steps: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply `pairs` instantly at the current position.
    pub fn set(self, target: NodeId, pairs: &[(&str, &str)]) -> Self {
        self.step(target, pairs, Duration::ZERO, "none", Offset::After)
    }

    pub fn to(self, target: NodeId, pairs: &[(&str, &str)], duration: Duration, ease: &'static str) -> Self {
        self.step(target, pairs, duration, ease, Offset::After)
    }

    pub fn step(
        mut self,
        target: NodeId,
        pairs: &[(&str, &str)],
        duration: Duration,
        ease: &'static str,
        offset: Offset,
    ) -> Self {
        self.steps.push(Step {
            target,
            props: props(pairs),
            duration,
            ease,
            offset,
        });
        self
    }

    /// Start time of every step, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut cursor = Duration::ZERO;
        let mut starts = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let start = match step.offset {
                Offset::After => cursor,
                Offset::Overlap(d) => cursor.saturating_sub(d),
                Offset::At(d) => d,
            };
            starts.push(start);
            cursor = cursor.max(start + step.duration);
        }
        starts
    }

    pub fn total_duration(&self) -> Duration {
        self.schedule()
            .iter()
            .zip(&self.steps)
            .map(|(start, step)| *start + step.duration)
            .max()
            .unwrap_or_default()
    }
}

fn apply(page: &Page, step: &Step) {
    let mut doc = page.document_mut();
    for (prop, value) in &step.props {
        doc.set_style(step.target, prop, value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(u64);

pub trait Scheduler {
    /// Start `timeline`. Returns at once.
    fn play(&self, page: &Rc<Page>, timeline: Timeline) -> AnimationId;
    /// Stop a timeline where it is. Unknown or finished ids are ignored.
    fn kill(&self, id: AnimationId);
    fn is_running(&self, id: AnimationId) -> bool;
}

/// Applies every step's end state immediately and keeps a log of labels.
#[derive(Debug, Default)]
pub struct InstantScheduler {
    next_id: Cell<u64>,
    played: RefCell<Vec<String>>,
    killed: RefCell<Vec<AnimationId>>,
}

impl InstantScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<String> {
        self.played.borrow().clone()
    }

    pub fn killed(&self) -> usize {
        self.killed.borrow().len()
    }
}

impl Scheduler for InstantScheduler {
    fn play(&self, page: &Rc<Page>, timeline: Timeline) -> AnimationId {
        let id = AnimationId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        trace!("Playing {} instantly", timeline.label());
        for step in timeline.steps() {
            apply(page, step);
        }
        self.played.borrow_mut().push(timeline.label);
        id
    }

    fn kill(&self, id: AnimationId) {
        self.killed.borrow_mut().push(id);
    }

    fn is_running(&self, _id: AnimationId) -> bool {
        false
    }
}

/// Plays steps at their scheduled times on the current `LocalSet`.
///
/// Each step's properties are applied when the step starts.
#[derive(Debug, Default)]
pub struct TimedScheduler {
    next_id: Cell<u64>,
    running: Rc<RefCell<HashMap<AnimationId, JoinHandle<()>>>>,
}

impl TimedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once no timeline is left running.
    pub async fn idle(&self) {
        while !self.running.borrow().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Scheduler for TimedScheduler {
    fn play(&self, page: &Rc<Page>, timeline: Timeline) -> AnimationId {
        let id = AnimationId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let page: Weak<Page> = Rc::downgrade(page);
        let running = Rc::downgrade(&self.running);
        let handle = tokio::task::spawn_local(async move {
            let origin = tokio::time::Instant::now();
            let mut steps: Vec<_> = timeline.schedule().into_iter().zip(timeline.steps).collect();
            steps.sort_by_key(|(start, _)| *start);
            for (start, step) in steps {
                tokio::time::sleep_until(origin + start).await;
                let Some(page) = page.upgrade() else { break };
                apply(&page, &step);
            }
            if let Some(running) = running.upgrade() {
                running.borrow_mut().remove(&id);
            }
        });
        if !handle.is_finished() {
            self.running.borrow_mut().insert(id, handle);
        }
        id
    }

    fn kill(&self, id: AnimationId) {
        if let Some(handle) = self.running.borrow_mut().remove(&id) {
            handle.abort();
        }
    }

    fn is_running(&self, id: AnimationId) -> bool {
        self.running.borrow().contains_key(&id)
    }
}
