//! Observer registry and deferred input queue
//!
//! Callbacks are stored per registration and fired in registration order once
//! an update has fully completed. A callback never sees the sheet itself; it
//! receives the new value, and may queue edits through [`DeferredInputs`].

use crate::dependency::DependencySet;
use propsheet_core::{Dictionary, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Handle returned by every `monitor_*` registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorId(u64);

/// Provenance diff of a set of inputs against a caller-held snapshot
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContributingSet {
    /// Inputs whose value differs from the snapshot (or is absent from it)
    pub changed: Dictionary,
    /// Inputs whose value is unchanged but whose priority decided a relation
    pub touched: Dictionary,
}

impl ContributingSet {
    /// True if nothing changed or was touched
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.touched.is_empty()
    }
}

pub(crate) type ValueCallback = Box<dyn FnMut(&Value)>;
pub(crate) type FlagCallback = Box<dyn FnMut(bool)>;
pub(crate) type ContributingCallback = Box<dyn FnMut(&ContributingSet)>;

pub(crate) enum Watcher {
    Value(ValueCallback),
    Enabled {
        watch: DependencySet,
        last: Option<bool>,
        callback: FlagCallback,
    },
    Contributing {
        mark: Dictionary,
        callback: ContributingCallback,
    },
    InvariantDependent(FlagCallback),
}

/// What a single firing delivers
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Value(Value),
    Flag(bool),
    Contributing(ContributingSet),
}

pub(crate) struct Monitor {
    pub id: MonitorId,
    /// Slot of the watched cell
    pub cell: usize,
    pub watcher: Watcher,
}

impl Monitor {
    fn fire(&mut self, payload: &Payload) {
        match (&mut self.watcher, payload) {
            (Watcher::Value(callback), Payload::Value(value)) => callback(value),
            (Watcher::Enabled { callback, .. }, Payload::Flag(flag))
            | (Watcher::InvariantDependent(callback), Payload::Flag(flag)) => callback(*flag),
            (Watcher::Contributing { callback, .. }, Payload::Contributing(set)) => callback(set),
            _ => {}
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.watcher {
            Watcher::Value(_) => "value",
            Watcher::Enabled { .. } => "enabled",
            Watcher::Contributing { .. } => "contributing",
            Watcher::InvariantDependent(_) => "invariant_dependent",
        };
        f.debug_struct("Monitor")
            .field("id", &self.id)
            .field("cell", &self.cell)
            .field("kind", &kind)
            .finish()
    }
}

/// Registrations in the order they were made
#[derive(Debug, Default)]
pub(crate) struct MonitorRegistry {
    next_id: u64,
    entries: Vec<Monitor>,
}

impl MonitorRegistry {
    /// Register a watcher and fire it once with `initial`
    pub fn connect(&mut self, cell: usize, watcher: Watcher, initial: &Payload) -> MonitorId {
        self.next_id += 1;
        let id = MonitorId(self.next_id);
        let mut monitor = Monitor { id, cell, watcher };
        monitor.fire(initial);
        self.entries.push(monitor);
        id
    }

    pub fn disconnect(&mut self, id: MonitorId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|monitor| monitor.id != id);
        self.entries.len() != before
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Monitor> {
        self.entries.iter_mut()
    }

    /// Deliver collected payloads, skipping registrations removed meanwhile
    pub fn dispatch(&mut self, notifications: Vec<(MonitorId, Payload)>) -> usize {
        let mut fired = 0;
        for (id, payload) in notifications {
            if let Some(monitor) = self.entries.iter_mut().find(|m| m.id == id) {
                monitor.fire(&payload);
                fired += 1;
            }
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeferredEdit {
    Set(String, Value),
    Touch(Vec<String>),
}

/// Queue of input edits made from inside monitor callbacks
///
/// Obtained from [`Sheet::deferred`](crate::Sheet::deferred). Edits are applied
/// at the end of the next `update`, after its notifications are dispatched,
/// and so take effect on the update after that.
#[derive(Debug, Clone, Default)]
pub struct DeferredInputs {
    queue: Rc<RefCell<Vec<DeferredEdit>>>,
}

impl DeferredInputs {
    /// Queue a `set`
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.queue
            .borrow_mut()
            .push(DeferredEdit::Set(name.into(), value.into()));
    }

    /// Queue a `touch`
    pub fn touch<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.queue.borrow_mut().push(DeferredEdit::Touch(names));
    }

    /// Number of queued edits
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub(crate) fn take(&self) -> Vec<DeferredEdit> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_connect_fires_initial_payload() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut registry = MonitorRegistry::default();
        let id = registry.connect(
            0,
            Watcher::Value(Box::new(move |value| sink.borrow_mut().push(value.clone()))),
            &Payload::Value(Value::from(1)),
        );

        assert_eq!(
            registry.dispatch(vec![(id, Payload::Value(Value::from(2)))]),
            1
        );
        assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2)]);
    }

    #[test]
    fn test_disconnect_severs_callback() {
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let mut registry = MonitorRegistry::default();
        let id = registry.connect(
            3,
            Watcher::InvariantDependent(Box::new(move |_| *sink.borrow_mut() += 1)),
            &Payload::Flag(false),
        );

        assert!(registry.disconnect(id));
        assert!(!registry.disconnect(id));
        assert_eq!(registry.dispatch(vec![(id, Payload::Flag(true))]), 0);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_deferred_queue_is_shared() {
        let deferred = DeferredInputs::default();
        let handle = deferred.clone();
        handle.set("x", 4);
        handle.touch(["x", "y"]);

        assert_eq!(deferred.len(), 2);
        assert_eq!(
            deferred.take(),
            vec![
                DeferredEdit::Set("x".into(), Value::from(4)),
                DeferredEdit::Touch(vec!["x".into(), "y".into()]),
            ]
        );
        assert!(handle.is_empty());
    }
}
