//! Provenance queries and monitor registration

use super::Sheet;
use crate::cell::{Cell, CellBody};
use crate::dependency::DependencySet;
use crate::error::Result;
use crate::monitor::{ContributingSet, MonitorId, Payload, Watcher};
use propsheet_core::{Dictionary, Value};

impl Sheet {
    /// Diff the inputs active in the last update against a snapshot
    ///
    /// An input is `changed` if its value differs from `mark` or is missing
    /// from it, and otherwise `touched` if its priority decided a relation.
    pub fn contributing(&self, mark: &Dictionary) -> ContributingSet {
        contributing_set(&self.cells, &self.priority_accessed, mark, &self.active)
    }

    /// Every input contributing to one cell, all reported as changed
    pub fn contributing_to_cell(&self, name: &str) -> Result<ContributingSet> {
        let slot = self.lookup(name)?;
        let set = cell_dependencies(&self.cells, slot);
        Ok(contributing_set(
            &self.cells,
            &self.priority_accessed,
            &Dictionary::new(),
            &set,
        ))
    }

    /// Whether an input mattered in the last update
    ///
    /// True if the input fed a published output or decided a relation, or if
    /// any input in `watch` decided a relation.
    pub fn is_enabled(&self, name: &str, watch: &[&str]) -> Result<bool> {
        let slot = self.input_slot(name)?;
        let watch = self.watch_set(watch)?;
        Ok(enabled_state(
            slot,
            &watch,
            &self.active,
            &self.priority_accessed,
        ))
    }

    /// Call `callback` with the cell's value now and whenever an update
    /// changes it
    ///
    /// On an invariant the callback fires when its truth flips; the first
    /// update always reports it, since there is no earlier pass to compare
    /// against. On an input it fires when the input was assigned a different
    /// value since the previous update.
    pub fn monitor_value<F>(&mut self, name: &str, callback: F) -> Result<MonitorId>
    where
        F: FnMut(&Value) + 'static,
    {
        let slot = self.lookup(name)?;
        let initial = Payload::Value(self.cells[slot].value.clone());
        Ok(self
            .monitors
            .connect(slot, Watcher::Value(Box::new(callback)), &initial))
    }

    /// Call `callback` with the input's enabled state now and whenever it
    /// flips (see [`Sheet::is_enabled`])
    pub fn monitor_enabled<F>(&mut self, name: &str, watch: &[&str], callback: F) -> Result<MonitorId>
    where
        F: FnMut(bool) + 'static,
    {
        let slot = self.input_slot(name)?;
        let watch = self.watch_set(watch)?;
        let now = enabled_state(slot, &watch, &self.active, &self.priority_accessed);
        let watcher = Watcher::Enabled {
            watch,
            last: Some(now),
            callback: Box::new(callback),
        };
        Ok(self.monitors.connect(slot, watcher, &Payload::Flag(now)))
    }

    /// Call `callback` with the cell's contributing inputs diffed against
    /// `mark`, now and after every update
    pub fn monitor_contributing<F>(
        &mut self,
        name: &str,
        mark: Dictionary,
        callback: F,
    ) -> Result<MonitorId>
    where
        F: FnMut(&ContributingSet) + 'static,
    {
        let slot = self.lookup(name)?;
        let set = cell_dependencies(&self.cells, slot);
        let initial = contributing_set(&self.cells, &self.priority_accessed, &mark, &set);
        let watcher = Watcher::Contributing {
            mark,
            callback: Box::new(callback),
        };
        Ok(self
            .monitors
            .connect(slot, watcher, &Payload::Contributing(initial)))
    }

    /// Call `callback` with whether the cell is implicated in a failing
    /// invariant, now and whenever that flips
    pub fn monitor_invariant_dependent<F>(&mut self, name: &str, callback: F) -> Result<MonitorId>
    where
        F: FnMut(bool) + 'static,
    {
        let slot = self.lookup(name)?;
        let initial = Payload::Flag(self.cells[slot].implicated);
        Ok(self.monitors.connect(
            slot,
            Watcher::InvariantDependent(Box::new(callback)),
            &initial,
        ))
    }

    fn watch_set(&self, names: &[&str]) -> Result<DependencySet> {
        names
            .iter()
            .map(|name| self.input_slot(name))
            .collect::<Result<DependencySet>>()
    }
}

/// Inputs a cell's value depends on; an input depends on itself
pub(super) fn cell_dependencies(cells: &[Cell], slot: usize) -> DependencySet {
    match &cells[slot].body {
        CellBody::Input(_) => DependencySet::single(slot),
        CellBody::Derived(derived) => derived.contributing,
        CellBody::Constant { .. } => DependencySet::new(),
    }
}

pub(super) fn enabled_state(
    slot: usize,
    watch: &DependencySet,
    active: &DependencySet,
    accessed: &DependencySet,
) -> bool {
    active.test(slot) || watch.intersects(accessed)
}

pub(super) fn contributing_set(
    cells: &[Cell],
    accessed: &DependencySet,
    mark: &Dictionary,
    set: &DependencySet,
) -> ContributingSet {
    let mut result = ContributingSet::default();
    for slot in set.iter() {
        let Some(cell) = cells.get(slot) else {
            continue;
        };
        if mark.get(&cell.name) != Some(&cell.value) {
            result.changed.insert(cell.name.clone(), cell.value.clone());
        } else if accessed.test(slot) {
            result.touched.insert(cell.name.clone(), cell.value.clone());
        }
    }
    result
}
