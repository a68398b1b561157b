//! The update pass
//!
//! One call runs, in order: pass reset, guard evaluation, relation flow,
//! output evaluation, invariant checks, active set publication, and finally
//! notification dispatch. Observers only ever see a completed pass.

use super::query::{cell_dependencies, contributing_set, enabled_state};
use super::{Sheet, Tracked};
use crate::cell::{Cell, CellKind};
use crate::dependency::DependencySet;
use crate::error::{Result, SheetError};
use crate::monitor::{DeferredEdit, MonitorId, Payload, Watcher};
use propsheet_expr::evaluate;
use std::cmp::Reverse;
use tracing::{debug, trace, warn};

/// Statistics from one [`Sheet::update`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Number of derived cells computed
    pub cells_evaluated: usize,
    /// Number of relations that derived a term
    pub relations_applied: usize,
    /// Number of relations whose guard was false
    pub relations_suppressed: usize,
    /// Number of invariants that evaluated false
    pub invariants_failed: usize,
    /// Number of monitor callbacks fired
    pub notifications: usize,
}

impl Sheet {
    /// Recompute the sheet and notify monitors
    ///
    /// Calling `update` twice without an intervening `set` or `touch` publishes
    /// the same values and contributing sets both times. On error no monitor
    /// fires and partial progress is kept.
    pub fn update(&mut self) -> Result<UpdateStats> {
        let mut stats = UpdateStats::default();

        // Phase 1: Reset pass state
        self.reset_pass();

        // Phase 2: Guards decide which relations constrain this pass
        self.evaluate_guards(&mut stats)?;

        // Phase 3: Pick the derived term of every relation
        self.flow(&mut stats)?;

        // Phase 4: Evaluate outputs
        for slot in 0..self.cells.len() {
            if self.cells[slot].kind.is_output() {
                self.ensure_evaluated(slot)?;
            }
        }

        // Phase 5: Invariants
        self.check_invariants(&mut stats)?;

        // Phase 6: Active set, then notifications
        self.publish_active();
        stats.cells_evaluated = self.evaluations;
        let notifications = self.collect_notifications();
        stats.notifications = self.monitors.dispatch(notifications);

        debug!(
            cells_evaluated = stats.cells_evaluated,
            relations_applied = stats.relations_applied,
            relations_suppressed = stats.relations_suppressed,
            invariants_failed = stats.invariants_failed,
            notifications = stats.notifications,
            "sheet updated"
        );

        self.apply_deferred()?;
        Ok(stats)
    }

    fn reset_pass(&mut self) {
        self.accumulators.clear();
        self.resolving.clear();
        self.guard_contributing.clear();
        self.priority_accessed.clear();
        self.evaluations = 0;
        for cell in &mut self.cells {
            if let Some(derived) = cell.derived_mut() {
                derived.reset();
            }
        }
        for relation in &mut self.relations {
            relation.resolved = false;
        }
    }

    fn evaluate_guards(&mut self, stats: &mut UpdateStats) -> Result<()> {
        for index in 0..self.relations.len() {
            let Some(guard) = self.relations[index].guard.clone() else {
                continue;
            };

            self.accumulators.push(DependencySet::new());
            let result = evaluate(&guard, &mut Tracked { sheet: self });
            let reads = self.accumulators.pop().unwrap_or_default();

            if result?.as_bool() {
                self.guard_contributing |= reads;
            } else {
                self.relations[index].resolved = true;
                for term in &self.relations[index].terms {
                    if let Some(derived) = self.cells[term.cell].derived_mut() {
                        derived.relation_pending = derived.relation_pending.saturating_sub(1);
                    }
                }
                stats.relations_suppressed += 1;
                trace!(relation = index, "relation suppressed by guard");
            }
        }
        Ok(())
    }

    /// Visit the interface inputs of unresolved relations, most recently
    /// edited first; each one still pending becomes a source and its relations
    /// cascade.
    fn flow(&mut self, stats: &mut UpdateStats) -> Result<()> {
        let mut candidates: Vec<usize> = self
            .relations
            .iter()
            .filter(|relation| !relation.resolved)
            .flat_map(|relation| relation.terms.iter())
            .filter_map(|term| self.cells[term.cell].paired())
            .collect();
        candidates.sort_by_key(|slot| (Reverse(self.priority_of(*slot)), *slot));
        candidates.dedup();

        for input in candidates {
            let Some(output) = self.cells[input].paired() else {
                continue;
            };
            match self.cells[output].derived_mut() {
                Some(derived) if !derived.resolved && derived.relation_pending > 0 => {
                    derived.resolved = true;
                }
                _ => continue,
            }
            self.priority_accessed.set(input);
            trace!(cell = %self.cells[output].name, "relation source");
            self.propagate(output, stats)?;
        }
        Ok(())
    }

    /// Apply every relation left with a single unresolved term, following the
    /// newly derived cells
    fn propagate(&mut self, source: usize, stats: &mut UpdateStats) -> Result<()> {
        let mut stack = vec![source];
        while let Some(cell) = stack.pop() {
            let relations = self.cells[cell]
                .derived()
                .map(|derived| derived.relations.clone())
                .unwrap_or_default();

            for index in relations {
                if self.relations[index].resolved {
                    continue;
                }
                let unresolved: Vec<usize> = self.relations[index]
                    .terms
                    .iter()
                    .enumerate()
                    .filter(|(_, term)| !is_resolved(&self.cells[term.cell]))
                    .map(|(position, _)| position)
                    .collect();

                match unresolved.as_slice() {
                    [] => return Err(self.relation_violation(index)),
                    [position] => {
                        let derived = self.apply_relation(index, *position);
                        stats.relations_applied += 1;
                        stack.push(derived);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Derive one term of a relation; returns the derived cell
    fn apply_relation(&mut self, index: usize, position: usize) -> usize {
        let relation = &mut self.relations[index];
        relation.resolved = true;
        let term = relation.terms[position].clone();

        for other in &self.relations[index].terms {
            if let Some(derived) = self.cells[other.cell].derived_mut() {
                derived.relation_pending = derived.relation_pending.saturating_sub(1);
            }
        }

        let cell = &mut self.cells[term.cell];
        let mut paired = None;
        if let Some(derived) = cell.derived_mut() {
            derived.derived_by = Some(term.expr.clone());
            derived.resolved = true;
            paired = derived.paired;
        }
        trace!(cell = %cell.name, expr = %term.expr, "relation derives");

        // Derived values never out-rank what determined them
        if let Some(input) = paired {
            let linked = self.cells[input].input().map_or(false, |i| i.linked);
            if linked {
                let priority = self.lower_priority();
                if let Some(input) = self.cells[input].input_mut() {
                    input.priority = priority;
                }
            }
        }
        term.cell
    }

    fn relation_violation(&self, index: usize) -> SheetError {
        let terms: Vec<String> = self.relations[index]
            .terms
            .iter()
            .map(|term| self.cells[term.cell].name.clone())
            .collect();
        warn!(relation = index, terms = ?terms, "relation violation");
        SheetError::RelationViolation { terms }
    }

    fn check_invariants(&mut self, stats: &mut UpdateStats) -> Result<()> {
        let mut failed = DependencySet::new();
        for slot in 0..self.cells.len() {
            if self.cells[slot].kind != CellKind::Invariant {
                continue;
            }
            self.ensure_evaluated(slot)?;

            let cell = &mut self.cells[slot];
            let holds = cell.value.as_bool();
            if let Some(derived) = cell.derived_mut() {
                derived.polarity_changed = derived.polarity != Some(holds);
                derived.polarity = Some(holds);
                if !holds {
                    failed |= derived.contributing;
                }
            }
            if !holds {
                stats.invariants_failed += 1;
                debug!(invariant = %cell.name, "invariant failed");
            }
        }

        for (slot, cell) in self.cells.iter_mut().enumerate() {
            let implicated = match cell.kind {
                CellKind::Input | CellKind::InterfaceInput => failed.test(slot),
                CellKind::Logic | CellKind::Output | CellKind::InterfaceOutput => {
                    match cell.derived() {
                        Some(derived) if derived.evaluated => {
                            derived.contributing.intersects(&failed)
                        }
                        _ => continue,
                    }
                }
                CellKind::Constant | CellKind::Invariant => continue,
            };
            cell.implicated_changed = implicated != cell.implicated;
            cell.implicated = implicated;
        }
        Ok(())
    }

    /// Inputs that were consulted for priority, plus the inputs feeding
    /// published outputs
    fn publish_active(&mut self) {
        let has_plain_outputs = self.cells.iter().any(|c| c.kind == CellKind::Output);
        let mut active = self.priority_accessed;
        for cell in self.cells.iter().filter(|c| c.kind.is_output()) {
            if has_plain_outputs && self.inputs.contains_key(&cell.name) {
                continue;
            }
            if let Some(derived) = cell.derived() {
                active |= derived.contributing;
            }
        }
        self.active = active;
    }

    /// Decide which registrations fire and with what, then clear the
    /// per-dispatch flags
    fn collect_notifications(&mut self) -> Vec<(MonitorId, Payload)> {
        let mut notifications = Vec::new();
        let cells = &self.cells;
        let active = self.active;
        let accessed = self.priority_accessed;

        for monitor in self.monitors.iter_mut() {
            let cell = &cells[monitor.cell];
            let payload = match &mut monitor.watcher {
                Watcher::Value(_) => {
                    value_changed(cell).then(|| Payload::Value(cell.value.clone()))
                }
                Watcher::Enabled { watch, last, .. } => {
                    let now = enabled_state(monitor.cell, watch, &active, &accessed);
                    if *last == Some(now) {
                        None
                    } else {
                        *last = Some(now);
                        Some(Payload::Flag(now))
                    }
                }
                Watcher::Contributing { mark, .. } => {
                    let set = cell_dependencies(cells, monitor.cell);
                    Some(Payload::Contributing(contributing_set(
                        cells, &accessed, mark, &set,
                    )))
                }
                Watcher::InvariantDependent(_) => cell
                    .implicated_changed
                    .then(|| Payload::Flag(cell.implicated)),
            };
            if let Some(payload) = payload {
                notifications.push((monitor.id, payload));
            }
        }

        for cell in &mut self.cells {
            cell.implicated_changed = false;
            if let Some(input) = cell.input_mut() {
                input.changed = false;
            }
            if let Some(derived) = cell.derived_mut() {
                derived.polarity_changed = false;
            }
        }
        notifications
    }

    fn apply_deferred(&mut self) -> Result<()> {
        for edit in self.deferred.take() {
            match edit {
                DeferredEdit::Set(name, value) => self.set(&name, value)?,
                DeferredEdit::Touch(names) => self.touch(&names)?,
            }
        }
        Ok(())
    }
}

fn is_resolved(cell: &Cell) -> bool {
    cell.derived().map_or(true, |derived| derived.resolved)
}

/// Whether a value monitor on this cell fires for the pass just completed
fn value_changed(cell: &Cell) -> bool {
    match cell.kind {
        CellKind::Input | CellKind::InterfaceInput => {
            cell.input().map_or(false, |input| input.changed)
        }
        CellKind::Invariant => cell
            .derived()
            .map_or(false, |derived| derived.polarity_changed),
        CellKind::Constant => false,
        CellKind::Logic | CellKind::Output | CellKind::InterfaceOutput => cell
            .derived()
            .map_or(false, |derived| derived.evaluated && derived.dirty),
    }
}
