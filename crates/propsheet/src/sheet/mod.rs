//! The property sheet
//!
//! A [`Sheet`] owns every cell and relation in append-only storage. Hosts
//! declare cells, assign inputs with [`Sheet::set`] and [`Sheet::touch`], and
//! recompute everything else with [`Sheet::update`].

mod declare;
mod dump;
mod query;
mod update;

pub use declare::IntoExpr;
pub use update::UpdateStats;

use crate::cell::{Cell, CellKind};
use crate::dependency::DependencySet;
use crate::error::{Result, SheetError};
use crate::monitor::{DeferredInputs, MonitorId, MonitorRegistry};
use crate::options::SheetOptions;
use crate::relation::Relation;
use ahash::AHashMap;
use propsheet_core::{Dictionary, Value};
use propsheet_expr::{evaluate, NameResolver};
use tracing::trace;

/// A declarative property sheet
///
/// Not thread-safe: callbacks are `!Send` and every operation runs on the
/// calling thread.
#[derive(Debug)]
pub struct Sheet {
    options: SheetOptions,
    cells: Vec<Cell>,
    relations: Vec<Relation>,
    /// Output, logic, constant, interface output and invariant names
    outputs: AHashMap<String, usize>,
    /// Input and interface input names
    inputs: AHashMap<String, usize>,
    high_priority: i64,
    low_priority: i64,
    /// Dependency accumulators of the evaluations in progress
    accumulators: Vec<DependencySet>,
    /// Derived cells currently being computed, innermost last
    resolving: Vec<usize>,
    /// Reads made by guards that held this pass
    guard_contributing: DependencySet,
    /// Inputs whose priority decided a relation in the last flow
    priority_accessed: DependencySet,
    /// Inputs contributing to published outputs after the last update
    active: DependencySet,
    /// Plain inputs set since the last reinitialize
    set_since_reinit: DependencySet,
    evaluations: usize,
    monitors: MonitorRegistry,
    deferred: DeferredInputs,
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl Sheet {
    /// Create an empty sheet with default options
    pub fn new() -> Self {
        Self::with_options(SheetOptions::default())
    }

    /// Create an empty sheet
    pub fn with_options(options: SheetOptions) -> Self {
        Self {
            options,
            cells: Vec::new(),
            relations: Vec::new(),
            outputs: AHashMap::new(),
            inputs: AHashMap::new(),
            high_priority: 0,
            low_priority: 0,
            accumulators: Vec::new(),
            resolving: Vec::new(),
            guard_contributing: DependencySet::new(),
            priority_accessed: DependencySet::new(),
            active: DependencySet::new(),
            set_since_reinit: DependencySet::new(),
            evaluations: 0,
            monitors: MonitorRegistry::default(),
            deferred: DeferredInputs::default(),
        }
    }

    /// Options the sheet was created with
    pub fn options(&self) -> &SheetOptions {
        &self.options
    }

    /// Handle for queuing `set`/`touch` calls from monitor callbacks
    pub fn deferred(&self) -> DeferredInputs {
        self.deferred.clone()
    }

    // === Live input operations ===

    /// Assign an input or interface input, giving it the highest priority
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let slot = self.input_slot(name)?;
        let priority = self.raise_priority();
        let cell = &mut self.cells[slot];
        let changed = cell.store(value.into());
        let plain = cell.kind == CellKind::Input;
        if let Some(input) = cell.input_mut() {
            input.priority = priority;
            input.changed |= changed;
        }
        if plain {
            self.set_since_reinit.set(slot);
        }
        trace!(cell = name, priority, changed, "set");
        Ok(())
    }

    /// Assign several inputs in dictionary order
    ///
    /// The first failure aborts; earlier assignments stay applied.
    pub fn set_many(&mut self, values: &Dictionary) -> Result<()> {
        for (name, value) in values {
            self.set(name, value.clone())?;
        }
        Ok(())
    }

    /// Give the named inputs fresh priorities above every other input
    ///
    /// The relative order of the touched inputs among themselves is kept.
    pub fn touch<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let mut slots = names
            .iter()
            .map(|name| self.input_slot(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        slots.sort_by_key(|slot| (self.priority_of(*slot), *slot));
        slots.dedup();
        for slot in slots {
            let priority = self.raise_priority();
            if let Some(input) = self.cells[slot].input_mut() {
                input.priority = priority;
            }
        }
        Ok(())
    }

    /// Recompute interface input initializers that read inputs set since the
    /// previous call, and give those interface inputs the highest priority
    pub fn reinitialize(&mut self) -> Result<()> {
        let since = self.set_since_reinit;
        for slot in 0..self.cells.len() {
            let initializer = match &self.cells[slot] {
                cell if cell.kind == CellKind::InterfaceInput => match cell.input() {
                    Some(input) if input.init_contributing.intersects(&since) => {
                        input.initializer.clone()
                    }
                    _ => continue,
                },
                _ => continue,
            };

            let mut scope = InitScope::new(self);
            let value = evaluate(&initializer, &mut scope)?;
            let init_contributing = scope.contributing;
            let priority = self.raise_priority();
            let cell = &mut self.cells[slot];
            let changed = cell.store(value);
            if let Some(input) = cell.input_mut() {
                input.priority = priority;
                input.init_contributing = init_contributing;
                input.changed |= changed;
            }
            trace!(cell = %cell.name, priority, changed, "reinitialized");
        }
        self.set_since_reinit.clear();
        Ok(())
    }

    // === Reads ===

    /// Read a cell, computing it first if this pass has not yet done so
    ///
    /// Output-side names win over input-side names.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        let slot = self.lookup(name)?;
        self.read_slot(slot)
    }

    /// Evaluate an arbitrary expression against the current state
    pub fn inspect(&mut self, expr: impl IntoExpr) -> Result<Value> {
        let expr = expr.into_expr()?;
        self.accumulators.push(DependencySet::new());
        let result = evaluate(&expr, &mut Tracked { sheet: self });
        self.accumulators.pop();
        result
    }

    // === Introspection ===

    /// True if `name` is an input or interface input
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// True if `name` is declared on the output side
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    /// Kind of the cell `name` resolves to
    pub fn cell_kind(&self, name: &str) -> Option<CellKind> {
        self.lookup(name).ok().map(|slot| self.cells[slot].kind)
    }

    /// Current priority of an input
    pub fn priority(&self, name: &str) -> Option<i64> {
        let slot = *self.inputs.get(name)?;
        self.cells[slot].input().map(|input| input.priority)
    }

    /// True if the cell contributes to or depends on a failing invariant
    pub fn is_implicated(&self, name: &str) -> Result<bool> {
        let slot = self.lookup(name)?;
        Ok(self.cells[slot].implicated)
    }

    /// Number of declared cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if nothing has been declared
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of declared relations
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Number of live monitor registrations
    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Remove a monitor; returns false if it was already gone
    pub fn disconnect(&mut self, id: MonitorId) -> bool {
        self.monitors.disconnect(id)
    }

    // === Internals ===

    pub(crate) fn lookup(&self, name: &str) -> Result<usize> {
        self.outputs
            .get(name)
            .or_else(|| self.inputs.get(name))
            .copied()
            .ok_or_else(|| SheetError::UnknownCell(name.to_string()))
    }

    pub(crate) fn input_slot(&self, name: &str) -> Result<usize> {
        self.inputs
            .get(name)
            .copied()
            .ok_or_else(|| SheetError::UnknownInput(name.to_string()))
    }

    pub(crate) fn priority_of(&self, slot: usize) -> i64 {
        self.cells[slot].input().map_or(0, |input| input.priority)
    }

    fn raise_priority(&mut self) -> i64 {
        self.high_priority += 1;
        self.high_priority
    }

    fn lower_priority(&mut self) -> i64 {
        self.low_priority -= 1;
        self.low_priority
    }

    /// Dependency-tracked read of a name from inside an evaluation
    fn read(&mut self, name: &str) -> Result<Value> {
        let top = self.resolving.last().copied();
        let slot = match top {
            // A cell reading its own name reads its input half
            Some(top) if self.cells[top].name == name => match self.inputs.get(name) {
                Some(slot) => *slot,
                None => return Err(self.cycle_error(top)),
            },
            _ => self.lookup(name)?,
        };
        self.read_slot(slot)
    }

    fn read_slot(&mut self, slot: usize) -> Result<Value> {
        let kind = self.cells[slot].kind;
        let contribution = match kind {
            CellKind::Constant => DependencySet::new(),
            CellKind::Input | CellKind::InterfaceInput => DependencySet::single(slot),
            _ => {
                self.ensure_evaluated(slot)?;
                self.cells[slot]
                    .derived()
                    .map(|derived| derived.contributing)
                    .unwrap_or_default()
            }
        };
        if let Some(accumulator) = self.accumulators.last_mut() {
            *accumulator |= contribution;
        }
        Ok(self.cells[slot].value.clone())
    }

    pub(crate) fn ensure_evaluated(&mut self, slot: usize) -> Result<()> {
        let Some(derived) = self.cells[slot].derived() else {
            return Ok(());
        };
        if derived.evaluated {
            return Ok(());
        }
        if derived.relation_pending > 0 {
            return Err(SheetError::UnresolvedRelation(self.cells[slot].name.clone()));
        }
        if derived.in_progress {
            return Err(self.cycle_error(slot));
        }
        self.evaluate_cell(slot)
    }

    /// Cycle through `slot`, from its first appearance on the resolving stack
    fn cycle_error(&self, slot: usize) -> SheetError {
        let start = self
            .resolving
            .iter()
            .position(|s| *s == slot)
            .unwrap_or(self.resolving.len());
        let mut path: Vec<String> = self.resolving[start..]
            .iter()
            .map(|s| self.cells[*s].name.clone())
            .collect();
        path.push(self.cells[slot].name.clone());
        tracing::warn!(path = ?path, "cycle detected");
        SheetError::CycleDetected { path }
    }

    fn evaluate_cell(&mut self, slot: usize) -> Result<()> {
        let Some(derived) = self.cells[slot].derived_mut() else {
            return Ok(());
        };
        let expr = derived.active_expr();
        derived.in_progress = true;

        self.resolving.push(slot);
        self.accumulators.push(DependencySet::new());
        let result = evaluate(&expr, &mut Tracked { sheet: self });
        let mut contributing = self.accumulators.pop().unwrap_or_default();
        self.resolving.pop();
        self.evaluations += 1;

        let guard_contributing = self.guard_contributing;
        let cell = &mut self.cells[slot];
        if let Some(derived) = cell.derived_mut() {
            derived.in_progress = false;
        }
        let value = result?;

        // Guards that held this pass decide what every output sees
        if cell.kind.is_output() {
            contributing |= guard_contributing;
        }
        let changed = cell.store(value);
        let mut paired = None;
        if let Some(derived) = cell.derived_mut() {
            derived.contributing = contributing;
            derived.evaluated = true;
            derived.dirty = changed;
            paired = derived.paired;
        }
        trace!(cell = %cell.name, value = %cell.value, changed, "evaluated");

        if let Some(input) = paired {
            self.propagate_linked(slot, input);
        }
        Ok(())
    }

    /// Copy an interface output's value into its linked input
    fn propagate_linked(&mut self, output: usize, input: usize) {
        if !self.options.propagate_linked {
            return;
        }
        let linked = self.cells[input].input().map_or(false, |i| i.linked);
        if !linked {
            return;
        }
        let value = self.cells[output].value.clone();
        let cell = &mut self.cells[input];
        if cell.store(value) {
            if let Some(input) = cell.input_mut() {
                input.changed = true;
            }
            trace!(cell = %cell.name, "linked value propagated");
        }
    }
}

/// Resolver reading through the sheet with dependency tracking
struct Tracked<'a> {
    sheet: &'a mut Sheet,
}

impl NameResolver for Tracked<'_> {
    type Error = SheetError;

    fn resolve(&mut self, name: &str) -> Result<Value> {
        self.sheet.read(name)
    }
}

/// Resolver for initializers: sees inputs and constants only
pub(crate) struct InitScope<'a> {
    sheet: &'a Sheet,
    pub contributing: DependencySet,
}

impl<'a> InitScope<'a> {
    pub fn new(sheet: &'a Sheet) -> Self {
        Self {
            sheet,
            contributing: DependencySet::new(),
        }
    }
}

impl NameResolver for InitScope<'_> {
    type Error = SheetError;

    fn resolve(&mut self, name: &str) -> Result<Value> {
        if let Some(slot) = self.sheet.inputs.get(name) {
            self.contributing.set(*slot);
            return Ok(self.sheet.cells[*slot].value.clone());
        }
        match self.sheet.outputs.get(name) {
            Some(slot) if self.sheet.cells[*slot].kind == CellKind::Constant => {
                Ok(self.sheet.cells[*slot].value.clone())
            }
            _ => Err(SheetError::UnknownCell(name.to_string())),
        }
    }
}
