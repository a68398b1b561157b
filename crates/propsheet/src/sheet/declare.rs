//! Declaration operations
//!
//! Cells and relations are appended; nothing is ever removed. Names live in
//! two namespaces: inputs and interface inputs on one side, everything else
//! on the other, so an interface pair shares one name.

use super::{InitScope, Sheet};
use crate::cell::{Cell, CellBody, CellKind, DerivedCell, InputCell};
use crate::dependency::DependencySet;
use crate::error::{Result, SheetError};
use crate::relation::{Relation, Term};
use propsheet_core::Value;
use propsheet_expr::{evaluate, parse_expression, Expr};
use std::rc::Rc;
use tracing::{trace, warn};

/// Anything a declaration accepts as an expression: source text or a parsed tree
pub trait IntoExpr {
    fn into_expr(self) -> Result<Expr>;
}

impl IntoExpr for &str {
    fn into_expr(self) -> Result<Expr> {
        Ok(parse_expression(self)?)
    }
}

impl IntoExpr for String {
    fn into_expr(self) -> Result<Expr> {
        self.as_str().into_expr()
    }
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Result<Expr> {
        Ok(self)
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Result<Expr> {
        Ok(self.clone())
    }
}

impl Sheet {
    /// Declare a settable input; the initializer is evaluated now
    ///
    /// Initializers see inputs and constants only.
    pub fn add_input(&mut self, name: &str, initializer: impl IntoExpr) -> Result<()> {
        let initializer = initializer.into_expr()?;
        self.check_declaration(name, 1, true, false)?;
        let (value, init_contributing) = self.initialize(&initializer)?;
        let priority = self.raise_priority();
        self.push_cell(Cell::new(
            name,
            CellKind::Input,
            value,
            CellBody::Input(InputCell {
                initializer: Rc::new(initializer),
                init_contributing,
                priority,
                changed: false,
                linked: false,
                paired: None,
            }),
        ));
        Ok(())
    }

    /// Declare a constant; the initializer is evaluated now
    pub fn add_constant(&mut self, name: &str, initializer: impl IntoExpr) -> Result<()> {
        let initializer = initializer.into_expr()?;
        self.check_declaration(name, 1, false, true)?;
        let (value, _) = self.initialize(&initializer)?;
        self.push_cell(Cell::new(
            name,
            CellKind::Constant,
            value,
            CellBody::Constant { initializer },
        ));
        Ok(())
    }

    /// Declare an output, recomputed by every update
    pub fn add_output(&mut self, name: &str, expr: impl IntoExpr) -> Result<()> {
        self.add_derived(name, CellKind::Output, expr.into_expr()?)
    }

    /// Declare an intermediate cell, computed only when something reads it
    pub fn add_logic(&mut self, name: &str, expr: impl IntoExpr) -> Result<()> {
        self.add_derived(name, CellKind::Logic, expr.into_expr()?)
    }

    /// Declare an invariant, checked by every update after outputs
    pub fn add_invariant(&mut self, name: &str, expr: impl IntoExpr) -> Result<()> {
        self.add_derived(name, CellKind::Invariant, expr.into_expr()?)
    }

    /// Declare an interface pair whose output reads its own input unless a
    /// relation derives it
    pub fn add_interface(
        &mut self,
        name: &str,
        linked: bool,
        initializer: impl IntoExpr,
    ) -> Result<()> {
        self.add_interface_with(name, linked, initializer, Expr::Name(name.to_string()))
    }

    /// Declare an interface pair with an explicit derive expression
    ///
    /// A `linked` pair copies the output's value back into the input after
    /// every evaluation.
    pub fn add_interface_with(
        &mut self,
        name: &str,
        linked: bool,
        initializer: impl IntoExpr,
        derive: impl IntoExpr,
    ) -> Result<()> {
        let initializer = initializer.into_expr()?;
        let derive = derive.into_expr()?;
        self.check_declaration(name, 2, true, true)?;
        let (value, init_contributing) = self.initialize(&initializer)?;
        let priority = self.raise_priority();

        let input = self.cells.len();
        let output = input + 1;
        self.push_cell(Cell::new(
            name,
            CellKind::InterfaceInput,
            value,
            CellBody::Input(InputCell {
                initializer: Rc::new(initializer),
                init_contributing,
                priority,
                changed: false,
                linked,
                paired: Some(output),
            }),
        ));
        self.push_cell(Cell::new(
            name,
            CellKind::InterfaceOutput,
            Value::Empty,
            CellBody::Derived(DerivedCell::new(derive, Some(input))),
        ));
        Ok(())
    }

    /// Declare a relation among interface cells
    ///
    /// Each term is `(cell, expr)`: when the relation picks that term, `cell`
    /// is derived from `expr`.
    pub fn add_relation<I, N, E>(&mut self, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = (N, E)>,
        N: AsRef<str>,
        E: IntoExpr,
    {
        self.push_relation(None, terms)
    }

    /// Declare a relation that only constrains its terms while `guard` holds
    pub fn add_guarded_relation<I, N, E>(&mut self, guard: impl IntoExpr, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = (N, E)>,
        N: AsRef<str>,
        E: IntoExpr,
    {
        let guard = guard.into_expr()?;
        self.push_relation(Some(guard), terms)
    }

    fn push_relation<I, N, E>(&mut self, guard: Option<Expr>, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = (N, E)>,
        N: AsRef<str>,
        E: IntoExpr,
    {
        let mut parsed = Vec::new();
        for (name, expr) in terms {
            let name = name.as_ref();
            let cell = match self.outputs.get(name) {
                Some(slot) if self.cells[*slot].kind == CellKind::InterfaceOutput => *slot,
                _ => return Err(SheetError::UnknownRelationTerm(name.to_string())),
            };
            parsed.push(Term {
                cell,
                expr: Rc::new(expr.into_expr()?),
            });
        }
        if parsed.is_empty() {
            return Err(SheetError::EmptyRelation);
        }

        let index = self.relations.len();
        for term in &parsed {
            if let Some(derived) = self.cells[term.cell].derived_mut() {
                derived.relations.push(index);
                derived.relation_pending += 1;
            }
        }
        trace!(relation = index, terms = parsed.len(), "declared relation");
        self.relations.push(Relation::new(guard, parsed));
        Ok(())
    }

    fn add_derived(&mut self, name: &str, kind: CellKind, expr: Expr) -> Result<()> {
        self.check_declaration(name, 1, false, true)?;
        self.push_cell(Cell::new(
            name,
            kind,
            Value::Empty,
            CellBody::Derived(DerivedCell::new(expr, None)),
        ));
        Ok(())
    }

    fn check_declaration(
        &self,
        name: &str,
        count: usize,
        input_side: bool,
        output_side: bool,
    ) -> Result<()> {
        let capacity = self.options.capacity();
        if self.cells.len() + count > capacity {
            warn!(cell = name, capacity, "sheet capacity exceeded");
            return Err(SheetError::CapacityExceeded { capacity });
        }
        if (input_side && self.inputs.contains_key(name))
            || (output_side && self.outputs.contains_key(name))
        {
            return Err(SheetError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Evaluate an initializer against inputs and constants
    fn initialize(&self, initializer: &Expr) -> Result<(Value, DependencySet)> {
        let mut scope = InitScope::new(self);
        let value = evaluate(initializer, &mut scope)?;
        Ok((value, scope.contributing))
    }

    fn push_cell(&mut self, cell: Cell) -> usize {
        let slot = self.cells.len();
        trace!(cell = %cell.name, kind = %cell.kind, slot, "declared");
        if cell.kind.is_input() {
            self.inputs.insert(cell.name.clone(), slot);
        } else {
            self.outputs.insert(cell.name.clone(), slot);
        }
        self.cells.push(cell);
        slot
    }
}
