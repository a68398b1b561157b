//! Cell storage
//!
//! Cells live in an append-only arena owned by the sheet; a cell's index in
//! that arena is its slot. Cross references (interface pairs, relation terms)
//! are slots, never borrows.

use crate::dependency::DependencySet;
use propsheet_core::Value;
use propsheet_expr::Expr;
use std::fmt;
use std::rc::Rc;

/// What a declared cell is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    /// Settable value
    Input,
    /// Value fixed at declaration
    Constant,
    /// Intermediate computed value, evaluated on demand
    Logic,
    /// Computed value evaluated on every update
    Output,
    /// Settable half of an interface pair
    InterfaceInput,
    /// Computed half of an interface pair, may be derived by a relation
    InterfaceOutput,
    /// Boolean condition checked after outputs are evaluated
    Invariant,
}

impl CellKind {
    /// True for kinds living in the input namespace
    pub fn is_input(self) -> bool {
        matches!(self, CellKind::Input | CellKind::InterfaceInput)
    }

    /// True for kinds whose value is computed from an expression
    pub fn is_derived(self) -> bool {
        matches!(
            self,
            CellKind::Logic | CellKind::Output | CellKind::InterfaceOutput | CellKind::Invariant
        )
    }

    /// True for kinds evaluated eagerly by every update
    pub(crate) fn is_output(self) -> bool {
        matches!(self, CellKind::Output | CellKind::InterfaceOutput)
    }

    /// Keyword used in the textual dump
    pub fn keyword(self) -> &'static str {
        match self {
            CellKind::Input => "input",
            CellKind::Constant => "constant",
            CellKind::Logic => "logic",
            CellKind::Output => "output",
            CellKind::InterfaceInput => "interface",
            CellKind::InterfaceOutput => "interface output",
            CellKind::Invariant => "invariant",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One declared cell
#[derive(Debug)]
pub(crate) struct Cell {
    pub name: String,
    pub kind: CellKind,
    pub value: Value,
    /// Contributes to (or is computed from) a failing invariant
    pub implicated: bool,
    pub implicated_changed: bool,
    pub body: CellBody,
}

#[derive(Debug)]
pub(crate) enum CellBody {
    Constant { initializer: Expr },
    Input(InputCell),
    Derived(DerivedCell),
}

/// State of an input or interface input
#[derive(Debug)]
pub(crate) struct InputCell {
    pub initializer: Rc<Expr>,
    /// Inputs read by the initializer
    pub init_contributing: DependencySet,
    pub priority: i64,
    /// Value changed since the last notification dispatch
    pub changed: bool,
    pub linked: bool,
    /// Interface output paired with this input
    pub paired: Option<usize>,
}

/// State of a computed cell
#[derive(Debug)]
pub(crate) struct DerivedCell {
    pub expr: Rc<Expr>,
    /// Term expression of the relation deriving this cell in the current pass
    pub derived_by: Option<Rc<Expr>>,
    pub contributing: DependencySet,
    pub evaluated: bool,
    pub in_progress: bool,
    pub dirty: bool,
    /// Picked (as source or derived) by relation flow this pass
    pub resolved: bool,
    pub relation_pending: usize,
    /// Relations naming this cell as a term, one entry per term
    pub relations: Vec<usize>,
    /// Interface input paired with this output
    pub paired: Option<usize>,
    /// Invariant polarity after the last evaluation
    pub polarity: Option<bool>,
    pub polarity_changed: bool,
}

impl DerivedCell {
    pub fn new(expr: Expr, paired: Option<usize>) -> Self {
        Self {
            expr: Rc::new(expr),
            derived_by: None,
            contributing: DependencySet::new(),
            evaluated: false,
            in_progress: false,
            dirty: false,
            resolved: false,
            relation_pending: 0,
            relations: Vec::new(),
            paired,
            polarity: None,
            polarity_changed: false,
        }
    }

    /// Expression producing this pass's value
    pub fn active_expr(&self) -> Rc<Expr> {
        self.derived_by.clone().unwrap_or_else(|| self.expr.clone())
    }

    pub fn reset(&mut self) {
        self.derived_by = None;
        self.evaluated = false;
        self.in_progress = false;
        self.dirty = false;
        self.resolved = false;
        self.relation_pending = self.relations.len();
    }
}

impl Cell {
    pub fn new(name: &str, kind: CellKind, value: Value, body: CellBody) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value,
            implicated: false,
            implicated_changed: false,
            body,
        }
    }

    pub fn input(&self) -> Option<&InputCell> {
        match &self.body {
            CellBody::Input(input) => Some(input),
            _ => None,
        }
    }

    pub fn input_mut(&mut self) -> Option<&mut InputCell> {
        match &mut self.body {
            CellBody::Input(input) => Some(input),
            _ => None,
        }
    }

    pub fn derived(&self) -> Option<&DerivedCell> {
        match &self.body {
            CellBody::Derived(derived) => Some(derived),
            _ => None,
        }
    }

    pub fn derived_mut(&mut self) -> Option<&mut DerivedCell> {
        match &mut self.body {
            CellBody::Derived(derived) => Some(derived),
            _ => None,
        }
    }

    /// Paired cell of an interface half
    pub fn paired(&self) -> Option<usize> {
        match &self.body {
            CellBody::Input(input) => input.paired,
            CellBody::Derived(derived) => derived.paired,
            CellBody::Constant { .. } => None,
        }
    }

    /// Store a freshly computed or assigned value, reporting whether it changed
    pub fn store(&mut self, value: Value) -> bool {
        if self.value == value {
            false
        } else {
            self.value = value;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_namespaces() {
        assert!(CellKind::Input.is_input());
        assert!(CellKind::InterfaceInput.is_input());
        assert!(!CellKind::Constant.is_input());
        assert!(CellKind::Invariant.is_derived());
        assert!(!CellKind::Logic.is_output());
        assert_eq!(CellKind::InterfaceOutput.to_string(), "interface output");
    }

    #[test]
    fn test_reset_restores_pending() {
        let mut derived = DerivedCell::new(Expr::Empty, None);
        derived.relations = vec![0, 3];
        derived.evaluated = true;
        derived.derived_by = Some(Rc::new(Expr::Number(1.0)));
        derived.reset();
        assert_eq!(derived.relation_pending, 2);
        assert!(!derived.evaluated);
        assert_eq!(*derived.active_expr(), Expr::Empty);
    }

    #[test]
    fn test_store_reports_change() {
        let mut cell = Cell::new(
            "x",
            CellKind::Input,
            Value::Empty,
            CellBody::Constant {
                initializer: Expr::Empty,
            },
        );
        assert!(cell.store(Value::from(1)));
        assert!(!cell.store(Value::from(1)));
    }
}
