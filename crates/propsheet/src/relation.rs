//! Relations: equality constraints among interface cells
//!
//! A relation lists terms `cell <== expr`. Each update picks exactly one term
//! whose cell is derived from the others; the rest keep their own values.

use crate::cell::Cell;
use propsheet_expr::Expr;
use std::fmt;
use std::rc::Rc;

/// One `cell <== expr` clause of a relation
#[derive(Debug, Clone)]
pub(crate) struct Term {
    /// Slot of the interface output this term derives
    pub cell: usize,
    pub expr: Rc<Expr>,
}

#[derive(Debug)]
pub(crate) struct Relation {
    pub guard: Option<Rc<Expr>>,
    pub terms: Vec<Term>,
    /// Applied or suppressed this pass
    pub resolved: bool,
}

impl Relation {
    pub fn new(guard: Option<Expr>, terms: Vec<Term>) -> Self {
        Self {
            guard: guard.map(Rc::new),
            terms,
            resolved: false,
        }
    }
}

/// Display adapter rendering a relation with its term names
pub(crate) struct DisplayRelation<'a> {
    pub relation: &'a Relation,
    pub cells: &'a [Cell],
}

impl fmt::Display for DisplayRelation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(guard) = &self.relation.guard {
            write!(f, "when ({}) ", guard)?;
        }
        f.write_str("relate {")?;
        for (i, term) in self.relation.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            let name = self.cells.get(term.cell).map_or("?", |cell| cell.name.as_str());
            write!(f, " {} <== {}", name, term.expr)?;
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellBody, CellKind, DerivedCell};
    use propsheet_core::Value;
    use propsheet_expr::parse_expression;

    #[test]
    fn test_display() {
        let relation = Relation::new(
            Some(parse_expression("locked").unwrap()),
            vec![
                Term {
                    cell: 0,
                    expr: Rc::new(parse_expression("b * 2").unwrap()),
                },
                Term {
                    cell: 1,
                    expr: Rc::new(parse_expression("a / 2").unwrap()),
                },
            ],
        );
        let cells: Vec<Cell> = ["a", "b"]
            .iter()
            .map(|name| {
                Cell::new(
                    name,
                    CellKind::InterfaceOutput,
                    Value::Empty,
                    CellBody::Derived(DerivedCell::new(Expr::Empty, None)),
                )
            })
            .collect();
        let text = DisplayRelation {
            relation: &relation,
            cells: &cells,
        }
        .to_string();
        assert_eq!(text, "when (locked) relate { a <== b * 2; b <== a / 2 }");
    }
}
