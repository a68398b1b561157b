//! Sheet error types

use propsheet_expr::ExprError;
use thiserror::Error;

/// Result type for sheet operations
pub type Result<T> = std::result::Result<T, SheetError>;

/// Errors raised by sheet declaration and live operations
///
/// Every error is scoped to the operation that raised it. Partial progress of
/// an `update` or `set_many` is not rolled back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SheetError {
    /// A cell with this name already exists in the same namespace
    #[error("Duplicate cell name: {0}")]
    DuplicateName(String),

    /// No cell with this name
    #[error("Unknown cell: {0}")]
    UnknownCell(String),

    /// No input or interface input with this name
    #[error("Unknown input: {0}")]
    UnknownInput(String),

    /// A relation term does not name a declared interface cell
    #[error("Relation term is not an interface cell: {0}")]
    UnknownRelationTerm(String),

    /// Every term of a relation was resolved without the relation being applied
    #[error("Relation violation: every term of relation {{{}}} is already resolved", terms.join(", "))]
    RelationViolation { terms: Vec<String> },

    /// A cell was read while still claimed by an unresolved relation
    #[error("Cell is claimed by an unresolved relation: {0}")]
    UnresolvedRelation(String),

    /// A cell was re-entered while being computed
    #[error("Cycle detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// Declaring the cell would exceed the sheet's capacity
    #[error("Sheet capacity of {capacity} cells exceeded")]
    CapacityExceeded { capacity: usize },

    /// A relation was declared without terms
    #[error("Relation has no terms")]
    EmptyRelation,

    /// Expression parse or evaluation error
    #[error(transparent)]
    Eval(#[from] ExprError),
}

impl SheetError {
    /// True for errors raised by the expression service
    pub fn is_eval(&self) -> bool {
        matches!(self, SheetError::Eval(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = SheetError::CycleDetected {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cycle detected: a -> b -> a");

        let err = SheetError::RelationViolation {
            terms: vec!["x".into(), "y".into()],
        };
        assert_eq!(
            err.to_string(),
            "Relation violation: every term of relation {x, y} is already resolved"
        );
    }

    #[test]
    fn test_eval_errors_pass_through() {
        let err: SheetError = ExprError::DivisionByZero.into();
        assert!(err.is_eval());
        assert_eq!(err.to_string(), "Division by zero");
    }
}
