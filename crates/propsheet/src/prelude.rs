//! Prelude module - common imports for propsheet users
//!
//! ```rust
//! use propsheet::prelude::*;
//! ```

pub use crate::{
    // Cell kinds
    CellKind,
    // Provenance and monitors
    ContributingSet,
    DeferredInputs,
    // Values
    Dictionary,
    Expr,
    IntoExpr,
    MonitorId,
    // Errors
    Result,
    // Main types
    Sheet,
    SheetError,
    SheetOptions,
    UpdateStats,
    Value,
};
