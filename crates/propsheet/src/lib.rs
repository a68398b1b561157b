//! # propsheet
//!
//! A declarative property-sheet engine.
//!
//! A [`Sheet`] is a network of named cells connected by expressions and
//! relations. Hosts assign the input cells and call [`Sheet::update`], which
//! recomputes everything else:
//!
//! - relations pick, per update, which of their interface cells is derived
//!   from the others, using input priorities (most recently edited wins);
//! - every derived value records exactly which inputs contributed to it;
//! - cycles are detected and reported with their path;
//! - monitors are notified of value, enabled-state, provenance and
//!   invariant changes once the pass has completed.
//!
//! ## Example
//!
//! ```rust
//! use propsheet::prelude::*;
//!
//! # fn main() -> propsheet::Result<()> {
//! let mut sheet = Sheet::new();
//! sheet.add_input("scale", "2")?;
//! sheet.add_interface("width", true, "10")?;
//! sheet.add_interface("height", true, "20")?;
//! sheet.add_relation([("width", "height / scale"), ("height", "width * scale")])?;
//! sheet.add_output("area", "width * height")?;
//!
//! // height was declared last, so it is the source and width is derived
//! sheet.update()?;
//! assert_eq!(sheet.get("width")?, Value::from(10));
//! assert_eq!(sheet.get("area")?, Value::from(200));
//!
//! // editing width flips the relation
//! sheet.set("width", 30)?;
//! sheet.update()?;
//! assert_eq!(sheet.get("height")?, Value::from(60));
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod dependency;
pub mod error;
pub mod monitor;
pub mod options;
pub mod prelude;
pub mod sheet;

mod relation;

pub use cell::CellKind;
pub use dependency::DependencySet;
pub use error::{Result, SheetError};
pub use monitor::{ContributingSet, DeferredInputs, MonitorId};
pub use options::SheetOptions;
pub use sheet::{IntoExpr, Sheet, UpdateStats};

// Re-export the value and expression types hosts need
pub use propsheet_core::{Dictionary, Value};
pub use propsheet_expr::{parse_expression, Expr, ExprError};
