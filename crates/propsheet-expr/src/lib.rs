//! # propsheet-expr
//!
//! Expression parser and evaluator for propsheet.
//!
//! This crate provides:
//! - Expression parsing (text → AST)
//! - Expression evaluation (AST → value) against any [`NameResolver`]
//! - Built-in functions (logical, math, text)
//!
//! The evaluator knows nothing about sheets. Every name an expression reads is
//! handed to the resolver, which is how a sheet observes exactly which cells
//! an expression touched.
//!
//! ## Example
//!
//! ```rust
//! use propsheet_core::{Dictionary, Value};
//! use propsheet_expr::{evaluate, parse_expression, SimpleContext};
//!
//! let mut names = Dictionary::new();
//! names.insert("width".to_string(), Value::from(40));
//!
//! let ast = parse_expression("width * 2 + 1").unwrap();
//! let mut ctx = SimpleContext::with_names(&names);
//! assert_eq!(evaluate(&ast, &mut ctx).unwrap(), Value::from(81));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use error::{ExprError, ExprResult};
pub use evaluator::{evaluate, NameResolver, SimpleContext};
pub use parser::parse_expression;
