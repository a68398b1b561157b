//! # propsheet-core
//!
//! Core value types for the propsheet property-sheet engine.
//!
//! This crate provides the types shared by the expression language and the
//! sheet engine:
//! - [`Value`] - the dynamic value held by every cell
//! - [`Dictionary`] - a name to value map used for bulk assignment and marks
//! - [`Error`] - conversion failures when extracting typed data from a [`Value`]
//!
//! ## Example
//!
//! ```rust
//! use propsheet_core::{Dictionary, Value};
//!
//! let mut mark = Dictionary::new();
//! mark.insert("width".to_string(), Value::from(640));
//! mark.insert("locked".to_string(), Value::from(true));
//!
//! assert_eq!(mark["width"].as_number(), Some(640.0));
//! assert!(mark["locked"].as_bool());
//! ```

pub mod error;
pub mod value;

pub use error::{Error, Result};
pub use value::{Dictionary, SharedString, Value};
