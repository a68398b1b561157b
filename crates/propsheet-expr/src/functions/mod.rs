//! Built-in functions
//!
//! `IF`, `AND`, `OR` and `IFEMPTY` are special forms handled by the evaluator;
//! everything here receives fully evaluated arguments.

pub mod logical;
pub mod math;
pub mod text;

use crate::error::ExprResult;
use ahash::AHashMap;
use propsheet_core::Value;

/// Function implementation signature
pub type FunctionImpl = fn(&[Value]) -> ExprResult<Value>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_logical_functions();
        registry.register_math_functions();
        registry.register_text_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    fn add(&mut self, name: &'static str, min_args: usize, max_args: Option<usize>, f: FunctionImpl) {
        self.register(FunctionDef {
            name,
            min_args,
            max_args,
            implementation: f,
        });
    }

    fn register_logical_functions(&mut self) {
        self.add("NOT", 1, Some(1), logical::fn_not);
        self.add("XOR", 1, None, logical::fn_xor);
    }

    fn register_math_functions(&mut self) {
        self.add("SUM", 1, None, math::fn_sum);
        self.add("MIN", 1, None, math::fn_min);
        self.add("MAX", 1, None, math::fn_max);
        self.add("COUNT", 1, None, math::fn_count);
        self.add("ABS", 1, Some(1), math::fn_abs);
        self.add("ROUND", 1, Some(2), math::fn_round);
        self.add("INT", 1, Some(1), math::fn_int);
        self.add("MOD", 2, Some(2), math::fn_mod);
        self.add("SQRT", 1, Some(1), math::fn_sqrt);
        self.add("POWER", 2, Some(2), math::fn_power);
        self.add("CLAMP", 3, Some(3), math::fn_clamp);
        self.add("INDEX", 2, Some(2), math::fn_index);
    }

    fn register_text_functions(&mut self) {
        self.add("LEN", 1, Some(1), text::fn_len);
        self.add("CONCAT", 1, None, text::fn_concat);
        self.add("UPPER", 1, Some(1), text::fn_upper);
        self.add("LOWER", 1, Some(1), text::fn_lower);
        self.add("TRIM", 1, Some(1), text::fn_trim);
    }
}

/// Fetch a required argument
pub(crate) fn arg<'a>(args: &'a [Value], index: usize, function: &str) -> ExprResult<&'a Value> {
    args.get(index).ok_or_else(|| {
        crate::error::ExprError::Argument(format!("{} requires argument {}", function, index + 1))
    })
}

/// Fetch a required numeric argument
pub(crate) fn number_arg(args: &[Value], index: usize, function: &str) -> ExprResult<f64> {
    let value = arg(args, index, function)?;
    value.as_number().ok_or_else(|| {
        crate::error::ExprError::Argument(format!(
            "{} expects a number for argument {}, got {}",
            function,
            index + 1,
            value.type_name()
        ))
    })
}

/// Visit scalar arguments, flattening arrays one level deep or more
pub(crate) fn for_each_scalar<'a>(args: &'a [Value], f: &mut impl FnMut(&'a Value)) {
    for arg in args {
        match arg {
            Value::Array(items) => for_each_scalar(items, f),
            other => f(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("sum").is_some());
        assert!(registry.get("Clamp").is_some());
        assert!(registry.get("VLOOKUP").is_none());
    }
}
