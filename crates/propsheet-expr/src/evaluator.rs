//! Expression evaluator
//!
//! Evaluates expression ASTs to produce values. Names are resolved through a
//! caller-supplied [`NameResolver`], so the caller sees every read.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{ExprError, ExprResult};
use crate::functions::FunctionRegistry;
use propsheet_core::{Dictionary, Value};
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Source of values for the names an expression references
///
/// Resolution may fail with the resolver's own error type; such failures are
/// propagated out of [`evaluate`] unchanged.
pub trait NameResolver {
    /// Error raised while resolving a name or evaluating
    type Error: From<ExprError>;

    /// Produce the current value of `name`
    fn resolve(&mut self, name: &str) -> Result<Value, Self::Error>;
}

/// Context for evaluation without a sheet
pub struct SimpleContext<'a> {
    names: Option<&'a Dictionary>,
}

impl<'a> SimpleContext<'a> {
    /// Create a context that knows no names (for constant expressions)
    pub fn simple() -> Self {
        Self { names: None }
    }

    /// Create a context that resolves names from a dictionary
    pub fn with_names(names: &'a Dictionary) -> Self {
        Self { names: Some(names) }
    }
}

impl NameResolver for SimpleContext<'_> {
    type Error = ExprError;

    fn resolve(&mut self, name: &str) -> ExprResult<Value> {
        self.names
            .and_then(|names| names.get(name))
            .cloned()
            .ok_or_else(|| ExprError::UnknownName(name.to_string()))
    }
}

/// Evaluate an expression
pub fn evaluate<R>(expr: &Expr, ctx: &mut R) -> Result<Value, R::Error>
where
    R: NameResolver + ?Sized,
{
    match expr {
        // === Literals ===
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::String(s) => Ok(Value::string(s.as_str())),
        Expr::Boolean(b) => Ok(Value::Boolean(*b)),
        Expr::Empty => Ok(Value::Empty),

        // === References ===
        Expr::Name(name) => ctx.resolve(name),

        // === Operators ===
        Expr::BinaryOp { op, left, right } => {
            let left_val = evaluate(left, ctx)?;
            let right_val = evaluate(right, ctx)?;
            Ok(evaluate_binary_op(*op, &left_val, &right_val)?)
        }

        Expr::UnaryOp { op, operand } => {
            let val = evaluate(operand, ctx)?;
            Ok(evaluate_unary_op(*op, &val)?)
        }

        // === Functions ===
        Expr::Function { name, args } => evaluate_function(name, args, ctx),

        // === Arrays ===
        Expr::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(evaluate(item, ctx)?);
            }
            Ok(Value::Array(values))
        }
    }
}

fn expect_number(value: &Value) -> ExprResult<f64> {
    value.as_number().ok_or_else(|| {
        ExprError::Evaluation(format!("Expected number, got {}", value.type_name()))
    })
}

/// Text form of a value for concatenation
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.as_str().to_string(),
        Value::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(op: BinaryOperator, left: &Value, right: &Value) -> ExprResult<Value> {
    match op {
        // Arithmetic operators
        BinaryOperator::Add => Ok(Value::Number(expect_number(left)? + expect_number(right)?)),
        BinaryOperator::Subtract => {
            Ok(Value::Number(expect_number(left)? - expect_number(right)?))
        }
        BinaryOperator::Multiply => {
            Ok(Value::Number(expect_number(left)? * expect_number(right)?))
        }
        BinaryOperator::Divide => {
            let l = expect_number(left)?;
            let r = expect_number(right)?;
            if r == 0.0 {
                Err(ExprError::DivisionByZero)
            } else {
                Ok(Value::Number(l / r))
            }
        }
        BinaryOperator::Power => {
            let result = expect_number(left)?.powf(expect_number(right)?);
            if result.is_nan() || result.is_infinite() {
                Err(ExprError::Evaluation("Power result is not a finite number".into()))
            } else {
                Ok(Value::Number(result))
            }
        }

        // Comparison operators
        BinaryOperator::Equal => Ok(Value::Boolean(compare_values(left, right).is_eq())),
        BinaryOperator::NotEqual => Ok(Value::Boolean(compare_values(left, right).is_ne())),
        BinaryOperator::LessThan => Ok(Value::Boolean(compare_values(left, right).is_lt())),
        BinaryOperator::LessEqual => Ok(Value::Boolean(compare_values(left, right).is_le())),
        BinaryOperator::GreaterThan => Ok(Value::Boolean(compare_values(left, right).is_gt())),
        BinaryOperator::GreaterEqual => {
            Ok(Value::Boolean(compare_values(left, right).is_ge()))
        }

        // Concatenation
        BinaryOperator::Concat => Ok(Value::string(text_of(left) + &text_of(right))),
    }
}

/// Compare two values for ordering
///
/// Values of different types order as empty < number < string < boolean < array.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Empty => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Boolean(_) => 3,
            Value::Array(_) => 4,
        }
    }

    match (left, right) {
        (Value::Empty, Value::Empty) => Ordering::Equal,
        (Value::Number(l), Value::Number(r)) => l.total_cmp(r),
        (Value::String(l), Value::String(r)) => l.as_str().cmp(r.as_str()),
        (Value::Boolean(l), Value::Boolean(r)) => l.cmp(r),
        (Value::Array(l), Value::Array(r)) => {
            for (a, b) in l.iter().zip(r.iter()) {
                let ord = compare_values(a, b);
                if ord.is_ne() {
                    return ord;
                }
            }
            l.len().cmp(&r.len())
        }
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(op: UnaryOperator, val: &Value) -> ExprResult<Value> {
    match op {
        UnaryOperator::Negate => Ok(Value::Number(-expect_number(val)?)),
        UnaryOperator::Percent => Ok(Value::Number(expect_number(val)? / 100.0)),
    }
}

/// Evaluate a function call
///
/// `IF`, `AND`, `OR` and `IFEMPTY` only evaluate the arguments they need, so a
/// resolver observes just the names that decided the result.
fn evaluate_function<R>(name: &str, args: &[Expr], ctx: &mut R) -> Result<Value, R::Error>
where
    R: NameResolver + ?Sized,
{
    match name {
        "IF" => {
            check_arity(name, args.len(), 2, Some(3))?;
            if evaluate(&args[0], ctx)?.as_bool() {
                evaluate(&args[1], ctx)
            } else {
                match args.get(2) {
                    Some(otherwise) => evaluate(otherwise, ctx),
                    None => Ok(Value::Boolean(false)),
                }
            }
        }
        "AND" => {
            check_arity(name, args.len(), 1, None)?;
            for arg in args {
                if !evaluate(arg, ctx)?.as_bool() {
                    return Ok(Value::Boolean(false));
                }
            }
            Ok(Value::Boolean(true))
        }
        "OR" => {
            check_arity(name, args.len(), 1, None)?;
            for arg in args {
                if evaluate(arg, ctx)?.as_bool() {
                    return Ok(Value::Boolean(true));
                }
            }
            Ok(Value::Boolean(false))
        }
        "IFEMPTY" => {
            check_arity(name, args.len(), 2, Some(2))?;
            let value = evaluate(&args[0], ctx)?;
            if value.is_empty() {
                evaluate(&args[1], ctx)
            } else {
                Ok(value)
            }
        }
        _ => {
            let registry = get_function_registry();

            let func = registry
                .get(name)
                .ok_or_else(|| ExprError::UnknownFunction(name.to_string()))?;

            check_arity(name, args.len(), func.min_args, func.max_args)?;

            // Evaluate arguments
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, ctx)?);
            }

            // Call the function
            Ok((func.implementation)(&evaluated_args)?)
        }
    }
}

fn check_arity(name: &str, actual: usize, min: usize, max: Option<usize>) -> ExprResult<()> {
    if actual < min {
        return Err(ExprError::ArgumentCount {
            function: name.to_string(),
            expected: format!("at least {}", min),
            actual,
        });
    }

    if let Some(max) = max {
        if actual > max {
            return Err(ExprError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at most {}", max),
                actual,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use pretty_assertions::assert_eq;

    fn eval(text: &str) -> ExprResult<Value> {
        let ast = parse_expression(text)?;
        let mut ctx = SimpleContext::simple();
        evaluate(&ast, &mut ctx)
    }

    /// Records every name read, in order
    struct Recorder {
        names: Dictionary,
        reads: Vec<String>,
    }

    impl NameResolver for Recorder {
        type Error = ExprError;

        fn resolve(&mut self, name: &str) -> ExprResult<Value> {
            self.reads.push(name.to_string());
            self.names
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UnknownName(name.to_string()))
        }
    }

    fn recorder(pairs: &[(&str, Value)]) -> Recorder {
        Recorder {
            names: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            reads: Vec::new(),
        }
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("42").unwrap(), Value::Number(42.0));
        assert_eq!(eval("\"Hello\"").unwrap(), Value::string("Hello"));
        assert_eq!(eval("TRUE").unwrap(), Value::Boolean(true));
        assert_eq!(eval("empty").unwrap(), Value::Empty);
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1+2").unwrap(), Value::Number(3.0));
        assert_eq!(eval("10-3").unwrap(), Value::Number(7.0));
        assert_eq!(eval("4*5").unwrap(), Value::Number(20.0));
        assert_eq!(eval("20/4").unwrap(), Value::Number(5.0));
        assert_eq!(eval("2^10").unwrap(), Value::Number(1024.0));
        assert_eq!(eval("(1+2)*3").unwrap(), Value::Number(9.0));
        assert_eq!(eval("-5 + 50%").unwrap(), Value::Number(-4.5));
    }

    #[test]
    fn test_evaluate_comparison() {
        assert_eq!(eval("1<2").unwrap(), Value::Boolean(true));
        assert_eq!(eval("5=5").unwrap(), Value::Boolean(true));
        assert_eq!(eval("5<>5").unwrap(), Value::Boolean(false));
        assert_eq!(eval("\"a\" < \"b\"").unwrap(), Value::Boolean(true));
        assert_eq!(eval("1 = \"1\"").unwrap(), Value::Boolean(false));
        assert_eq!(eval("{1, 2} = {1, 2}").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_evaluate_concatenation() {
        assert_eq!(
            eval("\"w=\" & 3 & \"px\"").unwrap(),
            Value::string("w=3px")
        );
    }

    #[test]
    fn test_evaluate_errors() {
        assert_eq!(eval("1/0").unwrap_err(), ExprError::DivisionByZero);
        assert!(matches!(eval("1 + \"a\""), Err(ExprError::Evaluation(_))));
        assert!(matches!(
            eval("NOSUCH(1)"),
            Err(ExprError::UnknownFunction(_))
        ));
        assert!(matches!(
            eval("IF(TRUE)"),
            Err(ExprError::ArgumentCount { .. })
        ));
        assert_eq!(
            eval("missing").unwrap_err(),
            ExprError::UnknownName("missing".into())
        );
    }

    #[test]
    fn test_if_reads_only_taken_branch() {
        let ast = parse_expression("IF(flag, a, b)").unwrap();
        let mut ctx = recorder(&[
            ("flag", Value::Boolean(true)),
            ("a", Value::from(1)),
            ("b", Value::from(2)),
        ]);
        assert_eq!(evaluate(&ast, &mut ctx).unwrap(), Value::from(1));
        assert_eq!(ctx.reads, vec!["flag", "a"]);
    }

    #[test]
    fn test_and_or_short_circuit() {
        let ast = parse_expression("OR(x, y) & AND(z, y)").unwrap();
        let mut ctx = recorder(&[
            ("x", Value::Boolean(true)),
            ("y", Value::Boolean(true)),
            ("z", Value::Boolean(false)),
        ]);
        assert_eq!(evaluate(&ast, &mut ctx).unwrap(), Value::string("truefalse"));
        assert_eq!(ctx.reads, vec!["x", "z"]);
    }

    #[test]
    fn test_ifempty() {
        let ast = parse_expression("IFEMPTY(a, 9)").unwrap();
        let mut ctx = recorder(&[("a", Value::Empty)]);
        assert_eq!(evaluate(&ast, &mut ctx).unwrap(), Value::from(9));
    }

    #[test]
    fn test_evaluate_array() {
        assert_eq!(
            eval("{1, \"a\", 1 > 0}").unwrap(),
            Value::Array(vec![Value::from(1), Value::from("a"), Value::from(true)])
        );
    }
}
