//! Text functions

use super::{arg, for_each_scalar};
use crate::error::{ExprError, ExprResult};
use crate::evaluator::text_of;
use propsheet_core::Value;

fn text_arg(args: &[Value], index: usize, function: &str) -> ExprResult<String> {
    match arg(args, index, function)? {
        Value::Array(_) => Err(ExprError::Argument(format!(
            "{} expects a scalar argument",
            function
        ))),
        other => Ok(text_of(other)),
    }
}

/// LEN function - length in characters
pub fn fn_len(args: &[Value]) -> ExprResult<Value> {
    Ok(Value::Number(text_arg(args, 0, "LEN")?.chars().count() as f64))
}

/// CONCAT function
pub fn fn_concat(args: &[Value]) -> ExprResult<Value> {
    let mut out = String::new();
    for_each_scalar(args, &mut |v| out.push_str(&text_of(v)));
    Ok(Value::string(out))
}

/// UPPER function
pub fn fn_upper(args: &[Value]) -> ExprResult<Value> {
    Ok(Value::string(text_arg(args, 0, "UPPER")?.to_uppercase()))
}

/// LOWER function
pub fn fn_lower(args: &[Value]) -> ExprResult<Value> {
    Ok(Value::string(text_arg(args, 0, "LOWER")?.to_lowercase()))
}

/// TRIM function - strips leading/trailing whitespace and collapses inner runs
pub fn fn_trim(args: &[Value]) -> ExprResult<Value> {
    let text = text_arg(args, 0, "TRIM")?;
    Ok(Value::string(
        text.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}
