//! Logical functions

use crate::error::ExprResult;
use propsheet_core::Value;

/// NOT function
pub fn fn_not(args: &[Value]) -> ExprResult<Value> {
    Ok(Value::Boolean(!super::arg(args, 0, "NOT")?.as_bool()))
}

/// XOR function - true when an odd number of arguments are true
pub fn fn_xor(args: &[Value]) -> ExprResult<Value> {
    let mut result = false;
    super::for_each_scalar(args, &mut |v| result ^= v.as_bool());
    Ok(Value::Boolean(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_xor() {
        assert_eq!(fn_not(&[Value::Number(0.0)]).unwrap(), Value::Boolean(true));
        assert_eq!(
            fn_xor(&[Value::Boolean(true), Value::Boolean(true)]).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            fn_xor(&[Value::Array(vec![Value::Boolean(true), Value::Empty])]).unwrap(),
            Value::Boolean(true)
        );
    }
}
