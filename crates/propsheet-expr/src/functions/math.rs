//! Math functions

use super::{arg, for_each_scalar, number_arg};
use crate::error::{ExprError, ExprResult};
use propsheet_core::Value;

fn numbers(args: &[Value]) -> Vec<f64> {
    let mut out = Vec::new();
    for_each_scalar(args, &mut |v| {
        if let Value::Number(n) = v {
            out.push(*n);
        }
    });
    out
}

/// SUM function - non-numeric values are ignored
pub fn fn_sum(args: &[Value]) -> ExprResult<Value> {
    Ok(Value::Number(numbers(args).iter().sum()))
}

/// MIN function
pub fn fn_min(args: &[Value]) -> ExprResult<Value> {
    Ok(numbers(args)
        .into_iter()
        .reduce(f64::min)
        .map_or(Value::Empty, Value::Number))
}

/// MAX function
pub fn fn_max(args: &[Value]) -> ExprResult<Value> {
    Ok(numbers(args)
        .into_iter()
        .reduce(f64::max)
        .map_or(Value::Empty, Value::Number))
}

/// COUNT function - counts non-empty scalars
pub fn fn_count(args: &[Value]) -> ExprResult<Value> {
    let mut count = 0usize;
    for_each_scalar(args, &mut |v| {
        if !v.is_empty() {
            count += 1;
        }
    });
    Ok(Value::Number(count as f64))
}

/// ABS function
pub fn fn_abs(args: &[Value]) -> ExprResult<Value> {
    Ok(Value::Number(number_arg(args, 0, "ABS")?.abs()))
}

/// ROUND(number, [digits])
pub fn fn_round(args: &[Value]) -> ExprResult<Value> {
    let n = number_arg(args, 0, "ROUND")?;
    let digits = if args.len() > 1 {
        number_arg(args, 1, "ROUND")?.trunc() as i32
    } else {
        0
    };
    let rounded = if digits >= 0 {
        let factor = 10f64.powi(digits);
        (n * factor).round() / factor
    } else {
        let factor = 10f64.powi(-digits);
        (n / factor).round() * factor
    };
    Ok(Value::Number(rounded))
}

/// INT function - rounds down to the nearest integer
pub fn fn_int(args: &[Value]) -> ExprResult<Value> {
    Ok(Value::Number(number_arg(args, 0, "INT")?.floor()))
}

/// MOD(number, divisor) - result has the sign of the divisor
pub fn fn_mod(args: &[Value]) -> ExprResult<Value> {
    let n = number_arg(args, 0, "MOD")?;
    let d = number_arg(args, 1, "MOD")?;
    if d == 0.0 {
        return Err(ExprError::DivisionByZero);
    }
    Ok(Value::Number(n - d * (n / d).floor()))
}

/// SQRT function
pub fn fn_sqrt(args: &[Value]) -> ExprResult<Value> {
    let n = number_arg(args, 0, "SQRT")?;
    if n < 0.0 {
        return Err(ExprError::Argument("SQRT of a negative number".into()));
    }
    Ok(Value::Number(n.sqrt()))
}

/// POWER(base, exponent)
pub fn fn_power(args: &[Value]) -> ExprResult<Value> {
    let result = number_arg(args, 0, "POWER")?.powf(number_arg(args, 1, "POWER")?);
    if result.is_finite() {
        Ok(Value::Number(result))
    } else {
        Err(ExprError::Evaluation("POWER result is not a finite number".into()))
    }
}

/// CLAMP(value, low, high)
pub fn fn_clamp(args: &[Value]) -> ExprResult<Value> {
    let n = number_arg(args, 0, "CLAMP")?;
    let low = number_arg(args, 1, "CLAMP")?;
    let high = number_arg(args, 2, "CLAMP")?;
    if low > high {
        return Err(ExprError::Argument(format!(
            "CLAMP bounds are reversed: {} > {}",
            low, high
        )));
    }
    Ok(Value::Number(n.clamp(low, high)))
}

/// INDEX(array, position) with zero-based positions
pub fn fn_index(args: &[Value]) -> ExprResult<Value> {
    let items = arg(args, 0, "INDEX")?
        .as_array()
        .ok_or_else(|| ExprError::Argument("INDEX expects an array".into()))?;
    let position = number_arg(args, 1, "INDEX")?;
    if position < 0.0 || position.fract() != 0.0 {
        return Err(ExprError::Argument(format!(
            "INDEX position must be a non-negative integer, got {}",
            position
        )));
    }
    items
        .get(position as usize)
        .cloned()
        .ok_or_else(|| ExprError::Argument(format!("INDEX position {} out of range", position)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().map(|n| Value::Number(*n)).collect()
    }

    #[test]
    fn test_sum_min_max_flatten_arrays() {
        let args = vec![
            Value::Number(1.0),
            Value::Array(nums(&[2.0, 7.0])),
            Value::string("skip"),
        ];
        assert_eq!(fn_sum(&args).unwrap(), Value::Number(10.0));
        assert_eq!(fn_min(&args).unwrap(), Value::Number(1.0));
        assert_eq!(fn_max(&args).unwrap(), Value::Number(7.0));
        assert_eq!(fn_count(&args).unwrap(), Value::Number(4.0));
        assert_eq!(fn_max(&[Value::string("x")]).unwrap(), Value::Empty);
    }

    #[test]
    fn test_round_and_int() {
        assert_eq!(fn_round(&nums(&[1.25, 1.0])).unwrap(), Value::Number(1.3));
        assert_eq!(fn_round(&nums(&[1234.0, -2.0])).unwrap(), Value::Number(1200.0));
        assert_eq!(fn_int(&nums(&[-1.5])).unwrap(), Value::Number(-2.0));
    }

    #[test]
    fn test_mod_sign_follows_divisor() {
        assert_eq!(fn_mod(&nums(&[-3.0, 2.0])).unwrap(), Value::Number(1.0));
        assert_eq!(fn_mod(&nums(&[3.0, -2.0])).unwrap(), Value::Number(-1.0));
        assert_eq!(fn_mod(&nums(&[3.0, 0.0])).unwrap_err(), ExprError::DivisionByZero);
    }

    #[test]
    fn test_clamp_and_index() {
        assert_eq!(fn_clamp(&nums(&[15.0, 0.0, 10.0])).unwrap(), Value::Number(10.0));
        assert!(fn_clamp(&nums(&[1.0, 5.0, 0.0])).is_err());

        let array = Value::Array(nums(&[4.0, 5.0]));
        assert_eq!(
            fn_index(&[array.clone(), Value::Number(1.0)]).unwrap(),
            Value::Number(5.0)
        );
        assert!(fn_index(&[array, Value::Number(2.0)]).is_err());
    }

    #[test]
    fn test_sqrt_rejects_negative() {
        assert_eq!(fn_sqrt(&nums(&[9.0])).unwrap(), Value::Number(3.0));
        assert!(fn_sqrt(&nums(&[-1.0])).is_err());
    }
}
