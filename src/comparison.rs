use std::cmp::Ordering;

use crate::expression::Value;

/// Relational comparison with JavaScript coercions: two strings compare
/// lexicographically, everything else numerically. Any NaN makes the
/// comparison false regardless of `pred_on_ord`.
pub fn cmp_values<F>(a: &Value, b: &Value, pred_on_ord: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    match (a, b) {
        (Value::Str(sa), Value::Str(sb)) => pred_on_ord(sa.cmp(sb)),
        _ => match to_number(a).partial_cmp(&to_number(b)) {
            Some(ord) => pred_on_ord(ord),
            None => false,
        },
    }
}

/// `===`
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
        _ => false,
    }
}

/// `==`
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
        (Value::Null | Value::Undefined, _) | (_, Value::Null | Value::Undefined) => false,
        (Value::Bool(x), other) => loose_eq(&Value::Number(bool_to_number(*x)), other),
        (other, Value::Bool(y)) => loose_eq(other, &Value::Number(bool_to_number(*y))),
        (Value::Number(x), Value::Str(s)) | (Value::Str(s), Value::Number(x)) => {
            *x == string_to_number(s)
        }
        _ => strict_eq(a, b),
    }
}

pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null | Value::Undefined => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Str(s) => !s.is_empty(),
    }
}

pub fn to_number(v: &Value) -> f64 {
    match v {
        Value::Number(n) => *n,
        Value::Str(s) => string_to_number(s),
        Value::Bool(b) => bool_to_number(*b),
        Value::Null => 0.0,
        Value::Undefined => f64::NAN,
    }
}

pub fn to_display_string(v: &Value) -> String {
    match v {
        Value::Number(n) => number_to_string(*n),
        Value::Str(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".into(),
        Value::Undefined => "undefined".into(),
    }
}

fn bool_to_number(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// String → number the way JavaScript's `Number(s)` does for decimal input.
/// Blank strings are 0; anything that is not a plain decimal literal is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust also accepts "inf"/"nan", JS does not
    if !t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n == f64::INFINITY {
        "Infinity".into()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".into()
    } else if n == n.trunc() && n.abs() < 1e21 {
        // also folds -0 into "0"
        format!("{}", n as i128)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> Value {
        Value::Str(v.into())
    }

    #[test]
    fn loose_equality_coerces_like_js() {
        assert!(loose_eq(&Value::Number(5.0), &s("5")));
        assert!(loose_eq(&s(" 5 "), &Value::Number(5.0)));
        assert!(loose_eq(&Value::Bool(true), &Value::Number(1.0)));
        assert!(loose_eq(&Value::Bool(false), &s("")));
        assert!(loose_eq(&Value::Null, &Value::Undefined));
        assert!(!loose_eq(&Value::Null, &Value::Number(0.0)));
        assert!(!loose_eq(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(!strict_eq(&Value::Number(5.0), &s("5")));
    }

    #[test]
    fn relational() {
        assert!(cmp_values(&s("abc"), &s("abd"), |o| o.is_lt()));
        // "10" < "9" as strings, 10 > 9 once one side is a number
        assert!(cmp_values(&s("10"), &s("9"), |o| o.is_lt()));
        assert!(cmp_values(&s("10"), &Value::Number(9.0), |o| o.is_gt()));
        assert!(!cmp_values(&s("abc"), &Value::Number(1.0), |o| o.is_ge()));
        assert!(!cmp_values(&s("abc"), &Value::Number(1.0), |o| o.is_lt()));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(2.5), "2.5");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
        assert!(string_to_number("inf").is_nan());
        assert_eq!(string_to_number("1e3"), 1000.0);
    }
}
