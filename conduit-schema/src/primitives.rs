//! Casters for primitive field types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// A primitive field type. Any other `$type` names a related schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    Object,
    Unknown,
}

impl Primitive {
    /// Parses a type name (without any `[]` suffix).
    pub fn parse(value_type: &str) -> Option<Self> {
        Some(match value_type {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" | "float" => Self::Number,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "object" => Self::Object,
            "unknown" => Self::Unknown,
            _ => return None,
        })
    }

    /// Coerces a value, returning `None` when it cannot be parsed.
    pub fn cast(&self, value: &Value) -> Option<Value> {
        match self {
            Self::String => cast_string(value),
            Self::Integer => cast_integer(value),
            Self::Number => cast_number(value),
            Self::Boolean => cast_boolean(value),
            Self::Date => cast_date(value),
            Self::Object => value.is_object().then(|| value.clone()),
            Self::Unknown => Some(value.clone()),
        }
    }
}

/// The current time in the format dates are cast to.
pub fn now_iso() -> String {
    format_date(Utc::now())
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn cast_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn cast_integer(value: &Value) -> Option<Value> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Some(Value::from(i));
        }
    }
    if let Value::String(s) = value {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Some(Value::from(i));
        }
    }
    parse_number(value)
        .map(f64::round)
        .filter(|f| (I64_LOWER..I64_UPPER).contains(f))
        .map(|f| Value::from(f as i64))
}

/// `i64::MIN` and `i64::MAX + 1` as floats. Both are exact powers of two.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn cast_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Some(Value::from(i)),
            Err(_) => parse_number(value).and_then(Number::from_f64).map(Value::Number),
        },
        _ => parse_number(value).map(|f| Value::from(f as i64)),
    }
}

fn cast_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn cast_date(value: &Value) -> Option<Value> {
    let date = match value {
        Value::String(s) => parse_date(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };
    date.map(|d| Value::String(format_date(d)))
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|n| n.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_from_string_and_float() {
        assert_eq!(Primitive::Integer.cast(&json!("244511383")), Some(json!(244511383)));
        assert_eq!(Primitive::Integer.cast(&json!(2.6)), Some(json!(3)));
        assert_eq!(Primitive::Integer.cast(&json!("2.4")), Some(json!(2)));
        assert_eq!(Primitive::Integer.cast(&json!("many")), None);
    }

    #[test]
    fn integer_out_of_range_is_dropped() {
        assert_eq!(Primitive::Integer.cast(&json!("1e30")), None);
        assert_eq!(Primitive::Integer.cast(&json!(-1e19)), None);
        assert_eq!(Primitive::Integer.cast(&json!(u64::MAX)), None);
        assert_eq!(Primitive::Integer.cast(&json!("1e18")), Some(json!(1_000_000_000_000_000_000_i64)));
        assert_eq!(Primitive::Integer.cast(&json!(i64::MIN)), Some(json!(i64::MIN)));
    }

    #[test]
    fn number_keeps_fractions() {
        assert_eq!(Primitive::Number.cast(&json!("3.5")), Some(json!(3.5)));
        assert_eq!(Primitive::Number.cast(&json!("7")), Some(json!(7)));
        assert_eq!(Primitive::Number.cast(&json!(true)), Some(json!(1)));
        assert_eq!(Primitive::Number.cast(&json!({})), None);
    }

    #[test]
    fn boolean_from_strings_and_numbers() {
        assert_eq!(Primitive::Boolean.cast(&json!("TRUE")), Some(json!(true)));
        assert_eq!(Primitive::Boolean.cast(&json!("0")), Some(json!(false)));
        assert_eq!(Primitive::Boolean.cast(&json!(0)), Some(json!(false)));
        assert_eq!(Primitive::Boolean.cast(&json!("maybe")), None);
    }

    #[test]
    fn string_from_scalars_only() {
        assert_eq!(Primitive::String.cast(&json!(12)), Some(json!("12")));
        assert_eq!(Primitive::String.cast(&json!(false)), Some(json!("false")));
        assert_eq!(Primitive::String.cast(&json!(["a"])), None);
    }

    #[test]
    fn date_formats() {
        assert_eq!(
            Primitive::Date.cast(&json!("2019-03-11T18:43:09+01:00")),
            Some(json!("2019-03-11T17:43:09.000Z"))
        );
        assert_eq!(Primitive::Date.cast(&json!("2019-03-11")), Some(json!("2019-03-11T00:00:00.000Z")));
        assert_eq!(Primitive::Date.cast(&json!(1552326189000_i64)), Some(json!("2019-03-11T17:43:09.000Z")));
        assert_eq!(Primitive::Date.cast(&json!("not a date")), None);
    }

    #[test]
    fn object_and_unknown() {
        assert_eq!(Primitive::Object.cast(&json!({ "a": 1 })), Some(json!({ "a": 1 })));
        assert_eq!(Primitive::Object.cast(&json!("a")), None);
        assert_eq!(Primitive::Unknown.cast(&json!([1, "b"])), Some(json!([1, "b"])));
    }

    #[test]
    fn float_alias() {
        assert_eq!(Primitive::parse("float"), Some(Primitive::Number));
        assert_eq!(Primitive::parse("user"), None);
    }
}
