//! Binding JSON values as Postgres parameters.

use crate::types::array::parse_array_literal;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::error::Error;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A JSON value bound as a query parameter.
///
/// The binary encoding follows the parameter type the server inferred for
/// the placeholder, so one JSON number can bind an `int4` column in one
/// statement and a `numeric` in the next. Strings are parsed when the target
/// is not textual (`'42'` into `int8`, RFC 3339 into `timestamptz`, and
/// array literals into array types).
#[derive(Debug, Clone, Copy)]
pub struct PgValue<'a>(pub &'a Value);

impl ToSql for PgValue<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        encode(self.0, ty, out)
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Wrap every parameter for handing to `tokio-postgres`.
pub fn bind_params(params: &[Value]) -> Vec<PgValue<'_>> {
    params.iter().map(PgValue).collect()
}

fn encode(value: &Value, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if value.is_null() {
        return Ok(IsNull::Yes);
    }

    if let Kind::Array(_) = ty.kind() {
        let items = match value {
            Value::Array(items) => items.clone(),
            Value::String(s) => parse_array_literal(s)
                .ok_or_else(|| format!("'{s}' is not an array literal for {ty}"))?,
            other => return Err(format!("cannot bind {other} as {ty}").into()),
        };
        let wrapped: Vec<Owned> = items.into_iter().map(Owned).collect();
        return wrapped.to_sql(ty, out);
    }

    match *ty {
        Type::BOOL => as_bool(value)?.to_sql(ty, out),
        Type::INT2 => i16::try_from(as_i64(value)?)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(as_i64(value)?)?.to_sql(ty, out),
        Type::INT8 => as_i64(value)?.to_sql(ty, out),
        Type::OID => u32::try_from(as_i64(value)?)?.to_sql(ty, out),
        Type::FLOAT4 => (as_f64(value)? as f32).to_sql(ty, out),
        Type::FLOAT8 => as_f64(value)?.to_sql(ty, out),
        Type::NUMERIC => Decimal::from_str(&scalar_text(value))?.to_sql(ty, out),
        Type::JSON | Type::JSONB => match value {
            // A string that already holds JSON text is passed through as a document.
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed) if parsed.is_object() || parsed.is_array() => parsed.to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            _ => value.to_sql(ty, out),
        },
        Type::UUID => uuid::Uuid::parse_str(&scalar_text(value))?.to_sql(ty, out),
        Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(&scalar_text(value))?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        Type::TIMESTAMP => parse_naive_datetime(&scalar_text(value))?.to_sql(ty, out),
        Type::DATE => NaiveDate::from_str(&scalar_text(value))?.to_sql(ty, out),
        Type::TIME => NaiveTime::from_str(&scalar_text(value))?.to_sql(ty, out),
        Type::BYTEA => match value {
            Value::String(s) => s.as_bytes().to_sql(ty, out),
            other => Err(format!("cannot bind {other} as bytea").into()),
        },
        // Text family, enums, domains over text and anything else with a
        // text-compatible binary format.
        _ => scalar_text(value).as_str().to_sql(ty, out),
    }
}

/// Owned element for array encoding.
#[derive(Debug)]
struct Owned(Value);

impl ToSql for Owned {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        encode(&self.0, ty, out)
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_bool(value: &Value) -> Result<bool, BoxError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "t" | "true" | "yes" | "on" | "1" => Ok(true),
            "f" | "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(format!("'{s}' is not a boolean").into()),
        },
        other => Err(format!("cannot bind {other} as boolean").into()),
    }
}

fn as_i64(value: &Value) -> Result<i64, BoxError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| format!("{n} is not an integer").into()),
        Value::String(s) => Ok(s.trim().parse::<i64>()?),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(format!("cannot bind {other} as integer").into()),
    }
}

fn as_f64(value: &Value) -> Result<f64, BoxError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{n} is not a float").into()),
        Value::String(s) => Ok(s.trim().parse::<f64>()?),
        other => Err(format!("cannot bind {other} as float").into()),
    }
}

fn parse_naive_datetime(s: &str) -> Result<NaiveDateTime, BoxError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    Ok(NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoded(value: Value, ty: &Type) -> Result<BytesMut, BoxError> {
        let mut out = BytesMut::new();
        PgValue(&value).to_sql(ty, &mut out)?;
        Ok(out)
    }

    #[test]
    fn null_is_null_for_any_type() {
        let mut out = BytesMut::new();
        let is_null = PgValue(&Value::Null).to_sql(&Type::INT4, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn integers_follow_target_width() {
        assert_eq!(encoded(json!(7), &Type::INT2).unwrap().len(), 2);
        assert_eq!(encoded(json!(7), &Type::INT4).unwrap().len(), 4);
        assert_eq!(encoded(json!("7"), &Type::INT8).unwrap().len(), 8);
        assert!(encoded(json!(70000), &Type::INT2).is_err());
        assert!(encoded(json!(1.5), &Type::INT4).is_err());
    }

    #[test]
    fn text_of_non_strings() {
        assert_eq!(&encoded(json!(42), &Type::TEXT).unwrap()[..], b"42");
        assert_eq!(&encoded(json!("hi"), &Type::VARCHAR).unwrap()[..], b"hi");
    }

    #[test]
    fn booleans_from_strings() {
        assert_eq!(&encoded(json!("t"), &Type::BOOL).unwrap()[..], &[1]);
        assert!(encoded(json!("maybe"), &Type::BOOL).is_err());
    }

    #[test]
    fn array_literal_into_text_array() {
        let out = encoded(json!("{a,\"b c\"}"), &Type::TEXT_ARRAY).unwrap();
        let native = encoded_native(vec!["a", "b c"], &Type::TEXT_ARRAY);
        assert_eq!(out, native);
    }

    #[test]
    fn json_array_into_int_array() {
        let out = encoded(json!([1, 2]), &Type::INT4_ARRAY).unwrap();
        assert_eq!(out, encoded_native(vec![1i32, 2], &Type::INT4_ARRAY));
    }

    #[test]
    fn timestamps_and_uuids() {
        assert!(encoded(json!("2024-01-01T00:00:00Z"), &Type::TIMESTAMPTZ).is_ok());
        assert!(encoded(json!("2024-01-01 10:00:00"), &Type::TIMESTAMP).is_ok());
        assert!(encoded(json!("2024-01-01"), &Type::DATE).is_ok());
        assert!(encoded(json!("6f1c1f36-4f43-4a4c-9b0e-27f3b0c3a7a5"), &Type::UUID).is_ok());
        assert!(encoded(json!("yesterday"), &Type::TIMESTAMPTZ).is_err());
    }

    #[test]
    fn numeric_from_number_or_string() {
        assert!(encoded(json!(12.5), &Type::NUMERIC).is_ok());
        assert!(encoded(json!("12.50"), &Type::NUMERIC).is_ok());
    }

    fn encoded_native<T: ToSql>(value: T, ty: &Type) -> BytesMut {
        let mut out = BytesMut::new();
        value.to_sql(ty, &mut out).unwrap();
        out
    }
}
