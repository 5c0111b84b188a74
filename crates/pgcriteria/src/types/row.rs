//! Decoding result rows into JSON objects.

use crate::error::{SqlError, SqlResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};

type BoxError = Box<dyn Error + Sync + Send>;

/// One column value decoded into JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonCell(pub Value);

impl<'a> FromSql<'a> for JsonCell {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode(ty, raw).map(JsonCell)
    }

    fn from_sql_null(_: &Type) -> Result<Self, BoxError> {
        Ok(JsonCell(Value::Null))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn decode(ty: &Type, raw: &[u8]) -> Result<Value, BoxError> {
    if let Kind::Array(_) = ty.kind() {
        let cells = Vec::<JsonCell>::from_sql(ty, raw)?;
        return Ok(Value::Array(cells.into_iter().map(|c| c.0).collect()));
    }

    Ok(match *ty {
        Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
        Type::INT2 => Value::from(i16::from_sql(ty, raw)?),
        Type::INT4 => Value::from(i32::from_sql(ty, raw)?),
        Type::INT8 => Value::from(i64::from_sql(ty, raw)?),
        Type::OID => Value::from(u32::from_sql(ty, raw)?),
        Type::FLOAT4 => float(f64::from(f32::from_sql(ty, raw)?)),
        Type::FLOAT8 => float(f64::from_sql(ty, raw)?),
        Type::NUMERIC => {
            let d = Decimal::from_sql(ty, raw)?.normalize().to_string();
            d.parse::<Number>().map(Value::Number).unwrap_or(Value::String(d))
        }
        Type::JSON | Type::JSONB => Value::from_sql(ty, raw)?,
        Type::UUID => Value::String(uuid::Uuid::from_sql(ty, raw)?.to_string()),
        Type::TIMESTAMPTZ => Value::String(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
        Type::TIMESTAMP => Value::String(NaiveDateTime::from_sql(ty, raw)?.to_string()),
        Type::DATE => Value::String(NaiveDate::from_sql(ty, raw)?.to_string()),
        Type::TIME => Value::String(NaiveTime::from_sql(ty, raw)?.to_string()),
        Type::BYTEA => {
            let bytes = <&[u8]>::from_sql(ty, raw)?;
            let mut hex = String::with_capacity(2 + bytes.len() * 2);
            hex.push_str("\\x");
            for b in bytes {
                hex.push_str(&format!("{b:02x}"));
            }
            Value::String(hex)
        }
        // Text family, enums and other text-compatible types.
        _ => Value::String(<&str>::from_sql(ty, raw)?.to_string()),
    })
}

/// NaN and infinities have no JSON number form.
fn float(f: f64) -> Value {
    Number::from_f64(f).map_or_else(|| Value::String(f.to_string()), Value::Number)
}

/// Decode every column of `row` into a JSON object keyed by column name.
pub fn row_to_json(row: &Row) -> SqlResult<Map<String, Value>> {
    let mut object = Map::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let cell: JsonCell = row
            .try_get(idx)
            .map_err(|e| SqlError::decode(column.name(), e.to_string()))?;
        object.insert(column.name().to_string(), cell.0);
    }
    Ok(object)
}
