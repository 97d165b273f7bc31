//! MySQL row to JSON conversion.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the driver's column type name
//! 2. A per-category decoder extracts the value
//!
//! Any value that cannot be decoded with its category's Rust type falls back to
//! text, then to base64 bytes, and finally to `null`.

use crate::models::ColumnMetadata;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Timestamp,
    Text,
    Binary,
    Json,
}

/// Classify a MySQL type name (as reported by sqlx) into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_uppercase();
    let base = upper.split_whitespace().next().unwrap_or("");

    match base {
        "DECIMAL" | "NUMERIC" => TypeCategory::Decimal,
        "BOOLEAN" | "BOOL" => TypeCategory::Boolean,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
            TypeCategory::Integer
        }
        "FLOAT" | "DOUBLE" | "REAL" => TypeCategory::Float,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "DATETIME" => TypeCategory::DateTime,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "JSON" => TypeCategory::Json,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => TypeCategory::Binary,
        _ => TypeCategory::Text,
    }
}

/// Raw DECIMAL value, kept as the server's exact string representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_uppercase();
        name.contains("DECIMAL") || name.contains("NUMERIC")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Encode binary column data as base64 text.
pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    JsonValue::String(STANDARD.encode(bytes))
}

/// Conversion from driver rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
    fn column_metadata(&self) -> Vec<ColumnMetadata>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                (col.name().to_string(), decode_column(self, idx, category))
            })
            .collect()
    }

    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.columns()
            .iter()
            .map(|col| {
                ColumnMetadata::new(
                    col.name(),
                    col.type_info().name(),
                    !col.type_info().is_null(),
                )
            })
            .collect()
    }
}

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    let decoded = match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Date => decode_with::<NaiveDate>(row, idx, |v| v.to_string()),
        TypeCategory::Time => decode_with::<NaiveTime>(row, idx, |v| v.to_string()),
        TypeCategory::DateTime => decode_with::<NaiveDateTime>(row, idx, |v| {
            v.format("%Y-%m-%d %H:%M:%S%.f").to_string()
        }),
        TypeCategory::Timestamp => decode_with::<DateTime<Utc>>(row, idx, |v| v.to_rfc3339()),
        TypeCategory::Json => decode_json(row, idx),
        TypeCategory::Binary => decode_bytes(row, idx),
        TypeCategory::Text => None,
    };

    decoded
        .or_else(|| decode_text(row, idx))
        .or_else(|| decode_bytes(row, idx))
        .unwrap_or(JsonValue::Null)
}

/// Returns `Some(Null)` for SQL NULL and `None` when the type does not match.
fn decode_with<T>(row: &MySqlRow, idx: usize, render: impl Fn(T) -> String) -> Option<JsonValue>
where
    T: for<'r> Decode<'r, sqlx::MySql> + Type<sqlx::MySql>,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(Some(v)) => Some(JsonValue::String(render(v))),
        Ok(None) => Some(JsonValue::Null),
        Err(_) => None,
    }
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(Some(v)) => Some(JsonValue::String(v.0)),
        Ok(None) => Some(JsonValue::Null),
        Err(e) => {
            tracing::debug!(column = idx, error = %e, "DECIMAL decode failed, falling back to text");
            None
        }
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Some(v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return Some(v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null));
    }
    // YEAR
    if let Ok(v) = row.try_get::<Option<u16>, _>(idx) {
        return Some(v.map(|v| JsonValue::Number(v.into())).unwrap_or(JsonValue::Null));
    }
    None
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<Option<bool>, _>(idx)
        .ok()
        .map(|v| v.map(JsonValue::Bool).unwrap_or(JsonValue::Null))
}

fn decode_float(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    let value = match row.try_get::<Option<f64>, _>(idx) {
        Ok(v) => v,
        Err(_) => row
            .try_get::<Option<f32>, _>(idx)
            .ok()?
            .map(f64::from),
    };

    Some(match value {
        Some(v) => serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        None => JsonValue::Null,
    })
}

fn decode_json(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<Option<JsonValue>, _>(idx)
        .ok()
        .map(|v| v.unwrap_or(JsonValue::Null))
}

fn decode_bytes(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<Option<Vec<u8>>, _>(idx)
        .ok()
        .map(|v| v.map(|b| encode_binary(&b)).unwrap_or(JsonValue::Null))
}

fn decode_text(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<Option<String>, _>(idx)
        .ok()
        .map(|v| v.map(JsonValue::String).unwrap_or(JsonValue::Null))
}
