//! Row representation.
//!
//! An explicit ordered column-name/value record rather than a loose map:
//! column order matches the select list and survives serialization, and row
//! order is whatever the database returned.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use sqlgate_error::Result;
use tokio_postgres::types::Type;
use tokio_postgres::Row;

/// One result row: an ordered mapping from column name to JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, Value)>,
}

impl ResultRow {
    pub fn from_pairs(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Decode a database row column by column, driven by the declared
    /// Postgres type of each cell.
    pub fn from_pg_row(row: &Row) -> Result<Self> {
        let mut columns = Vec::with_capacity(row.columns().len());
        for (idx, column) in row.columns().iter().enumerate() {
            let value = cell_to_json(row, idx, column.type_())?;
            columns.push((column.name().to_string(), value));
        }
        Ok(Self { columns })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn cell_to_json(row: &Row, idx: usize, ty: &Type) -> Result<Value> {
    let value = match ty.name() {
        "bool" => opt(row, idx, Value::Bool)?,
        "int2" => opt(row, idx, |v: i16| Value::from(i64::from(v)))?,
        "int4" => opt(row, idx, |v: i32| Value::from(i64::from(v)))?,
        "int8" => opt(row, idx, |v: i64| Value::from(v))?,
        "float4" => opt(row, idx, |v: f32| float_value(f64::from(v)))?,
        "float8" => opt(row, idx, float_value)?,
        "numeric" => opt(row, idx, |v: Decimal| match v.to_f64() {
            Some(f) => float_value(f),
            None => Value::String(v.to_string()),
        })?,
        "text" | "varchar" | "bpchar" | "name" => opt(row, idx, Value::String)?,
        "date" => opt(row, idx, |v: NaiveDate| {
            Value::String(v.format("%Y-%m-%d").to_string())
        })?,
        "time" => opt(row, idx, |v: NaiveTime| {
            Value::String(v.format("%H:%M:%S%.f").to_string())
        })?,
        "timestamp" => opt(row, idx, |v: NaiveDateTime| {
            Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        })?,
        "timestamptz" => opt(row, idx, |v: DateTime<Utc>| Value::String(v.to_rfc3339()))?,
        "json" | "jsonb" => opt(row, idx, |v: Value| v)?,
        "uuid" => opt(row, idx, |v: uuid::Uuid| Value::String(v.to_string()))?,
        // Unknown type: try a few common decodes, then give up as null.
        _ => fallback(row, idx),
    };
    Ok(value)
}

fn opt<'a, T, F>(row: &'a Row, idx: usize, to_value: F) -> Result<Value>
where
    T: tokio_postgres::types::FromSql<'a>,
    F: FnOnce(T) -> Value,
{
    let cell: Option<T> = row.try_get(idx).map_err(sqlgate_error::GateError::from)?;
    Ok(cell.map(to_value).unwrap_or(Value::Null))
}

fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn fallback(row: &Row, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<_, Option<String>>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<_, Option<i64>>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<_, Option<f64>>(idx) {
        return v.map(float_value).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<_, Option<bool>>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialization_preserves_column_order() {
        let row = ResultRow::from_pairs(vec![
            ("zebra".to_string(), json!(1)),
            ("apple".to_string(), json!("two")),
            ("mango".to_string(), Value::Null),
        ]);
        let out = serde_json::to_string(&row).unwrap();
        assert_eq!(out, r#"{"zebra":1,"apple":"two","mango":null}"#);
    }

    #[test]
    fn get_finds_columns_by_name() {
        let row = ResultRow::from_pairs(vec![
            ("customer_id".to_string(), json!("ALFKI")),
            ("order_count".to_string(), json!(6)),
        ]);
        assert_eq!(row.get("order_count"), Some(&json!(6)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
        assert_eq!(
            row.column_names().collect::<Vec<_>>(),
            vec!["customer_id", "order_count"]
        );
    }
}
