use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
///
/// SQLite has no boolean, timestamp or JSON storage class: booleans become
/// `0`/`1`, timestamps become `YYYY-MM-DD HH:MM:SS[.fff]` text and JSON is
/// stored as its serialized text.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Owned positional bind values, ready to move onto the blocking thread.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<Value>);

impl Params {
    #[must_use]
    pub fn convert(params: &[RowValues]) -> Self {
        Params(params.iter().map(row_value_to_sqlite_value).collect())
    }

    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn converts_every_variant() {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        let params = Params::convert(&[
            RowValues::Int(3),
            RowValues::Float(1.5),
            RowValues::Text("c".into()),
            RowValues::Bool(true),
            RowValues::Timestamp(ts),
            RowValues::Null,
            RowValues::JSON(serde_json::json!({"k": 1})),
            RowValues::Blob(vec![1, 2]),
        ]);
        assert_eq!(
            params.as_values(),
            &[
                Value::Integer(3),
                Value::Real(1.5),
                Value::Text("c".into()),
                Value::Integer(1),
                Value::Text("2024-05-06 07:08:09".into()),
                Value::Null,
                Value::Text(r#"{"k":1}"#.into()),
                Value::Blob(vec![1, 2]),
            ]
        );
    }
}
