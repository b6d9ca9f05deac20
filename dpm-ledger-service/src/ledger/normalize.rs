//! Conversion of untyped legacy row values into typed fields.
//!
//! Rows are decoded once into a JSON map (`raw`) right after the fetch; the
//! role fields are then read out of that map. Nothing here fails: values that
//! cannot be interpreted become `None` or zero.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Decode every column of `row` by its runtime storage class.
pub fn row_to_raw(row: &SqliteRow) -> Result<Map<String, Value>, sqlx::Error> {
    let mut raw = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = column_value(row, column.ordinal())?;
        raw.insert(column.name().to_string(), value);
    }
    Ok(raw)
}

/// One column as JSON. BLOBs are hex-encoded.
pub fn column_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" | "NUMERIC" => Number::from_f64(row.try_get_unchecked::<f64, _>(index)?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => Value::String(hex::encode(row.try_get_unchecked::<Vec<u8>, _>(index)?)),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

/// Calendar date from an ISO-8601 date or datetime string. Other types are `None`.
pub fn normalize_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_iso_date(s.trim()),
        _ => None,
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y%m%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
    ];
    DATETIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(s, fmt)
            .map(|dt| dt.date())
            .ok()
            .or_else(|| DateTime::parse_from_str(s, fmt).map(|dt| dt.date_naive()).ok())
    })
}

/// Exact decimal amount. Null, non-numeric and non-finite values are zero.
pub fn normalize_amount(value: &Value) -> Decimal {
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };
    parsed.unwrap_or(Decimal::ZERO)
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Display form of an identifier or reference value. Null and empty are `None`.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> Option<NaiveDate> {
        Some(NaiveDate::from_str(s).unwrap())
    }

    #[test]
    fn dates_parse_from_iso_strings() {
        assert_eq!(normalize_date(&json!("2024-03-05")), date("2024-03-05"));
        assert_eq!(normalize_date(&json!("2024-03-05T14:30:00")), date("2024-03-05"));
        assert_eq!(normalize_date(&json!("2024-03-05 14:30:00.123")), date("2024-03-05"));
        assert_eq!(normalize_date(&json!("2024-03-05T23:59:59+03:00")), date("2024-03-05"));
        assert_eq!(normalize_date(&json!("2024-03-05 08:00")), date("2024-03-05"));
    }

    #[test]
    fn unparsable_or_non_string_dates_are_none() {
        assert_eq!(normalize_date(&json!("05/03/2024")), None);
        assert_eq!(normalize_date(&json!("2024-02-30")), None);
        assert_eq!(normalize_date(&json!("")), None);
        assert_eq!(normalize_date(&json!(20240305)), None);
        assert_eq!(normalize_date(&Value::Null), None);
    }

    #[test]
    fn amounts_parse_exactly() {
        assert_eq!(normalize_amount(&json!("100.10")), Decimal::from_str("100.10").unwrap());
        assert_eq!(normalize_amount(&json!(" 42 ")), Decimal::from(42));
        assert_eq!(normalize_amount(&json!(250)), Decimal::from(250));
        assert_eq!(normalize_amount(&json!(12.5)), Decimal::from_str("12.5").unwrap());
        assert_eq!(normalize_amount(&json!("-7.25")), Decimal::from_str("-7.25").unwrap());
        assert_eq!(normalize_amount(&json!("1.5e3")), Decimal::from(1500));
    }

    #[test]
    fn malformed_amounts_are_zero() {
        assert_eq!(normalize_amount(&json!("twelve")), Decimal::ZERO);
        assert_eq!(normalize_amount(&json!("")), Decimal::ZERO);
        assert_eq!(normalize_amount(&Value::Null), Decimal::ZERO);
        assert_eq!(normalize_amount(&json!({"a": 1})), Decimal::ZERO);
    }

    #[test]
    fn text_values_keep_their_display_form() {
        assert_eq!(value_to_text(&json!("INV-001")), Some("INV-001".to_string()));
        assert_eq!(value_to_text(&json!(1001)), Some("1001".to_string()));
        assert_eq!(value_to_text(&json!("")), None);
        assert_eq!(value_to_text(&Value::Null), None);
    }
}
