//! 多欄位篩選：所有啟用中的條件都要成立（AND），集合條件內任一值相符即可（OR）。

use crate::domain::model::{FilterSet, Predicate, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// 依照 `filters` 篩選，輸出維持輸入的相對順序，不修改輸入。
pub fn apply_filters(records: &[Record], filters: &FilterSet) -> Vec<Record> {
    let active: Vec<_> = filters
        .filters
        .iter()
        .filter(|f| f.predicate.is_active())
        .collect();

    if active.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| {
            active
                .iter()
                .all(|f| matches_predicate(record.field(&f.field), &f.predicate))
        })
        .cloned()
        .collect()
}

/// 單一欄位值是否滿足條件；`value` 為 `None` 代表欄位缺漏或為 null
pub fn matches_predicate(value: Option<&Value>, predicate: &Predicate) -> bool {
    if !predicate.is_active() {
        return true;
    }

    match predicate {
        Predicate::Equals { value: expected } => {
            value.is_some_and(|actual| values_equal(actual, expected))
        }
        Predicate::Range { min, max } => match value.and_then(numeric_value) {
            Some(n) => min.map_or(true, |min| n >= min) && max.map_or(true, |max| n <= max),
            None => false,
        },
        Predicate::DateRange { from, to } => match value.and_then(date_value) {
            Some(d) => from.map_or(true, |from| d >= from) && to.map_or(true, |to| d <= to),
            None => false,
        },
        Predicate::OneOf { values } => {
            value.is_some_and(|actual| values.iter().any(|allowed| values_equal(actual, allowed)))
        }
        Predicate::Contains { text } => value.is_some_and(|actual| {
            display_string(actual)
                .to_lowercase()
                .contains(&text.trim().to_lowercase())
        }),
    }
}

/// 嚴格相等，但整數與浮點數以數值比較（1 與 1.0 相等）
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// 數值欄位；後端的 Decimal 欄位常以字串傳回，例如 "150.00"
pub(crate) fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// 接受 `YYYY-MM-DD`、RFC 3339 與 `YYYY-MM-DDTHH:MM:SS`，以日期為比較單位
pub(crate) fn date_value(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

pub(crate) fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => Record::from(map),
            _ => panic!("test records must be objects"),
        }
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records
            .iter()
            .map(|r| r.data.get("id").and_then(|v| v.as_i64()).unwrap())
            .collect()
    }

    fn clients() -> Vec<Record> {
        vec![
            record(json!({"id": 1, "status": "active", "ltv": 150, "country": "UK"})),
            record(json!({"id": 2, "status": "paused", "ltv": 90, "country": "US"})),
            record(json!({"id": 3, "status": "cancelled", "ltv": 300})),
            record(json!({"id": 4, "status": "paused", "ltv": "450.00", "country": "UK"})),
            record(json!({"id": 5, "status": "active", "ltv": null})),
            record(json!({"id": 6, "status": "active", "ltv": 500})),
        ]
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let filters = FilterSet::new().with("status", Predicate::Equals { value: json!("active") });
        assert!(apply_filters(&[], &filters).is_empty());
        assert!(apply_filters(&[], &FilterSet::new()).is_empty());
    }

    #[test]
    fn test_empty_filter_set_is_identity() {
        let records = clients();
        assert_eq!(apply_filters(&records, &FilterSet::new()), records);
    }

    #[test]
    fn test_inactive_predicates_are_skipped() {
        let records = clients();
        let filters = FilterSet::new()
            .with("status", Predicate::Equals { value: json!("") })
            .with("ltv", Predicate::Range { min: None, max: None })
            .with("country", Predicate::OneOf { values: vec![] })
            .with("joined", Predicate::DateRange { from: None, to: None });
        assert_eq!(apply_filters(&records, &filters), records);
    }

    #[test]
    fn test_numeric_range_bounds() {
        let range = Predicate::Range {
            min: Some(10.0),
            max: Some(20.0),
        };
        assert!(matches_predicate(Some(&json!(15)), &range));
        assert!(matches_predicate(Some(&json!(10)), &range));
        assert!(matches_predicate(Some(&json!(20.0)), &range));
        assert!(!matches_predicate(Some(&json!(9)), &range));
        assert!(!matches_predicate(Some(&json!(21)), &range));
        assert!(!matches_predicate(None, &range));
        assert!(!matches_predicate(Some(&json!("n/a")), &range));
    }

    #[test]
    fn test_open_ended_range() {
        let at_least = Predicate::Range {
            min: Some(100.0),
            max: None,
        };
        assert!(matches_predicate(Some(&json!(1_000_000)), &at_least));
        assert!(!matches_predicate(Some(&json!(99.99)), &at_least));
    }

    #[test]
    fn test_status_set_and_ltv_range_combined() {
        let filters = FilterSet::new()
            .with(
                "status",
                Predicate::OneOf {
                    values: vec![json!("active"), json!("paused")],
                },
            )
            .with(
                "ltv",
                Predicate::Range {
                    min: Some(100.0),
                    max: Some(500.0),
                },
            );

        let result = apply_filters(&clients(), &filters);
        assert_eq!(ids(&result), vec![1, 4, 6]);
    }

    #[test]
    fn test_equality_is_strict_on_type() {
        assert!(matches_predicate(
            Some(&json!(1)),
            &Predicate::Equals { value: json!(1.0) }
        ));
        assert!(!matches_predicate(
            Some(&json!("1")),
            &Predicate::Equals { value: json!(1) }
        ));
        assert!(!matches_predicate(
            None,
            &Predicate::Equals { value: json!("active") }
        ));
    }

    #[test]
    fn test_date_range_requires_the_field() {
        let filters = FilterSet::new().with(
            "client_start_date",
            Predicate::DateRange {
                from: NaiveDate::from_ymd_opt(2024, 2, 1),
                to: NaiveDate::from_ymd_opt(2024, 3, 31),
            },
        );
        let records = vec![
            record(json!({"id": 1, "client_start_date": "2024-01-31"})),
            record(json!({"id": 2, "client_start_date": "2024-02-01"})),
            record(json!({"id": 3, "client_start_date": "2024-03-31T23:59:00Z"})),
            record(json!({"id": 4})),
            record(json!({"id": 5, "client_start_date": "2024-04-01"})),
            record(json!({"id": 6, "client_start_date": "not a date"})),
        ];

        assert_eq!(ids(&apply_filters(&records, &filters)), vec![2, 3]);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let records = vec![
            record(json!({"id": 1, "name": "Ann Smith"})),
            record(json!({"id": 2, "name": "Bob"})),
            record(json!({"id": 3, "name": "SAMANTHA"})),
        ];
        let filters = FilterSet::new().with(
            "name",
            Predicate::Contains {
                text: " sam".to_string(),
            },
        );
        assert_eq!(ids(&apply_filters(&records, &filters)), vec![3]);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let records = clients();
        let before = records.clone();
        let filters = FilterSet::new().with("status", Predicate::Equals { value: json!("active") });
        let first = apply_filters(&records, &filters);
        let second = apply_filters(&records, &filters);
        assert_eq!(records, before);
        assert_eq!(first, second);
        assert_eq!(ids(&first), vec![1, 5, 6]);
    }
}
