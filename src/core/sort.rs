//! 表格排序。未定義的值（缺欄位或 null）不論方向一律排在最後。

use crate::core::filter::display_string;
use crate::domain::model::{Record, SortDirection, SortSpec};
use serde_json::Value;
use std::cmp::Ordering;

enum SortKey {
    Missing,
    Number(f64),
    Text(String),
}

/// 穩定排序，回傳新的 Vec，不修改輸入。
///
/// 欄位中所有已定義的值都是數字時以數值比較，否則全部改用不分大小寫的字串比較。
/// 整欄採用同一種比較方式，確保混合型別時仍是全序。
pub fn apply_sort(records: &[Record], spec: &SortSpec) -> Vec<Record> {
    let numeric = records
        .iter()
        .filter_map(|r| r.field(&spec.column))
        .all(Value::is_number);

    let mut keyed: Vec<(SortKey, &Record)> = records
        .iter()
        .map(|r| (sort_key(r.field(&spec.column), numeric), r))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, spec.direction));

    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

fn sort_key(value: Option<&Value>, numeric: bool) -> SortKey {
    match value {
        None => SortKey::Missing,
        Some(v) if numeric => v.as_f64().map_or(SortKey::Missing, SortKey::Number),
        Some(v) => SortKey::Text(display_string(v).to_lowercase()),
    }
}

fn compare_keys(a: &SortKey, b: &SortKey, direction: SortDirection) -> Ordering {
    let ordering = match (a, b) {
        (SortKey::Missing, SortKey::Missing) => return Ordering::Equal,
        (SortKey::Missing, _) => return Ordering::Greater,
        (_, SortKey::Missing) => return Ordering::Less,
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        // 同一欄只會產生同一種 key
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
    };

    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}
