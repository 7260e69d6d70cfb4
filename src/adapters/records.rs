//! 讀寫後端 API 匯出的實體清單（JSON 陣列或 CSV）。

use crate::core::filter::display_string;
use crate::domain::model::{FilterSet, Record};
use crate::utils::error::{CrmError, Result};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    Csv,
}

impl RecordFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(RecordFormat::Json),
            Some("csv") => Ok(RecordFormat::Csv),
            _ => Err(CrmError::input(format!(
                "Unsupported record file: {} (expected .json or .csv)",
                path.display()
            ))),
        }
    }
}

pub async fn load_records(path: &Path) -> Result<Vec<Record>> {
    let format = RecordFormat::from_path(path)?;
    let content = tokio::fs::read_to_string(path).await?;
    let records = match format {
        RecordFormat::Json => parse_json_records(&content)?,
        RecordFormat::Csv => parse_csv_records(&content)?,
    };
    tracing::info!("📂 Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// 篩選條件檔：TOML 的 `[[filters]]` 陣列
pub async fn load_filters(path: &Path) -> Result<FilterSet> {
    let content = tokio::fs::read_to_string(path).await?;
    let filters = parse_filters(&content)?;
    tracing::info!(
        "🔎 Loaded {} filters ({} active) from {}",
        filters.filters.len(),
        filters.active_count(),
        path.display()
    );
    Ok(filters)
}

pub fn parse_filters(content: &str) -> Result<FilterSet> {
    toml::from_str(content).map_err(|e| CrmError::ConfigValidationError {
        field: "filters".to_string(),
        message: format!("TOML parsing error: {}", e),
    })
}

/// 接受物件陣列，或 DRF 分頁格式 `{"results": [...]}`
pub fn parse_json_records(content: &str) -> Result<Vec<Record>> {
    let items = match serde_json::from_str::<Value>(content)? {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("results") {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(obj)],
        },
        other => {
            return Err(CrmError::input(format!(
                "Expected a JSON array of records, got {}",
                other
            )))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(obj) => records.push(Record::from(obj)),
            other => tracing::warn!("Skipping non-object record: {}", other),
        }
    }
    Ok(records)
}

pub fn parse_csv_records(content: &str) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let data = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.to_string(), infer_cell(cell)))
            .collect();
        records.push(Record::new(data));
    }
    Ok(records)
}

/// CSV 沒有型別：空白為 null；數字寫回後與原文相同才轉成數字，
/// 因此 `+447700900123`、`01234`、`120.50` 都保留為字串
fn infer_cell(cell: &str) -> Value {
    if cell.trim().is_empty() {
        return Value::Null;
    }
    let number = match cell.parse::<i64>() {
        Ok(i) => Value::from(i),
        Err(_) => match cell.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::from(f),
            _ => return Value::String(cell.to_string()),
        },
    };
    if display_string(&number) == cell {
        number
    } else {
        Value::String(cell.to_string())
    }
}

/// 未指定欄位時輸出所有出現過的欄位（依名稱排序）
pub fn resolve_columns(records: &[Record], columns: &[String]) -> Vec<String> {
    if !columns.is_empty() {
        return columns.to_vec();
    }
    records
        .iter()
        .flat_map(|r| r.data.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn write_csv(records: &[Record], columns: &[String]) -> Result<String> {
    let columns = resolve_columns(records, columns);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|c| match record.field(c) {
            Some(v) => display_string(v),
            None => String::new(),
        }))?;
    }
    let bytes = writer.into_inner().map_err(|e| CrmError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| CrmError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

/// 未指定欄位時每筆保留自己的欄位，鍵依名稱排序
pub fn write_json(records: &[Record], columns: &[String]) -> Result<String> {
    let projected: Vec<serde_json::Map<String, Value>> = records
        .iter()
        .map(|r| {
            if columns.is_empty() {
                return r.data.clone().into_iter().collect();
            }
            columns
                .iter()
                .map(|c| (c.clone(), r.data.get(c).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect();
    Ok(serde_json::to_string_pretty(&projected)?)
}
