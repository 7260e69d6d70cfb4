use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 後端 API 回傳的任意實體資料（客戶、付款、分期…）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new(data: HashMap<String, serde_json::Value>) -> Self {
        Self { data }
    }

    /// 缺欄位與 JSON null 都視為未定義
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: map.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    #[default]
    NotSet,
    Validating,
    Verified,
    Failed,
}

impl ValidationStatus {
    /// 合法轉換：
    /// NotSet -> Validating -> {Verified | Failed}，
    /// Failed/Verified -> Validating（新一輪），Verified -> NotSet（重設）
    pub fn can_transition_to(self, next: ValidationStatus) -> bool {
        use ValidationStatus::{Failed, NotSet, Validating, Verified};
        matches!(
            (self, next),
            (NotSet, Validating)
                | (Validating, Validating)
                | (Validating, Verified)
                | (Validating, Failed)
                | (Failed, Validating)
                | (Verified, Validating)
                | (Verified, NotSet)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ValidationStatus::Verified | ValidationStatus::Failed)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValidationStatus::NotSet => "not_set",
            ValidationStatus::Validating => "validating",
            ValidationStatus::Verified => "verified",
            ValidationStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DomainValidationState {
    pub subdomain: String,
    pub status: ValidationStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub verified_ip: Option<String>,
    pub error_message: Option<String>,
    /// 最近一次 DNS 查詢的結果訊息，逾時或取消後仍保留
    #[serde(default)]
    pub last_result: Option<String>,
}

impl DomainValidationState {
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            ..Self::default()
        }
    }
}

/// 單一欄位的篩選條件；控制值未設定時不參與篩選
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    Equals {
        value: serde_json::Value,
    },
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    DateRange {
        #[serde(default)]
        from: Option<NaiveDate>,
        #[serde(default)]
        to: Option<NaiveDate>,
    },
    OneOf {
        #[serde(default)]
        values: Vec<serde_json::Value>,
    },
    Contains {
        #[serde(default)]
        text: String,
    },
}

impl Predicate {
    pub fn is_active(&self) -> bool {
        match self {
            Predicate::Equals { value } => match value {
                serde_json::Value::Null => false,
                serde_json::Value::String(s) => !s.is_empty(),
                _ => true,
            },
            Predicate::Range { min, max } => min.is_some() || max.is_some(),
            Predicate::DateRange { from, to } => from.is_some() || to.is_some(),
            Predicate::OneOf { values } => !values.is_empty(),
            Predicate::Contains { text } => !text.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    #[serde(flatten)]
    pub predicate: Predicate,
}

/// 有序的欄位篩選集合，由呼叫端擁有
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub filters: Vec<FieldFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一欄位再次設定時取代原本的條件，保留原位置
    pub fn with(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.set(field, predicate);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, predicate: Predicate) {
        let field = field.into();
        match self.filters.iter_mut().find(|f| f.field == field) {
            Some(existing) => existing.predicate = predicate,
            None => self.filters.push(FieldFilter { field, predicate }),
        }
    }

    pub fn remove(&mut self, field: &str) {
        self.filters.retain(|f| f.field != field);
    }

    pub fn get(&self, field: &str) -> Option<&Predicate> {
        self.filters
            .iter()
            .find(|f| f.field == field)
            .map(|f| &f.predicate)
    }

    pub fn active_count(&self) -> usize {
        self.filters.iter().filter(|f| f.predicate.is_active()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }

    /// 解析 `column` 或 `column:asc` / `column:desc`
    pub fn parse(spec: &str) -> Option<Self> {
        let (column, direction) = match spec.split_once(':') {
            Some((column, dir)) => {
                let direction = match dir.trim().to_ascii_lowercase().as_str() {
                    "asc" | "ascending" => SortDirection::Ascending,
                    "desc" | "descending" => SortDirection::Descending,
                    _ => return None,
                };
                (column, direction)
            }
            None => (spec, SortDirection::Ascending),
        };
        let column = column.trim();
        if column.is_empty() {
            return None;
        }
        Some(Self {
            column: column.to_string(),
            direction,
        })
    }
}
