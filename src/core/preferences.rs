//! 表格顯示偏好（欄位顯示與順序、側欄開關）。
//!
//! 偏好是一個明確的設定物件：建立時載入，變更後由呼叫端儲存，沒有全域狀態。

use crate::domain::ports::Storage;
use crate::utils::error::{CrmError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default = "default_visible")]
    pub default_visible: bool,
}

fn default_visible() -> bool {
    true
}

impl ColumnDefinition {
    pub fn new(id: &str, label: &str, mandatory: bool, default_visible: bool) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            mandatory,
            default_visible,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSetting {
    pub id: String,
    pub visible: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPreferences {
    #[serde(default)]
    columns: Vec<ColumnSetting>,
    #[serde(default)]
    sidebar_open: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TablePreferences {
    table: String,
    definitions: Vec<ColumnDefinition>,
    columns: Vec<ColumnSetting>,
    sidebar_open: bool,
}

impl TablePreferences {
    pub fn new(table: impl Into<String>, definitions: Vec<ColumnDefinition>) -> Self {
        let columns = default_columns(&definitions);
        Self {
            table: table.into(),
            definitions,
            columns,
            sidebar_open: true,
        }
    }

    pub fn storage_key(&self) -> String {
        format!("preferences/{}.json", self.table)
    }

    /// 載入並與目前的欄位定義對齊：未知欄位丟棄、新欄位附加在後、必要欄位強制顯示
    pub async fn load<S: Storage>(
        storage: &S,
        table: impl Into<String>,
        definitions: Vec<ColumnDefinition>,
    ) -> Result<Self> {
        let mut prefs = Self::new(table, definitions);
        let key = prefs.storage_key();
        if !storage.exists(&key).await {
            return Ok(prefs);
        }

        let bytes = storage.read_file(&key).await?;
        let stored: StoredPreferences = match serde_json::from_slice(&bytes) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("⚠️ Ignoring unreadable {}: {}", key, e);
                return Ok(prefs);
            }
        };

        prefs.columns = reconcile(&prefs.definitions, stored.columns);
        if let Some(open) = stored.sidebar_open {
            prefs.sidebar_open = open;
        }
        Ok(prefs)
    }

    pub async fn save<S: Storage>(&self, storage: &S) -> Result<()> {
        let stored = StoredPreferences {
            columns: self.columns.clone(),
            sidebar_open: Some(self.sidebar_open),
        };
        storage
            .write_file(&self.storage_key(), &serde_json::to_vec_pretty(&stored)?)
            .await
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnSetting] {
        &self.columns
    }

    pub fn definition(&self, id: &str) -> Option<&ColumnDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    pub fn visible_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> Result<()> {
        let mandatory = self
            .definition(id)
            .map(|d| d.mandatory)
            .ok_or_else(|| CrmError::input(format!("Unknown column: {}", id)))?;
        if mandatory && !visible {
            return Err(CrmError::input(format!("Column '{}' cannot be hidden", id)));
        }
        if let Some(column) = self.columns.iter_mut().find(|c| c.id == id) {
            column.visible = visible;
        }
        Ok(())
    }

    /// 拖放排序：把 `from` 位置的欄位移到 `to`
    pub fn move_column(&mut self, from: usize, to: usize) -> Result<()> {
        move_item(&mut self.columns, from, to)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.sidebar_open = open;
    }

    pub fn reset(&mut self) {
        self.columns = default_columns(&self.definitions);
        self.sidebar_open = true;
    }
}

fn default_columns(definitions: &[ColumnDefinition]) -> Vec<ColumnSetting> {
    definitions
        .iter()
        .map(|d| ColumnSetting {
            id: d.id.clone(),
            visible: d.mandatory || d.default_visible,
        })
        .collect()
}

fn reconcile(definitions: &[ColumnDefinition], stored: Vec<ColumnSetting>) -> Vec<ColumnSetting> {
    let mut seen = HashSet::new();
    let mut columns: Vec<ColumnSetting> = stored
        .into_iter()
        .filter_map(|setting| {
            let def = definitions.iter().find(|d| d.id == setting.id)?;
            if !seen.insert(setting.id.clone()) {
                return None;
            }
            Some(ColumnSetting {
                visible: setting.visible || def.mandatory,
                id: setting.id,
            })
        })
        .collect();

    for def in definitions {
        if !seen.contains(&def.id) {
            columns.push(ColumnSetting {
                id: def.id.clone(),
                visible: def.mandatory || def.default_visible,
            });
        }
    }
    columns
}

/// 通用的拖放移動，也用於表單題目排序
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<()> {
    if from >= items.len() || to >= items.len() {
        return Err(CrmError::input(format!(
            "Cannot move item {} to {}: only {} items",
            from,
            to,
            items.len()
        )));
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    Ok(())
}

/// 客戶列表的欄位
pub fn client_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("name", "Name", true, true),
        ColumnDefinition::new("email", "Email", false, true),
        ColumnDefinition::new("phone", "Phone", false, true),
        ColumnDefinition::new("instagram_handle", "Instagram", false, false),
        ColumnDefinition::new("id", "Client ID", false, true),
        ColumnDefinition::new("country", "Country", false, false),
        ColumnDefinition::new("client_start_date", "Client Start Date", false, true),
        ColumnDefinition::new("client_end_date", "Client End Date", false, false),
        ColumnDefinition::new("package_type", "Package Type", false, true),
        ColumnDefinition::new("latest_payment_amount", "Latest Payment", false, true),
        ColumnDefinition::new("latest_payment_date", "Latest Payment Date", false, true),
        ColumnDefinition::new("payment_method", "Stripe Account", false, false),
        ColumnDefinition::new("status", "Status", false, false),
        ColumnDefinition::new("coach_name", "Coach", false, false),
        ColumnDefinition::new("ltv", "LTV", false, false),
    ]
}
