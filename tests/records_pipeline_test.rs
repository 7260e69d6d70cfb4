use anyhow::Result;
use fithq_core::adapters::records::{load_filters, load_records, write_csv, write_json};
use fithq_core::core::preferences::client_columns;
use fithq_core::{apply_filters, apply_sort, LocalStorage, SortSpec, TablePreferences};
use tempfile::TempDir;

const CLIENTS_JSON: &str = r#"{
  "count": 6,
  "results": [
    {"id": 1, "name": "Ann", "status": "active", "ltv": "450.00", "country": "UK", "client_start_date": "2024-01-10"},
    {"id": 2, "name": "bob", "status": "cancelled", "ltv": "90.00", "country": "US", "client_start_date": "2023-11-02"},
    {"id": 3, "name": "Cara", "status": "active", "ltv": "1200.00", "country": "UK", "client_start_date": "2024-03-01"},
    {"id": 4, "name": "Dan", "status": "paused", "ltv": "120.50", "country": null, "client_start_date": "2024-02-15"},
    {"id": 5, "name": "Eve", "status": "pending", "ltv": null, "country": "IE", "client_start_date": null},
    {"id": 6, "name": "finn", "status": "active", "ltv": "300.00", "country": "UK", "client_start_date": "2024-05-20T09:00:00Z"}
  ]
}"#;

const FILTERS_TOML: &str = r#"
[[filters]]
field = "status"
type = "one_of"
values = ["active", "paused"]

[[filters]]
field = "ltv"
type = "range"
min = 100
max = 500

[[filters]]
field = "country"
type = "equals"
value = ""
"#;

/// 匯出的客戶清單 → 篩選 → 排序 → CSV
#[tokio::test]
async fn test_filter_sort_and_export_clients() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("clients.json");
    let filters_path = temp_dir.path().join("filters.toml");
    tokio::fs::write(&input, CLIENTS_JSON).await?;
    tokio::fs::write(&filters_path, FILTERS_TOML).await?;

    let records = load_records(&input).await?;
    assert_eq!(records.len(), 6);

    let filters = load_filters(&filters_path).await?;
    assert_eq!(filters.active_count(), 2);

    let filtered = apply_filters(&records, &filters);
    let ids: Vec<i64> = filtered
        .iter()
        .filter_map(|r| r.field("id").and_then(|v| v.as_i64()))
        .collect();
    assert_eq!(ids, vec![1, 4, 6]);

    // ltv 是字串欄位，依字串排序
    let sorted = apply_sort(&filtered, &SortSpec::parse("name:desc").unwrap());
    let csv = write_csv(&sorted, &["name".to_string(), "ltv".to_string()])?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec!["name,ltv", "finn,300.00", "Dan,120.50", "Ann,450.00"]
    );
    Ok(())
}

/// CSV 匯入時推斷型別，數字欄位依數值排序，空值排最後
#[tokio::test]
async fn test_csv_input_sorts_numerically() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("payments.csv");
    tokio::fs::write(
        &input,
        "id,client,amount,date\n1,Ann,99.5,2024-01-03\n2,Bob,,2024-01-04\n3,Cara,1000,2024-02-01\n4,Dan,250,2024-01-20\n",
    )
    .await?;

    let records = load_records(&input).await?;
    let sorted = apply_sort(&records, &SortSpec::descending("amount"));
    let clients: Vec<&str> = sorted
        .iter()
        .filter_map(|r| r.field("client").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(clients, vec!["Cara", "Dan", "Ann", "Bob"]);

    let ascending = apply_sort(&records, &SortSpec::ascending("amount"));
    let clients: Vec<&str> = ascending
        .iter()
        .filter_map(|r| r.field("client").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(clients, vec!["Ann", "Dan", "Cara", "Bob"]);
    Ok(())
}

/// 輸出欄位使用表格偏好中可見的欄位
#[tokio::test]
async fn test_export_uses_saved_column_preferences() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap());

    let mut prefs = TablePreferences::load(&storage, "clients", client_columns()).await?;
    for column in prefs.visible_columns() {
        if column != "name" {
            prefs.set_visible(&column, false)?;
        }
    }
    prefs.set_visible("ltv", true)?;
    let ltv = prefs.position("ltv").unwrap();
    prefs.move_column(ltv, 0)?;
    prefs.save(&storage).await?;

    let reloaded = TablePreferences::load(&storage, "clients", client_columns()).await?;
    let columns = reloaded.visible_columns();
    assert_eq!(columns, vec!["ltv", "name"]);

    let input = temp_dir.path().join("clients.json");
    tokio::fs::write(&input, CLIENTS_JSON).await?;
    let records = load_records(&input).await?;

    let json = write_json(&records[..1], &columns)?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(value, serde_json::json!([{"ltv": "450.00", "name": "Ann"}]));
    Ok(())
}
