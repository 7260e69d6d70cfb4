use crate::domain::model::DomainValidationState;
use crate::domain::ports::Storage;
use crate::utils::error::Result;

pub const VALIDATION_STATE_FILE: &str = "domain_validation.json";

/// 驗證進度的存取點，重新啟動後可以從這裡恢復輪詢
pub struct ValidationStateStore<S: Storage> {
    storage: S,
    key: String,
}

impl<S: Storage> ValidationStateStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: VALIDATION_STATE_FILE.to_string(),
        }
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub async fn load(&self) -> Result<Option<DomainValidationState>> {
        if !self.storage.exists(&self.key).await {
            return Ok(None);
        }
        let bytes = self.storage.read_file(&self.key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                // 壞掉的檔案當作沒有存檔，重新開始即可
                tracing::warn!("⚠️ Ignoring unreadable {}: {}", self.key, e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, state: &DomainValidationState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state)?;
        self.storage.write_file(&self.key, &json).await?;
        tracing::debug!("💾 Saved validation state ({}, {} attempts)", state.status, state.attempts);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.storage.delete_file(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use crate::domain::model::ValidationStatus;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = ValidationStateStore::new(LocalStorage::new(
            temp_dir.path().to_str().unwrap(),
        ));

        assert_eq!(store.load().await.unwrap(), None);

        let state = DomainValidationState {
            subdomain: "check.gym.com".to_string(),
            status: ValidationStatus::Validating,
            attempts: 7,
            ..Default::default()
        };
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(VALIDATION_STATE_FILE), b"{not json").unwrap();
        let store = ValidationStateStore::new(LocalStorage::new(
            temp_dir.path().to_str().unwrap(),
        ));

        assert_eq!(store.load().await.unwrap(), None);
    }
}
