use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{LocalStateRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryLocalStateRepository {
    values: RwLock<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl LocalStateRepository for InMemoryLocalStateRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn put(&self, key: &str, value_json: String) -> Result<(), RepositoryError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value_json);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let mut values = self.values.write().await;
        values.remove(key);
        Ok(())
    }
}
