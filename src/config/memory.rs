//! In-memory provider, for tests and code-defined configuration.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ConfigResult;
use super::provider::ConfigProvider;

#[derive(Debug)]
pub struct MemoryConfigProvider {
    data: RwLock<HashMap<String, String>>,
    name: String,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            name: name.into(),
        }
    }

    pub fn from_data(data: HashMap<String, String>) -> Self {
        Self {
            data: RwLock::new(data),
            name: "memory".to_string(),
        }
    }

    /// Builder-style insert.
    pub fn value(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.data.get_mut().insert(key.into(), value.to_string());
        self
    }

    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.write().await.insert(key.into(), value.into());
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

impl Default for MemoryConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for MemoryConfigProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let data = self.data.read().await;
        let mut keys: Vec<String> = data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigProviderExt;

    #[tokio::test]
    async fn test_basic_operations() {
        let provider = MemoryConfigProvider::new().value("unit.max_depth", 2);
        assert_eq!(
            provider.get_raw("unit.max_depth").await.unwrap(),
            Some("2".to_string())
        );

        provider.set_raw("unit.sandbox", "false").await.unwrap();
        assert_eq!(
            provider.list_keys("unit.").await.unwrap(),
            vec!["unit.max_depth".to_string(), "unit.sandbox".to_string()]
        );

        assert!(provider.delete("unit.sandbox").await.unwrap());
        assert!(!provider.delete("unit.sandbox").await.unwrap());
        assert_eq!(provider.len().await, 1);
    }

    #[tokio::test]
    async fn test_typed_access() {
        let provider = MemoryConfigProvider::new();
        provider.set("manager.max_units", &7usize).await.unwrap();

        let max: Option<usize> = provider.get("manager.max_units").await.unwrap();
        assert_eq!(max, Some(7));
        let parsed: Option<usize> = provider.get_parsed("manager.max_units").await.unwrap();
        assert_eq!(parsed, Some(7));

        provider.insert("memory.threshold", "high").await;
        assert!(provider.get_parsed::<f64>("memory.threshold").await.is_err());
    }
}
