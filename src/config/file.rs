//! JSON file provider.
//!
//! Dotted keys address nested objects, so `unit.timeout_ms` reads
//! `{"unit": {"timeout_ms": 30000}}`.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::ConfigResult;
use super::provider::ConfigProvider;

pub struct FileConfigProvider {
    path: PathBuf,
    data: RwLock<Option<Map<String, Value>>>,
    auto_reload: bool,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: RwLock::new(None),
            auto_reload: false,
        }
    }

    /// Re-reads the file on every access.
    pub fn auto_reload(path: impl Into<PathBuf>) -> Self {
        Self {
            auto_reload: true,
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn reload(&self) -> ConfigResult<()> {
        *self.data.write().await = Some(self.load().await?);
        Ok(())
    }

    // A missing file reads as empty.
    async fn load(&self) -> ConfigResult<Map<String, Value>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Map::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn ensure_loaded(&self) -> ConfigResult<()> {
        let mut data = self.data.write().await;
        if data.is_none() || self.auto_reload {
            *data = Some(self.load().await?);
        }
        Ok(())
    }

    async fn save(&self, data: &Map<String, Value>) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(data)?).await?;
        Ok(())
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = map.get(parts.next()?)?;
    parts.try_fold(first, |value, part| value.get(part))
}

fn insert_path(map: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            map.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

fn remove_path(map: &mut Map<String, Value>, key: &str) -> bool {
    match key.split_once('.') {
        None => map.remove(key).is_some(),
        Some((head, rest)) => match map.get_mut(head) {
            Some(Value::Object(child)) => remove_path(child, rest),
            _ => false,
        },
    }
}

fn flatten(prefix: &str, map: &Map<String, Value>, out: &mut Vec<String>) {
    for (key, value) in map {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(child) => flatten(&full, child, out),
            _ => out.push(full),
        }
    }
}

#[async_trait::async_trait]
impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        self.ensure_loaded().await?;
        let data = self.data.read().await;
        Ok(data
            .as_ref()
            .and_then(|map| lookup(map, key))
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }))
    }

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.ensure_loaded().await?;
        let mut data = self.data.write().await;
        let map = data.get_or_insert_with(Map::new);
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        insert_path(map, key, value);
        self.save(map).await
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        self.ensure_loaded().await?;
        let mut data = self.data.write().await;
        let Some(map) = data.as_mut() else {
            return Ok(false);
        };
        let existed = remove_path(map, key);
        if existed {
            self.save(map).await?;
        }
        Ok(existed)
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        self.ensure_loaded().await?;
        let data = self.data.read().await;
        let mut keys = Vec::new();
        if let Some(map) = data.as_ref() {
            flatten("", map, &mut keys);
        }
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("auto_reload", &self.auto_reload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_nested_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent.json");
        let config = serde_json::json!({
            "manager": {"max_units": 3},
            "memory": {"compression": "deferred"}
        });
        tokio::fs::write(&path, config.to_string()).await.unwrap();

        let provider = FileConfigProvider::new(&path);
        assert_eq!(
            provider.get_raw("manager.max_units").await.unwrap(),
            Some("3".to_string())
        );
        assert_eq!(
            provider.get_raw("memory.compression").await.unwrap(),
            Some("deferred".to_string())
        );
        assert_eq!(provider.get_raw("manager.missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let provider = FileConfigProvider::new(dir.path().join("absent.json"));
        assert_eq!(provider.get_raw("unit.sandbox").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_nested_write_and_delete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("agent.json");
        let provider = FileConfigProvider::new(&path);

        provider.set_raw("unit.timeout_ms", "500").await.unwrap();
        provider.set_raw("unit.sandbox", "false").await.unwrap();
        provider.set_raw("memory.compression", "inline").await.unwrap();
        assert!(path.exists());

        let written: Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(written["unit"]["timeout_ms"], 500);

        assert_eq!(
            provider.list_keys("unit.").await.unwrap(),
            vec!["unit.sandbox".to_string(), "unit.timeout_ms".to_string()]
        );
        assert!(provider.delete("unit.sandbox").await.unwrap());
        assert!(!provider.delete("unit.sandbox").await.unwrap());
    }
}
