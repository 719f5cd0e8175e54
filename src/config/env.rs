//! Environment variable provider.
//!
//! `manager.max_units` is read from `TASK_AGENT_MANAGER_MAX_UNITS`: the key
//! is upper-cased, dots become underscores, and the prefix is prepended.

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

pub const DEFAULT_ENV_PREFIX: &str = "TASK_AGENT_";

/// Read-only view of the process environment.
///
/// Mutating the environment is not thread-safe, so writes are refused.
#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    prefix: String,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn env_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase().replace('.', "_"))
    }

    // Section names carry no underscores, so only the first one is a dot.
    fn key_from_env(&self, env_name: &str) -> Option<String> {
        let rest = env_name.strip_prefix(&self.prefix)?.to_lowercase();
        Some(rest.replacen('_', ".", 1))
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for EnvConfigProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        match std::env::var(self.env_key(key)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        }
    }

    async fn set_raw(&self, _key: &str, _value: &str) -> ConfigResult<()> {
        Err(ConfigError::Provider {
            message: "environment variables are read-only at runtime".into(),
        })
    }

    async fn delete(&self, _key: &str) -> ConfigResult<bool> {
        Err(ConfigError::Provider {
            message: "environment variables are read-only at runtime".into(),
        })
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let env_prefix = self.env_key(prefix);
        let mut keys: Vec<String> = std::env::vars()
            .filter(|(k, _)| k.starts_with(&env_prefix))
            .filter_map(|(k, _)| self.key_from_env(&k))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let provider = EnvConfigProvider::new();
        assert_eq!(
            provider.env_key("manager.max_units"),
            "TASK_AGENT_MANAGER_MAX_UNITS"
        );
        assert_eq!(
            provider.key_from_env("TASK_AGENT_MANAGER_MAX_UNITS").as_deref(),
            Some("manager.max_units")
        );
        assert_eq!(provider.key_from_env("OTHER_MANAGER_MAX_UNITS"), None);
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let provider = EnvConfigProvider::with_prefix("TASK_AGENT_ENV_TEST_");
        // SAFETY: test-only variable with a unique prefix
        unsafe { std::env::set_var("TASK_AGENT_ENV_TEST_UNIT_TIMEOUT_MS", "1500") };

        assert_eq!(
            provider.get_raw("unit.timeout_ms").await.unwrap(),
            Some("1500".to_string())
        );
        assert_eq!(
            provider.list_keys("unit.").await.unwrap(),
            vec!["unit.timeout_ms".to_string()]
        );

        unsafe { std::env::remove_var("TASK_AGENT_ENV_TEST_UNIT_TIMEOUT_MS") };
    }

    #[tokio::test]
    async fn test_read_only() {
        let provider = EnvConfigProvider::new();
        assert!(provider.set_raw("unit.sandbox", "false").await.is_err());
        assert!(provider.delete("unit.sandbox").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider = EnvConfigProvider::with_prefix("TASK_AGENT_NOPE_");
        assert_eq!(provider.get_raw("memory.threshold").await.unwrap(), None);
    }
}
