//! Loading [`ManagerConfig`] from a provider.

use std::time::Duration;

use super::provider::{ConfigProvider, ConfigProviderExt};
use super::{ConfigError, ConfigResult, ValidationErrors};
use crate::manager::ManagerConfig;
use crate::memory::CompressionMode;

pub mod keys {
    pub const MAX_UNITS: &str = "manager.max_units";
    pub const MAX_CONCURRENCY: &str = "manager.max_concurrency";
    pub const UNIT_MAX_CONCURRENCY: &str = "unit.max_concurrency";
    pub const UNIT_TIMEOUT_MS: &str = "unit.timeout_ms";
    pub const UNIT_SANDBOX: &str = "unit.sandbox";
    pub const UNIT_MAX_DEPTH: &str = "unit.max_depth";
    pub const UNIT_WORKING_DIR: &str = "unit.working_dir";
    pub const MEMORY_CONTEXT_BUDGET: &str = "memory.context_budget";
    pub const MEMORY_THRESHOLD: &str = "memory.threshold";
    pub const MEMORY_MESSAGE_CEILING: &str = "memory.message_ceiling";
    pub const MEMORY_RETENTION_WINDOW: &str = "memory.retention_window";
    pub const MEMORY_COMPRESSION: &str = "memory.compression";
}

impl ManagerConfig {
    /// Reads every known key, keeping defaults for absent ones, then validates.
    pub async fn load(provider: &dyn ConfigProvider) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(v) = provider.get_parsed(keys::MAX_UNITS).await? {
            config.max_units = v;
        }
        if let Some(v) = provider.get_parsed(keys::MAX_CONCURRENCY).await? {
            config.max_concurrency = v;
        }

        let unit = &mut config.unit;
        if let Some(v) = provider.get_parsed(keys::UNIT_MAX_CONCURRENCY).await? {
            unit.max_concurrency = v;
        }
        if let Some(ms) = provider.get_parsed::<u64>(keys::UNIT_TIMEOUT_MS).await? {
            unit.timeout = Duration::from_millis(ms);
        }
        if let Some(v) = provider.get_parsed(keys::UNIT_SANDBOX).await? {
            unit.sandbox = v;
        }
        if let Some(v) = provider.get_parsed(keys::UNIT_MAX_DEPTH).await? {
            unit.max_depth = v;
        }
        if let Some(dir) = provider.get_raw(keys::UNIT_WORKING_DIR).await? {
            unit.working_dir = dir.into();
        }

        let memory = &mut unit.memory;
        if let Some(v) = provider.get_parsed(keys::MEMORY_CONTEXT_BUDGET).await? {
            memory.context_budget = v;
        }
        if let Some(v) = provider.get_parsed(keys::MEMORY_THRESHOLD).await? {
            memory.threshold = v;
        }
        if let Some(v) = provider.get_parsed(keys::MEMORY_MESSAGE_CEILING).await? {
            memory.message_ceiling = v;
        }
        if let Some(v) = provider.get_parsed(keys::MEMORY_RETENTION_WINDOW).await? {
            memory.retention_window = v;
        }
        if let Some(raw) = provider.get_raw(keys::MEMORY_COMPRESSION).await? {
            memory.compression = CompressionMode::parse(raw.trim_matches('"')).ok_or_else(|| {
                ConfigError::invalid(keys::MEMORY_COMPRESSION, format!("unknown mode '{raw}'"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Collects every violated limit rather than stopping at the first.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let memory = &self.unit.memory;

        if self.max_units == 0 {
            errors.push(ConfigError::invalid(keys::MAX_UNITS, "must be at least 1"));
        }
        if self.max_concurrency == 0 {
            errors.push(ConfigError::invalid(keys::MAX_CONCURRENCY, "must be at least 1"));
        }
        if self.unit.max_concurrency == 0 {
            errors.push(ConfigError::invalid(
                keys::UNIT_MAX_CONCURRENCY,
                "must be at least 1",
            ));
        }
        if self.unit.timeout.is_zero() {
            errors.push(ConfigError::invalid(keys::UNIT_TIMEOUT_MS, "must be positive"));
        }
        if !(memory.threshold > 0.0 && memory.threshold <= 1.0) {
            errors.push(ConfigError::invalid(
                keys::MEMORY_THRESHOLD,
                format!("{} is outside (0, 1]", memory.threshold),
            ));
        }
        if memory.retention_window >= memory.message_ceiling {
            errors.push(ConfigError::invalid(
                keys::MEMORY_RETENTION_WINDOW,
                format!(
                    "{} must be smaller than the message ceiling {}",
                    memory.retention_window, memory.message_ceiling
                ),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let config = ManagerConfig::load(&MemoryConfigProvider::new())
            .await
            .unwrap();
        assert_eq!(config.max_units, 10);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.unit.timeout, Duration::from_secs(30));
        assert_eq!(config.unit.memory.compression, CompressionMode::Inline);
    }

    #[tokio::test]
    async fn test_overrides() {
        let provider = MemoryConfigProvider::new()
            .value(keys::MAX_UNITS, 2)
            .value(keys::UNIT_TIMEOUT_MS, 250)
            .value(keys::UNIT_SANDBOX, false)
            .value(keys::MEMORY_THRESHOLD, 0.5)
            .value(keys::MEMORY_COMPRESSION, "deferred");
        let config = ManagerConfig::load(&provider).await.unwrap();

        assert_eq!(config.max_units, 2);
        assert_eq!(config.unit.timeout, Duration::from_millis(250));
        assert!(!config.unit.sandbox);
        assert_eq!(config.unit.memory.threshold, 0.5);
        assert_eq!(config.unit.memory.compression, CompressionMode::Deferred);
    }

    #[tokio::test]
    async fn test_validation_collects_all_errors() {
        let provider = MemoryConfigProvider::new()
            .value(keys::MAX_UNITS, 0)
            .value(keys::MEMORY_THRESHOLD, 1.5)
            .value(keys::MEMORY_RETENTION_WINDOW, 100);
        let err = ManagerConfig::load(&provider).await.unwrap_err();

        let ConfigError::ValidationErrors(errors) = err else {
            panic!("expected validation errors, got {err}");
        };
        assert_eq!(errors.0.len(), 3);
    }

    #[tokio::test]
    async fn test_bad_value_is_reported_with_key() {
        let provider = MemoryConfigProvider::new().value(keys::MEMORY_COMPRESSION, "lazy");
        let err = ManagerConfig::load(&provider).await.unwrap_err();
        assert!(err.to_string().contains("memory.compression"));
    }
}
