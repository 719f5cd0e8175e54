//! Core Tests
//!
//! Memory store behavior under long append sequences, snapshot files,
//! builtin tools through the registry, rule-based decomposition, and
//! layered configuration.
//!
//! Run: cargo nextest run --test core_tests

use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Memory
// =============================================================================

mod memory_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use task_agent::memory::{
        CompressionMode, MemoryConfig, MemoryStore, MessageDraft, MessageRole, SessionSnapshot,
    };

    const ROLES: [MessageRole; 4] = [
        MessageRole::User,
        MessageRole::Assistant,
        MessageRole::System,
        MessageRole::Tool,
    ];

    fn random_draft(rng: &mut StdRng) -> MessageDraft {
        let words = rng.random_range(1..60);
        let content = (0..words)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let role = ROLES[rng.random_range(0..ROLES.len())];
        MessageDraft::new(role, content)
    }

    /// Alternates blocks of one-to-three word messages, which can only
    /// trip the message ceiling, with blocks of long ones, which trip the
    /// token threshold first.
    fn phased_draft(rng: &mut StdRng, appended: usize) -> MessageDraft {
        if (appended / 100) % 2 == 0 {
            let words = rng.random_range(1..4);
            let content = vec!["tiny"; words].join(" ");
            MessageDraft::new(ROLES[rng.random_range(0..ROLES.len())], content)
        } else {
            random_draft(rng)
        }
    }

    #[test]
    fn test_compression_fires_exactly_when_a_limit_is_crossed() {
        let config = MemoryConfig::default()
            .with_context_budget(800)
            .with_threshold(0.9)
            .with_message_ceiling(30)
            .with_retention_window(5);
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut store = MemoryStore::with_config(config.clone());
        let (mut by_tokens, mut by_count) = (0, 0);

        for appended in 1..=600 {
            let tokens_before = store.stats().total_tokens;
            let len_before = store.len();
            let compressions_before = store.stats().compression_count;

            store.append(phased_draft(&mut rng, appended));

            let added = store.history().last().unwrap().token_count;
            let over_tokens = (tokens_before + added) as f64 > config.token_threshold();
            let over_count = len_before + 1 > config.message_ceiling;
            let compressed = store.stats().compression_count == compressions_before + 1;

            assert_eq!(
                compressed,
                over_tokens || over_count,
                "append {appended}: tokens {tokens_before}+{added}, len {len_before}"
            );
            if compressed {
                assert!(store.len() <= config.retention_window);
                if over_tokens {
                    by_tokens += 1;
                } else {
                    by_count += 1;
                }
            } else {
                assert_eq!(store.stats().compression_count, compressions_before);
                assert_eq!(store.len(), len_before + 1);
            }

            assert!(store.len() <= config.message_ceiling);
            assert_eq!(store.stats().total_appended, appended);
            assert_eq!(store.stats().compression_count, store.medium_term().len());
            let retained: usize = store.short_term().iter().map(|m| m.token_count).sum();
            assert_eq!(store.stats().total_tokens, retained);
            assert_eq!(store.stats().by_role.total(), store.len());
        }

        assert!(by_tokens > 0, "no token-triggered compression");
        assert!(by_count > 0, "no count-triggered compression");
    }

    #[test]
    fn test_summaries_account_for_every_compressed_message() {
        let config = MemoryConfig::default()
            .with_message_ceiling(10)
            .with_retention_window(3);
        let mut rng = StdRng::seed_from_u64(42);
        let mut store = MemoryStore::with_config(config);

        for _ in 0..200 {
            store.append(random_draft(&mut rng));
        }

        // Each compression summarizes the retained tail again plus the new
        // messages, so every summary covers more than the retention window.
        for summary in store.medium_term() {
            assert!(summary.metadata.original_message_count > 3);
            assert!(summary.metadata.original_token_count > 0);
            assert!(summary.metadata.compression_ratio > 0.0);
        }
    }

    #[test]
    fn test_context_window_is_suffix_of_full_history() {
        let config = MemoryConfig::default()
            .with_message_ceiling(10)
            .with_retention_window(3);
        let mut rng = StdRng::seed_from_u64(7);
        let mut store = MemoryStore::with_config(config);
        for _ in 0..50 {
            store.append(random_draft(&mut rng));
        }
        assert!(store.stats().compression_count > 0);
        assert_eq!(store.history().len(), 50);

        for budget in [0, 10, 50, 200, 1_000, 100_000] {
            let window = store.context_window(budget);
            let used: usize = window.iter().map(|m| m.token_count).sum();
            assert!(used <= budget);

            let history = store.history();
            assert_eq!(window, &history[history.len() - window.len()..]);
            // One more message from the past would not fit.
            if window.len() < history.len() {
                let previous = &history[history.len() - window.len() - 1];
                assert!(used + previous.token_count > budget);
            }
        }
        assert_eq!(store.context_window(100_000).len(), 50);
    }

    #[test]
    fn test_deferred_compression_matches_inline_after_compaction() {
        let limits = MemoryConfig::default()
            .with_message_ceiling(12)
            .with_retention_window(4);
        let mut inline = MemoryStore::with_config(limits.clone());
        let mut deferred =
            MemoryStore::with_config(limits.with_compression(CompressionMode::Deferred));

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..13 {
            let draft = random_draft(&mut rng);
            inline.append(draft.clone());
            deferred.append(draft);
        }

        assert_eq!(inline.len(), 4);
        assert_eq!(deferred.len(), 13);
        assert!(deferred.compression_pending());

        assert!(deferred.compact_if_needed());
        assert_eq!(deferred.len(), inline.len());
        assert_eq!(deferred.stats().total_tokens, inline.stats().total_tokens);
    }

    #[tokio::test]
    async fn test_snapshot_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions/unit.json");

        let config = MemoryConfig::default()
            .with_message_ceiling(6)
            .with_retention_window(2);
        let mut store = MemoryStore::with_config(config.clone());
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..15 {
            store.append(random_draft(&mut rng));
        }
        store.set_fact("language", "rust");
        store.set_fact("limits", json!({"units": 10}));

        store.save_snapshot(&path).await.unwrap();
        let mut restored = MemoryStore::with_config(config);
        restored.load_snapshot(&path).await.unwrap();

        assert_eq!(restored.short_term(), store.short_term());
        assert_eq!(restored.history(), store.history());
        assert_eq!(restored.medium_term(), store.medium_term());
        assert_eq!(restored.long_term(), store.long_term());
        assert_eq!(restored.stats(), store.stats());
        assert_eq!(restored.usage(), store.usage());
    }

    #[test]
    fn test_snapshot_from_newer_version_is_rejected() {
        let mut snapshot = MemoryStore::new().export_session();
        snapshot.version += 1;
        let raw = snapshot.to_json().unwrap();

        assert!(SessionSnapshot::from_json(&raw).is_err());

        let parsed: SessionSnapshot = serde_json::from_str(&raw).unwrap();
        let mut store = MemoryStore::new();
        store.append(MessageDraft::user("keep me"));
        let err = store.import_session(parsed).unwrap_err();

        assert!(matches!(err, task_agent::Error::Snapshot(_)));
        assert_eq!(store.len(), 1);
    }
}

// =============================================================================
// Tools
// =============================================================================

mod tool_tests {
    use super::*;
    use task_agent::tools::{ToolAccess, ToolContext, ToolError, ToolRegistry, ToolResult};

    fn context(dir: &TempDir) -> ToolContext {
        ToolContext::detached(std::fs::canonicalize(dir.path()).unwrap())
    }

    #[tokio::test]
    async fn test_missing_parameter_message() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::builtin(&ToolAccess::all());

        for (tool, missing) in [
            ("Read", "file_path"),
            ("Write", "content"),
            ("Bash", "command"),
            ("Grep", "pattern"),
        ] {
            let result = registry.invoke(tool, json!({}), &context(&dir)).await;
            assert_eq!(
                result.error_message().as_deref(),
                Some(format!("missing required parameter: {missing}").as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_wrong_type_is_rejected_before_execution() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::builtin(&ToolAccess::all());
        let result = registry
            .invoke("Read", json!({"file_path": 12}), &context(&dir))
            .await;
        assert!(matches!(
            result,
            ToolResult::Error(ToolError::InvalidType { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::builtin(&ToolAccess::all());
        let result = registry.invoke("Deploy", json!({}), &context(&dir)).await;
        assert_eq!(result, ToolResult::Error(ToolError::unknown_tool("Deploy")));
    }

    #[tokio::test]
    async fn test_write_edit_read_grep_flow() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let registry = ToolRegistry::builtin(&ToolAccess::all());

        let written = registry
            .invoke(
                "Write",
                json!({"file_path": "src/lib.rs", "content": "// TODO: docs\nfn main() {}\n"}),
                &ctx,
            )
            .await;
        assert!(written.is_success());

        let edited = registry
            .invoke(
                "Edit",
                json!({"file_path": "src/lib.rs", "old_string": "main", "new_string": "run"}),
                &ctx,
            )
            .await;
        assert!(edited.is_success());

        let read = registry
            .invoke("Read", json!({"file_path": "src/lib.rs"}), &ctx)
            .await;
        let text = read.output_text().unwrap();
        assert!(text.contains("fn run() {}"));

        let found = registry
            .invoke("Grep", json!({"pattern": "TODO", "path": "src"}), &ctx)
            .await;
        assert!(found.is_success());
        assert!(found.output_text().unwrap().contains("lib.rs"));
    }

    #[tokio::test]
    async fn test_sandbox_blocks_escape_but_permissive_allows_resolution() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::builtin(&ToolAccess::all());

        let sandboxed = registry
            .invoke("Read", json!({"file_path": "../outside.txt"}), &context(&dir))
            .await;
        assert!(matches!(
            sandboxed,
            ToolResult::Error(ToolError::SecurityViolation { .. })
        ));

        let permissive = registry
            .invoke(
                "Read",
                json!({"file_path": "../definitely-missing-file.txt"}),
                &context(&dir).with_sandbox(false),
            )
            .await;
        assert!(matches!(
            permissive,
            ToolResult::Error(ToolError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_access_filter() {
        let registry = ToolRegistry::builtin(&ToolAccess::only(["Read", "Grep"]));
        assert!(registry.contains("Read"));
        assert!(registry.contains("Grep"));
        assert!(!registry.contains("Bash"));
        assert_eq!(registry.len(), 2);
    }
}

// =============================================================================
// Analyzer
// =============================================================================

mod analyzer_tests {
    use task_agent::analyzer::{RuleBasedAnalyzer, parse_decomposition};

    #[test]
    fn test_multi_clause_task() {
        let plan = RuleBasedAnalyzer.plan(
            "Read Cargo.toml, then search for 'serde' in src; finally run `cargo check`",
        );
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.hint(0), Some("Read"));
        assert_eq!(plan.hint(1), Some("Grep"));
        assert_eq!(plan.hint(2), Some("Bash"));
    }

    #[test]
    fn test_numbered_list_task() {
        let plan = RuleBasedAnalyzer.plan("1. read a.txt\n2. write 'x' to b.txt");
        assert_eq!(plan.steps, vec!["read a.txt", "write 'x' to b.txt"]);
        assert_eq!(plan.hint(1), Some("Write"));
    }

    #[test]
    fn test_unmatched_task_is_single_step() {
        let plan = RuleBasedAnalyzer.plan("ponder the meaning of life");
        assert_eq!(plan.steps, vec!["ponder the meaning of life"]);
        assert_eq!(plan.hint(0), None);
    }

    #[test]
    fn test_model_output_formats() {
        let object = parse_decomposition(
            r#"{"steps": ["read a.rs", "run tests"], "tool_hints": ["Read", "Bash"]}"#,
        )
        .unwrap();
        assert_eq!(object.hint(1), Some("Bash"));

        let array = parse_decomposition(r#"["one", "two"]"#).unwrap();
        assert_eq!(array.steps, vec!["one", "two"]);

        assert!(parse_decomposition("   ").is_err());
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod config_tests {
    use super::*;
    use std::time::Duration;
    use task_agent::config::{ConfigBuilder, ConfigError, MemoryConfigProvider, keys};
    use task_agent::memory::CompressionMode;

    #[tokio::test]
    async fn test_first_provider_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("task-agent.json");
        std::fs::write(
            &path,
            json!({
                "manager": {"max_units": 3, "max_concurrency": 2},
                "unit": {"timeout_ms": 5000, "max_depth": 1},
                "memory": {"compression": "deferred"}
            })
            .to_string(),
        )
        .unwrap();

        let overrides = MemoryConfigProvider::new().value(keys::MAX_UNITS, 8);
        let config = ConfigBuilder::new()
            .memory(overrides)
            .file(&path)
            .load()
            .await
            .unwrap();

        assert_eq!(config.max_units, 8);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.unit.timeout, Duration::from_secs(5));
        assert_eq!(config.unit.max_depth, 1);
        assert_eq!(config.unit.memory.compression, CompressionMode::Deferred);
    }

    #[tokio::test]
    async fn test_invalid_values_are_all_reported() {
        let provider = MemoryConfigProvider::new()
            .value(keys::MAX_UNITS, 0)
            .value(keys::UNIT_TIMEOUT_MS, 0)
            .value(keys::MEMORY_THRESHOLD, 1.5);
        let err = ConfigBuilder::new().memory(provider).load().await.unwrap_err();

        match err {
            ConfigError::ValidationErrors(errors) => assert_eq!(errors.0.len(), 3),
            other => panic!("expected validation errors, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_value() {
        let provider = MemoryConfigProvider::new().value(keys::MAX_CONCURRENCY, "many");
        let err = ConfigBuilder::new().memory(provider).load().await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err: task_agent::Error = err.into();
        assert_eq!(err.category(), task_agent::ErrorCategory::Configuration);
    }
}
