//! Step-to-tool matching.
//!
//! [`select_tool`] is a pure function of the step text and an optional hint,
//! so tool choice can be tested without a registry or a running unit.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|(?:^|\s)'([^']*)'|`([^`]*)`"#).unwrap()
});
static BACKTICK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]*\w\.[A-Za-z][A-Za-z0-9]{0,7}$").unwrap());
/// "delegate a subtask to", "spawn a sub-task:", "via a subtask" and similar.
static DELEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:(?:delegate|spawn)\b(?:\s+(?:an?|the|one)\b)?",
        r"(?:\s+(?:sub-?tasks?|sub-?agents?|(?:nested\s+)?units?)\b)?",
        r"|(?:(?:via|in|as|with|using)\s+)?(?:an?\s+)?sub-?tasks?\b)",
        r"\s*(?:\b(?:to|for|that)\b|:)?\s*",
    ))
    .unwrap()
});

/// Builtin tool families a step can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Task,
    Edit,
    Write,
    Search,
    Command,
    Read,
}

/// Keyword rules in priority order; the first kind with a matching word wins.
const RULES: &[(ToolKind, &[&str])] = &[
    (ToolKind::Task, &["subtask", "delegate", "spawn", "sub-task"]),
    (ToolKind::Edit, &["edit", "replace", "modify", "rename", "patch"]),
    (ToolKind::Write, &["write", "create", "save", "generate"]),
    (ToolKind::Search, &["search", "grep", "find", "locate", "look for"]),
    (
        ToolKind::Command,
        &["run", "execute", "exec", "build", "compile", "install", "test"],
    ),
    (ToolKind::Read, &["read", "open", "view", "show", "cat", "inspect", "load"]),
];

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Task,
        ToolKind::Edit,
        ToolKind::Write,
        ToolKind::Search,
        ToolKind::Command,
        ToolKind::Read,
    ];

    /// Registry name of the builtin tool implementing this kind.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Edit => "Edit",
            Self::Write => "Write",
            Self::Search => "Grep",
            Self::Command => "Bash",
            Self::Read => "Read",
        }
    }

    /// Accepts tool names and common aliases, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "task" | "subtask" => Some(Self::Task),
            "edit" => Some(Self::Edit),
            "write" => Some(Self::Write),
            "grep" | "search" => Some(Self::Search),
            "bash" | "shell" | "command" => Some(Self::Command),
            "read" => Some(Self::Read),
            _ => None,
        }
    }

    /// Matches step text against the keyword rules.
    ///
    /// A backtick-quoted command outranks every rule except `Task`.
    pub fn match_step(step: &str) -> Option<Self> {
        let lower = step.to_lowercase();
        if contains_word_any(&lower, RULES[0].1) {
            return Some(Self::Task);
        }
        if BACKTICK.is_match(step) {
            return Some(Self::Command);
        }
        RULES
            .iter()
            .skip(1)
            .find(|(_, words)| contains_word_any(&lower, words))
            .map(|(kind, _)| *kind)
    }

    /// Builds tool parameters from free-form step text.
    ///
    /// Keys that cannot be found are left out so schema validation reports them.
    pub fn extract_params(&self, step: &str) -> Value {
        let quoted = quoted_segments(step);
        let path = first_path(step);
        let mut params = Map::new();

        match self {
            Self::Task => insert_opt(&mut params, "task", delegated_task(step)),
            Self::Read => insert_opt(&mut params, "file_path", path),
            Self::Write => {
                insert_opt(&mut params, "file_path", path);
                insert_opt(&mut params, "content", quoted.first().cloned());
            }
            Self::Edit => {
                insert_opt(&mut params, "file_path", path);
                insert_opt(&mut params, "old_string", quoted.first().cloned());
                insert_opt(&mut params, "new_string", quoted.get(1).cloned());
            }
            Self::Search => {
                let pattern = quoted.first().cloned().or_else(|| word_after(step, "for"));
                insert_opt(&mut params, "pattern", pattern);
                insert_opt(&mut params, "path", path);
            }
            Self::Command => {
                params.insert("command".into(), Value::String(command_text(step)));
            }
        }
        Value::Object(params)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Picks the tool for one step.
///
/// A non-empty hint wins; builtin aliases in the hint are mapped to their
/// registry names and anything else is used verbatim. Without a hint the
/// keyword matcher decides.
pub fn select_tool(step: &str, hint: Option<&str>) -> Option<String> {
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        return Some(
            ToolKind::from_name(hint)
                .map(|kind| kind.tool_name().to_string())
                .unwrap_or_else(|| hint.to_string()),
        );
    }
    ToolKind::match_step(step).map(|kind| kind.tool_name().to_string())
}

/// Parameters for `tool` built from step text. Tools outside the builtin
/// families receive `{"input": <step>}`.
pub fn step_params(tool: &str, step: &str) -> Value {
    match ToolKind::from_name(tool) {
        Some(kind) => kind.extract_params(step),
        None => json!({"input": step.trim()}),
    }
}

/// The work a delegating step hands to a nested unit, with the delegation
/// phrase removed. `None` when nothing is left.
pub fn delegated_task(step: &str) -> Option<String> {
    let stripped = DELEGATION.replace_all(step, " ");
    let task = stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '-' | '.'))
        .trim()
        .to_string();
    (!task.is_empty()).then_some(task)
}

fn contains_word_any(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|word| contains_word(lower, word))
}

fn contains_word(lower: &str, word: &str) -> bool {
    lower.match_indices(word).any(|(start, _)| {
        let end = start + word.len();
        let before = lower[..start].chars().next_back();
        let after = lower[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn quoted_segments(step: &str) -> Vec<String> {
    QUOTED
        .captures_iter(step)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

fn first_path(step: &str) -> Option<String> {
    let unquoted = QUOTED.replace_all(step, " ");
    unquoted
        .split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '"' | '\''))
                .trim_end_matches('.')
        })
        .find(|token| {
            !token.is_empty()
                && !token.contains("://")
                && (token.contains('/') || FILE_NAME.is_match(token))
        })
        .map(str::to_string)
}

fn word_after(step: &str, marker: &str) -> Option<String> {
    let mut words = step.split_whitespace();
    words.by_ref().find(|w| w.eq_ignore_ascii_case(marker))?;
    words
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '_').to_string())
        .filter(|w| !w.is_empty())
}

fn command_text(step: &str) -> String {
    if let Some(caps) = BACKTICK.captures(step) {
        return caps[1].trim().to_string();
    }
    let words: Vec<&str> = step.split_whitespace().collect();
    let start = words
        .iter()
        .position(|w| matches!(w.to_ascii_lowercase().as_str(), "run" | "execute" | "exec"))
        .map(|i| i + 1)
        .unwrap_or(0);
    words[start.min(words.len())..].join(" ")
}

fn insert_opt(params: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        params.insert(key.into(), Value::String(value));
    }
}
