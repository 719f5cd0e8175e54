//! Running counters for the short-term tier.

use serde::{Deserialize, Serialize};

use super::message::{Message, MessageRole};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub user: usize,
    pub assistant: usize,
    pub system: usize,
    pub tool: usize,
}

impl RoleCounts {
    pub fn get(&self, role: MessageRole) -> usize {
        match role {
            MessageRole::User => self.user,
            MessageRole::Assistant => self.assistant,
            MessageRole::System => self.system,
            MessageRole::Tool => self.tool,
        }
    }

    fn slot(&mut self, role: MessageRole) -> &mut usize {
        match role {
            MessageRole::User => &mut self.user,
            MessageRole::Assistant => &mut self.assistant,
            MessageRole::System => &mut self.system,
            MessageRole::Tool => &mut self.tool,
        }
    }

    pub fn total(&self) -> usize {
        self.user + self.assistant + self.system + self.tool
    }
}

/// Derived counters for the messages currently held in short-term memory.
///
/// `total_tokens` and `by_role` always describe the retained messages only.
/// `compression_count` and `total_appended` are lifetime counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    pub total_tokens: usize,
    pub by_role: RoleCounts,
    pub compression_count: usize,
    pub total_appended: usize,
}

impl ContextStats {
    pub(crate) fn record(&mut self, message: &Message) {
        self.total_tokens += message.token_count;
        *self.by_role.slot(message.role) += 1;
        self.total_appended += 1;
    }

    /// Recomputes the per-message counters from `retained`, keeping lifetime
    /// counters intact.
    pub(crate) fn rebuild(&mut self, retained: &[Message]) {
        self.total_tokens = retained.iter().map(|m| m.token_count).sum();
        self.by_role = RoleCounts::default();
        for message in retained {
            *self.by_role.slot(message.role) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MessageDraft;

    #[test]
    fn test_record_and_rebuild() {
        let a = MessageDraft::user("read the config file").into_message();
        let b = MessageDraft::tool("ok").into_message();

        let mut stats = ContextStats::default();
        stats.record(&a);
        stats.record(&b);
        assert_eq!(stats.total_tokens, a.token_count + b.token_count);
        assert_eq!(stats.by_role.user, 1);
        assert_eq!(stats.by_role.tool, 1);
        assert_eq!(stats.total_appended, 2);

        stats.compression_count = 1;
        stats.rebuild(std::slice::from_ref(&b));
        assert_eq!(stats.total_tokens, b.token_count);
        assert_eq!(stats.by_role.user, 0);
        assert_eq!(stats.by_role.total(), 1);
        assert_eq!(stats.compression_count, 1);
        assert_eq!(stats.total_appended, 2);
    }
}
