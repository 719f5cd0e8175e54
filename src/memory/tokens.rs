//! Word-count token estimation.
//!
//! Compression timing depends on these numbers, so the estimator is fixed and
//! deterministic: every whitespace-separated word costs four thirds of a token,
//! rounded up. No tokenizer parity is attempted.

const TOKENS_PER_WORD_NUMERATOR: usize = 4;
const TOKENS_PER_WORD_DENOMINATOR: usize = 3;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn estimate_tokens(text: &str) -> usize {
    (word_count(text) * TOKENS_PER_WORD_NUMERATOR).div_ceil(TOKENS_PER_WORD_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_free() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \n\t "), 0);
    }

    #[test]
    fn test_rounds_up() {
        assert_eq!(estimate_tokens("one"), 2);
        assert_eq!(estimate_tokens("one two three"), 4);
        assert_eq!(estimate_tokens("a b c d e f"), 8);
    }

    #[test]
    fn test_ignores_whitespace_shape() {
        assert_eq!(
            estimate_tokens("read   the\nfile"),
            estimate_tokens("read the file")
        );
    }
}
