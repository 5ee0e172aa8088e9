//! Prompt normalization and cache keys

use sha2::{Digest, Sha256};

/// Cache key for an enhanced prompt.
pub type PromptKey = [u8; 32];

/// Trim, collapse internal whitespace runs to one space, and lower-case.
pub fn normalize_prompt(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 of the normalized prompt.
pub fn prompt_cache_key(prompt: &str) -> PromptKey {
    let mut hasher = Sha256::new();
    hasher.update(normalize_prompt(prompt).as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_prompt("  A   Cat\tin\nthe  Rain "), "a cat in the rain");
        assert_eq!(normalize_prompt("一只  小猫"), "一只 小猫");
    }

    #[test]
    fn test_equivalent_prompts_share_key() {
        assert_eq!(prompt_cache_key("A cat"), prompt_cache_key("  a   CAT "));
        assert_ne!(prompt_cache_key("a cat"), prompt_cache_key("a dog"));
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(s in "[a-zA-Z0-9 \\t\\n一-龥]{0,64}") {
            let once = normalize_prompt(&s);
            prop_assert_eq!(normalize_prompt(&once), once.clone());
            prop_assert_eq!(prompt_cache_key(&s), prompt_cache_key(&once));
        }
    }
}
