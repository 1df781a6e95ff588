use crate::heuristics::patterns::{DEFAULT_BANNED_WORDS, DRUG_KEYWORDS};

/// One inbound human-authored message, already parsed by the ingestion layer.
#[derive(Clone, Debug)]
pub struct MessageEvent {
    pub author_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub text: String,
    pub author_role_ids: Vec<u64>,
}

/// Snapshot of the moderation configuration the pipeline runs against.
///
/// Loaded per event from the config store by the caller; missing or
/// malformed stored values fall back to the compiled defaults here.
#[derive(Clone, Debug)]
pub struct RuleConfig {
    pub banned_words: Vec<String>,
    pub ping_protected_roles: Vec<u64>,
    pub immune_roles: Vec<u64>,
    pub drug_keywords: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            banned_words: DEFAULT_BANNED_WORDS
                .iter()
                .map(|w| (*w).to_owned())
                .collect(),
            ping_protected_roles: Vec::new(),
            immune_roles: Vec::new(),
            drug_keywords: DRUG_KEYWORDS.iter().map(|w| (*w).to_owned()).collect(),
        }
    }
}

impl RuleConfig {
    /// Merge stored overrides into the compiled defaults.
    ///
    /// Word lists replace the defaults only when non-empty, so a failed or
    /// absent config read never leaves the filter toothless.
    pub fn with_overrides(
        banned_words: Vec<String>,
        ping_protected_roles: Vec<u64>,
        immune_roles: Vec<u64>,
    ) -> Self {
        let mut config = Self::default();
        if !banned_words.is_empty() {
            config.banned_words = banned_words;
        }
        config.ping_protected_roles = ping_protected_roles;
        config.immune_roles = immune_roles;
        config
    }

    /// Whether the author holds any immune/staff role.
    pub fn is_immune(&self, author_role_ids: &[u64]) -> bool {
        author_role_ids
            .iter()
            .any(|role| self.immune_roles.contains(role))
    }
}

#[cfg(test)]
mod tests {
    use super::RuleConfig;

    #[test]
    fn defaults_carry_compiled_word_lists() {
        let config = RuleConfig::default();
        assert!(!config.banned_words.is_empty());
        assert!(!config.drug_keywords.is_empty());
        assert!(config.immune_roles.is_empty());
    }

    #[test]
    fn empty_override_keeps_default_banned_words() {
        let config = RuleConfig::with_overrides(Vec::new(), vec![1], vec![2]);
        assert!(!config.banned_words.is_empty());
        assert_eq!(config.ping_protected_roles, vec![1]);
        assert!(config.is_immune(&[2, 99]));
        assert!(!config.is_immune(&[99]));
    }
}
