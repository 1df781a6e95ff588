//! Compiled patterns and default word lists for the heuristic battery.

use std::sync::LazyLock;

use regex::Regex;

/// Default banned word list applied when no list is configured.
pub const DEFAULT_BANNED_WORDS: &[&str] = &[
    "nigger", "faggot", "retard", "kike", "chink", "spic", "rape", "porn", "sex", "cock", "cum",
    "slut", "whore", "kys", "nigga",
];

/// Fixed drug-reference keyword list; matched as plain substrings.
pub const DRUG_KEYWORDS: &[&str] = &[
    "cocaine", "heroin", "meth", "weed", "marijuana", "lsd", "mdma", "ecstasy", "fent", "xanax",
];

/// Permissive `scheme://nonspace` URL token.
pub static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z][a-zA-Z0-9+.-]*://\S+").expect("valid url regex")
});

/// Obfuscation-tolerant slur pattern: leetspeak substitutions, repeated
/// letters, optional trailing plural.
pub static SLUR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bn+[i1!|]+[g9]+[e3]+r+s*\b").expect("valid slur regex")
});

/// Curated self-harm encouragement phrases.
pub static SELF_HARM_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\bk[i1!|]+ll\s+(yourself|urself|yoself)\b")
            .expect("valid self-harm regex"),
        Regex::new(r"(?i)\b(commit|do)\s+suicide\b").expect("valid self-harm regex"),
    ]
});

#[cfg(test)]
mod tests {
    use super::{SELF_HARM_RES, SLUR_RE, URL_RE};

    #[test]
    fn url_pattern_is_scheme_agnostic() {
        assert_eq!(URL_RE.find_iter("https://a.x http://b.y ftp://c.z").count(), 3);
        assert_eq!(URL_RE.find_iter("no links at all").count(), 0);
    }

    #[test]
    fn slur_pattern_tolerates_obfuscation() {
        assert!(SLUR_RE.is_match("n1gg3r"));
        assert!(SLUR_RE.is_match("niiggers"));
        assert!(!SLUR_RE.is_match("trigger"));
    }

    #[test]
    fn self_harm_patterns_match_variants() {
        assert!(SELF_HARM_RES.iter().any(|re| re.is_match("k!ll urself")));
        assert!(SELF_HARM_RES.iter().any(|re| re.is_match("go commit suicide")));
        assert!(!SELF_HARM_RES.iter().any(|re| re.is_match("kill the boss")));
    }
}
