//! Ordered, first-match-wins battery of spam/abuse checks.
//!
//! Exactly one rule fires per message: the battery is iterated in a fixed
//! order and evaluation stops at the first match, so a single message is
//! never punished twice.

pub mod patterns;

use rand::seq::SliceRandom;

use patterns::{SELF_HARM_RES, SLUR_RE, URL_RE};

/// Oversize thresholds.
const MAX_LINE_BREAKS: usize = 10;
const MAX_CHARS: usize = 500;
/// Maximum protected-role mentions per message.
const MAX_PROTECTED_PINGS: usize = 4;
/// Maximum URL-like tokens per message.
const MAX_LINKS: usize = 2;
/// Minimum identical messages in the window for repetition spam.
const MIN_REPEATS: usize = 3;

/// Everything a rule may inspect for one message.
pub struct RuleInput<'a> {
    pub text: &'a str,
    /// The author's sliding window (≤6 texts, oldest first, current included).
    pub history: &'a [String],
    /// Lowercased banned words from configuration.
    pub banned_words: &'a [String],
    pub ping_protected_roles: &'a [u64],
    /// Lowercased drug-reference keywords.
    pub drug_keywords: &'a [String],
}

/// The verdict a triggered rule hands to the dispatcher.
#[derive(Clone, Debug)]
pub struct Violation {
    /// Stable rule identifier for audit records.
    pub rule: &'static str,
    /// Human-readable reason, may embed the matched token.
    pub reason: String,
    /// Channel-facing notice body.
    pub channel_notice: String,
    /// Direct-message body; the dispatcher prefixes the warning label.
    pub direct_notice: String,
    pub delete_message: bool,
    /// Standalone reaction line: no author mention, no warning label.
    pub impersonal_reaction: bool,
    /// DM must carry safety-resource guidance.
    pub include_safety_resources: bool,
}

/// A single stateless check in the ordered battery.
pub trait HeuristicRule: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation>;
}

/// Build the battery in its fixed evaluation order.
pub fn build_rules() -> Vec<Box<dyn HeuristicRule>> {
    vec![
        Box::new(BannedWordRule),
        Box::new(OversizeRule),
        Box::new(RolePingRule),
        Box::new(RepeatRule),
        Box::new(LinkFloodRule),
        Box::new(SlurRule),
        Box::new(SelfHarmRule),
        Box::new(DrugReferenceRule),
    ]
}

/// Run the battery; returns the first violation, if any.
pub fn evaluate(rules: &[Box<dyn HeuristicRule>], input: &RuleInput<'_>) -> Option<Violation> {
    rules.iter().find_map(|rule| rule.evaluate(input))
}

#[derive(Debug)]
struct BannedWordRule;

impl HeuristicRule for BannedWordRule {
    fn name(&self) -> &'static str {
        "banned_word"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation> {
        let lowered = input.text.to_lowercase();
        // Word-boundary comparison on alphanumeric tokens so "fag" does not
        // match inside "leafage".
        let matched = input.banned_words.iter().find(|word| {
            lowered
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| token == word.as_str())
        })?;

        Some(Violation {
            rule: self.name(),
            reason: format!("Use of banned word: {matched}"),
            channel_notice: "watch your language.".to_owned(),
            direct_notice: format!("Use of banned word ('{matched}'). Message deleted."),
            delete_message: true,
            impersonal_reaction: false,
            include_safety_resources: false,
        })
    }
}

#[derive(Debug)]
struct OversizeRule;

impl HeuristicRule for OversizeRule {
    fn name(&self) -> &'static str {
        "oversized_content"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation> {
        let line_breaks = input.text.matches('\n').count();
        let chars = input.text.chars().count();
        if line_breaks <= MAX_LINE_BREAKS && chars <= MAX_CHARS {
            return None;
        }

        Some(Violation {
            rule: self.name(),
            reason: format!("Text wall / spam ({chars} chars, {line_breaks} line breaks)"),
            channel_notice: "sending large text walls or spam is prohibited.".to_owned(),
            direct_notice: "Text wall or spam detected.".to_owned(),
            delete_message: false,
            impersonal_reaction: false,
            include_safety_resources: false,
        })
    }
}

#[derive(Debug)]
struct RolePingRule;

impl HeuristicRule for RolePingRule {
    fn name(&self) -> &'static str {
        "excessive_role_pings"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation> {
        let ping_count: usize = input
            .ping_protected_roles
            .iter()
            .map(|role| input.text.matches(&format!("<@&{role}>")).count())
            .sum();
        if ping_count <= MAX_PROTECTED_PINGS {
            return None;
        }

        Some(Violation {
            rule: self.name(),
            reason: format!("Excessive staff pinging ({ping_count} mentions)"),
            channel_notice: "excessive staff pinging is not allowed.".to_owned(),
            direct_notice: "Excessive staff pinging.".to_owned(),
            delete_message: false,
            impersonal_reaction: false,
            include_safety_resources: false,
        })
    }
}

#[derive(Debug)]
struct RepeatRule;

impl HeuristicRule for RepeatRule {
    fn name(&self) -> &'static str {
        "repeated_messages"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation> {
        if input.history.len() < MIN_REPEATS {
            return None;
        }
        let first = &input.history[0];
        if !input.history.iter().all(|entry| entry == first) {
            return None;
        }

        Some(Violation {
            rule: self.name(),
            reason: "Repeated message spam".to_owned(),
            channel_notice: "repeated messages detected.".to_owned(),
            direct_notice: "Repeated message spam.".to_owned(),
            delete_message: false,
            impersonal_reaction: false,
            include_safety_resources: false,
        })
    }
}

#[derive(Debug)]
struct LinkFloodRule;

impl HeuristicRule for LinkFloodRule {
    fn name(&self) -> &'static str {
        "link_flood"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation> {
        let links = URL_RE.find_iter(input.text).count();
        if links <= MAX_LINKS {
            return None;
        }

        Some(Violation {
            rule: self.name(),
            reason: format!("Link spam ({links} links)"),
            channel_notice: "excessive links detected.".to_owned(),
            direct_notice: "Excessive link posting.".to_owned(),
            delete_message: false,
            impersonal_reaction: false,
            include_safety_resources: false,
        })
    }
}

#[derive(Debug)]
struct SlurRule;

impl HeuristicRule for SlurRule {
    fn name(&self) -> &'static str {
        "prohibited_slur"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation> {
        if !SLUR_RE.is_match(input.text) {
            return None;
        }

        let reactions = [
            "Interesting choice of words. Not recommended.",
            "Attempting human chaos detected. Deleting.",
        ];
        let reaction = reactions
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(reactions[0]);

        Some(Violation {
            rule: self.name(),
            reason: "Prohibited slur".to_owned(),
            channel_notice: reaction.to_owned(),
            direct_notice: "Use of a prohibited slur.".to_owned(),
            delete_message: true,
            impersonal_reaction: true,
            include_safety_resources: false,
        })
    }
}

#[derive(Debug)]
struct SelfHarmRule;

impl HeuristicRule for SelfHarmRule {
    fn name(&self) -> &'static str {
        "self_harm_encouragement"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation> {
        if !SELF_HARM_RES.iter().any(|re| re.is_match(input.text)) {
            return None;
        }

        let reactions = [
            "Protocol violation. That's a negative.",
            "Error detected: inappropriate content. Executing deletion.",
        ];
        let reaction = reactions
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(reactions[0]);

        Some(Violation {
            rule: self.name(),
            reason: "Self-harm encouragement".to_owned(),
            channel_notice: reaction.to_owned(),
            direct_notice: "Promoting self-harm is prohibited.".to_owned(),
            delete_message: true,
            impersonal_reaction: true,
            include_safety_resources: true,
        })
    }
}

#[derive(Debug)]
struct DrugReferenceRule;

impl HeuristicRule for DrugReferenceRule {
    fn name(&self) -> &'static str {
        "drug_reference"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Violation> {
        let lowered = input.text.to_lowercase();
        // Plain substring match by design; no word boundary.
        if !input
            .drug_keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
        {
            return None;
        }

        Some(Violation {
            rule: self.name(),
            reason: "Drug mention".to_owned(),
            channel_notice: "discussion of drugs is prohibited.".to_owned(),
            direct_notice: "Discussion of drugs is prohibited.".to_owned(),
            delete_message: false,
            impersonal_reaction: false,
            include_safety_resources: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{RuleInput, build_rules, evaluate};

    fn owned(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_owned()).collect()
    }

    fn input<'a>(
        text: &'a str,
        history: &'a [String],
        banned: &'a [String],
        protected: &'a [u64],
        drugs: &'a [String],
    ) -> RuleInput<'a> {
        RuleInput {
            text,
            history,
            banned_words: banned,
            ping_protected_roles: protected,
            drug_keywords: drugs,
        }
    }

    #[test]
    fn banned_word_matches_whole_tokens_only() {
        let rules = build_rules();
        let banned = owned(&["fag"]);
        let hit = evaluate(&rules, &input("you fag", &[], &banned, &[], &[]));
        assert_eq!(hit.unwrap().rule, "banned_word");

        let miss = evaluate(&rules, &input("nice leafage", &[], &banned, &[], &[]));
        assert!(miss.is_none());
    }

    #[test]
    fn banned_word_reason_carries_matched_word() {
        let rules = build_rules();
        let banned = owned(&["kys"]);
        let violation = evaluate(&rules, &input("KYS now", &[], &banned, &[], &[])).unwrap();
        assert!(violation.reason.contains("kys"));
        assert!(violation.delete_message);
    }

    #[test]
    fn oversize_boundaries() {
        let rules = build_rules();
        let exactly_500 = "a".repeat(500);
        assert!(evaluate(&rules, &input(&exactly_500, &[], &[], &[], &[])).is_none());

        let over_500 = "a".repeat(501);
        let hit = evaluate(&rules, &input(&over_500, &[], &[], &[], &[])).unwrap();
        assert_eq!(hit.rule, "oversized_content");

        let ten_breaks = "x\n".repeat(10);
        assert!(evaluate(&rules, &input(&ten_breaks, &[], &[], &[], &[])).is_none());

        let eleven_breaks = "x\n".repeat(11);
        let hit = evaluate(&rules, &input(&eleven_breaks, &[], &[], &[], &[])).unwrap();
        assert_eq!(hit.rule, "oversized_content");
    }

    #[test]
    fn role_ping_counts_across_protected_roles() {
        let rules = build_rules();
        let protected = [10u64, 20u64];
        let four = "<@&10> <@&10> <@&20> <@&20>";
        assert!(evaluate(&rules, &input(four, &[], &[], &protected, &[])).is_none());

        let five = "<@&10> <@&10> <@&10> <@&20> <@&20>";
        let hit = evaluate(&rules, &input(five, &[], &[], &protected, &[])).unwrap();
        assert_eq!(hit.rule, "excessive_role_pings");

        // Unprotected roles never count.
        let unprotected = "<@&99> <@&99> <@&99> <@&99> <@&99>";
        assert!(evaluate(&rules, &input(unprotected, &[], &[], &protected, &[])).is_none());
    }

    #[test]
    fn repetition_requires_three_identical() {
        let rules = build_rules();
        let two = owned(&["hi", "hi"]);
        assert!(evaluate(&rules, &input("hi", &two, &[], &[], &[])).is_none());

        let three = owned(&["hi", "hi", "hi"]);
        let hit = evaluate(&rules, &input("hi", &three, &[], &[], &[])).unwrap();
        assert_eq!(hit.rule, "repeated_messages");

        let mixed = owned(&["hi", "hi", "yo"]);
        assert!(evaluate(&rules, &input("yo", &mixed, &[], &[], &[])).is_none());
    }

    #[test]
    fn link_flood_fires_at_three_links() {
        let rules = build_rules();
        let two = "https://a.example http://b.example";
        assert!(evaluate(&rules, &input(two, &[], &[], &[], &[])).is_none());

        let three = "https://a.example http://b.example https://c.example";
        let hit = evaluate(&rules, &input(three, &[], &[], &[], &[])).unwrap();
        assert_eq!(hit.rule, "link_flood");
    }

    #[test]
    fn slur_rule_is_independent_of_banned_words() {
        let rules = build_rules();
        let hit = evaluate(&rules, &input("n1gg3r", &[], &[], &[], &[])).unwrap();
        assert_eq!(hit.rule, "prohibited_slur");
        assert!(hit.delete_message);
        assert!(hit.impersonal_reaction);
    }

    #[test]
    fn self_harm_rule_flags_safety_resources() {
        let rules = build_rules();
        let hit = evaluate(&rules, &input("go commit suicide", &[], &[], &[], &[])).unwrap();
        assert_eq!(hit.rule, "self_harm_encouragement");
        assert!(hit.include_safety_resources);
        assert!(hit.delete_message);
    }

    #[test]
    fn drug_rule_matches_substrings() {
        let rules = build_rules();
        let drugs = owned(&["meth"]);
        // Substring by design: "methods" contains "meth".
        let hit = evaluate(&rules, &input("methods", &[], &[], &[], &drugs)).unwrap();
        assert_eq!(hit.rule, "drug_reference");
    }

    #[test]
    fn first_match_wins_in_battery_order() {
        let rules = build_rules();
        let banned = owned(&["spamword"]);
        // Contains a banned word AND three links; banned word is earlier in
        // the battery, so it is the only rule that fires.
        let text = "spamword https://a.x https://b.x https://c.x";
        let hit = evaluate(&rules, &input(text, &[], &banned, &[], &[])).unwrap();
        assert_eq!(hit.rule, "banned_word");
    }

    #[test]
    fn clean_message_passes_every_rule() {
        let rules = build_rules();
        let banned = owned(&["spamword"]);
        let drugs = owned(&["meth"]);
        let history = owned(&["earlier", "different"]);
        let hit = evaluate(
            &rules,
            &input("a perfectly fine message", &history, &banned, &[5], &drugs),
        );
        assert!(hit.is_none());
    }
}
