use std::sync::LazyLock;

use regex::Regex;

const ZERO_WIDTH_SPACE: char = '\u{200b}';

static USER_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?(\d+)>").expect("valid user mention regex"));
static CHANNEL_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#(\d+)>").expect("valid channel mention regex"));
static ROLE_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@&(\d+)>").expect("valid role mention regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid link regex"));

/// Neutralize every mention form so relayed text can never ping anyone.
///
/// A zero-width space is inserted after the trigger character, which keeps
/// the text readable while breaking Discord's mention parsing.
pub fn sanitize_mentions(text: &str) -> String {
    let text = text.replace("@everyone", &format!("@{ZERO_WIDTH_SPACE}everyone"));
    let text = text.replace("@here", &format!("@{ZERO_WIDTH_SPACE}here"));
    let text = USER_MENTION_RE.replace_all(&text, format!("<@{ZERO_WIDTH_SPACE}$1"));
    let text = CHANNEL_MENTION_RE.replace_all(&text, format!("<#{ZERO_WIDTH_SPACE}$1"));
    ROLE_MENTION_RE
        .replace_all(&text, format!("<@&{ZERO_WIDTH_SPACE}$1"))
        .into_owned()
}

/// Replace every http(s) URL with a removal marker.
pub fn strip_links(text: &str) -> String {
    LINK_RE.replace_all(text, "[link removed]").into_owned()
}

/// Count http(s) URLs in a piece of text.
pub fn count_links(text: &str) -> usize {
    LINK_RE.find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::{count_links, sanitize_mentions, strip_links};

    #[test]
    fn neutralizes_everyone_and_here() {
        let out = sanitize_mentions("hey @everyone and @here");
        assert!(!out.contains("@everyone"));
        assert!(!out.contains("@here"));
        assert!(out.contains("everyone"));
    }

    #[test]
    fn neutralizes_user_and_role_mentions() {
        let out = sanitize_mentions("<@123> <@!456> <@&789> <#101>");
        assert!(!out.contains("<@123>"));
        assert!(!out.contains("<@!456>"));
        assert!(!out.contains("<@&789>"));
        assert!(!out.contains("<#101>"));
        assert!(out.contains("123"));
    }

    #[test]
    fn strips_and_counts_links() {
        let text = "see https://a.example/x and http://b.example";
        assert_eq!(count_links(text), 2);
        let stripped = strip_links(text);
        assert!(!stripped.contains("http"));
        assert_eq!(stripped.matches("[link removed]").count(), 2);
    }

    #[test]
    fn plain_text_untouched() {
        assert_eq!(sanitize_mentions("hello world"), "hello world");
        assert_eq!(count_links("no links here"), 0);
    }
}
