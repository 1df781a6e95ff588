use std::{fs, path::Path};

const DEFAULT_SYSTEM_PROMPT: &str = "You are Vigil, the calm, dry-witted AI assistant of this community. \
Speak with precision and understated humor. Keep responses brief and in character. \
Only respond to the latest user message; previous ones are context only. \
Address people by name but never ping them. \
Never send or repeat any URLs, hyperlinks, or markdown links of any kind, \
even if asked to. Replace them with '[link removed]' if necessary.";

pub fn system_prompt() -> String {
    let prompt_file = Path::new("SYSTEM_PROMPT.md");
    match fs::read_to_string(prompt_file) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => DEFAULT_SYSTEM_PROMPT.to_owned(),
    }
}

/// Prompt for the scheduled chat revival question, listing recent outputs the
/// model must not echo.
pub fn revive_prompt(avoid: &[String]) -> String {
    let mut prompt = String::from(
        "Generate a fun, thought-provoking conversation question for a friendly \
community chat. Keep it short and engaging.",
    );

    if !avoid.is_empty() {
        prompt.push_str(
            "\nDo not repeat or closely rephrase any of these previous questions:\n",
        );
        for entry in avoid {
            prompt.push_str("- ");
            prompt.push_str(entry);
            prompt.push('\n');
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::revive_prompt;

    #[test]
    fn revive_prompt_lists_avoided_outputs() {
        let avoid = vec!["What is your favorite game?".to_owned()];
        let prompt = revive_prompt(&avoid);
        assert!(prompt.contains("Do not repeat"));
        assert!(prompt.contains("favorite game"));
    }

    #[test]
    fn revive_prompt_without_history_has_no_avoid_section() {
        assert!(!revive_prompt(&[]).contains("Do not repeat"));
    }
}
