use rand::seq::SliceRandom;

/// Tone category for persona-styled lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Success,
    Info,
    Warning,
    Error,
    Default,
}

/// Wrap a message in one of the bot's persona phrasings for the given tone.
///
/// The pools keep user-facing text varied without changing its meaning; the
/// payload is always embedded verbatim.
pub fn persona_line(text: &str, tone: Tone) -> String {
    let pool: &[&str] = match tone {
        Tone::Success => &[
            "Mission accomplished: {}",
            "Objective complete. {}",
            "Done. {}",
        ],
        Tone::Info => &["Update: {}", "Noted. {}", "Acknowledged: {}"],
        Tone::Warning => &["Advisory: {}", "Heads up: {}", "Warning issued: {}"],
        Tone::Error => &[
            "Error detected: {}",
            "Minor malfunction: {}",
            "Negative. {}",
        ],
        Tone::Default => &["{}", "Affirmative. {}", "Understood: {}"],
    };

    let template = pool
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("{}");
    template.replacen("{}", text, 1)
}

/// Fixed in-character line used whenever an AI-gated response cannot be
/// produced (breaker open, dependency failure, sanitization veto).
pub const DEGRADED_MODE_LINE: &str = "Apologies, my humor subroutines are temporarily offline.";

#[cfg(test)]
mod tests {
    use super::{Tone, persona_line};

    #[test]
    fn payload_always_embedded() {
        for tone in [
            Tone::Success,
            Tone::Info,
            Tone::Warning,
            Tone::Error,
            Tone::Default,
        ] {
            let line = persona_line("systems nominal", tone);
            assert!(line.contains("systems nominal"), "missing payload: {line}");
        }
    }

    #[test]
    fn template_placeholder_is_consumed() {
        let line = persona_line("ok", Tone::Info);
        assert!(!line.contains("{}"));
    }
}
