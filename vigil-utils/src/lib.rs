/// Shared formatting helpers (durations, warning labels).
pub mod formatting;
/// Categorized persona response pools for user-facing text.
pub mod persona;
/// Outbound text sanitization (mention neutralization, link stripping).
pub mod sanitize;
/// Shared time helpers.
pub mod time;
