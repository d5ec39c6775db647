//! Small helpers shared across modules.

use std::borrow::Cow;

/// Expand a leading `~` to `$HOME`, used for database paths.
///
/// - `"~"` → `"/home/user"`
/// - `"~/warbler.db"` → `"/home/user/warbler.db"`
/// - Anything else passes through unchanged.
pub fn expand_tilde(path: &str) -> Cow<'_, str> {
    match (path.strip_prefix('~'), std::env::var("HOME")) {
        (Some(rest), Ok(home)) if rest.is_empty() || rest.starts_with('/') => {
            Cow::Owned(format!("{home}{rest}"))
        }
        _ => Cow::Borrowed(path),
    }
}

/// One-line preview of user text for log lines, capped at `max` chars.
pub fn preview(text: &str, max: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() <= max {
        return cleaned;
    }
    let mut short: String = cleaned.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_passthrough() {
        assert_eq!(expand_tilde("/var/lib/warbler.db"), "/var/lib/warbler.db");
        assert_eq!(expand_tilde("~other/db"), "~other/db");
    }

    #[test]
    fn test_preview_collapses_and_truncates() {
        assert_eq!(preview("hello\n  world", 20), "hello world");
        assert_eq!(preview("abcdefghij", 6), "abc...");
    }
}
