/// Default cap on generated file names, in characters
pub const DEFAULT_MAX_NAME_LENGTH: usize = 120;

/// Characters that are unsafe in file names on Android shared storage
const UNSAFE: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Make a title usable as a file name.
///
/// Unsafe and control characters become spaces, runs of whitespace collapse to a
/// single space, leading/trailing spaces and dots are trimmed, and the result is
/// cut to `max_chars` characters.
pub fn sanitize_title(title: &str, max_chars: usize) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if UNSAFE.contains(&c) || c.is_control() { ' ' } else { c })
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c == ' ');

    let truncated: String = trimmed.chars().take(max_chars).collect();
    truncated.trim_end_matches(|c: char| c == '.' || c == ' ').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_unsafe_characters() {
        assert_eq!(sanitize_title("AC/DC: Live?", 120), "AC DC Live");
        assert_eq!(sanitize_title("a<b>c|d\"e*f\\g", 120), "a b c d e f g");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(sanitize_title("  Intro \t\n  part   one ", 120), "Intro part one");
    }

    #[test]
    fn test_trims_dots() {
        assert_eq!(sanitize_title("...hidden.", 120), "hidden");
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        assert_eq!(sanitize_title("Глава первая", 5), "Глава");
        assert_eq!(sanitize_title("abc def", 4), "abc");
    }

    #[test]
    fn test_empty_when_nothing_usable() {
        assert_eq!(sanitize_title("???", 120), "");
    }
}
