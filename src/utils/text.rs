//! Text helpers for program output handling

/// Trim trailing whitespace. Sandbox output and expected test case output are
/// both normalized this way before comparison; leading whitespace is
/// significant and preserved.
pub fn trim_trailing_whitespace(s: &str) -> &str {
    s.trim_end()
}

/// Byte equality after trailing-whitespace normalization on both sides
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    trim_trailing_whitespace(actual) == trim_trailing_whitespace(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("3\n"), "3");
        assert_eq!(trim_trailing_whitespace("3 \t\r\n"), "3");
        assert_eq!(trim_trailing_whitespace("  3"), "  3");
        assert_eq!(trim_trailing_whitespace(""), "");
    }

    #[test]
    fn test_outputs_match() {
        assert!(outputs_match("3\n", "3"));
        assert!(outputs_match("a b\nc d\n", "a b\nc d"));
        assert!(!outputs_match("3", "30"));
        // Interior whitespace is significant
        assert!(!outputs_match("a  b", "a b"));
        // Leading whitespace is significant
        assert!(!outputs_match(" 3", "3"));
    }
}
