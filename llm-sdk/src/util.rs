//! Utility module for common functionality

use std::time::Instant;

/// Truncate a string to at most `max_chars` characters, adding an ellipsis if truncated
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }

    let mut truncated: String = s.chars().take(max_chars - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Milliseconds elapsed since `start`
pub fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 2), "hi");
        assert_eq!(truncate_string("perché così", 7), "perc...");
    }
}
