//! Pure Markdown escaping utilities.

/// Escape characters with special Markdown meaning so literal text renders
/// as written: emphasis markers, brackets, backticks, pipes, angle brackets,
/// leading `#`, and `!` when it would start an image.
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    let mut chars = text.chars().peekable();
    let mut at_line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '\\' => result.push_str("\\\\"),
            '*' | '_' | '[' | ']' | '`' | '|' | '<' | '>' | '$' => {
                result.push('\\');
                result.push(c);
            }
            '#' if at_line_start => {
                result.push('\\');
                result.push(c);
            }
            '!' if chars.peek() == Some(&'[') => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
        at_line_start = c == '\n';
    }

    result
}

/// Remove backslash escapes, the inverse of [`escape_markdown`].
pub fn unescape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => result.push(next),
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Smallest fence length (at least 3) not appearing as a run in the content.
pub fn fence_length(content: &str, fence_char: char) -> usize {
    longest_run(content, fence_char).max(2) + 1
}

/// Smallest backtick count (at least 1) not appearing as a run in the content.
pub fn inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}

fn longest_run(content: &str, target: char) -> usize {
    let mut max_run = 0;
    let mut current_run = 0;
    for c in content.chars() {
        if c == target {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }
    max_run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_emphasis_and_brackets() {
        assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
        assert_eq!(escape_markdown("[link]"), "\\[link\\]");
        assert_eq!(escape_markdown("a|b"), "a\\|b");
    }

    #[test]
    fn test_escape_heading_only_at_line_start() {
        assert_eq!(escape_markdown("# heading"), "\\# heading");
        assert_eq!(escape_markdown("not # heading"), "not # heading");
    }

    #[test]
    fn test_escape_image_bang() {
        assert_eq!(escape_markdown("![alt]"), "\\!\\[alt\\]");
        assert_eq!(escape_markdown("! plain"), "! plain");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        let original = "text with *stars* and [brackets] and \\slashes";
        assert_eq!(unescape_markdown(&escape_markdown(original)), original);
    }

    #[test]
    fn test_fence_length_grows_past_content() {
        assert_eq!(fence_length("let x = 1;", '`'), 3);
        assert_eq!(fence_length("```nested```", '`'), 4);
    }

    #[test]
    fn test_inline_code_ticks() {
        assert_eq!(inline_code_ticks("plain"), 1);
        assert_eq!(inline_code_ticks("a ` b"), 2);
    }
}
