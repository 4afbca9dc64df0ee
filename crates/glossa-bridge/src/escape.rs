//! Script-literal escaping for arguments interpolated into overlay calls.
//!
//! Every outbound command is a script expression with caller-supplied
//! strings spliced into single-quoted literals. The transform below is the
//! entire escaping contract: backslash first, then quotes, then the line
//! terminators a script literal cannot contain.

/// Escape a string for interpolation into a single-quoted script literal.
///
/// Replaces `\` `'` `"` `\n` `\r` U+2028 U+2029 with their escape
/// sequences and leaves every other character untouched.
pub fn escape_script_arg(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(escape_script_arg("hello world"), "hello world");
        assert_eq!(escape_script_arg(""), "");
    }

    #[test]
    fn escapes_backslash_before_quotes() {
        // A backslash already in the input must not merge with a following
        // quote's escape into a different sequence.
        assert_eq!(escape_script_arg("a\\b'c"), "a\\\\b\\'c");
    }

    #[test]
    fn escapes_each_special_character() {
        assert_eq!(escape_script_arg("\\"), "\\\\");
        assert_eq!(escape_script_arg("'"), "\\'");
        assert_eq!(escape_script_arg("\""), "\\\"");
        assert_eq!(escape_script_arg("\n"), "\\n");
        assert_eq!(escape_script_arg("\r"), "\\r");
        assert_eq!(escape_script_arg("\u{2028}"), "\\u2028");
        assert_eq!(escape_script_arg("\u{2029}"), "\\u2029");
    }

    #[test]
    fn escaped_output_cannot_terminate_a_quoted_literal() {
        let hostile = "x', evil(), '\ny\u{2028}";
        let escaped = escape_script_arg(hostile);
        // No unescaped quote and no raw line terminator may survive.
        let mut prev_backslash = false;
        for ch in escaped.chars() {
            if ch == '\'' {
                assert!(prev_backslash, "unescaped quote in {escaped:?}");
            }
            assert!(ch != '\n' && ch != '\r' && ch != '\u{2028}' && ch != '\u{2029}');
            prev_backslash = ch == '\\' && !prev_backslash;
        }
    }

    #[test]
    fn leaves_unicode_text_alone() {
        assert_eq!(escape_script_arg("déjà-vu 本"), "déjà-vu 本");
    }
}
