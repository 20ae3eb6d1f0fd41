use crate::{Result, TtsError};

/// Maximum characters handed to an engine before truncation
pub const MAX_TEXT_CHARS: usize = 5000;

/// Marker appended to truncated text
pub const ELLIPSIS: &str = "...";

pub(crate) const EMPTY_TEXT_MESSAGE: &str = "text cannot be empty";

/// Normalize user text before it is interpolated into engine arguments or scripts.
///
/// Double quotes become single quotes, newlines become `". "`, carriage returns
/// are dropped, tabs and whitespace runs collapse to a single space. Text
/// longer than [`MAX_TEXT_CHARS`] is cut and suffixed with [`ELLIPSIS`].
/// Lengths are counted in chars, so truncation never splits a code point.
pub fn sanitize(text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(TtsError::Validation(EMPTY_TEXT_MESSAGE.to_string()));
    }

    let replaced = text
        .replace('"', "'")
        .replace('\r', "")
        .replace('\n', ". ")
        .replace('\t', " ");
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > MAX_TEXT_CHARS {
        let mut truncated: String = collapsed.chars().take(MAX_TEXT_CHARS).collect();
        truncated.push_str(ELLIPSIS);
        return Ok(truncated);
    }
    Ok(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_blank_rejected() {
        for input in ["", "   ", "\n\t\r "] {
            let err = sanitize(input).unwrap_err();
            assert!(err.is_validation());
            assert_eq!(err.to_string(), "text cannot be empty");
        }
    }

    #[test]
    fn test_quotes_and_control_whitespace() {
        let out = sanitize("  Say \"hi\"\r\nto\tall   of  you  ").unwrap();
        assert_eq!(out, "Say 'hi'. to all of you");
    }

    #[test]
    fn test_long_text_is_truncated_with_marker() {
        let input = "a".repeat(MAX_TEXT_CHARS + 250);
        let out = sanitize(&input).unwrap();
        assert_eq!(out.chars().count(), MAX_TEXT_CHARS + ELLIPSIS.len());
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let input = "é".repeat(MAX_TEXT_CHARS + 1);
        let out = sanitize(&input).unwrap();
        assert_eq!(out.chars().count(), 5003);
        assert!(out.starts_with("éé"));
    }

    #[test]
    fn test_exact_limit_is_untouched() {
        let input = "b".repeat(MAX_TEXT_CHARS);
        assert_eq!(sanitize(&input).unwrap(), input);
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize(&format!("x \"y\"\n{}", "z".repeat(6000))).unwrap();
        let twice = sanitize(&once).unwrap();
        assert_eq!(once, twice);
    }
}
