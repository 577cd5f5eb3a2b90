//! Whitespace helpers shared by extraction and the summarizer front-ends

use once_cell::sync::Lazy;
use regex::Regex;

static ANY_WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex compiles"));

static INLINE_WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("inline whitespace regex compiles"));

static WHITESPACE_BEFORE_NEWLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\n").expect("newline regex compiles"));

/// Number of whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse every whitespace run (newlines included) to a single space.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    ANY_WHITESPACE_RE.replace_all(text, " ").into_owned()
}

/// Collapse spaces and tabs but keep line structure: runs of blank lines and
/// trailing spaces fold into one newline.
#[must_use]
pub fn tidy_lines(text: &str) -> String {
    let inline = INLINE_WHITESPACE_RE.replace_all(text, " ");
    WHITESPACE_BEFORE_NEWLINE_RE
        .replace_all(&inline, "\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_across_any_whitespace() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  one\ttwo\n\nthree  "), 3);
    }

    #[test]
    fn collapse_whitespace_flattens_newlines() {
        assert_eq!(collapse_whitespace("a \n\n b\t\tc"), "a b c");
    }

    #[test]
    fn tidy_lines_keeps_paragraph_breaks() {
        let raw = "  First   line \t\n\n\nSecond\tline  \n";
        assert_eq!(tidy_lines(raw), "First line\nSecond line");
    }
}
