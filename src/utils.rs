// src/utils.rs
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex");
    static ref UNDERLINE_BOLD: Regex = Regex::new(r"__(.+?)__").expect("valid bold regex");
    static ref ITALIC: Regex = Regex::new(r"\*([^*\s][^*]*?)\*").expect("valid italic regex");
}

/// Replace tab, newline and carriage return with a space so a value can sit
/// in one TSV cell. Applying it twice changes nothing.
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// Collapse every whitespace run (including newlines) to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `**bold**`, `__bold__` and `*italic*` markers, keeping the inner text.
pub fn strip_markdown_emphasis(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    let text = UNDERLINE_BOLD.replace_all(&text, "$1");
    ITALIC.replace_all(&text, "$1").into_owned()
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_field() {
        assert_eq!(sanitize_field("a\tb\nc\r"), "a b c ");
        assert_eq!(sanitize_field("plain"), "plain");
    }

    #[test]
    fn test_sanitize_field_is_idempotent() {
        let inputs = ["\t\t", "x\ny", "no tabs", "\r\n mixed \t"];
        for input in inputs {
            let once = sanitize_field(input);
            assert_eq!(sanitize_field(&once), once);
            assert!(!once.contains('\t') && !once.contains('\n'));
        }
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  led \n\n  the   team "), "led the team");
        assert_eq!(collapse_whitespace("\n\t"), "");
    }

    #[test]
    fn test_strip_markdown_emphasis() {
        assert_eq!(
            strip_markdown_emphasis("**Best Fit Position:** Chairman"),
            "Best Fit Position: Chairman"
        );
        assert_eq!(strip_markdown_emphasis("a *very* __strong__ fit"), "a very strong fit");
        assert_eq!(strip_markdown_emphasis("3 * 4 = 12"), "3 * 4 = 12");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk-ant-123456"), "*********3456");
        assert_eq!(mask_secret("abc"), "***");
    }
}
