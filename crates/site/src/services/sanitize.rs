//! Plain-text sanitization for visitor-submitted text.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("Invalid regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Reduce submitted text to plain text.
///
/// Script and style blocks are dropped with their contents, every other tag is
/// replaced by a space, whitespace runs collapse to one space and the result is
/// trimmed. Applying it twice gives the same result as applying it once.
///
/// ```
/// use redline_site::services::sanitize::sanitize;
///
/// assert_eq!(sanitize("<p>Nice <b>build</b></p><script>alert(1)</script>"), "Nice build");
/// ```
#[must_use]
pub fn sanitize(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK_RE.replace_all(input, "");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    WHITESPACE_RE
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_script_blocks_with_content() {
        assert_eq!(
            sanitize("before<script type=\"text/javascript\">steal()</script>after"),
            "beforeafter"
        );
        assert_eq!(sanitize("<SCRIPT>\nx()\n</SCRIPT >ok"), "ok");
    }

    #[test]
    fn test_strips_tags_and_collapses_whitespace() {
        assert_eq!(
            sanitize("  <p>Line one</p>\n\n<p>Line   two</p>  "),
            "Line one Line two"
        );
        assert_eq!(sanitize("a<br>b"), "a b");
    }

    #[test]
    fn test_keeps_plain_text_and_lone_brackets() {
        assert_eq!(sanitize("boost > 20psi"), "boost > 20psi");
        assert_eq!(sanitize("3 < 4"), "3 < 4");
    }

    #[test]
    fn test_is_idempotent() {
        let inputs = [
            "<scr<script></script>ipt>alert(1)</script>",
            "<<a>b>",
            "a < b > c",
            "<img src=x onerror=alert(1)//",
            "  mixed\t<i>tags</i>\r\nand   space ",
            "<style>p{}</style><p>x</p>",
            "",
            "plain",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
        }
    }
}
