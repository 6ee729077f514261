//! Plain-text conversion of rendered HTML fragments.

use std::sync::LazyLock;

use regex::Regex;

/// Matches any tag.
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

/// Matches a newline followed by whitespace-only lines.
static BLANK_LINES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("Invalid blank line regex"));

/// Tags that end a line of text.
const LINE_BREAK_TAGS: [&str; 4] = ["</p>", "<br>", "<br/>", "<br />"];

/// Converts a rendered HTML fragment into plain text.
///
/// Paragraph ends and line breaks become newlines, every other tag is dropped,
/// blank lines collapse, surrounding newlines are trimmed and entities are
/// decoded last.
pub fn strip_html(html: &str) -> String {
    let mut text = html.to_string();
    for tag in LINE_BREAK_TAGS {
        text = text.replace(tag, "\n");
    }

    let text = TAG_REGEX.replace_all(&text, "");
    let text = BLANK_LINES_REGEX.replace_all(&text, "\n");
    let text = text.trim_matches('\n');

    html_escape::decode_html_entities(text).into_owned()
}

/// Decodes HTML entities without touching markup.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_become_lines() {
        assert_eq!(strip_html("<p>Hello</p><p>World</p>"), "Hello\nWorld");
    }

    #[test]
    fn line_break_variants() {
        assert_eq!(strip_html("a<br>b<br/>c<br />d"), "a\nb\nc\nd");
    }

    #[test]
    fn blank_lines_collapse() {
        assert_eq!(strip_html("<p>One</p>\n\n<p>Two</p>\n"), "One\nTwo");
        assert_eq!(strip_html("One\n  \n\t\nTwo"), "One\nTwo");
    }

    #[test]
    fn other_tags_are_removed() {
        assert_eq!(
            strip_html(r#"<p>Meet at <a href="https://example.org">the hall</a></p>"#),
            "Meet at the hall"
        );
        assert_eq!(strip_html("<strong>bold</strong> <em>text</em>"), "bold text");
    }

    #[test]
    fn entities_are_decoded_after_stripping() {
        assert_eq!(strip_html("<p>Fish &amp; Chips</p>"), "Fish & Chips");
        // An escaped tag must survive as text.
        assert_eq!(strip_html("&lt;b&gt;kept&lt;/b&gt;"), "<b>kept</b>");
        assert_eq!(strip_html("Caf&#233; &#8211; open"), "Café – open");
    }

    #[test]
    fn leading_and_trailing_newlines_trimmed() {
        assert_eq!(strip_html("\n\n<p>Body</p>\n"), "Body");
    }

    #[test]
    fn empty_input() {
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("<p></p>"), "");
    }

    #[test]
    fn decode_entities_keeps_markup() {
        assert_eq!(decode_entities("A &amp; B <i>x</i>"), "A & B <i>x</i>");
    }
}
