//! Textual `href=` / `src=` rewriting against a [`FileMap`].
//!
//! This is a single regex pass, not a DOM parse. Quoted values that happen to
//! look like attributes inside inline `<script>` or `<style>` text are
//! rewritten too, as are `data-src=`-style attributes.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use vitrine_core::FileMap;

/// Counts from one rewrite pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub rewritten: usize,
    pub absolute: usize,
    pub unresolved: Vec<String>,
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\b(href|src)(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
            .expect("attribute pattern is a valid regex")
    })
}

/// True for values that must never be remapped: `http:`, `https:`,
/// protocol-relative `//`, and `data:` URIs.
pub fn is_absolute_reference(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("//")
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:")
}

pub fn rewrite_html(html: &str, file_map: &FileMap) -> String {
    rewrite_html_with_report(html, file_map).0
}

/// Rewrites bundle-relative `href`/`src` values to the URLs in `file_map`.
///
/// Unresolved references are left as written; a missing asset never fails the
/// document.
pub fn rewrite_html_with_report(html: &str, file_map: &FileMap) -> (String, RewriteReport) {
    let mut report = RewriteReport::default();
    let rewritten = attribute_pattern().replace_all(html, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let (value, quote) = match (caps.get(3), caps.get(4)) {
            (Some(value), _) => (value.as_str(), '"'),
            (None, Some(value)) => (value.as_str(), '\''),
            (None, None) => return whole.to_string(),
        };
        if value.is_empty() {
            return whole.to_string();
        }
        if is_absolute_reference(value) {
            report.absolute += 1;
            return whole.to_string();
        }
        match file_map.url_for(value) {
            Some(url) => {
                report.rewritten += 1;
                format!("{}{}{quote}{url}{quote}", &caps[1], &caps[2])
            }
            None => {
                report.unresolved.push(value.to_string());
                whole.to_string()
            }
        }
    });
    (rewritten.into_owned(), report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_map() -> FileMap {
        FileMap::from_entries([
            ("assets/style.css", "https://cdn.test/style?t=1"),
            ("js/app.js", "https://cdn.test/app?t=2"),
            ("img/logo.png", "https://cdn.test/logo?t=3"),
        ])
    }

    #[test]
    fn unit_absolute_and_data_references_stay_byte_identical() {
        let html = r#"<img src="https://x/y.png"><img SRC='data:image/png;base64,AAAA'><script src="//cdn/lib.js"></script><a href="HTTP://Example.com/style.css">x</a>"#;
        let (output, report) = rewrite_html_with_report(html, &bundle_map());
        assert_eq!(output, html);
        assert_eq!(report.absolute, 4);
        assert_eq!(report.rewritten, 0);
    }

    #[test]
    fn unit_basename_reference_matches_full_path_reference() {
        let html = r#"<link href="style.css"><link href="assets/style.css">"#;
        let output = rewrite_html(html, &bundle_map());
        assert_eq!(
            output,
            r#"<link href="https://cdn.test/style?t=1"><link href="https://cdn.test/style?t=1">"#
        );
    }

    #[test]
    fn functional_rewrites_mixed_case_attributes_and_quote_styles() {
        let html = "<script SRC='./js/app.js'></script>\n<img Src = \"/img/logo.png?v=9\">";
        let (output, report) = rewrite_html_with_report(html, &bundle_map());
        assert_eq!(
            output,
            "<script SRC='https://cdn.test/app?t=2'></script>\n<img Src = \"https://cdn.test/logo?t=3\">"
        );
        assert_eq!(report.rewritten, 2);
    }

    #[test]
    fn functional_unresolved_references_are_left_untouched() {
        let html = r##"<img src="missing.png"><a href="#top">top</a><a href="">empty</a>"##;
        let (output, report) = rewrite_html_with_report(html, &bundle_map());
        assert_eq!(output, html);
        assert_eq!(report.unresolved, vec!["missing.png".to_string(), "#top".to_string()]);
    }

    #[test]
    fn regression_malformed_fragments_are_not_reformatted() {
        let html = "<div><p>unclosed <img src=\"logo.png\" <b>";
        let output = rewrite_html(html, &bundle_map());
        assert_eq!(output, "<div><p>unclosed <img src=\"https://cdn.test/logo?t=3\" <b>");
    }

    #[test]
    fn regression_inline_script_text_matching_the_pattern_is_rewritten() {
        let html = r#"<script>el.innerHTML = '<img src="logo.png">';</script>"#;
        let output = rewrite_html(html, &bundle_map());
        assert!(output.contains("src=\"https://cdn.test/logo?t=3\""));
    }
}
