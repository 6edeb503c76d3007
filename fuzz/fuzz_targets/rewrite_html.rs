#![no_main]

use libfuzzer_sys::fuzz_target;
use vitrine_core::FileMap;
use vitrine_render::{is_absolute_reference, rewrite_html_with_report};

fuzz_target!(|data: &[u8]| {
    let reference = String::from_utf8_lossy(data).replace(['"', '\''], "");
    let map = FileMap::from_entries([
        ("index.html", "https://cdn.test/index"),
        ("css/site.css", "https://cdn.test/site"),
    ]);
    let html = format!(r#"<img src="{reference}"><a href='{reference}'>x</a>"#);
    let (output, report) = rewrite_html_with_report(&html, &map);
    if reference.is_empty() {
        assert_eq!(output, html);
        return;
    }
    if is_absolute_reference(&reference) {
        assert_eq!(output, html);
        assert_eq!(report.absolute, 2);
    } else {
        assert_eq!(report.rewritten + report.unresolved.len(), 2);
    }
});
