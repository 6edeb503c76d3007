/// Shown under every error message.
pub const ERROR_LOG_HINT: &str = "Check the console logs for more details.";

/// Fixed, self-contained error document injected in place of bundle content.
///
/// Needs no network access, so it renders even when every fetch is failing.
pub fn render_error_document(message: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Preview unavailable</title></head>
<body style="margin:0;font-family:system-ui,sans-serif;background:#fff8f0;color:#7a2e0e">
<div class="vitrine-error" role="alert" style="display:flex;flex-direction:column;align-items:center;justify-content:center;min-height:100vh;padding:16px;box-sizing:border-box;text-align:center">
<div class="vitrine-error-icon" aria-hidden="true" style="font-size:40px">&#9888;&#65039;</div>
<p class="vitrine-error-message" style="font-weight:600;margin:12px 0 4px">{message}</p>
<p class="vitrine-error-hint" style="font-size:12px;opacity:0.8;margin:0">{hint}</p>
</div>
</body></html>
"##,
        message = escape_html(message),
        hint = ERROR_LOG_HINT,
    )
}

/// Escapes text for HTML element content and double-quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_error_document_contains_icon_message_and_hint() {
        let document = render_error_document("No entry point found");
        assert!(document.contains("&#9888;"));
        assert!(document.contains(">No entry point found</p>"));
        assert!(document.contains(ERROR_LOG_HINT));
        assert!(!document.contains("<script"));
    }

    #[test]
    fn regression_error_message_is_escaped() {
        let document = render_error_document("<script>alert('x')</script>");
        assert!(document.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(!document.contains("<script>"));
    }
}
