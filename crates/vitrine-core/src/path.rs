//! Canonical form for bundle-relative file references.
//!
//! Storage keys, manifest values, HTML attribute values, and explicit entry
//! overrides all pass through [`normalize_path`] before they are compared.

/// Normalizes a bundle-relative reference.
///
/// Backslashes become forward slashes, everything from the first `?` is
/// dropped, and leading `./` and `/` prefixes are stripped. Stripping repeats
/// until no prefix remains, so the result is a fixed point.
pub fn normalize_path(raw: &str) -> String {
    let slashed = raw.replace('\\', "/");
    let without_query = match slashed.find('?') {
        Some(index) => &slashed[..index],
        None => slashed.as_str(),
    };

    let mut trimmed = without_query;
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        } else {
            break;
        }
    }
    trimmed.to_string()
}

/// Returns the last `/`-separated segment of a normalized path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Number of directory separators in a normalized path; `index.html` is 0.
pub fn path_depth(path: &str) -> usize {
    path.matches('/').count()
}

/// Returns the directory part of a normalized path without a trailing slash.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

/// True for `.html` / `.htm` file names, ignoring ASCII case.
pub fn is_html_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Joins a storage prefix and a child segment with exactly one `/`.
pub fn join_storage_path(prefix: &str, child: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    if prefix.is_empty() {
        return child.to_string();
    }
    if child.is_empty() {
        return prefix.to_string();
    }
    format!("{prefix}/{child}")
}
