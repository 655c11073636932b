//! Lexical remote path handling.
//!
//! Remote paths are plain strings separated by `/` whatever the local
//! platform uses. Nothing here touches a file system.

const SEPARATOR: char = '/';

/// Joins `name` onto `base` and normalizes the result.
///
/// An empty `base` and `"/"` both denote the root, so `join("", "a")` and
/// `join("/", "a")` are both `"/a"`. A relative `base` is treated as if it
/// started with `/`.
pub fn join(base: &str, name: &str) -> String {
    let base = if base == "/" { "" } else { base };

    let mut joined = String::with_capacity(base.len() + name.len() + 2);
    if !base.starts_with(SEPARATOR) {
        joined.push(SEPARATOR);
    }
    joined.push_str(base);
    joined.push(SEPARATOR);
    joined.push_str(name);

    normalize(&joined)
}

/// Collapses `.`, `..` and repeated separators.
///
/// The result is always absolute and has no trailing separator unless it is
/// the root itself. `..` above the root stays at the root.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                let _ = segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return SEPARATOR.to_string();
    }

    segments.iter().fold(String::new(), |mut acc, s| {
        acc.push(SEPARATOR);
        acc.push_str(s);
        acc
    })
}

/// Name of the last segment of `path`, empty for the root.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
        .rsplit(SEPARATOR)
        .next()
        .unwrap_or_default()
}
