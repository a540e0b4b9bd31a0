//! Upstream path allow-list matching.
//!
//! Paths are compared exactly after stripping one trailing `/` from each
//! side. Comparison is case-sensitive and works on the raw, undecoded path.
//! A configured entry never grants access to paths below it.

/// Whether `path` may be forwarded given `allowed`.
///
/// An empty allow-list permits every path, including `""` and `/`.
pub fn is_allowed<S: AsRef<str>>(allowed: &[S], path: &str) -> bool {
    if allowed.is_empty() {
        return true;
    }

    let requested = trim_trailing_slash(path);
    allowed
        .iter()
        .any(|entry| trim_trailing_slash(entry.as_ref()) == requested)
}

fn trim_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}
