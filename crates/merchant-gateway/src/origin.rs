//! Origin host extraction and allow-list matching. No I/O.

/// Host component of an `Origin` header value, port included.
///
/// Strips `scheme://` and anything from the first `/`, `?` or `#`. Ports are
/// kept verbatim: `http://localhost:3000` yields `localhost:3000`.
pub fn extract_host(origin: &str) -> &str {
    let rest = match origin.find("://") {
        Some(idx) => &origin[idx + 3..],
        None => origin,
    };
    let end = rest
        .find(|c: char| c == '/' || c == '?' || c == '#')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Whether `host` is admitted by a single allow-list `pattern`.
///
/// `*.suffix` admits any direct or nested subdomain of `suffix` but never the
/// bare suffix. Any other pattern is compared as a literal. Both comparisons
/// ignore ASCII case.
pub fn domain_matches(host: &str, pattern: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let pattern = pattern.trim().to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(suffix) => {
            if suffix.is_empty() {
                return false;
            }
            // at least one non-empty label before ".suffix"
            host.len() > suffix.len() + 1 && host.ends_with(&format!(".{}", suffix))
        }
        None => !pattern.is_empty() && host == pattern,
    }
}

/// First pattern in `allowed` that admits `host`.
pub fn find_matching_pattern<'a>(host: &str, allowed: &'a [String]) -> Option<&'a str> {
    allowed
        .iter()
        .map(String::as_str)
        .find(|pattern| domain_matches(host, pattern))
}
