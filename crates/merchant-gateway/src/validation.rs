use alloy::primitives::Address;
use url::Url;

use crate::error::GatewayError;

/// Upper bound on allow-list length per app.
pub const MAX_ALLOWED_DOMAINS: usize = 100;

/// Validate one allow-list pattern and return its canonical (lowercase) form.
///
/// Accepted: `example.com`, `*.example.com`, `localhost`, `localhost:3000`,
/// `127.0.0.1:8080`, `[::1]:3000`. Rejected: schemes, paths, userinfo, bare
/// `*`, wildcards anywhere but the leading label, non-canonical hosts.
pub fn validate_domain_pattern(pattern: &str) -> Result<String, GatewayError> {
    let pattern = pattern.trim().to_ascii_lowercase();

    if pattern.is_empty() {
        return Err(GatewayError::InvalidDomain(
            "domain pattern must not be empty".to_string(),
        ));
    }

    // Opaque origins (sandboxed iframes, file://) send `Origin: null`.
    if pattern == "null" {
        return Err(GatewayError::InvalidDomain(
            "'null' is not a host and cannot be allow-listed".to_string(),
        ));
    }

    if pattern.contains("://") {
        return Err(GatewayError::InvalidDomain(format!(
            "'{}' must be a host, not a URL",
            pattern
        )));
    }

    if pattern
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | '\\'))
    {
        return Err(GatewayError::InvalidDomain(format!(
            "'{}' contains characters not allowed in a host",
            pattern
        )));
    }

    let host_part = pattern.strip_prefix("*.").unwrap_or(&pattern);
    if host_part.contains('*') {
        return Err(GatewayError::InvalidDomain(format!(
            "'{}': only a leading '*.' wildcard is supported",
            pattern
        )));
    }

    let parsed = Url::parse(&format!("http://{}", host_part)).map_err(|_| {
        GatewayError::InvalidDomain(format!("'{}' is not a valid host", pattern))
    })?;
    let host = parsed
        .host_str()
        .ok_or_else(|| GatewayError::InvalidDomain(format!("'{}' has no host", pattern)))?;

    // The URL parser canonicalizes IDNA and shorthand IPs; require the
    // canonical spelling so stored patterns compare literally.
    if !host_part.starts_with(host) {
        return Err(GatewayError::InvalidDomain(format!(
            "'{}' is not in canonical form (expected '{}')",
            pattern, host
        )));
    }

    Ok(pattern)
}

/// Validate a whole allow-list, preserving order and dropping duplicates.
pub fn validate_domain_list(patterns: &[String]) -> Result<Vec<String>, GatewayError> {
    if patterns.len() > MAX_ALLOWED_DOMAINS {
        return Err(GatewayError::InvalidDomain(format!(
            "at most {} domain patterns are allowed",
            MAX_ALLOWED_DOMAINS
        )));
    }

    let mut out: Vec<String> = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let canonical = validate_domain_pattern(pattern)?;
        if !out.contains(&canonical) {
            out.push(canonical);
        }
    }
    Ok(out)
}

/// Parse a vendor address and return it in lowercase `0x` form.
pub fn validate_vendor_address(address: &str) -> Result<String, GatewayError> {
    let parsed: Address = address
        .trim()
        .parse()
        .map_err(|_| GatewayError::InvalidAddress(address.to_string()))?;
    Ok(format!("{:#x}", parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_supported_patterns() {
        assert_eq!(validate_domain_pattern("example.com").unwrap(), "example.com");
        assert_eq!(
            validate_domain_pattern("*.Example.com").unwrap(),
            "*.example.com"
        );
        assert_eq!(validate_domain_pattern("localhost").unwrap(), "localhost");
        assert_eq!(
            validate_domain_pattern("localhost:3000").unwrap(),
            "localhost:3000"
        );
        assert_eq!(
            validate_domain_pattern("127.0.0.1:8080").unwrap(),
            "127.0.0.1:8080"
        );
        assert_eq!(validate_domain_pattern("[::1]:3000").unwrap(), "[::1]:3000");
    }

    #[test]
    fn test_rejects_urls_and_paths() {
        assert!(validate_domain_pattern("https://example.com").is_err());
        assert!(validate_domain_pattern("example.com/path").is_err());
        assert!(validate_domain_pattern("user@example.com").is_err());
        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("exa mple.com").is_err());
    }

    #[test]
    fn test_rejects_opaque_origin() {
        assert!(validate_domain_pattern("null").is_err());
        assert!(validate_domain_pattern(" NULL ").is_err());
        let list = vec!["shop.example.com".to_string(), "null".to_string()];
        assert!(validate_domain_list(&list).is_err());
        // Hosts merely containing the word are fine
        assert!(validate_domain_pattern("null.example.com").is_ok());
    }

    #[test]
    fn test_rejects_bad_wildcards() {
        assert!(validate_domain_pattern("*").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("a.*.example.com").is_err());
        assert!(validate_domain_pattern("*example.com").is_err());
        assert!(validate_domain_pattern("*.*.example.com").is_err());
    }

    #[test]
    fn test_rejects_non_canonical_hosts() {
        assert!(validate_domain_pattern("127.1").is_err());
        assert!(validate_domain_pattern("localhost:99999").is_err());
    }

    #[test]
    fn test_domain_list_dedupes() {
        let list = vec![
            "Example.com".to_string(),
            "example.com".to_string(),
            "*.example.com".to_string(),
        ];
        assert_eq!(
            validate_domain_list(&list).unwrap(),
            vec!["example.com".to_string(), "*.example.com".to_string()]
        );
    }

    #[test]
    fn test_domain_list_limit() {
        let list: Vec<String> = (0..=MAX_ALLOWED_DOMAINS)
            .map(|i| format!("d{}.example.com", i))
            .collect();
        assert!(validate_domain_list(&list).is_err());
    }

    #[test]
    fn test_vendor_address() {
        assert_eq!(
            validate_vendor_address("0xABCDEF1234567890ABCDEF1234567890ABCDEF12").unwrap(),
            "0xabcdef1234567890abcdef1234567890abcdef12"
        );
        assert!(validate_vendor_address("0x1234").is_err());
        assert!(validate_vendor_address("vendor-1").is_err());
    }
}
