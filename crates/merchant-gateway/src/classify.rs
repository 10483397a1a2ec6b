/// Whether the gateway enforces API key and origin checks on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Externally exposed: full authentication
    External,
    /// Administrative or infrastructure path: passes through untouched
    Internal,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::External => "external",
            RouteClass::Internal => "internal",
        }
    }
}

/// Path-prefix route classifier.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    internal_prefixes: Vec<String>,
}

impl RouteClassifier {
    pub fn new(internal_prefixes: Vec<String>) -> Self {
        let internal_prefixes = internal_prefixes
            .into_iter()
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { internal_prefixes }
    }

    /// A prefix covers the exact path and anything below it (`/admin`,
    /// `/admin/apps`), never a sibling that merely shares characters
    /// (`/administrator`).
    pub fn classify(&self, path: &str) -> RouteClass {
        let internal = self.internal_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .map(|rest| rest.is_empty() || rest.starts_with('/'))
                .unwrap_or(false)
        });
        if internal {
            RouteClass::Internal
        } else {
            RouteClass::External
        }
    }
}
