//! Route groups.

use crate::middleware::MiddlewareRef;

/// Settings shared by every route registered inside a group.
///
/// Groups are plain values: nesting builds a merged copy with [`RouteGroup::nest`]
/// and leaves both inputs untouched.
#[derive(Debug, Clone, Default)]
pub struct RouteGroup {
    /// Path prefix.
    pub prefix: String,
    /// Middleware applied after global middleware.
    pub middlewares: Vec<MiddlewareRef>,
    /// Host restriction for routes without their own.
    pub host: Option<String>,
    /// Dot-joined route name prefix.
    pub name_prefix: Option<String>,
}

impl RouteGroup {
    /// Creates a group with a path prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Adds a middleware.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    /// Restricts the group to a host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the route name prefix.
    #[must_use]
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Merges `child` into this group.
    pub fn nest(&self, child: &Self) -> Self {
        let name_prefix = match (self.name_prefix.as_deref(), child.name_prefix.as_deref()) {
            (Some(outer), Some(inner)) if !outer.is_empty() && !inner.is_empty() => {
                Some(format!("{outer}.{inner}"))
            }
            (Some(outer), _) if !outer.is_empty() => Some(outer.to_string()),
            (_, inner) => inner.map(str::to_string),
        };

        Self {
            prefix: format!("{}{}", self.prefix, child.prefix),
            middlewares: self
                .middlewares
                .iter()
                .chain(&child.middlewares)
                .cloned()
                .collect(),
            host: child.host.clone().or_else(|| self.host.clone()),
            name_prefix: name_prefix
                .map(|prefix| prefix.trim_matches('.').to_string())
                .filter(|prefix| !prefix.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nest_concatenates() {
        let outer = RouteGroup::new("/admin").middleware("auth").host("admin.example.com");
        let inner = RouteGroup::new("/stats").middleware("audit");

        let merged = outer.nest(&inner);
        assert_eq!(merged.prefix, "/admin/stats");
        assert_eq!(merged.middlewares.len(), 2);
        assert_eq!(merged.middlewares[0].name(), Some("auth"));
        assert_eq!(merged.host.as_deref(), Some("admin.example.com"));
    }

    #[test]
    fn test_child_host_wins() {
        let merged = RouteGroup::new("")
            .host("a.example.com")
            .nest(&RouteGroup::new("").host("b.example.com"));
        assert_eq!(merged.host.as_deref(), Some("b.example.com"));
    }

    #[test]
    fn test_name_prefixes_join() {
        let outer = RouteGroup::new("/admin").name_prefix("admin");

        let both = outer.nest(&RouteGroup::new("/auth").name_prefix("auth"));
        assert_eq!(both.name_prefix.as_deref(), Some("admin.auth"));

        let outer_only = outer.nest(&RouteGroup::new("/stats"));
        assert_eq!(outer_only.name_prefix.as_deref(), Some("admin"));

        let inner_only = RouteGroup::new("").nest(&RouteGroup::new("").name_prefix(".api."));
        assert_eq!(inner_only.name_prefix.as_deref(), Some("api"));

        let empty = RouteGroup::new("").nest(&RouteGroup::new("").name_prefix(".."));
        assert_eq!(empty.name_prefix, None);
    }
}
