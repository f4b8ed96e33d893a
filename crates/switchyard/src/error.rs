//! Error types for routing.

use std::path::PathBuf;

use thiserror::Error;

use crate::request::Method;

/// Router-specific errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No route matched the request, the route name is unknown, or a
    /// required parameter is missing during URL generation.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// The path and host matched but none of the methods did.
    #[error("method not allowed, expected one of: {}", format_methods(.allowed))]
    MethodNotAllowed {
        /// Methods registered for the matched path, in registration order.
        allowed: Vec<Method>,
    },

    /// A captured parameter failed its validator.
    #[error("invalid parameter: {param}. This may indicate an invalid value or a missing/misordered route for path \"{path}\"")]
    InvalidRouteParameter {
        /// Parameter name.
        param: String,
        /// Pattern of the route that rejected it.
        path: String,
    },

    /// A handler could not be resolved into something callable.
    #[error("invalid handler: {0}")]
    InvalidHandler(String),

    /// A middleware reference could not be resolved.
    #[error("invalid middleware: {0}")]
    InvalidMiddleware(String),

    /// A request URL could not be parsed.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// Invalid path pattern.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),

    /// A second route was registered under an existing name.
    #[error("route name already exists: {0}")]
    DuplicateRouteName(String),

    /// No registered route has this method and path.
    #[error("no route registered for {method} {path}")]
    UnknownRoute {
        /// Requested method.
        method: Method,
        /// Requested path, including any group prefix.
        path: String,
    },

    /// Request input failed schema validation.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A route manifest could not be read.
    #[error("invalid route manifest {}: {message}", .path.display())]
    Manifest {
        /// Manifest file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Route cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors raised while dumping or loading the route cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The handler is a closure or a live instance.
    #[error("route cache supports only named handlers and [controller, action] pairs: {0}")]
    UnsupportedHandler(String),

    /// The middleware is a live instance rather than an alias.
    #[error("route cache supports only named middleware (alias or type name) on route {0}")]
    UnsupportedMiddleware(String),

    /// The validator is a custom predicate.
    #[error("route cache does not support custom validators (parameter {0})")]
    UnsupportedValidator(String),

    /// Nothing is stored under the key.
    #[error("route cache not found: {0}")]
    Missing(String),

    /// The stored data is not a well-formed route list.
    #[error("route cache is malformed: {0}")]
    Malformed(String),

    /// The store refused the write.
    #[error("failed to write route cache: {0}")]
    WriteFailed(String),

    /// Backend failure.
    #[error("cache store error: {0}")]
    Store(String),

    /// IO error (file-backed stores and manifests).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
