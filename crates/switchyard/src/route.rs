//! Route definitions.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Result;
use crate::handler::Handler;
use crate::middleware::MiddlewareRef;
use crate::request::Method;

/// Built-in parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// One or more ASCII digits.
    Int,
    /// Any value.
    String,
}

impl ParamType {
    /// Returns the type tag used in route caches.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
        }
    }

    /// Checks a captured value.
    pub fn check(self, value: &str) -> bool {
        match self {
            Self::Int => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Self::String => true,
        }
    }
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "string" => Ok(Self::String),
            _ => Err(format!("unknown parameter type: {s}")),
        }
    }
}

/// Validates a captured route parameter.
#[derive(Clone)]
pub enum Validator {
    /// A built-in type check.
    Type(ParamType),
    /// A custom predicate.
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Validator {
    /// Creates a custom validator.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// Checks a captured value.
    pub fn check(&self, value: &str) -> bool {
        match self {
            Self::Type(kind) => kind.check(value),
            Self::Custom(predicate) => predicate(value),
        }
    }
}

impl From<ParamType> for Validator {
    fn from(kind: ParamType) -> Self {
        Self::Type(kind)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(kind) => f.debug_tuple("Type").field(kind).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A single route definition.
///
/// Routes are immutable once registered; [`Route::with_middleware`] builds
/// a replacement instead of changing one in place.
#[derive(Debug, Clone)]
pub struct Route {
    /// HTTP method, or [`Method::Any`].
    pub method: Method,
    /// Path pattern with `{name}` and `{name?}` placeholders.
    pub path: String,
    /// Request handler.
    pub handler: Handler,
    /// Middleware in execution order.
    pub middlewares: Vec<MiddlewareRef>,
    /// Route name for reverse URL lookup.
    pub name: Option<String>,
    /// Exact host this route is restricted to.
    pub host: Option<String>,
    /// Values for parameters absent from the URL.
    pub defaults: HashMap<String, String>,
    /// Validators keyed by parameter name.
    pub validators: HashMap<String, Validator>,
}

impl Route {
    /// Creates a new route, rejecting handlers that cannot be called.
    pub fn new(method: Method, path: impl Into<String>, handler: impl Into<Handler>) -> Result<Self> {
        let handler = handler.into();
        handler.validate()?;

        Ok(Self {
            method,
            path: path.into(),
            handler,
            middlewares: Vec::new(),
            name: None,
            host: None,
            defaults: HashMap::new(),
            validators: HashMap::new(),
        })
    }

    /// Sets the route name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a middleware.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    /// Returns a copy with `middleware` appended.
    #[must_use]
    pub fn with_middleware(&self, middleware: MiddlewareRef) -> Self {
        let mut route = self.clone();
        route.middlewares.push(middleware);
        route
    }
}

/// Optional settings for a route being registered.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Route-specific middleware, run after global, group and controller middleware.
    pub middlewares: Vec<MiddlewareRef>,
    /// Explicit route name; derived from method and path when absent.
    pub name: Option<String>,
    /// Host restriction; inherited from the group when absent.
    pub host: Option<String>,
    /// Parameter defaults.
    pub defaults: HashMap<String, String>,
    /// Parameter validators.
    pub validators: HashMap<String, Validator>,
}

impl RouteOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a middleware.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    /// Sets the route name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts the route to a host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets a parameter default.
    #[must_use]
    pub fn with_default(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(param.into(), value.into());
        self
    }

    /// Sets a parameter validator.
    #[must_use]
    pub fn validator(mut self, param: impl Into<String>, validator: impl Into<Validator>) -> Self {
        self.validators.insert(param.into(), validator.into());
        self
    }
}
