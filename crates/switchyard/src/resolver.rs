//! Request to route matching.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::collector::RouteCollector;
use crate::error::{Result, RouterError};
use crate::path::PathPattern;
use crate::request::{Method, PathParams, Request};
use crate::route::Route;

/// A matched route and its parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route.
    pub route: Arc<Route>,
    /// Captured parameters merged over the route defaults.
    pub params: PathParams,
}

/// Finds the route for a request.
///
/// Routes are scanned in registration order and the first full match wins.
/// Compiled patterns are cached per resolver, keyed by the raw route path.
#[derive(Debug)]
pub struct RouteResolver {
    routes: Arc<RouteCollector>,
    patterns: RwLock<HashMap<String, Arc<PathPattern>>>,
}

impl RouteResolver {
    /// Creates a resolver over a route collection.
    pub fn new(routes: Arc<RouteCollector>) -> Self {
        Self {
            routes,
            patterns: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the routes this resolver scans.
    pub fn routes(&self) -> &Arc<RouteCollector> {
        &self.routes
    }

    /// Resolves a request.
    ///
    /// Returns `Ok(None)` when no route matches the path. Fails with
    /// [`RouterError::MethodNotAllowed`] when routes matched the path but
    /// not the method, and with [`RouterError::InvalidRouteParameter`] as
    /// soon as the first fully matching route rejects a parameter; later
    /// routes are not tried.
    pub fn resolve(&self, request: &Request) -> Result<Option<RouteMatch>> {
        let mut allowed: Vec<Method> = Vec::new();

        for route in self.routes.routes() {
            if route.host.as_ref().is_some_and(|host| *host != request.host) {
                continue;
            }

            let pattern = self.pattern(&route.path)?;
            let Some(captured) = pattern.match_path(&request.path) else {
                continue;
            };

            if !route.method.accepts(request.method) {
                if !allowed.contains(&route.method) {
                    allowed.push(route.method);
                }
                continue;
            }

            validate_params(route, &pattern, &captured)?;

            let params = route
                .defaults
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .chain(captured.iter().map(|(k, v)| (k.to_string(), v.to_string())))
                .collect();

            debug!(method = %request.method, path = %request.path, route = %route.path, "route matched");
            return Ok(Some(RouteMatch {
                route: Arc::clone(route),
                params,
            }));
        }

        if allowed.is_empty() {
            Ok(None)
        } else {
            Err(RouterError::MethodNotAllowed { allowed })
        }
    }

    fn pattern(&self, path: &str) -> Result<Arc<PathPattern>> {
        if let Some(pattern) = self
            .patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(Arc::clone(pattern));
        }

        let pattern = Arc::new(PathPattern::compile(path)?);
        self.patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), Arc::clone(&pattern));
        Ok(pattern)
    }
}

fn validate_params(route: &Route, pattern: &PathPattern, params: &PathParams) -> Result<()> {
    for name in pattern.param_names() {
        let (Some(value), Some(validator)) = (params.get(name), route.validators.get(name)) else {
            continue;
        };
        if !validator.check(value) {
            return Err(RouterError::InvalidRouteParameter {
                param: name.clone(),
                path: route.path.clone(),
            });
        }
    }
    Ok(())
}
