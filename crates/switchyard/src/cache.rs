//! Route cache: dumping a route table to a store and loading it back.
//!
//! Only routes made of plain data survive the trip: handlers must be named
//! references or `[controller, action]` pairs, middleware must be aliases and
//! validators must be built-in types. Anything else aborts the dump before
//! the store is touched.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collector::{Registrar, RouteCollector};
use crate::error::{CacheError, Result};
use crate::handler::{ControllerRef, Handler};
use crate::middleware::MiddlewareRef;
use crate::request::Method;
use crate::route::{ParamType, Route, RouteOptions, Validator};
use crate::store::CacheStore;

const CACHE_KEY_PREFIX: &str = "router.routes";
const DEFAULT_ENVIRONMENT: &str = "dev";

/// A handler in plain-data form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandlerRecord {
    /// Named function or invokable controller.
    Reference(String),
    /// `[controller, action]` pair.
    Action(String, String),
}

impl From<HandlerRecord> for Handler {
    fn from(record: HandlerRecord) -> Self {
        match record {
            HandlerRecord::Reference(name) => Self::Reference(name),
            HandlerRecord::Action(controller, action) => Self::action(controller, action),
        }
    }
}

fn default_method() -> String {
    Method::Get.as_str().to_string()
}

fn default_path() -> String {
    "/".to_string()
}

/// A route in plain-data form, as stored in caches and route manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    /// HTTP method.
    #[serde(default = "default_method")]
    pub method: String,
    /// Path pattern.
    #[serde(default = "default_path")]
    pub path: String,
    /// Handler reference.
    pub handler: HandlerRecord,
    /// Middleware aliases in execution order.
    #[serde(default)]
    pub middlewares: Vec<String>,
    /// Route name.
    #[serde(default)]
    pub name: Option<String>,
    /// Host restriction.
    #[serde(default)]
    pub host: Option<String>,
    /// Parameter defaults.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    /// Parameter types, `int` or `string`.
    #[serde(default)]
    pub validators: BTreeMap<String, String>,
}

impl RouteRecord {
    /// Converts a route, rejecting parts that cannot be stored.
    pub fn from_route(route: &Route) -> std::result::Result<Self, CacheError> {
        let handler = match &route.handler {
            Handler::Reference(name) => HandlerRecord::Reference(name.clone()),
            Handler::Action {
                controller: ControllerRef::Name(controller),
                action,
            } => HandlerRecord::Action(controller.clone(), action.clone()),
            other => return Err(CacheError::UnsupportedHandler(other.describe())),
        };

        let middlewares = route
            .middlewares
            .iter()
            .map(|middleware| match middleware {
                MiddlewareRef::Name(name) => Ok(name.clone()),
                MiddlewareRef::Instance(_) => {
                    Err(CacheError::UnsupportedMiddleware(route.path.clone()))
                }
            })
            .collect::<std::result::Result<_, _>>()?;

        let validators = route
            .validators
            .iter()
            .map(|(param, validator)| match validator {
                Validator::Type(kind) => Ok((param.clone(), kind.as_str().to_string())),
                Validator::Custom(_) => Err(CacheError::UnsupportedValidator(param.clone())),
            })
            .collect::<std::result::Result<_, _>>()?;

        Ok(Self {
            method: route.method.as_str().to_string(),
            path: route.path.clone(),
            handler,
            middlewares,
            name: route.name.clone(),
            host: route.host.clone(),
            defaults: route
                .defaults
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            validators,
        })
    }

    /// Registers the route on `routes`.
    pub fn register(self, routes: &mut impl Registrar) -> Result<()> {
        let method: Method = self.method.parse().map_err(CacheError::Malformed)?;

        let mut options = RouteOptions {
            middlewares: self.middlewares.into_iter().map(MiddlewareRef::Name).collect(),
            name: self.name,
            host: self.host,
            defaults: self.defaults.into_iter().collect(),
            ..RouteOptions::default()
        };
        for (param, kind) in self.validators {
            let kind: ParamType = kind.parse().map_err(CacheError::Malformed)?;
            options.validators.insert(param, kind.into());
        }

        routes.add_route(method, &self.path, Handler::from(self.handler), options)
    }
}

/// Stores route tables in a [`CacheStore`], one entry per environment.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use switchyard::{MemoryStore, Registrar, RouteCache, RouteCollector, RouteOptions};
///
/// let mut routes = RouteCollector::new();
/// routes.get("/users", ("UserController", "index"), RouteOptions::new()).unwrap();
///
/// let cache = RouteCache::new(Arc::new(MemoryStore::new())).environment("prod");
/// cache.dump(&routes, None).unwrap();
///
/// let loaded = cache.load(None).unwrap();
/// assert!(loaded.route("users.index").is_some());
/// ```
#[derive(Clone)]
pub struct RouteCache {
    store: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
    environment: Option<String>,
}

impl RouteCache {
    /// Creates a cache over `store`.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: None,
            environment: None,
        }
    }

    /// Sets the entry lifetime.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the environment used when none is passed.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Returns the store key for an environment; empty or absent means `dev`.
    pub fn cache_key(environment: Option<&str>) -> String {
        let environment = environment
            .filter(|env| !env.is_empty())
            .unwrap_or(DEFAULT_ENVIRONMENT);
        format!("{CACHE_KEY_PREFIX}.{environment}")
    }

    fn key(&self, environment: Option<&str>) -> String {
        Self::cache_key(environment.or(self.environment.as_deref()))
    }

    /// Writes every route of `routes`.
    ///
    /// Nothing is written when any route cannot be stored.
    pub fn dump(&self, routes: &RouteCollector, environment: Option<&str>) -> Result<()> {
        let key = self.key(environment);

        let records = routes
            .routes()
            .iter()
            .map(|route| RouteRecord::from_route(route))
            .collect::<std::result::Result<Vec<_>, _>>()
            .inspect_err(|e| warn!(key = %key, error = %e, "route cache dump rejected"))?;

        let value = serde_json::to_value(&records).map_err(CacheError::from)?;
        if !self.store.set(&key, value, self.ttl)? {
            return Err(CacheError::WriteFailed(key).into());
        }

        info!(key = %key, routes = records.len(), "route cache written");
        Ok(())
    }

    /// Rebuilds a collector from the stored routes.
    pub fn load(&self, environment: Option<&str>) -> Result<RouteCollector> {
        let key = self.key(environment);

        let value = self
            .store
            .get(&key)?
            .ok_or_else(|| CacheError::Missing(key.clone()))?;
        let records: Vec<RouteRecord> = serde_json::from_value(value)
            .map_err(|e| CacheError::Malformed(format!("{key}: {e}")))?;

        let mut routes = RouteCollector::new();
        for record in records {
            record.register(&mut routes)?;
        }

        info!(key = %key, routes = routes.len(), "route cache loaded");
        Ok(routes)
    }

    /// Returns whether routes are stored for the environment.
    pub fn has(&self, environment: Option<&str>) -> Result<bool> {
        Ok(self.store.has(&self.key(environment))?)
    }

    /// Removes the stored routes.
    pub fn clear(&self, environment: Option<&str>) -> Result<bool> {
        let key = self.key(environment);
        debug!(key = %key, "clearing route cache");
        Ok(self.store.delete(&key)?)
    }
}

impl std::fmt::Debug for RouteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteCache")
            .field("ttl", &self.ttl)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}
