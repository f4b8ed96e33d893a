//! Route registration.
//!
//! Routes are registered on a [`RouteCollector`] either directly or through a
//! [`RouteScope`] handed to group callbacks. Both implement [`Registrar`], so
//! registration code reads the same at every nesting level:
//!
//! ```
//! use switchyard::{Handler, Registrar, RouteCollector, RouteGroup, RouteOptions};
//!
//! let mut routes = RouteCollector::new();
//! routes.add_middleware("logging");
//!
//! routes
//!     .group(RouteGroup::new("/admin").name_prefix("admin").middleware("auth"), |admin| {
//!         admin.get("/stats", ("StatsController", "index"), RouteOptions::new())?;
//!         admin.resource("/users", "UserController", Default::default())
//!     })
//!     .unwrap();
//!
//! assert!(routes.route("admin.stats.index").is_some());
//! assert!(routes.route("admin.users.show").is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, RouterError};
use crate::group::RouteGroup;
use crate::handler::Handler;
use crate::middleware::MiddlewareRef;
use crate::path::PathPattern;
use crate::request::Method;
use crate::route::{Route, RouteOptions, Validator};

/// Last name segments that already describe an action.
const ACTION_SUFFIXES: [&str; 5] = ["index", "show", "store", "update", "destroy"];

static ROOT_GROUP: RouteGroup = RouteGroup {
    prefix: String::new(),
    middlewares: Vec::new(),
    host: None,
    name_prefix: None,
};

#[derive(Debug, Clone)]
struct ControllerMiddleware {
    middlewares: Vec<MiddlewareRef>,
    only: Vec<String>,
    except: Vec<String>,
}

impl ControllerMiddleware {
    fn applies_to(&self, action: &str) -> bool {
        if !self.only.is_empty() && !self.only.iter().any(|a| a == action) {
            return false;
        }
        !self.except.iter().any(|a| a == action)
    }
}

/// Ordered registry of routes.
///
/// Registration order is match priority. Once built, a collector is meant to
/// be shared read-only behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RouteCollector {
    routes: Vec<Arc<Route>>,
    named: HashMap<String, Arc<Route>>,
    middlewares: Vec<MiddlewareRef>,
    controller_middlewares: HashMap<String, Vec<ControllerMiddleware>>,
}

impl RouteCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a global middleware to routes registered from now on.
    pub fn add_middleware(&mut self, middleware: impl Into<MiddlewareRef>) {
        self.middlewares.push(middleware.into());
    }

    /// Adds middleware to routes handled by `controller`.
    ///
    /// A non-empty `only` restricts the middleware to those actions; `except`
    /// excludes actions. Invokable controllers are matched with the
    /// `invoke` action.
    pub fn add_controller_middleware(
        &mut self,
        controller: impl Into<String>,
        middlewares: Vec<MiddlewareRef>,
        only: &[&str],
        except: &[&str],
    ) {
        self.controller_middlewares
            .entry(controller.into())
            .or_default()
            .push(ControllerMiddleware {
                middlewares,
                only: only.iter().map(ToString::to_string).collect(),
                except: except.iter().map(ToString::to_string).collect(),
            });
    }

    /// Returns all routes in registration order.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Returns named routes keyed by name.
    pub fn named_routes(&self) -> &HashMap<String, Arc<Route>> {
        &self.named
    }

    /// Looks up a route by name.
    pub fn route(&self, name: &str) -> Option<&Arc<Route>> {
        self.named.get(name)
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn register(
        &mut self,
        group: &RouteGroup,
        method: Method,
        path: &str,
        handler: Handler,
        options: RouteOptions,
    ) -> Result<()> {
        let path = format!("{}{path}", group.prefix);

        let mut middlewares = self.middlewares.clone();
        middlewares.extend(group.middlewares.iter().cloned());
        middlewares.extend(self.controller_middlewares_for(&handler));
        middlewares.extend(options.middlewares);

        let name = match options.name.filter(|name| !name.is_empty()) {
            Some(name) => name,
            None => auto_name(method, &path, None),
        };
        let name = apply_name_prefix(name, group.name_prefix.as_deref());

        if self.named.contains_key(&name) {
            return Err(RouterError::DuplicateRouteName(name));
        }
        PathPattern::compile(&path)?;

        let mut route = Route::new(method, path, handler)?;
        route.middlewares = middlewares;
        route.host = options.host.or_else(|| group.host.clone());
        route.defaults = options.defaults;
        route.validators = options.validators;
        route.name = Some(name.clone());

        debug!(
            method = %route.method,
            path = %route.path,
            name = %name,
            middlewares = route.middlewares.len(),
            "route registered"
        );

        let route = Arc::new(route);
        self.named.insert(name, Arc::clone(&route));
        self.routes.push(route);
        Ok(())
    }

    fn controller_middlewares_for(&self, handler: &Handler) -> Vec<MiddlewareRef> {
        let Some((controller, action)) = handler.controller_action() else {
            return Vec::new();
        };

        self.controller_middlewares
            .get(controller)
            .into_iter()
            .flatten()
            .filter(|config| config.applies_to(action))
            .flat_map(|config| config.middlewares.iter().cloned())
            .collect()
    }

    fn append_route_middleware(
        &mut self,
        method: Method,
        path: &str,
        middleware: MiddlewareRef,
    ) -> Result<()> {
        let Some(index) = self
            .routes
            .iter()
            .position(|route| route.method == method && route.path == path)
        else {
            return Err(RouterError::UnknownRoute {
                method,
                path: path.to_string(),
            });
        };

        let route = Arc::new(self.routes[index].with_middleware(middleware));
        if let Some(name) = &route.name {
            self.named.insert(name.clone(), Arc::clone(&route));
        }
        self.routes[index] = route;
        Ok(())
    }
}

/// Registration handle for the routes of a group.
///
/// Created by [`Registrar::group`]; carries the merged settings of every
/// enclosing group and is released when the callback returns.
#[derive(Debug)]
pub struct RouteScope<'a> {
    collector: &'a mut RouteCollector,
    group: RouteGroup,
}

impl RouteScope<'_> {
    /// Returns the merged group settings applied by this scope.
    pub fn current_group(&self) -> &RouteGroup {
        &self.group
    }
}

/// Options for [`Registrar::resource`].
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// Actions to skip.
    pub except: Vec<String>,
    /// Middleware applied to every generated route.
    pub middlewares: Vec<MiddlewareRef>,
    /// Extra middleware per action, appended after registration.
    pub route_middlewares: HashMap<String, Vec<MiddlewareRef>>,
    /// Name used in place of the path-derived base.
    pub name_prefix: Option<String>,
    /// Whether to add a `restore` route.
    pub restore: bool,
    /// Validators for every generated route.
    pub validators: HashMap<String, Validator>,
}

impl ResourceOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips an action.
    #[must_use]
    pub fn except(mut self, action: impl Into<String>) -> Self {
        self.except.push(action.into());
        self
    }

    /// Adds a middleware to every generated route.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    /// Adds a middleware to a single action.
    #[must_use]
    pub fn route_middleware(
        mut self,
        action: impl Into<String>,
        middleware: impl Into<MiddlewareRef>,
    ) -> Self {
        self.route_middlewares
            .entry(action.into())
            .or_default()
            .push(middleware.into());
        self
    }

    /// Sets the name prefix.
    #[must_use]
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Adds the `restore` route.
    #[must_use]
    pub fn with_restore(mut self) -> Self {
        self.restore = true;
        self
    }

    /// Sets a validator on every generated route.
    #[must_use]
    pub fn validator(mut self, param: impl Into<String>, validator: impl Into<Validator>) -> Self {
        self.validators.insert(param.into(), validator.into());
        self
    }
}

/// Route registration shared by [`RouteCollector`] and [`RouteScope`].
pub trait Registrar {
    /// Returns the collector and the group new routes are registered under.
    fn parts(&mut self) -> (&mut RouteCollector, &RouteGroup);

    /// Registers a route.
    ///
    /// The path is prefixed with the group prefix. Middleware runs in the
    /// order global, group, controller, then `options.middlewares`. Routes
    /// without a name get one derived from method and path; the group name
    /// prefix is prepended unless the name already carries it.
    fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Into<Handler>,
        options: RouteOptions,
    ) -> Result<()>
    where
        Self: Sized,
    {
        let (collector, group) = self.parts();
        collector.register(group, method, path, handler.into(), options)
    }

    /// Registers a GET route.
    fn get(&mut self, path: &str, handler: impl Into<Handler>, options: RouteOptions) -> Result<()>
    where
        Self: Sized,
    {
        self.add_route(Method::Get, path, handler, options)
    }

    /// Registers a POST route.
    fn post(&mut self, path: &str, handler: impl Into<Handler>, options: RouteOptions) -> Result<()>
    where
        Self: Sized,
    {
        self.add_route(Method::Post, path, handler, options)
    }

    /// Registers a PUT route.
    fn put(&mut self, path: &str, handler: impl Into<Handler>, options: RouteOptions) -> Result<()>
    where
        Self: Sized,
    {
        self.add_route(Method::Put, path, handler, options)
    }

    /// Registers a PATCH route.
    fn patch(&mut self, path: &str, handler: impl Into<Handler>, options: RouteOptions) -> Result<()>
    where
        Self: Sized,
    {
        self.add_route(Method::Patch, path, handler, options)
    }

    /// Registers a DELETE route.
    fn delete(&mut self, path: &str, handler: impl Into<Handler>, options: RouteOptions) -> Result<()>
    where
        Self: Sized,
    {
        self.add_route(Method::Delete, path, handler, options)
    }

    /// Registers a route matching every method.
    fn any(&mut self, path: &str, handler: impl Into<Handler>, options: RouteOptions) -> Result<()>
    where
        Self: Sized,
    {
        self.add_route(Method::Any, path, handler, options)
    }

    /// Registers routes inside a nested group.
    ///
    /// Errors returned by `routes` are propagated unchanged.
    fn group<F>(&mut self, group: RouteGroup, routes: F) -> Result<()>
    where
        Self: Sized,
        F: FnOnce(&mut RouteScope<'_>) -> Result<()>,
    {
        let (collector, parent) = self.parts();
        let group = parent.nest(&group);
        routes(&mut RouteScope { collector, group })
    }

    /// Appends a middleware to an already registered route.
    ///
    /// `path` is relative to the current group. Fails with
    /// [`RouterError::UnknownRoute`] when no route has this method and path.
    fn add_route_middleware(
        &mut self,
        method: Method,
        path: &str,
        middleware: impl Into<MiddlewareRef>,
    ) -> Result<()>
    where
        Self: Sized,
    {
        let (collector, group) = self.parts();
        let path = format!("{}{path}", group.prefix);
        collector.append_route_middleware(method, &path, middleware.into())
    }

    /// Registers the CRUD routes of a resource controller.
    ///
    /// | action  | method | path               |
    /// |---------|--------|--------------------|
    /// | index   | GET    | `path`             |
    /// | show    | GET    | `path/{id}`        |
    /// | store   | POST   | `path`             |
    /// | update  | PUT    | `path/{id}`        |
    /// | destroy | DELETE | `path/{id}`        |
    /// | restore | POST   | `path/{id}/restore` |
    ///
    /// `restore` is only added when requested.
    fn resource(&mut self, path: &str, controller: &str, options: ResourceOptions) -> Result<()>
    where
        Self: Sized,
    {
        let item = format!("{path}/{{id}}");
        let mut actions = vec![
            ("index", Method::Get, path.to_string()),
            ("show", Method::Get, item.clone()),
            ("store", Method::Post, path.to_string()),
            ("update", Method::Put, item.clone()),
            ("destroy", Method::Delete, item.clone()),
        ];
        if options.restore {
            actions.push(("restore", Method::Post, format!("{item}/restore")));
        }

        let prefix = options.name_prefix.as_deref().filter(|p| !p.is_empty());

        for (action, method, route_path) in actions {
            if options.except.iter().any(|skipped| skipped == action) {
                continue;
            }

            let name = match prefix {
                Some(prefix) if action == "restore" => Some(format!("{prefix}.restore")),
                Some(prefix) => Some(auto_name(method, &route_path, Some(prefix))),
                None => None,
            };

            let route_options = RouteOptions {
                middlewares: options.middlewares.clone(),
                name,
                validators: options.validators.clone(),
                ..RouteOptions::default()
            };
            self.add_route(method, &route_path, Handler::action(controller, action), route_options)?;

            for middleware in options.route_middlewares.get(action).into_iter().flatten() {
                self.add_route_middleware(method, &route_path, middleware.clone())?;
            }
        }

        Ok(())
    }
}

impl Registrar for RouteCollector {
    fn parts(&mut self) -> (&mut RouteCollector, &RouteGroup) {
        (self, &ROOT_GROUP)
    }
}

impl Registrar for RouteScope<'_> {
    fn parts(&mut self) -> (&mut RouteCollector, &RouteGroup) {
        (&mut *self.collector, &self.group)
    }
}

/// Derives a route name from method and path.
///
/// Static segments are dot-joined (`/api/crm/orders/{id}` gives
/// `api.crm.orders`) and suffixed with the conventional action for the
/// method: `index`, `show`, `store`, `update` or `destroy`. A `name_prefix`
/// replaces the last static segment, or the whole base when the prefix is
/// dotted or the path has no static segment.
///
/// ```
/// use switchyard::{auto_name, Method};
///
/// assert_eq!(auto_name(Method::Get, "/users", None), "users.index");
/// assert_eq!(auto_name(Method::Delete, "/users/{id}", None), "users.destroy");
/// assert_eq!(auto_name(Method::Get, "/", None), "root.index");
/// assert_eq!(auto_name(Method::Get, "/api/people/{id}", Some("users")), "api.users.show");
/// ```
pub fn auto_name(method: Method, path: &str, name_prefix: Option<&str>) -> String {
    let segments: Vec<&str> = path
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    let last_is_param = segments.last().is_some_and(|segment| is_param_segment(segment));

    let statics: Vec<&str> = segments
        .iter()
        .copied()
        .filter(|segment| !is_param_segment(segment))
        .collect();
    let mut base = statics.join(".");

    if let Some(prefix) = name_prefix.filter(|p| !p.is_empty()) {
        base = if base.is_empty() || prefix.contains('.') {
            prefix.to_string()
        } else {
            match base.rsplit_once('.') {
                Some((head, _)) => format!("{head}.{prefix}"),
                None => prefix.to_string(),
            }
        };
    }
    if base.is_empty() {
        base = "root".to_string();
    }

    let last = base.rsplit('.').next().unwrap_or_default();
    if ACTION_SUFFIXES.contains(&last) {
        return base;
    }

    let action = match (method, last_is_param) {
        (Method::Get, true) => Some("show"),
        (Method::Put | Method::Patch, true) => Some("update"),
        (Method::Delete, true) => Some("destroy"),
        (Method::Post, _) => Some("store"),
        (Method::Get, false) => Some("index"),
        _ => None,
    };

    match action {
        Some(action) => format!("{base}.{action}"),
        None => base,
    }
}

fn is_param_segment(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

fn apply_name_prefix(name: String, prefix: Option<&str>) -> String {
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) if name != prefix && !name.starts_with(&format!("{prefix}.")) => {
            format!("{prefix}.{name}")
        }
        _ => name,
    }
}
