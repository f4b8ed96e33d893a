//! # switchyard
//!
//! HTTP request routing with middleware pipelines.
//!
//! This crate provides:
//! - Route registration with groups, resources and automatic route names
//! - Path patterns with required and optional `{parameters}`
//! - Host constraints, parameter defaults and parameter validators
//! - Per-route middleware chains and handler resolution
//! - Reverse URL generation for named routes
//! - A route cache that dumps routes to a key-value store and loads them back
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use switchyard::{Handler, Registrar, Request, Response, RouteCollector, RouteOptions, Router};
//!
//! let mut routes = RouteCollector::new();
//! routes
//!     .get(
//!         "/users/{id}",
//!         Handler::closure(|req: Request| async move {
//!             let id = req.params.get("id").unwrap_or("unknown").to_string();
//!             Ok(Response::text(id))
//!         }),
//!         RouteOptions::new().name("users.show"),
//!     )
//!     .unwrap();
//!
//! let router = Router::new(Arc::new(routes));
//! assert_eq!(
//!     router.url_for("users.show", [("id", 42)]).unwrap(),
//!     "/users/42"
//! );
//! ```
//!
//! ## Route Groups
//!
//! ```
//! use switchyard::{Registrar, RouteCollector, RouteGroup, RouteOptions};
//!
//! let mut routes = RouteCollector::new();
//! routes
//!     .group(RouteGroup::new("/api").middleware("auth"), |api| {
//!         api.get("/users", ("UserController", "index"), RouteOptions::new())
//!     })
//!     .unwrap();
//!
//! assert_eq!(routes.route("api.users.index").unwrap().path, "/api/users");
//! ```
//!
//! ## Route Cache
//!
//! Routes whose handlers and middleware are plain names can be written to a
//! [`CacheStore`] with [`RouteCache::dump`] and rebuilt with
//! [`RouteCache::load`], skipping route registration code on startup.

mod cache;
mod collector;
mod container;
mod dispatcher;
mod error;
mod factory;
mod group;
mod handler;
mod listing;
mod middleware;
pub mod path;
mod request;
mod resolver;
mod response;
mod route;
mod router;
mod store;

pub use cache::{HandlerRecord, RouteCache, RouteRecord};
pub use collector::{auto_name, Registrar, ResourceOptions, RouteCollector, RouteScope};
pub use container::{
    Argument, Arguments, Container, ContainerHandlerResolver, RequestSchema,
    RequiredFields, Slot, SlotKind,
};
pub use dispatcher::Dispatcher;
pub use error::{CacheError, Result, RouterError};
pub use factory::{ManifestFactory, RouteCollectorFactory};
pub use group::RouteGroup;
pub use handler::{
    controller_endpoint, endpoint, Controller, ControllerFactory, ControllerRef,
    DefaultHandlerResolver, Endpoint, Handler, HandlerResolver, INVOKE_ACTION,
};
pub use listing::{render_route_table, NO_ROUTES};
pub use middleware::{
    middleware_fn, BoxFuture, DefaultRouteMiddlewareResolver, FnMiddleware, LoggingMiddleware,
    Middleware, MiddlewareRef, Next, RouteMiddlewareResolver,
};
pub use path::PathPattern;
pub use request::{Attribute, Method, PathParams, Request};
pub use resolver::{RouteMatch, RouteResolver};
pub use response::Response;
pub use route::{ParamType, Route, RouteOptions, Validator};
pub use router::{Router, ROUTE_ATTRIBUTE, ROUTE_HANDLER_ATTRIBUTE, ROUTE_PARAMS_ATTRIBUTE};
pub use store::{CacheStore, FileStore, MemoryStore};
