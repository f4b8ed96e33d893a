//! Middleware chain execution.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::handler::{DefaultHandlerResolver, HandlerResolver};
use crate::middleware::{DefaultRouteMiddlewareResolver, Next, RouteMiddlewareResolver};
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;

/// Runs a route's middleware chain and its handler.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<dyn HandlerResolver>,
    middlewares: Arc<dyn RouteMiddlewareResolver>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with the default resolvers.
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(DefaultHandlerResolver::new()),
            middlewares: Arc::new(DefaultRouteMiddlewareResolver::new()),
        }
    }

    /// Sets the handler resolver.
    #[must_use]
    pub fn with_handler_resolver(mut self, resolver: impl HandlerResolver + 'static) -> Self {
        self.handlers = Arc::new(resolver);
        self
    }

    /// Sets the middleware resolver.
    #[must_use]
    pub fn with_middleware_resolver(
        mut self,
        resolver: impl RouteMiddlewareResolver + 'static,
    ) -> Self {
        self.middlewares = Arc::new(resolver);
        self
    }

    /// Dispatches a request through the route's middleware to its handler.
    ///
    /// Middleware is resolved up front, so an unknown alias fails before
    /// anything runs. The handler is resolved only when the chain reaches
    /// it; a middleware that answers on its own never triggers resolution.
    pub async fn dispatch(&self, route: &Route, request: Request) -> Result<Response> {
        let stack = self.middlewares.resolve(&route.middlewares)?;
        debug!(
            route = %route.path,
            middlewares = stack.len(),
            handler = %route.handler.describe(),
            "dispatching"
        );

        Next::new(stack, route.handler.clone(), Arc::clone(&self.handlers))
            .handle(request)
            .await
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
