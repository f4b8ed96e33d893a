//! Middleware support for request/response processing.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::error::{Result, RouterError};
use crate::handler::{Handler, HandlerResolver};
use crate::request::Request;
use crate::response::Response;

/// A boxed future for async middleware operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for middleware that processes requests and responses.
///
/// Middleware can:
/// - Modify the request before passing it on
/// - Short-circuit processing by returning a response without calling `next`
/// - Modify the response returned by `next`
///
/// Middleware registered first wraps everything registered after it, so it
/// sees the request first and the response last.
///
/// # Example
///
/// ```ignore
/// struct Timing;
///
/// impl Middleware for Timing {
///     fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
///         Box::pin(async move {
///             let started = std::time::Instant::now();
///             let res = next.handle(req).await?;
///             Ok(res.header("X-Elapsed", format!("{:?}", started.elapsed())))
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Processes the request, optionally delegating to `next`.
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Result<Response>>;
}

/// The remainder of a middleware chain.
///
/// Consumed by [`Next::handle`], so every link runs at most once.
pub struct Next {
    stack: Arc<[Arc<dyn Middleware>]>,
    position: usize,
    handler: Handler,
    resolver: Arc<dyn HandlerResolver>,
}

impl Next {
    pub(crate) fn new(
        stack: Vec<Arc<dyn Middleware>>,
        handler: Handler,
        resolver: Arc<dyn HandlerResolver>,
    ) -> Self {
        Self {
            stack: stack.into(),
            position: 0,
            handler,
            resolver,
        }
    }

    /// Number of middleware still to run before the handler.
    pub fn remaining(&self) -> usize {
        self.stack.len() - self.position
    }

    /// Runs the next middleware, or the handler once none are left.
    pub fn handle(mut self, request: Request) -> BoxFuture<'static, Result<Response>> {
        let Some(middleware) = self.stack.get(self.position).cloned() else {
            return match self.resolver.resolve(&self.handler) {
                Ok(endpoint) => endpoint(request),
                Err(e) => futures::future::ready(Err(e)).boxed(),
            };
        };

        self.position += 1;
        Box::pin(async move { middleware.process(request, self).await })
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .field("handler", &self.handler)
            .finish()
    }
}

/// Middleware backed by an async closure.
pub struct FnMiddleware<F>(F);

/// Wraps an async closure into middleware.
///
/// ```ignore
/// let auth = middleware_fn(|req: Request, next: Next| async move {
///     if req.get_header("Authorization").is_none() {
///         return Ok(Response::new(401));
///     }
///     next.handle(req).await
/// });
/// ```
pub fn middleware_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    FnMiddleware(f)
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        Box::pin((self.0)(request, next))
    }
}

/// Middleware that logs requests.
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let method = request.method;
            let path = request.path.clone();
            debug!("--> {method} {path}");

            let result = next.handle(request).await;
            match &result {
                Ok(res) => info!(%method, %path, status = res.status, "request handled"),
                Err(e) => warn!(%method, %path, error = %e, "request failed"),
            }
            result
        })
    }
}

/// A middleware as stored on a route.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// Alias or type name, resolved at dispatch time.
    Name(String),
    /// A live middleware instance.
    Instance(Arc<dyn Middleware>),
}

impl MiddlewareRef {
    /// Wraps a middleware instance.
    pub fn instance(middleware: impl Middleware + 'static) -> Self {
        Self::Instance(Arc::new(middleware))
    }

    /// Returns the alias for named middleware.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name.as_str()),
            Self::Instance(_) => None,
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Instance(_) => f.write_str("Instance"),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        Self::Instance(middleware)
    }
}

/// Turns the middleware references of a route into instances.
pub trait RouteMiddlewareResolver: Send + Sync {
    /// Resolves every reference, in order.
    fn resolve(&self, middlewares: &[MiddlewareRef]) -> Result<Vec<Arc<dyn Middleware>>>;
}

type MiddlewareFactory = Arc<dyn Fn() -> Arc<dyn Middleware> + Send + Sync>;

/// Resolves middleware aliases through a registry of factories.
///
/// The `logging` alias is registered out of the box.
#[derive(Clone)]
pub struct DefaultRouteMiddlewareResolver {
    factories: HashMap<String, MiddlewareFactory>,
}

impl Default for DefaultRouteMiddlewareResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultRouteMiddlewareResolver {
    /// Creates a resolver with the built-in aliases.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
        .register("logging", || LoggingMiddleware)
    }

    /// Registers a middleware factory under an alias.
    #[must_use]
    pub fn register<F, M>(mut self, alias: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Middleware + 'static,
    {
        self.factories.insert(
            alias.into(),
            Arc::new(move || Arc::new(factory()) as Arc<dyn Middleware>),
        );
        self
    }
}

impl RouteMiddlewareResolver for DefaultRouteMiddlewareResolver {
    fn resolve(&self, middlewares: &[MiddlewareRef]) -> Result<Vec<Arc<dyn Middleware>>> {
        middlewares
            .iter()
            .map(|middleware| match middleware {
                MiddlewareRef::Instance(instance) => Ok(Arc::clone(instance)),
                MiddlewareRef::Name(alias) => self
                    .factories
                    .get(alias)
                    .map(|factory| factory())
                    .ok_or_else(|| {
                        RouterError::InvalidMiddleware(format!(
                            "no middleware registered for alias: {alias}"
                        ))
                    }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::DefaultHandlerResolver;

    fn chain(stack: Vec<Arc<dyn Middleware>>) -> Next {
        let handler = Handler::closure(|_req| async { Ok(Response::new(200).header("X", "H")) });
        Next::new(stack, handler, Arc::new(DefaultHandlerResolver::new()))
    }

    #[tokio::test]
    async fn test_empty_chain_runs_handler() {
        let res = chain(Vec::new()).handle(Request::get("/")).await.unwrap();
        assert_eq!(res.get_header("X"), Some("H"));
    }

    #[tokio::test]
    async fn test_fn_middleware_wraps_response() {
        let mw: Arc<dyn Middleware> = Arc::new(middleware_fn(|req, next: Next| async move {
            next.handle(req)
                .await
                .map(|res| res.append_header("X", "A"))
        }));

        let res = chain(vec![mw]).handle(Request::get("/")).await.unwrap();
        assert_eq!(res.get_header("X"), Some("H A"));
    }

    #[tokio::test]
    async fn test_unresolvable_handler_surfaces_error() {
        let next = Next::new(
            Vec::new(),
            Handler::reference("Missing"),
            Arc::new(DefaultHandlerResolver::new()),
        );
        let err = next.handle(Request::get("/")).await.unwrap_err();
        assert!(matches!(err, RouterError::InvalidHandler(_)));
    }

    #[tokio::test]
    async fn test_logging_middleware_passes_through() {
        let res = chain(vec![Arc::new(LoggingMiddleware)])
            .handle(Request::get("/"))
            .await
            .unwrap();
        assert_eq!(res.status, 200);
    }

    #[test]
    fn test_resolver_aliases() {
        let resolver = DefaultRouteMiddlewareResolver::new().register("logging2", || LoggingMiddleware);

        let resolved = resolver
            .resolve(&[
                MiddlewareRef::from("logging"),
                MiddlewareRef::from("logging2"),
                MiddlewareRef::instance(LoggingMiddleware),
            ])
            .unwrap();
        assert_eq!(resolved.len(), 3);

        let err = resolver.resolve(&["unknown".into()]).err().expect("expected resolve error");
        assert!(matches!(err, RouterError::InvalidMiddleware(_)));
    }
}
