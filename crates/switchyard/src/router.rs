//! Request routing and URL generation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::collector::RouteCollector;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, RouterError};
use crate::middleware::BoxFuture;
use crate::path;
use crate::request::{Attribute, Request};
use crate::resolver::{RouteMatch, RouteResolver};
use crate::response::Response;

/// Attribute holding the matched route name, or its path when unnamed.
pub const ROUTE_ATTRIBUTE: &str = "_route";
/// Attribute holding the matched parameters.
pub const ROUTE_PARAMS_ATTRIBUTE: &str = "_route_params";
/// Attribute holding the matched handler.
pub const ROUTE_HANDLER_ATTRIBUTE: &str = "_route_handler";

/// The main router: resolves requests and dispatches them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use switchyard::{Handler, Registrar, Request, Response, RouteCollector, RouteOptions, Router};
///
/// let mut routes = RouteCollector::new();
/// routes
///     .get(
///         "/users/{id}",
///         Handler::closure(|req: Request| async move {
///             Ok(Response::text(format!("user {}", req.params.get("id").unwrap_or_default())))
///         }),
///         RouteOptions::new(),
///     )
///     .unwrap();
///
/// let router = Router::new(Arc::new(routes));
/// assert_eq!(router.url_for("users.show", [("id", 7)]).unwrap(), "/users/7");
/// ```
#[derive(Debug)]
pub struct Router {
    resolver: RouteResolver,
    dispatcher: Dispatcher,
}

impl Router {
    /// Creates a router with the default dispatcher.
    pub fn new(routes: Arc<RouteCollector>) -> Self {
        Self::from_parts(RouteResolver::new(routes), Dispatcher::new())
    }

    /// Creates a router from a resolver and a dispatcher.
    pub fn from_parts(resolver: RouteResolver, dispatcher: Dispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
        }
    }

    /// Replaces the dispatcher.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Returns the registered routes.
    pub fn routes(&self) -> &RouteCollector {
        self.resolver.routes()
    }

    /// Handles a request.
    ///
    /// Fails with [`RouterError::RouteNotFound`] when nothing matches;
    /// resolution and dispatch errors propagate unchanged.
    pub fn handle<'a>(&'a self, request: Request) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let Some(matched) = self.resolver.resolve(&request)? else {
                debug!(method = %request.method, path = %request.path, "no route matched");
                return Err(RouterError::RouteNotFound(format!(
                    "{} {}",
                    request.method, request.path
                )));
            };

            let request = apply_match(request, &matched);
            self.dispatcher.dispatch(&matched.route, request).await
        })
    }

    /// Generates the path of a named route.
    ///
    /// Unknown names and missing required parameters fail with
    /// [`RouterError::RouteNotFound`].
    pub fn url_for<I, K, V>(&self, name: &str, params: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let route = self
            .routes()
            .route(name)
            .ok_or_else(|| RouterError::RouteNotFound(format!("route with name '{name}' not found")))?;

        let params: HashMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
            .collect();

        path::reverse(&route.path, &params).ok_or_else(|| {
            RouterError::RouteNotFound(format!("missing required parameters for route '{name}'"))
        })
    }
}

fn apply_match(request: Request, matched: &RouteMatch) -> Request {
    let route_name = matched
        .route
        .name
        .clone()
        .unwrap_or_else(|| matched.route.path.clone());

    let mut request = request
        .with_attribute(ROUTE_ATTRIBUTE, route_name)
        .with_attribute(ROUTE_PARAMS_ATTRIBUTE, Attribute::Params(matched.params.clone()))
        .with_attribute(
            ROUTE_HANDLER_ATTRIBUTE,
            Attribute::Handler(matched.route.handler.clone()),
        );

    for (key, value) in matched.params.iter() {
        request = request.with_attribute(key, value);
    }
    request.params = matched.params.clone();
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Registrar;
    use crate::handler::Handler;
    use crate::request::Method;
    use crate::route::RouteOptions;

    fn echo_route_attribute() -> Handler {
        Handler::closure(|req: Request| async move {
            let route = req.attribute_text(ROUTE_ATTRIBUTE).unwrap_or("").to_string();
            let id = req.attribute_text("id").unwrap_or("").to_string();
            Ok(Response::text(format!("{route}:{id}")))
        })
    }

    fn router(build: impl FnOnce(&mut RouteCollector)) -> Router {
        let mut rc = RouteCollector::new();
        build(&mut rc);
        Router::new(Arc::new(rc))
    }

    #[tokio::test]
    async fn test_handle_sets_route_attributes() {
        let router = router(|rc| {
            rc.get("/users/{id}", echo_route_attribute(), RouteOptions::new())
                .unwrap();
        });

        let res = router.handle(Request::get("/users/5")).await.unwrap();
        assert_eq!(res.body_string().as_deref(), Some("users.show:5"));
    }

    #[tokio::test]
    async fn test_handle_exposes_params_and_handler() {
        let router = router(|rc| {
            rc.get(
                "/posts/{slug}",
                Handler::closure(|req: Request| async move {
                    let params = match req.attribute(ROUTE_PARAMS_ATTRIBUTE) {
                        Some(Attribute::Params(params)) => params.len(),
                        _ => 0,
                    };
                    let handler = match req.attribute(ROUTE_HANDLER_ATTRIBUTE) {
                        Some(Attribute::Handler(handler)) => handler.describe(),
                        _ => String::new(),
                    };
                    Ok(Response::text(format!(
                        "{params}:{handler}:{}",
                        req.params.get("slug").unwrap_or("")
                    )))
                }),
                RouteOptions::new(),
            )
            .unwrap();
        });

        let res = router.handle(Request::get("/posts/hello")).await.unwrap();
        assert_eq!(res.body_string().as_deref(), Some("1:Closure:hello"));
    }

    #[tokio::test]
    async fn test_handle_not_found() {
        let router = router(|_| {});
        let err = router.handle(Request::get("/missing")).await.unwrap_err();
        assert!(matches!(err, RouterError::RouteNotFound(_)));
    }

    #[tokio::test]
    async fn test_handle_method_not_allowed() {
        let router = router(|rc| {
            rc.get("/users", echo_route_attribute(), RouteOptions::new())
                .unwrap();
        });

        let err = router
            .handle(Request::new(Method::Post, "/users"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::MethodNotAllowed { ref allowed } if allowed == &[Method::Get]));
    }

    #[test]
    fn test_url_for() {
        let router = router(|rc| {
            rc.get("/base//{id}//{opt?}/", "H", RouteOptions::new().name("route"))
                .unwrap();
            rc.get("/", "Home", RouteOptions::new().name("home")).unwrap();
        });

        assert_eq!(router.url_for("route", [("id", 42)]).unwrap(), "/base/42");
        assert_eq!(
            router
                .url_for("route", [("id", "42"), ("opt", "x")])
                .unwrap(),
            "/base/42/x"
        );
        assert_eq!(router.url_for("home", Vec::<(&str, &str)>::new()).unwrap(), "/");
    }

    #[test]
    fn test_url_for_errors() {
        let router = router(|rc| {
            rc.get("/users/{id}", "H", RouteOptions::new()).unwrap();
        });

        assert!(matches!(
            router.url_for("nope", Vec::<(&str, &str)>::new()),
            Err(RouterError::RouteNotFound(_))
        ));
        assert!(matches!(
            router.url_for("users.show", Vec::<(&str, &str)>::new()),
            Err(RouterError::RouteNotFound(_))
        ));
    }
}
