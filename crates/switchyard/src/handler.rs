//! Route handlers and their resolution into callable endpoints.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{Result, RouterError};
use crate::middleware::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// Action invoked on controllers referenced without an explicit action.
pub const INVOKE_ACTION: &str = "invoke";

/// A callable endpoint: the fully resolved form of a handler.
pub type Endpoint = Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

/// Builds a controller instance on demand.
pub type ControllerFactory = Arc<dyn Fn() -> Arc<dyn Controller> + Send + Sync>;

/// Wraps an async closure into an [`Endpoint`].
pub fn endpoint<F, Fut>(f: F) -> Endpoint
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    Arc::new(move |req: Request| -> BoxFuture<'static, Result<Response>> { Box::pin(f(req)) })
}

/// A group of named actions dispatched by name.
///
/// # Example
///
/// ```ignore
/// struct UserController;
///
/// impl Controller for UserController {
///     fn name(&self) -> &str {
///         "UserController"
///     }
///
///     fn has_action(&self, action: &str) -> bool {
///         matches!(action, "index" | "show")
///     }
///
///     fn call<'a>(&'a self, action: &'a str, req: Request) -> BoxFuture<'a, Result<Response>> {
///         Box::pin(async move {
///             match action {
///                 "show" => Ok(Response::text(format!("user {}", req.params.get("id").unwrap_or("?")))),
///                 _ => Ok(Response::text("users")),
///             }
///         })
///     }
/// }
/// ```
pub trait Controller: Send + Sync {
    /// The name this controller is registered under.
    fn name(&self) -> &str;

    /// Returns whether `action` can be called.
    fn has_action(&self, action: &str) -> bool;

    /// Runs `action` for the request.
    fn call<'a>(&'a self, action: &'a str, request: Request) -> BoxFuture<'a, Result<Response>>;
}

/// The controller half of an action handler.
#[derive(Clone)]
pub enum ControllerRef {
    /// Controller looked up by name at dispatch time.
    Name(String),
    /// A live controller instance.
    Instance(Arc<dyn Controller>),
}

impl ControllerRef {
    /// Returns the controller name.
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Instance(controller) => controller.name(),
        }
    }
}

impl fmt::Debug for ControllerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Instance(controller) => f.debug_tuple("Instance").field(&controller.name()).finish(),
        }
    }
}

/// What a route invokes once the middleware chain has run.
#[derive(Clone)]
pub enum Handler {
    /// An inline closure.
    Closure(Endpoint),
    /// A named function or invokable controller, resolved by name.
    Reference(String),
    /// A controller action.
    Action {
        /// Controller owning the action.
        controller: ControllerRef,
        /// Action name.
        action: String,
    },
    /// A live invokable controller.
    Instance(Arc<dyn Controller>),
}

impl Handler {
    /// Creates a closure handler.
    pub fn closure<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        Self::Closure(endpoint(f))
    }

    /// Creates a handler referencing a named function or invokable controller.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    /// Creates a handler for an action of a named controller.
    pub fn action(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Action {
            controller: ControllerRef::Name(controller.into()),
            action: action.into(),
        }
    }

    /// Creates a handler for an action of a controller instance.
    pub fn instance_action(controller: Arc<dyn Controller>, action: impl Into<String>) -> Self {
        Self::Action {
            controller: ControllerRef::Instance(controller),
            action: action.into(),
        }
    }

    /// Creates a handler invoking a controller instance.
    pub fn instance(controller: Arc<dyn Controller>) -> Self {
        Self::Instance(controller)
    }

    /// Checks that the handler names something that can be called.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Reference(name) if name.trim().is_empty() => Err(RouterError::InvalidHandler(
                "handler reference must not be empty".to_string(),
            )),
            Self::Action { controller, action } => {
                if controller.name().trim().is_empty() || action.trim().is_empty() {
                    Err(RouterError::InvalidHandler(format!(
                        "handler must be a [controller, action] pair, got [{}, {action}]",
                        controller.name()
                    )))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Returns the controller and action this handler targets, if any.
    pub fn controller_action(&self) -> Option<(&str, &str)> {
        match self {
            Self::Closure(_) => None,
            Self::Reference(name) => Some((name.as_str(), INVOKE_ACTION)),
            Self::Action { controller, action } => Some((controller.name(), action.as_str())),
            Self::Instance(controller) => Some((controller.name(), INVOKE_ACTION)),
        }
    }

    /// Returns a human readable description, e.g. `UserController::show`.
    pub fn describe(&self) -> String {
        match self {
            Self::Closure(_) => "Closure".to_string(),
            Self::Reference(name) => name.clone(),
            Self::Action { controller, action } => format!("{}::{action}", controller.name()),
            Self::Instance(controller) => format!("{}::{INVOKE_ACTION}", controller.name()),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closure(_) => f.write_str("Closure"),
            Self::Reference(name) => f.debug_tuple("Reference").field(name).finish(),
            Self::Action { controller, action } => f
                .debug_struct("Action")
                .field("controller", controller)
                .field("action", action)
                .finish(),
            Self::Instance(controller) => f.debug_tuple("Instance").field(&controller.name()).finish(),
        }
    }
}

impl From<&str> for Handler {
    fn from(name: &str) -> Self {
        Self::Reference(name.to_string())
    }
}

impl From<String> for Handler {
    fn from(name: String) -> Self {
        Self::Reference(name)
    }
}

impl From<(&str, &str)> for Handler {
    fn from((controller, action): (&str, &str)) -> Self {
        Self::action(controller, action)
    }
}

impl From<Endpoint> for Handler {
    fn from(endpoint: Endpoint) -> Self {
        Self::Closure(endpoint)
    }
}

/// Turns handlers into endpoints.
pub trait HandlerResolver: Send + Sync {
    /// Resolves the handler, failing with [`RouterError::InvalidHandler`]
    /// when it cannot be called.
    fn resolve(&self, handler: &Handler) -> Result<Endpoint>;
}

/// Wraps a controller action into an endpoint.
pub fn controller_endpoint(controller: Arc<dyn Controller>, action: &str) -> Result<Endpoint> {
    if !controller.has_action(action) {
        return Err(RouterError::InvalidHandler(format!(
            "{}::{action} is not callable",
            controller.name()
        )));
    }

    let action = action.to_string();
    Ok(Arc::new(move |req: Request| -> BoxFuture<'static, Result<Response>> {
        let controller = Arc::clone(&controller);
        let action = action.clone();
        Box::pin(async move { controller.call(&action, req).await })
    }))
}

/// Resolves handlers from registries of named functions and controller
/// factories. Controllers are instantiated on every resolution.
#[derive(Clone, Default)]
pub struct DefaultHandlerResolver {
    functions: HashMap<String, Endpoint>,
    controllers: HashMap<String, ControllerFactory>,
}

impl DefaultHandlerResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named function.
    #[must_use]
    pub fn function<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.functions.insert(name.into(), endpoint(f));
        self
    }

    /// Registers a controller factory.
    #[must_use]
    pub fn controller<F, C>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        self.controllers
            .insert(name.into(), Arc::new(move || Arc::new(factory()) as Arc<dyn Controller>));
        self
    }

    fn instantiate(&self, name: &str) -> Result<Arc<dyn Controller>> {
        self.controllers
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| RouterError::InvalidHandler(format!("unknown controller: {name}")))
    }
}

impl fmt::Debug for DefaultHandlerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultHandlerResolver")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerResolver for DefaultHandlerResolver {
    fn resolve(&self, handler: &Handler) -> Result<Endpoint> {
        match handler {
            Handler::Closure(endpoint) => Ok(Arc::clone(endpoint)),
            Handler::Reference(name) => match self.functions.get(name) {
                Some(endpoint) => Ok(Arc::clone(endpoint)),
                None => controller_endpoint(self.instantiate(name)?, INVOKE_ACTION),
            },
            Handler::Action {
                controller: ControllerRef::Name(name),
                action,
            } => controller_endpoint(self.instantiate(name)?, action),
            Handler::Action {
                controller: ControllerRef::Instance(controller),
                action,
            } => controller_endpoint(Arc::clone(controller), action),
            Handler::Instance(controller) => controller_endpoint(Arc::clone(controller), INVOKE_ACTION),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyController;

    impl Controller for DummyController {
        fn name(&self) -> &str {
            "DummyController"
        }

        fn has_action(&self, action: &str) -> bool {
            matches!(action, "hello" | INVOKE_ACTION)
        }

        fn call<'a>(&'a self, action: &'a str, _req: Request) -> BoxFuture<'a, Result<Response>> {
            Box::pin(async move {
                match action {
                    "hello" => Ok(Response::new(201)),
                    _ => Ok(Response::new(202)),
                }
            })
        }
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        assert!(Handler::reference("").validate().is_err());
        assert!(Handler::action("Users", "").validate().is_err());
        assert!(Handler::action("Users", "show").validate().is_ok());
    }

    #[test]
    fn test_controller_action() {
        assert_eq!(
            Handler::action("Users", "show").controller_action(),
            Some(("Users", "show"))
        );
        assert_eq!(
            Handler::reference("Ping").controller_action(),
            Some(("Ping", INVOKE_ACTION))
        );
        let closure = Handler::closure(|_req| async { Ok(Response::ok()) });
        assert_eq!(closure.controller_action(), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(Handler::action("Users", "show").describe(), "Users::show");
        assert_eq!(
            Handler::instance(Arc::new(DummyController)).describe(),
            "DummyController::invoke"
        );
        assert_eq!(Handler::closure(|_req| async { Ok(Response::ok()) }).describe(), "Closure");
    }

    #[tokio::test]
    async fn test_resolves_named_controller_action() {
        let resolver = DefaultHandlerResolver::new().controller("DummyController", || DummyController);

        let endpoint = resolver
            .resolve(&Handler::action("DummyController", "hello"))
            .unwrap();
        let res = endpoint(Request::get("/")).await.unwrap();
        assert_eq!(res.status, 201);

        let endpoint = resolver.resolve(&Handler::reference("DummyController")).unwrap();
        let res = endpoint(Request::get("/")).await.unwrap();
        assert_eq!(res.status, 202);
    }

    #[tokio::test]
    async fn test_resolves_named_function_before_controller() {
        let resolver = DefaultHandlerResolver::new()
            .controller("ping", || DummyController)
            .function("ping", |_req| async { Ok(Response::text("pong")) });

        let endpoint = resolver.resolve(&Handler::reference("ping")).unwrap();
        let res = endpoint(Request::get("/")).await.unwrap();
        assert_eq!(res.body_string(), Some("pong".to_string()));
    }

    #[test]
    fn test_unknown_handlers_are_invalid() {
        let resolver = DefaultHandlerResolver::new().controller("DummyController", || DummyController);

        assert!(matches!(
            resolver.resolve(&Handler::reference("Missing")),
            Err(RouterError::InvalidHandler(_))
        ));
        assert!(matches!(
            resolver.resolve(&Handler::action("DummyController", "nope")),
            Err(RouterError::InvalidHandler(_))
        ));
    }
}
