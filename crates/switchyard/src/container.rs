//! Container-backed handler resolution with argument injection.
//!
//! A [`Container`] holds shared controller instances and *bindings*: a
//! handler key (`name` or `Controller::action`) mapped to the arguments the
//! handler takes and the function receiving them. Arguments are filled from
//! the request before the function runs, and schema inputs are validated
//! first, so a handler body never sees invalid input.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, FutureExt};
use serde_json::{Map, Value};

use crate::error::{Result, RouterError};
use crate::handler::{
    controller_endpoint, Controller, ControllerRef, DefaultHandlerResolver, Endpoint, Handler,
    HandlerResolver, INVOKE_ACTION,
};
use crate::middleware::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// Validates request input and returns the validated data.
pub trait RequestSchema: Send + Sync {
    /// Validates the request, returning the accepted data or error messages.
    fn validate(&self, request: &Request) -> std::result::Result<Value, Vec<String>>;
}

/// Schema requiring string fields in a JSON object body.
#[derive(Debug, Clone)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    /// Creates a schema requiring `fields`.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl RequestSchema for RequiredFields {
    fn validate(&self, request: &Request) -> std::result::Result<Value, Vec<String>> {
        let body: Map<String, Value> = if request.body.is_empty() {
            Map::new()
        } else {
            request
                .json()
                .map_err(|e| vec![format!("body must be a JSON object: {e}")])?
        };

        let mut validated = Map::new();
        let mut errors = Vec::new();
        for field in &self.fields {
            match body.get(field) {
                Some(Value::String(value)) => {
                    validated.insert(field.clone(), Value::String(value.clone()));
                }
                Some(_) => errors.push(format!("{field} must be a string")),
                None => errors.push(format!("{field} is required")),
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(validated))
        } else {
            Err(errors)
        }
    }
}

/// What fills a handler argument.
#[derive(Clone)]
pub enum SlotKind {
    /// The request itself.
    Request,
    /// A route parameter, by name.
    Param(String),
    /// Request input validated by a schema.
    Input(Arc<dyn RequestSchema>),
}

/// A named handler argument.
#[derive(Clone)]
pub struct Slot {
    name: String,
    kind: SlotKind,
}

impl Slot {
    /// An argument receiving the request.
    pub fn request(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Request,
        }
    }

    /// An argument receiving a route parameter.
    pub fn param(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: SlotKind::Param(name.clone()),
            name,
        }
    }

    /// An argument receiving input validated by `schema`.
    pub fn input(name: impl Into<String>, schema: impl RequestSchema + 'static) -> Self {
        Self {
            name: name.into(),
            kind: SlotKind::Input(Arc::new(schema)),
        }
    }

    /// Returns the argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn fill(&self, request: &Request) -> Result<Argument> {
        Ok(match &self.kind {
            SlotKind::Request => Argument::Request(request.clone()),
            SlotKind::Param(param) => Argument::Param(
                request
                    .params
                    .get(param)
                    .or_else(|| request.attribute_text(param))
                    .map(str::to_string),
            ),
            SlotKind::Input(schema) => {
                Argument::Input(schema.validate(request).map_err(RouterError::Validation)?)
            }
        })
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            SlotKind::Request => "Request".to_string(),
            SlotKind::Param(param) => format!("Param({param})"),
            SlotKind::Input(_) => "Input".to_string(),
        };
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// A filled argument.
#[derive(Debug, Clone)]
pub enum Argument {
    /// The request.
    Request(Request),
    /// A route parameter; `None` when the request did not carry it.
    Param(Option<String>),
    /// Validated input.
    Input(Value),
}

/// Filled arguments, looked up by slot name.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: HashMap<String, Argument>,
}

impl Arguments {
    /// Returns a request argument.
    pub fn request(&self, name: &str) -> Option<&Request> {
        match self.values.get(name)? {
            Argument::Request(request) => Some(request),
            _ => None,
        }
    }

    /// Returns a parameter argument.
    pub fn param(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            Argument::Param(value) => value.as_deref(),
            _ => None,
        }
    }

    /// Returns an input argument.
    pub fn input(&self, name: &str) -> Option<&Value> {
        match self.values.get(name)? {
            Argument::Input(value) => Some(value),
            _ => None,
        }
    }
}

type BindingBody = Arc<dyn Fn(Arguments) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

#[derive(Clone)]
struct Binding {
    slots: Arc<[Slot]>,
    body: BindingBody,
}

impl Binding {
    fn endpoint(&self) -> Endpoint {
        let binding = self.clone();
        Arc::new(move |request: Request| -> BoxFuture<'static, Result<Response>> {
            let arguments = binding
                .slots
                .iter()
                .map(|slot| Ok((slot.name.clone(), slot.fill(&request)?)))
                .collect::<Result<HashMap<_, _>>>();
            match arguments {
                Ok(values) => (binding.body)(Arguments { values }),
                Err(e) => future::ready(Err(e)).boxed(),
            }
        })
    }
}

/// Shared controllers and injectable handler bindings.
#[derive(Clone, Default)]
pub struct Container {
    controllers: HashMap<String, Arc<dyn Controller>>,
    bindings: HashMap<String, Binding>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared controller under its name.
    #[must_use]
    pub fn controller(mut self, controller: impl Controller + 'static) -> Self {
        let controller: Arc<dyn Controller> = Arc::new(controller);
        self.controllers
            .insert(controller.name().to_string(), controller);
        self
    }

    /// Binds a handler key to its arguments and body.
    ///
    /// The key is a handler name or `Controller::action`, matching
    /// [`Handler::describe`].
    #[must_use]
    pub fn bind<F, Fut>(mut self, key: impl Into<String>, slots: Vec<Slot>, body: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.bindings.insert(
            key.into(),
            Binding {
                slots: slots.into(),
                body: Arc::new(move |args: Arguments| -> BoxFuture<'static, Result<Response>> {
                    Box::pin(body(args))
                }),
            },
        );
        self
    }

    /// Returns a shared controller.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Controller>> {
        self.controllers.get(name).cloned()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolves handlers through a [`Container`].
///
/// Bindings win, then shared controllers; everything else goes to the
/// fallback resolver.
#[derive(Debug, Clone)]
pub struct ContainerHandlerResolver {
    container: Arc<Container>,
    fallback: DefaultHandlerResolver,
}

impl ContainerHandlerResolver {
    /// Creates a resolver over `container`.
    pub fn new(container: impl Into<Arc<Container>>) -> Self {
        Self {
            container: container.into(),
            fallback: DefaultHandlerResolver::new(),
        }
    }

    /// Sets the resolver used for handlers the container does not know.
    #[must_use]
    pub fn with_fallback(mut self, fallback: DefaultHandlerResolver) -> Self {
        self.fallback = fallback;
        self
    }
}

impl HandlerResolver for ContainerHandlerResolver {
    fn resolve(&self, handler: &Handler) -> Result<Endpoint> {
        if !matches!(handler, Handler::Closure(_)) {
            if let Some(binding) = self.container.bindings.get(&handler.describe()) {
                return Ok(binding.endpoint());
            }
        }

        let shared = match handler {
            Handler::Reference(name) => self
                .container
                .get(name)
                .map(|controller| (controller, INVOKE_ACTION)),
            Handler::Action {
                controller: ControllerRef::Name(name),
                action,
            } => self
                .container
                .get(name)
                .map(|controller| (controller, action.as_str())),
            _ => None,
        };

        match shared {
            Some((controller, action)) => controller_endpoint(controller, action),
            None => self.fallback.resolve(handler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingController {
        calls: Arc<AtomicUsize>,
    }

    impl Controller for CountingController {
        fn name(&self) -> &str {
            "CountingController"
        }

        fn has_action(&self, action: &str) -> bool {
            action == "hello"
        }

        fn call<'a>(&'a self, _action: &'a str, _req: Request) -> BoxFuture<'a, Result<Response>> {
            Box::pin(async move {
                let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Response::new(201).header("X-Calls", calls.to_string()))
            })
        }
    }

    fn login_request(body: &str) -> Request {
        Request::post("/schema").body(body)
    }

    #[tokio::test]
    async fn test_resolves_shared_controller() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new().controller(CountingController {
            calls: Arc::clone(&calls),
        });
        let resolver = ContainerHandlerResolver::new(container);

        let handler = Handler::action("CountingController", "hello");
        for _ in 0..2 {
            let res = resolver.resolve(&handler).unwrap()(Request::get("/hi")).await.unwrap();
            assert_eq!(res.status, 201);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_injects_route_params() {
        let container = Container::new().bind(
            "RouteParamController::show",
            vec![Slot::request("request"), Slot::param("id")],
            |args: Arguments| async move {
                let path = args.request("request").map(|r| r.path.clone()).unwrap_or_default();
                let id = args.param("id").unwrap_or_default().to_string();
                Ok(Response::ok().header("X-Id", id).header("X-Path", path))
            },
        );
        let resolver = ContainerHandlerResolver::new(container);

        let mut request = Request::get("/users/42");
        request.params.insert("id", "42");
        let endpoint = resolver
            .resolve(&Handler::action("RouteParamController", "show"))
            .unwrap();
        let res = endpoint(request).await.unwrap();

        assert_eq!(res.get_header("X-Id"), Some("42"));
        assert_eq!(res.get_header("X-Path"), Some("/users/42"));
    }

    #[tokio::test]
    async fn test_param_falls_back_to_attribute() {
        let container = Container::new().bind("show", vec![Slot::param("id")], |args: Arguments| async move {
            Ok(Response::text(args.param("id").unwrap_or("none").to_string()))
        });
        let resolver = ContainerHandlerResolver::new(container);
        let endpoint = resolver.resolve(&Handler::reference("show")).unwrap();

        let res = endpoint(Request::get("/").with_attribute("id", "7")).await.unwrap();
        assert_eq!(res.body_string().as_deref(), Some("7"));

        let res = endpoint(Request::get("/")).await.unwrap();
        assert_eq!(res.body_string().as_deref(), Some("none"));
    }

    fn schema_container() -> Container {
        Container::new().bind(
            "RequestSchemaController::handle",
            vec![Slot::input("schema", RequiredFields::new(["email"]))],
            |args: Arguments| async move {
                let email = args
                    .input("schema")
                    .and_then(|data| data.get("email"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(Response::ok().header("X-Email", email))
            },
        )
    }

    #[tokio::test]
    async fn test_schema_validation_passes() {
        let resolver = ContainerHandlerResolver::new(schema_container());
        let endpoint = resolver
            .resolve(&Handler::action("RequestSchemaController", "handle"))
            .unwrap();

        let res = endpoint(login_request(r#"{"email": "user@example.com"}"#))
            .await
            .unwrap();
        assert_eq!(res.get_header("X-Email"), Some("user@example.com"));
    }

    #[tokio::test]
    async fn test_schema_validation_fails() {
        let resolver = ContainerHandlerResolver::new(schema_container());
        let endpoint = resolver
            .resolve(&Handler::action("RequestSchemaController", "handle"))
            .unwrap();

        let err = endpoint(login_request("")).await.unwrap_err();
        assert!(matches!(err, RouterError::Validation(ref errors) if errors == &["email is required"]));

        let err = endpoint(login_request(r#"{"email": 5}"#)).await.unwrap_err();
        assert!(matches!(err, RouterError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_handlers_use_fallback() {
        let fallback = DefaultHandlerResolver::new().function("ping", |_req| async { Ok(Response::text("pong")) });
        let resolver = ContainerHandlerResolver::new(Container::new()).with_fallback(fallback);

        let res = resolver.resolve(&Handler::reference("ping")).unwrap()(Request::get("/"))
            .await
            .unwrap();
        assert_eq!(res.body_string().as_deref(), Some("pong"));

        assert!(matches!(
            resolver.resolve(&Handler::reference("Missing")),
            Err(RouterError::InvalidHandler(_))
        ));
    }
}
