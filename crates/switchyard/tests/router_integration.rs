//! End-to-end tests: registration, resolution, dispatch and caching working
//! together through a [`Router`].

use std::sync::Arc;

use switchyard::{
    Arguments, BoxFuture, Container, ContainerHandlerResolver, Controller, DefaultHandlerResolver,
    DefaultRouteMiddlewareResolver, Dispatcher, FileStore, Handler, Method, Middleware,
    MiddlewareRef, Next, ParamType, Registrar, Request, RequiredFields, ResourceOptions, Response,
    Result, RouteCache, RouteCollector, RouteGroup, RouteOptions, Router, RouterError, Slot,
    ROUTE_ATTRIBUTE,
};

/// Appends `-tag` to the response body on the way out.
struct Suffix(&'static str);

impl Middleware for Suffix {
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let mut res = next.handle(request).await?;
            res.body.extend_from_slice(format!("-{}", self.0).as_bytes());
            Ok(res)
        })
    }
}

/// A resource controller answering `action:id`.
struct UserController;

impl Controller for UserController {
    fn name(&self) -> &str {
        "UserController"
    }

    fn has_action(&self, action: &str) -> bool {
        matches!(action, "index" | "show" | "store" | "update" | "destroy")
    }

    fn call<'a>(&'a self, action: &'a str, request: Request) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let id = request.params.get("id").unwrap_or("-");
            Ok(Response::text(format!("{action}:{id}")))
        })
    }
}

fn body(res: &Response) -> String {
    res.body_string().unwrap_or_default()
}

fn user_router(routes: RouteCollector) -> Router {
    Router::new(Arc::new(routes)).with_dispatcher(
        Dispatcher::new()
            .with_handler_resolver(DefaultHandlerResolver::new().controller("UserController", || UserController)),
    )
}

#[tokio::test]
async fn test_middleware_layers_wrap_inside_out() {
    let mut routes = RouteCollector::new();
    routes.add_middleware(MiddlewareRef::instance(Suffix("global")));
    routes
        .group(
            RouteGroup::new("/admin").middleware(MiddlewareRef::instance(Suffix("group"))),
            |admin| {
                admin.get(
                    "/dashboard",
                    Handler::closure(|_req| async { Ok(Response::text("H")) }),
                    RouteOptions::new().middleware(MiddlewareRef::instance(Suffix("route"))),
                )
            },
        )
        .unwrap();

    let router = Router::new(Arc::new(routes));
    let res = router.handle(Request::get("/admin/dashboard")).await.unwrap();
    assert_eq!(body(&res), "H-route-group-global");
}

#[tokio::test]
async fn test_middleware_aliases_resolve_at_dispatch() {
    let mut routes = RouteCollector::new();
    routes
        .get(
            "/ping",
            Handler::closure(|_req| async { Ok(Response::text("pong")) }),
            RouteOptions::new().middleware("stamp").middleware("logging"),
        )
        .unwrap();

    let router = Router::new(Arc::new(routes)).with_dispatcher(
        Dispatcher::new().with_middleware_resolver(
            DefaultRouteMiddlewareResolver::new().register("stamp", || Suffix("stamped")),
        ),
    );
    let res = router.handle(Request::get("/ping")).await.unwrap();
    assert_eq!(body(&res), "pong-stamped");
}

#[tokio::test]
async fn test_resource_routes_and_url_generation() {
    let mut routes = RouteCollector::new();
    routes
        .resource("/users", "UserController", ResourceOptions::new().except("destroy"))
        .unwrap();
    let router = user_router(routes);

    let res = router.handle(Request::get("/users/42")).await.unwrap();
    assert_eq!(body(&res), "show:42");
    let res = router.handle(Request::post("/users")).await.unwrap();
    assert_eq!(body(&res), "store:-");

    assert_eq!(router.url_for("users.show", [("id", 42)]).unwrap(), "/users/42");
    assert_eq!(router.url_for("users.index", Vec::<(&str, &str)>::new()).unwrap(), "/users");
    assert!(router.routes().route("users.destroy").is_none());

    let err = router
        .handle(Request::new(Method::Delete, "/users/42"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::MethodNotAllowed { ref allowed } if allowed == &[Method::Get, Method::Put]));
}

#[tokio::test]
async fn test_host_constrained_routes() {
    let mut routes = RouteCollector::new();
    routes
        .group(RouteGroup::new("").host("api.example.com").name_prefix("api"), |api| {
            api.get(
                "/status",
                Handler::closure(|_req| async { Ok(Response::text("api")) }),
                RouteOptions::new(),
            )
        })
        .unwrap();
    routes
        .get(
            "/status",
            Handler::closure(|_req| async { Ok(Response::text("www")) }),
            RouteOptions::new(),
        )
        .unwrap();

    let router = Router::new(Arc::new(routes));
    let api = Request::from_url(Method::Get, "https://api.example.com/status").unwrap();
    assert_eq!(body(&router.handle(api).await.unwrap()), "api");

    let www = Request::get("/status").host("www.example.com");
    assert_eq!(body(&router.handle(www).await.unwrap()), "www");
}

#[tokio::test]
async fn test_failed_validation_stops_resolution() {
    let mut routes = RouteCollector::new();
    routes
        .get(
            "/users/{id}",
            Handler::closure(|_req| async { Ok(Response::text("show")) }),
            RouteOptions::new().validator("id", ParamType::Int),
        )
        .unwrap();
    routes
        .get(
            "/users/create",
            Handler::closure(|_req| async { Ok(Response::text("create")) }),
            RouteOptions::new().name("users.create"),
        )
        .unwrap();

    let router = Router::new(Arc::new(routes));
    assert_eq!(body(&router.handle(Request::get("/users/7")).await.unwrap()), "show");

    let err = router.handle(Request::get("/users/create")).await.unwrap_err();
    assert!(matches!(err, RouterError::InvalidRouteParameter { ref param, .. } if param == "id"));

    let err = router.handle(Request::get("/missing")).await.unwrap_err();
    assert!(matches!(err, RouterError::RouteNotFound(_)));
}

#[tokio::test]
async fn test_optional_parameters_and_defaults() {
    let mut routes = RouteCollector::new();
    routes
        .get(
            "/posts/{page?}",
            Handler::closure(|req: Request| async move {
                Ok(Response::text(req.params.get("page").unwrap_or("none").to_string()))
            }),
            RouteOptions::new().name("posts").with_default("page", "1"),
        )
        .unwrap();

    let router = Router::new(Arc::new(routes));
    assert_eq!(body(&router.handle(Request::get("/posts")).await.unwrap()), "1");
    assert_eq!(body(&router.handle(Request::get("/posts/3")).await.unwrap()), "3");
    assert_eq!(router.url_for("posts", Vec::<(&str, &str)>::new()).unwrap(), "/posts");
    assert_eq!(router.url_for("posts", [("page", 2)]).unwrap(), "/posts/2");
}

#[tokio::test]
async fn test_cached_routes_serve_requests() {
    let dir = tempfile::tempdir().unwrap();
    let cache = RouteCache::new(Arc::new(FileStore::new(dir.path()))).environment("prod");

    let mut routes = RouteCollector::new();
    routes
        .resource("/users", "UserController", ResourceOptions::new().validator("id", ParamType::Int))
        .unwrap();
    routes
        .get("/health", "HealthCheck", RouteOptions::new().middleware("logging"))
        .unwrap();
    cache.dump(&routes, None).unwrap();
    assert!(cache.has(None).unwrap());

    let loaded = cache.load(None).unwrap();
    assert_eq!(loaded.len(), routes.len());
    assert_eq!(loaded.route("health.index").unwrap().middlewares.len(), 1);

    let router = user_router(loaded);
    assert_eq!(body(&router.handle(Request::get("/users/5")).await.unwrap()), "show:5");
    let err = router.handle(Request::get("/users/abc")).await.unwrap_err();
    assert!(matches!(err, RouterError::InvalidRouteParameter { .. }));

    assert!(cache.clear(None).unwrap());
    assert!(!cache.has(None).unwrap());
}

#[tokio::test]
async fn test_container_injects_arguments() {
    let mut routes = RouteCollector::new();
    routes
        .post("/teams/{team}/members", ("MemberController", "store"), RouteOptions::new())
        .unwrap();

    let container = Container::new().bind(
        "MemberController::store",
        vec![Slot::param("team"), Slot::input("member", RequiredFields::new(["email"]))],
        |args: Arguments| async move {
            let team = args.param("team").unwrap_or_default().to_string();
            let email = args
                .input("member")
                .and_then(|member| member["email"].as_str())
                .unwrap_or_default()
                .to_string();
            Ok(Response::text(format!("{email}@{team}")))
        },
    );
    let router = Router::new(Arc::new(routes)).with_dispatcher(
        Dispatcher::new().with_handler_resolver(ContainerHandlerResolver::new(container)),
    );

    let req = Request::post("/teams/core/members").body(r#"{"email": "ada"}"#);
    let res = router.handle(req).await.unwrap();
    assert_eq!(body(&res), "ada@core");

    let req = Request::post("/teams/core/members").body("{}");
    let err = router.handle(req).await.unwrap_err();
    assert!(matches!(err, RouterError::Validation(ref errors) if errors == &["email is required"]));
}

#[tokio::test]
async fn test_matched_route_is_exposed_to_handlers() {
    let mut routes = RouteCollector::new();
    routes
        .get(
            "/about",
            Handler::closure(|req: Request| async move {
                Ok(Response::text(req.attribute_text(ROUTE_ATTRIBUTE).unwrap_or("?").to_string()))
            }),
            RouteOptions::new().name("about"),
        )
        .unwrap();

    let router = Router::new(Arc::new(routes));
    assert_eq!(body(&router.handle(Request::get("/about")).await.unwrap()), "about");
}
