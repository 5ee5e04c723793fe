//! mon demo server.
//!
//! Wires the dispatch pipeline together behind a hyper accept loop: a small
//! set of demo routes (closures and a controller), an access-log middleware,
//! and an in-memory session store registered as a container service.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MON_LISTEN` | `0.0.0.0:8086` | Bind address |
//! | `MON_DEBUG` | `false` | Verbose error responses |
//! | `MON_CALLBACK_CACHE_MAX` | `1024` | Composed-callable cache bound |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mon_core::{
    Container, Controller, CoreConfig, DefaultExceptionHandler, Dispatcher, Flow, Handler,
    Invocation, MemorySessionStore, Middleware, MiddlewareRegistry, Next, ParamSpec,
    SessionStore, VarValue,
};
use mon_http::{HttpConfig, MonHttpService};
use mon_model::{HandlerOutcome, Request};
use mon_router::Router;

/// Version reported on the demo index page.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Logs method, path, status, and duration around the rest of the chain.
struct AccessLog;

impl Middleware for AccessLog {
    fn process(&self, request: &mut Request, next: &dyn Next) -> Flow {
        let method = request.method().clone();
        let path = request.path().to_owned();
        let start = std::time::Instant::now();
        next.run(request).map(move |response| {
            info!(
                %method,
                path,
                status = response.status().as_u16(),
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "handled request",
            );
            response
        })
    }
}

/// Demo controller backing `/users/*` routes.
struct UserController;

impl Controller for UserController {
    fn action(&self, name: &str, ctx: &Invocation<'_>) -> Option<HandlerOutcome> {
        match name {
            "show" => {
                let id = ctx.int("id")?;
                Some(HandlerOutcome::json(serde_json::json!({
                    "id": id,
                    "name": format!("user-{id}"),
                })))
            }
            "index" => {
                let page = ctx.int("page").unwrap_or(1);
                Some(HandlerOutcome::json(serde_json::json!({
                    "page": page,
                    "users": [],
                })))
            }
            _ => None,
        }
    }
}

/// Build the demo route table, registry, and container.
fn build_dispatcher(config: CoreConfig) -> Result<Dispatcher> {
    let mut router = Router::new();
    let registry = MiddlewareRegistry::new();
    let container = Container::new();

    registry.register("access-log", AccessLog);
    container.register_controller("UserController", || Arc::new(UserController));
    container.register_service(
        "sessions",
        Arc::new(MemorySessionStore::new()),
    );

    router.group("", vec!["access-log".to_owned()], |router| -> Result<()> {
        router
            .get(
                "/",
                Handler::closure(|_| HandlerOutcome::text(format!("<h1>mon {VERSION}</h1>"))),
            )
            .context("register /")?;

        router
            .get(
                "/health",
                Handler::closure(|_| {
                    HandlerOutcome::json(serde_json::json!({"status": "running"}))
                }),
            )
            .context("register /health")?;

        let show = Handler::method("UserController@show")
            .context("parse UserController@show")?
            .with_params(vec![ParamSpec::var("id")]);
        let id = router
            .get(r"/users/{id:\d+}", show)
            .context("register /users/{id}")?;
        router.name(id, "users.show").context("name users.show")?;

        let index = Handler::method("UserController@index")
            .context("parse UserController@index")?
            .with_params(vec![ParamSpec::var_or("page", VarValue::Int(1))]);
        router
            .get(r"/users[/{page:\d+}]", index)
            .context("register /users[/{page}]")?;

        router
            .get(
                "/visits",
                Handler::closure(|ctx| {
                    let sessions: Arc<MemorySessionStore> = match ctx.service("sessions") {
                        Ok(store) => store,
                        Err(err) => return HandlerOutcome::fail(err),
                    };
                    let key = ctx
                        .request()
                        .remote_addr()
                        .map_or_else(|| "anonymous".to_owned(), |a| a.ip().to_string());
                    let count = sessions
                        .get(&key, "visits")
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(0)
                        + 1;
                    sessions.set(&key, "visits", count.to_string());
                    HandlerOutcome::json(serde_json::json!({"visits": count}))
                }),
            )
            .context("register /visits")?;

        router
            .get("/old-home", Handler::closure(|_| HandlerOutcome::redirect("/")))
            .context("register /old-home")?;

        router
            .fallback(Handler::closure(|ctx| {
                HandlerOutcome::abort(
                    http::StatusCode::NOT_FOUND,
                    format!("<h1>nothing at {}</h1>", ctx.request().path()),
                )
            }))
            .context("register fallback")?;

        Ok(())
    })?;

    Ok(Dispatcher::new(
        router,
        Arc::new(registry),
        Arc::new(container),
        Arc::new(DefaultExceptionHandler),
        config,
    ))
}

/// Run the accept loop until a shutdown signal arrives.
async fn serve(listener: TcpListener, service: MonHttpService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone().with_remote_addr(peer_addr);
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    init_tracing(&log_level)?;

    let core_config = CoreConfig::from_env();
    let listen = std::env::var("MON_LISTEN").unwrap_or_else(|_| "0.0.0.0:8086".to_owned());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address: {listen}"))?;

    info!(
        %addr,
        debug = core_config.debug,
        cache_max = core_config.callback_cache_max,
        version = VERSION,
        "starting mon server",
    );

    let dispatcher = Arc::new(build_dispatcher(core_config).context("route setup failed")?);
    let service = MonHttpService::new(dispatcher, HttpConfig::default());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    serve(listener, service).await
}
