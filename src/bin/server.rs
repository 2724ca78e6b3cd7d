use std::{env, fs::OpenOptions, net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use finboard::{
    ApiBaseUrl, AppConfig, AppState, DEFAULT_MAX_IMAGE_BYTES, Mode, build_router,
    graceful_shutdown, logging_middleware,
};

/// The web frontend for the finance backend.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Whether to call the backend directly or through the reverse proxy.
    #[arg(long, value_enum, default_value_t = Mode::Development)]
    mode: Mode,

    /// The origin of the backend, used in development mode.
    #[arg(long, default_value = "http://localhost:8080")]
    backend_origin: String,

    /// The public origin of this app, used in production mode.
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    public_origin: String,

    /// The canonical timezone to display times in, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// How many seconds a fetched list is served from the cache.
    #[arg(long, default_value_t = 30)]
    cache_stale_secs: u64,

    /// The largest account image that can be uploaded, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
    max_image_bytes: usize,

    /// Log request and response bodies.
    #[arg(long)]
    log_bodies: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(error) = setup_logging() {
        eprintln!("Could not set up logging: {error}");
        return ExitCode::FAILURE;
    }

    let args = Args::parse();

    let Ok(secret) = env::var("SECRET") else {
        tracing::error!("The environment variable 'SECRET' must be set");
        return ExitCode::FAILURE;
    };

    let api_base_url =
        match ApiBaseUrl::resolve(args.mode, &args.backend_origin, &args.public_origin) {
            Ok(url) => url,
            Err(error) => {
                tracing::error!("{error}");
                return ExitCode::FAILURE;
            }
        };

    let mut config = AppConfig::new(api_base_url, &args.timezone);
    config.cache_stale_time = Duration::from_secs(args.cache_stale_secs);
    config.max_image_bytes = args.max_image_bytes;

    tracing::info!("Running in {} mode against {}", args.mode, config.api_base_url);

    let state = match AppState::new(config, &secret) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Could not start the server: {error}");
            return ExitCode::FAILURE;
        }
    };

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let mut router = build_router(state);

    if args.log_bodies {
        router = router.layer(middleware::from_fn(logging_middleware));
    }

    let router = add_tracing_layer(router);

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    tracing::info!("HTTP server listening on {}", addr);

    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("The server stopped with an error: {error}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn setup_logging() -> Result<(), std::io::Error> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
                ),
        )
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
