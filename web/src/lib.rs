use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use auth::{Authenticator, UrlSigner};
use authz::PermissionEvaluator;

pub mod error;
pub mod handlers;
pub mod media;
pub mod middleware_hooks;
pub mod reporter;
pub mod server;
pub mod settings;


pub use media::{HttpMediaSource, MediaKind, MediaSource};
pub use reporter::{get_reporter, ErrorReporter};
pub use server::{start_server, ServerConfig};
pub use settings::Settings;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on the time spent serving one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(32);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<PermissionEvaluator>,
    pub signer: UrlSigner,
    pub authenticator: Arc<dyn Authenticator>,
    pub media: Arc<dyn MediaSource>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub settings: Arc<Settings>,
}

/// Create the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Routes that need an authenticated, policy-resolved user
    let protected = Router::new()
        .route("/", get(handlers::index::index))
        .route("/media/link", get(handlers::media::link))
        .route(media::IMAGES_PATH, get(handlers::media::image))
        .route(media::RECORDINGS_PATH, get(handlers::media::recording))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::authenticate,
        ));

    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/auth/login", get(handlers::auth::login))
        .route("/auth/callback", get(handlers::auth::callback))
        .route("/auth/logout", post(handlers::auth::logout));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(handlers::not_found)
        // Innermost layers first.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::report_errors,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::upgrade_insecure,
        ))
        .layer(middleware::from_fn(middleware_hooks::response_headers))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .with_state(state)
}
