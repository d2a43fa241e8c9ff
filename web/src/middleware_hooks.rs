use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use auth::Challenge;

use crate::error::{ApiError, ReportableError};
use crate::{AppState, VERSION};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Authentication middleware for protected routes
///
/// # Flow
///
/// 1. The configured authenticator resolves the request to a principal
/// 2. On failure, the authenticator's challenge decides the response:
///    401 with `WWW-Authenticate` for Basic, 302 to the login page for OAuth
/// 3. The principal is resolved against the policy into a `User`
/// 4. The `User` is stored in the request extensions for the handlers
///
/// A principal the policy does not know (and no default group) is denied
/// with 403 before any handler runs.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match state.authenticator.authenticate(request.headers()).await {
        Ok(principal) => principal,
        Err(e) => {
            debug!(
                "AUTH MIDDLEWARE: Rejected {} {}: {}",
                request.method(),
                request.uri().path(),
                e
            );
            return Err(match state.authenticator.challenge() {
                Challenge::Basic { realm } => ApiError::Unauthorized { realm },
                Challenge::Redirect(location) => ApiError::LoginRequired { location },
            });
        }
    };

    let user = state.evaluator.lookup(&principal.id).map_err(|e| {
        warn!("AUTH MIDDLEWARE: Access DENIED for {}: {}", principal, e);
        ApiError::from(e)
    })?;
    debug!(
        "AUTH MIDDLEWARE: {} resolved (found in policy: {})",
        user.id, user.found
    );

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Redirects plain HTTP to HTTPS behind a TLS-terminating proxy and marks
/// every response with `Strict-Transport-Security`.
pub async fn upgrade_insecure(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let forwarded_http = request
        .headers()
        .get(FORWARDED_PROTO_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("http"));

    if forwarded_http && !state.settings.allow_unencrypted_traffic {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(state.settings.public_host.as_str());
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let location = format!("https://{}{}", host, path);
        debug!("Upgrading insecure request to {}", location);
        let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
        if let Ok(value) = HeaderValue::from_str(&location) {
            response.headers_mut().insert(header::LOCATION, value);
        }
        return response;
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static(HSTS_VALUE),
    );
    response
}

/// Response processing middleware hook
///
/// Tags every response with the server version and a fresh request id.
pub async fn response_headers(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let mut response = next.run(request).await;

    info!(
        request_id = %request_id,
        "{} {} {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("teleview/{}", VERSION)) {
        headers.insert(header::SERVER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Hands internal errors to the configured reporter.
pub async fn report_errors(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    if let Some(ReportableError(message)) = response.extensions().get::<ReportableError>() {
        state.reporter.report(&method, &path, message);
    }
    response
}
