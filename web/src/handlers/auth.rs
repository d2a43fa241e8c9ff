//! Login, OAuth callback and logout.

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use auth::authenticator::google::LOGIN_PATH;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// 302 to `location`, optionally setting a cookie on the way.
fn found(location: &str, set_cookie: Option<&str>) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(location) {
        headers.insert(header::LOCATION, value);
    }
    if let Some(cookie) = set_cookie.and_then(|c| HeaderValue::from_str(c).ok()) {
        headers.insert(header::SET_COOKIE, cookie);
    }
    response
}

fn login_again() -> ApiError {
    ApiError::LoginRequired {
        location: LOGIN_PATH.to_string(),
    }
}

/// GET /auth/login
///
/// Only exists when the OAuth scheme is configured.
pub async fn login(State(state): State<AppState>) -> ApiResult<Response> {
    let Some(oauth) = state.authenticator.oauth() else {
        return Err(ApiError::NotFound);
    };
    let url = oauth.login_url(Utc::now())?;
    Ok(found(&url, None))
}

/// GET /auth/callback
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Response> {
    let Some(oauth) = state.authenticator.oauth() else {
        return Err(ApiError::NotFound);
    };
    if let Some(error) = query.error {
        warn!("Identity provider returned an error: {}", error);
        return Err(login_again());
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        warn!("OAuth callback without code or state");
        return Err(login_again());
    };

    match oauth.complete(&code, &oauth_state, Utc::now()).await {
        Ok((principal, set_cookie)) => {
            info!("{} logged in", principal);
            Ok(found("/", Some(&set_cookie)))
        }
        Err(e) => {
            warn!("OAuth login failed: {}", e);
            Err(login_again())
        }
    }
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = state.authenticator.logout_cookie();
    found("/", cookie.as_deref())
}
