//! Signed media links and the media relay.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use auth::SignedToken;
use authz::{ResourceAgeGate, User};

use crate::error::{ApiError, ApiResult};
use crate::media::{self, is_valid_resource, MediaKind};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub resource: String,
    pub kind: MediaKind,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub url: String,
    pub expires: i64,
}

/// GET /media/link?resource=..&kind=image|recording
///
/// Issues a signed link for the current viewer. The resource's creation time
/// is looked up upstream and bound into the link.
pub async fn link(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<LinkQuery>,
) -> ApiResult<Json<LinkResponse>> {
    user.permission.require(query.kind.capability())?;
    if !is_valid_resource(query.kind, &query.resource) {
        return Err(ApiError::BadRequest("invalid resource".to_string()));
    }

    let now = Utc::now();
    let created = state.media.date_created(query.kind, &query.resource).await?;
    ResourceAgeGate::check(created, &user.permission, now)?;

    let (url, token) = media::media_url(
        &state.signer,
        query.kind,
        &query.resource,
        &user.id,
        Some(created),
        state.settings.media_token_ttl,
        now,
    )?;
    debug!("Issued {:?} link for {}", query.kind, user.id);
    Ok(Json(LinkResponse {
        url,
        expires: token.expires,
    }))
}

/// GET /media/images
pub async fn image(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    query: Result<Query<SignedToken>, QueryRejection>,
) -> ApiResult<Response> {
    relay(&state, &user, MediaKind::Image, query).await
}

/// GET /media/recordings
pub async fn recording(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    query: Result<Query<SignedToken>, QueryRejection>,
) -> ApiResult<Response> {
    relay(&state, &user, MediaKind::Recording, query).await
}

async fn relay(
    state: &AppState,
    user: &User,
    kind: MediaKind,
    query: Result<Query<SignedToken>, QueryRejection>,
) -> ApiResult<Response> {
    user.permission.require(kind.capability())?;

    let Query(token) = query.map_err(|e| {
        debug!("Rejected media request without a usable token: {}", e);
        ApiError::AccessDenied
    })?;

    let now = Utc::now();
    token.verify(&state.signer, now)?;
    if token.requester != user.id {
        warn!(
            "Media link issued to {} presented by {}",
            token.requester, user.id
        );
        return Err(ApiError::AccessDenied);
    }
    if !is_valid_resource(kind, &token.resource) {
        return Err(ApiError::BadRequest("invalid resource".to_string()));
    }

    // A signed creation time was looked up upstream when the link was issued.
    let created = match token.created_at()? {
        Some(created) => created,
        None => state.media.date_created(kind, &token.resource).await?,
    };
    ResourceAgeGate::check(created, &user.permission, now)?;

    let media = state.media.fetch(kind, &token.resource).await?;
    info!("Relaying {:?} {} to {}", kind, token.resource, user.id);

    Ok((
        [
            (header::CONTENT_TYPE, media.content_type),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        media.body,
    )
        .into_response())
}
