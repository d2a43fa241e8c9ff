use std::collections::BTreeMap;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use authz::{Capability, User};

use crate::AppState;

/// What the signed-in viewer is allowed to see.
#[derive(Debug, Serialize)]
pub struct ViewerResponse {
    pub id: String,
    /// False when access comes from the default group.
    pub found: bool,
    pub capabilities: BTreeMap<Capability, bool>,
    pub max_resource_age_secs: i64,
    pub page_size: u32,
    pub show_media_by_default: bool,
}

/// GET /
pub async fn index(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Json<ViewerResponse> {
    Json(ViewerResponse {
        capabilities: user.permission.capabilities().resolved(),
        max_resource_age_secs: user.permission.max_resource_age().num_seconds(),
        page_size: state.settings.page_size,
        show_media_by_default: state.settings.show_media_by_default,
        found: user.found,
        id: user.id,
    })
}
