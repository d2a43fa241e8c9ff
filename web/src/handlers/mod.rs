pub mod auth;
pub mod health;
pub mod index;
pub mod media;

use crate::error::ApiError;

/// Fallback for every unrouted path.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
