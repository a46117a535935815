use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::auth::dto::{ProfileData, PublicUser};
use crate::auth::extractors::CurrentUser;
use crate::error::ApiError;
use crate::profile::dto::ProfileResponse;
use crate::profile::repo;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(state, user))]
async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = repo::fetch(&state.db, user.id, user.role).await?;
    Ok(Json(ProfileResponse {
        user: PublicUser::from(user),
        profile,
    }))
}

#[instrument(skip(state, user, payload))]
async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ProfileData>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = repo::update(&state.db, user.id, user.role, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".into()))?;
    Ok(Json(ProfileResponse {
        user: PublicUser::from(user),
        profile: Some(profile),
    }))
}
