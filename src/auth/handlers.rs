use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::{
    dto::{
        AuthResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest, RegisterRequest,
        ResetConfirmBody, ResetRequestBody, ResetRequestedResponse, VerifiedEmailResponse,
        VerifyEmailBody,
    },
    extractors::CurrentUser,
    services,
};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/reset-password/request", post(request_password_reset))
        .route("/auth/reset-password/confirm", post(confirm_password_reset))
        .route("/auth/verify-email", post(verify_email))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(services::login(&state, payload).await?))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

#[instrument(skip(state, user))]
async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MessageResponse>, ApiError> {
    services::logout(&state, user.id).await?;
    Ok(Json(MessageResponse {
        message: "Logged out".into(),
    }))
}

#[instrument(skip(user))]
async fn me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip(state, payload))]
async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequestBody>,
) -> Result<Json<ResetRequestedResponse>, ApiError> {
    let debug_token = services::request_password_reset(&state, &payload.email).await?;
    Ok(Json(ResetRequestedResponse {
        message: "If that email is registered, a reset link has been sent".into(),
        debug_token,
    }))
}

#[instrument(skip(state, payload))]
async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetConfirmBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    services::reset_password(&state, &payload.token, &payload.new_password).await?;
    Ok(Json(MessageResponse {
        message: "Password updated".into(),
    }))
}

#[instrument(skip(state, payload))]
async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailBody>,
) -> Result<Json<VerifiedEmailResponse>, ApiError> {
    let email = services::verify_email(&state, &payload.token).await?;
    Ok(Json(VerifiedEmailResponse { email }))
}
