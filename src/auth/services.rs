use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use regex::Regex;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use crate::auth::repo::{AuthToken, TokenPurpose, User, UserRole};
use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::mailer;
use crate::state::AppState;

/// Length of the opaque tokens stored in auth_tokens.
const OPAQUE_TOKEN_LEN: usize = 48;

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Random bearer credential for the auth_tokens table. The value itself
/// carries no meaning; purpose and expiry live in the row.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(OPAQUE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.access_ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "access token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Sign a fresh access JWT and store a new refresh-purpose row.
pub async fn issue_token_pair(state: &AppState, user_id: Uuid) -> anyhow::Result<IssuedTokens> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user_id)?;
    let refresh_token = issue_purpose_token(
        state,
        user_id,
        TokenPurpose::Refresh,
        state.config.tokens.refresh_ttl_minutes,
    )
    .await?;
    Ok(IssuedTokens {
        access_token,
        refresh_token,
    })
}

async fn issue_purpose_token(
    state: &AppState,
    user_id: Uuid,
    purpose: TokenPurpose,
    ttl_minutes: i64,
) -> anyhow::Result<String> {
    let token = generate_token();
    let expires_at = OffsetDateTime::now_utc() + TimeDuration::minutes(ttl_minutes);
    AuthToken::insert(&state.db, user_id, &token, purpose, expires_at).await?;
    Ok(token)
}

pub async fn register(state: &AppState, mut req: RegisterRequest) -> Result<AuthResponse, ApiError> {
    req.email = req.email.trim().to_lowercase();

    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let role = UserRole::parse(&req.role).ok_or_else(|| ApiError::InvalidRole(req.role.clone()))?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let hash = hash_password(&req.password)?;

    // The unique index on users.email still backstops the check above; a
    // concurrent duplicate insert surfaces as DuplicateEmail via error.rs.
    let mut tx = state.db.begin().await?;
    let user = User::create(&mut tx, &req.email, &hash, role).await?;
    crate::profile::repo::insert_for_role(&mut tx, user.id, role, &req.profile).await?;
    tx.commit().await?;

    let verify_token = issue_purpose_token(
        state,
        user.id,
        TokenPurpose::EmailVerification,
        state.config.tokens.verify_ttl_minutes,
    )
    .await?;

    let link = format!(
        "{}/verify-email?token={}",
        state.config.public_base_url, verify_token
    );
    if let Err(e) = state
        .mailer
        .send(&user.email, "Verify your email", &mailer::verification_email(&link))
        .await
    {
        // Registration stands even if the mail bounces; the user can ask for
        // a new verification token later.
        warn!(error = %e, user_id = %user.id, "failed to send verification email");
    }

    let tokens = issue_token_pair(state, user.id).await?;

    info!(user_id = %user.id, email = %user.email, role = %role.as_str(), "user registered");
    Ok(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: PublicUser::from(user),
        debug_verification_token: state.config.return_debug_tokens.then_some(verify_token),
    })
}

pub async fn login(state: &AppState, mut req: LoginRequest) -> Result<AuthResponse, ApiError> {
    req.email = req.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %req.email, "login unknown email");
            ApiError::Unauthorized("Invalid credentials".into())
        })?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let tokens = issue_token_pair(state, user.id).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: PublicUser::from(user),
        debug_verification_token: None,
    })
}

/// Rotation: the presented token is consumed in one atomic DELETE, so a
/// replay (or a concurrent duplicate) finds nothing and is rejected.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<AuthResponse, ApiError> {
    let row = AuthToken::consume(&state.db, refresh_token, TokenPurpose::Refresh)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired refresh token".into()))?;

    if row.expires_at < OffsetDateTime::now_utc() {
        // Already purged by the consume above.
        warn!(user_id = %row.user_id, "expired refresh token presented");
        return Err(ApiError::Unauthorized("Invalid or expired refresh token".into()));
    }

    let user = User::find_by_id(&state.db, row.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired refresh token".into()))?;

    let tokens = issue_token_pair(state, user.id).await?;

    debug!(user_id = %user.id, "refresh token rotated");
    Ok(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: PublicUser::from(user),
        debug_verification_token: None,
    })
}

/// Idempotent: deleting zero rows is still a successful logout.
pub async fn logout(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    let removed = AuthToken::delete_for_user(&state.db, user_id, TokenPurpose::Refresh).await?;
    info!(user_id = %user_id, removed, "user logged out");
    Ok(())
}

/// Returns the raw token only when the debug gate is on; the response shape
/// seen by clients is identical for known and unknown emails.
pub async fn request_password_reset(
    state: &AppState,
    email: &str,
) -> Result<Option<String>, ApiError> {
    let email = email.trim().to_lowercase();

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        debug!("password reset requested for unknown email");
        return Ok(None);
    };

    let token = issue_purpose_token(
        state,
        user.id,
        TokenPurpose::PasswordReset,
        state.config.tokens.reset_ttl_minutes,
    )
    .await?;

    let link = format!(
        "{}/reset-password?token={}",
        state.config.public_base_url, token
    );
    if let Err(e) = state
        .mailer
        .send(&user.email, "Reset your password", &mailer::reset_email(&link))
        .await
    {
        // Surfacing a send failure here would reveal that the email exists.
        warn!(error = %e, user_id = %user.id, "failed to send reset email");
    }

    info!(user_id = %user.id, "password reset token issued");
    Ok(state.config.return_debug_tokens.then_some(token))
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let row = AuthToken::consume(&state.db, token, TokenPurpose::PasswordReset)
        .await?
        .ok_or_else(|| ApiError::InvalidToken("Invalid reset token".into()))?;

    if row.expires_at < OffsetDateTime::now_utc() {
        warn!(user_id = %row.user_id, "expired reset token presented");
        return Err(ApiError::InvalidToken("Reset token expired".into()));
    }

    let hash = hash_password(new_password)?;
    User::update_password(&state.db, row.user_id, &hash).await?;

    // A password reset ends existing sessions.
    AuthToken::delete_for_user(&state.db, row.user_id, TokenPurpose::Refresh).await?;

    info!(user_id = %row.user_id, "password reset");
    Ok(())
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<String, ApiError> {
    let row = AuthToken::consume(&state.db, token, TokenPurpose::EmailVerification)
        .await?
        .ok_or_else(|| ApiError::InvalidToken("Invalid verification token".into()))?;

    if row.expires_at < OffsetDateTime::now_utc() {
        warn!(user_id = %row.user_id, "expired verification token presented");
        return Err(ApiError::InvalidToken("Verification token expired".into()));
    }

    let user = User::find_by_id(&state.db, row.user_id)
        .await?
        .ok_or_else(|| ApiError::InvalidToken("Invalid verification token".into()))?;

    User::mark_email_verified(&state.db, user.id).await?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(user.email)
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}

#[cfg(test)]
mod token_tests {
    use super::*;

    #[test]
    fn generated_tokens_are_opaque_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), OPAQUE_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.example.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@b"));
    }
}

#[cfg(test)]
mod jwt_tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(keys.verify(&tampered).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_opaque_token() {
        // Presenting a refresh-style opaque token as a bearer JWT must fail.
        let keys = make_keys();
        assert!(keys.verify(&generate_token()).is_err());
    }
}
