use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{User, UserRole};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Untyped on purpose; validated against the recognized role set.
    pub role: String,
    #[serde(default)]
    pub profile: ProfileData,
}

/// Role-specific profile fields supplied at registration. Unused fields for
/// the chosen role are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileData {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub trade: Option<String>,
    pub bio: Option<String>,
    pub service_area: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetConfirmBody {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailBody {
    pub token: String,
}

/// Response returned after register, login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
    /// Present only when RETURN_DEBUG_TOKENS is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_verification_token: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub email_verified: bool,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Uniform response for reset requests; identical whether or not the email
/// exists.
#[derive(Debug, Serialize)]
pub struct ResetRequestedResponse {
    pub message: String,
    /// Present only when RETURN_DEBUG_TOKENS is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifiedEmailResponse {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_defaults_profile() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.com","password":"Test123!","role":"homeowner"}"#,
        )
        .unwrap();
        assert!(req.profile.display_name.is_none());
        assert_eq!(req.role, "homeowner");
    }

    #[test]
    fn auth_response_omits_absent_debug_token() {
        let resp = AuthResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                email: "a@b.com".into(),
                role: UserRole::Homeowner,
                email_verified: false,
                created_at: OffsetDateTime::now_utc(),
            },
            debug_verification_token: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("debug_verification_token"));
        assert!(json.contains("\"role\":\"homeowner\""));
    }
}
