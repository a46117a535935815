use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload of an access token. Refresh tokens are not JWTs; they live in
/// the auth_tokens table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}
