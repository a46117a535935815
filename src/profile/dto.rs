use serde::Serialize;

use crate::auth::dto::PublicUser;
use crate::profile::repo::RoleProfile;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
    pub profile: Option<RoleProfile>,
}
