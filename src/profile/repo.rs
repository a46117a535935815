use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::ProfileData;
use crate::auth::repo::UserRole;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HomeownerProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProviderProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub trade: Option<String>,
    pub bio: Option<String>,
    pub service_area: Option<String>,
    pub updated_at: OffsetDateTime,
}

/// One of the two role-specific sub-records, serialized flat.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RoleProfile {
    Homeowner(HomeownerProfile),
    Provider(ProviderProfile),
}

/// Create the sub-record matching the user's role. Runs inside the
/// registration transaction.
pub async fn insert_for_role(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    role: UserRole,
    data: &ProfileData,
) -> anyhow::Result<()> {
    match role {
        UserRole::Homeowner => {
            sqlx::query(
                r#"
                INSERT INTO homeowner_profiles (user_id, display_name, phone, address)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(user_id)
            .bind(&data.display_name)
            .bind(&data.phone)
            .bind(&data.address)
            .execute(&mut **tx)
            .await?;
        }
        UserRole::ServiceProvider => {
            sqlx::query(
                r#"
                INSERT INTO provider_profiles
                    (user_id, display_name, phone, trade, bio, service_area)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(user_id)
            .bind(&data.display_name)
            .bind(&data.phone)
            .bind(&data.trade)
            .bind(&data.bio)
            .bind(&data.service_area)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

pub async fn fetch(
    db: &PgPool,
    user_id: Uuid,
    role: UserRole,
) -> anyhow::Result<Option<RoleProfile>> {
    let profile = match role {
        UserRole::Homeowner => sqlx::query_as::<_, HomeownerProfile>(
            r#"
            SELECT user_id, display_name, phone, address, updated_at
            FROM homeowner_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .map(RoleProfile::Homeowner),
        UserRole::ServiceProvider => sqlx::query_as::<_, ProviderProfile>(
            r#"
            SELECT user_id, display_name, phone, trade, bio, service_area, updated_at
            FROM provider_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .map(RoleProfile::Provider),
    };
    Ok(profile)
}

/// Partial update: absent fields keep their stored value.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    role: UserRole,
    data: &ProfileData,
) -> anyhow::Result<Option<RoleProfile>> {
    let profile = match role {
        UserRole::Homeowner => sqlx::query_as::<_, HomeownerProfile>(
            r#"
            UPDATE homeowner_profiles
            SET display_name = COALESCE($2, display_name),
                phone        = COALESCE($3, phone),
                address      = COALESCE($4, address),
                updated_at   = now()
            WHERE user_id = $1
            RETURNING user_id, display_name, phone, address, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&data.display_name)
        .bind(&data.phone)
        .bind(&data.address)
        .fetch_optional(db)
        .await?
        .map(RoleProfile::Homeowner),
        UserRole::ServiceProvider => sqlx::query_as::<_, ProviderProfile>(
            r#"
            UPDATE provider_profiles
            SET display_name = COALESCE($2, display_name),
                phone        = COALESCE($3, phone),
                trade        = COALESCE($4, trade),
                bio          = COALESCE($5, bio),
                service_area = COALESCE($6, service_area),
                updated_at   = now()
            WHERE user_id = $1
            RETURNING user_id, display_name, phone, trade, bio, service_area, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&data.display_name)
        .bind(&data.phone)
        .bind(&data.trade)
        .bind(&data.bio)
        .bind(&data.service_area)
        .fetch_optional(db)
        .await?
        .map(RoleProfile::Provider),
    };
    Ok(profile)
}
