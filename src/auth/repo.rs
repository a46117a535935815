use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Homeowner,
    ServiceProvider,
}

impl UserRole {
    /// Role strings arrive from clients untyped so that an unknown value can
    /// be answered with the InvalidRole error instead of a serde rejection.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "homeowner" => Some(Self::Homeowner),
            "service_provider" => Some(Self::ServiceProvider),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homeowner => "homeowner",
            Self::ServiceProvider => "service_provider",
        }
    }
}

/// What a stored opaque token is good for. One explicit column, not a string
/// prefix on the token value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Refresh,
    EmailVerification,
    PasswordReset,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub email_verified: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, email_verified, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, email_verified, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password. Runs inside the registration
    /// transaction so the profile sub-record lands atomically with the user.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, role, email_verified, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&mut **tx)
        .await?;
        Ok(user)
    }

    pub async fn update_password(
        db: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn mark_email_verified(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }
}

/// Stored opaque credential (refresh / email-verification / password-reset).
/// Rows are deleted on use or detected expiry, never flagged.
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub purpose: TokenPurpose,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl AuthToken {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        purpose: TokenPurpose,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<AuthToken> {
        let row = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (id, user_id, token, purpose, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, token, purpose, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token)
        .bind(purpose)
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Atomically remove and return the token row. The single DELETE is what
    /// guarantees at-most-one successful use under concurrent requests, and
    /// it also purges expired rows on the access attempt that finds them.
    pub async fn consume(
        db: &PgPool,
        token: &str,
        purpose: TokenPurpose,
    ) -> anyhow::Result<Option<AuthToken>> {
        let row = sqlx::query_as::<_, AuthToken>(
            r#"
            DELETE FROM auth_tokens
            WHERE token = $1 AND purpose = $2
            RETURNING id, user_id, token, purpose, expires_at, created_at
            "#,
        )
        .bind(token)
        .bind(purpose)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete_for_user(
        db: &PgPool,
        user_id: Uuid,
        purpose: TokenPurpose,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1 AND purpose = $2")
            .bind(user_id)
            .bind(purpose)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_roundtrip() {
        for role in [UserRole::Homeowner, UserRole::ServiceProvider] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("admin"), None);
        assert_eq!(UserRole::parse("Homeowner"), None);
        assert_eq!(UserRole::parse(""), None);
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: UserRole::Homeowner,
            email_verified: false,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
        assert!(json.contains("a@b.com"));
    }
}
