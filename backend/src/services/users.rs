//! Account management for owners and their staff

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::models::{Role, User};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::auth::hash_password;

pub(crate) const USER_COLUMNS: &str =
    "id, email, name, password_hash, role, employer_id, is_active, created_at, updated_at";

/// User row including the password hash, never serialized
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
    pub employer_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role.parse()?,
            employer_id: row.employer_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// New account created by an owner
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// Defaults to staff
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveInput {
    pub is_active: bool,
}

/// User management service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The owner's own account followed by their staff
    pub async fn list(&self, owner: &AuthUser) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1 OR employer_id = $1 \
             ORDER BY (id = $1) DESC, name",
            USER_COLUMNS
        ))
        .bind(owner.user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Create an account. Staff accounts are attached to the creating owner.
    pub async fn create(&self, owner: &AuthUser, input: CreateUserInput) -> AppResult<User> {
        input.validate()?;

        let role = input.role.unwrap_or(Role::Pegawai);
        let employer_id = match role {
            Role::Pegawai => Some(owner.user_id),
            Role::Owner => None,
        };
        let password_hash = hash_password(&input.password)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, name, password_hash, role, employer_id, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.email.trim().to_lowercase())
        .bind(input.name.trim())
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(employer_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::DuplicateEntry("email".to_string())
            }
            other => AppError::DatabaseError(other),
        })?;

        let user = User::try_from(row)?;
        tracing::info!(user_id = %user.id, role = %user.role, created_by = %owner.user_id, "user created");
        Ok(user)
    }

    /// Enable or disable one of the owner's staff accounts
    pub async fn set_active(&self, owner: &AuthUser, user_id: Uuid, is_active: bool) -> AppResult<User> {
        if user_id == owner.user_id {
            return Err(AppError::Conflict {
                resource: "user".to_string(),
                message: "You cannot change your own account status".to_string(),
                message_id: "Anda tidak dapat mengubah status akun sendiri".to_string(),
            });
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET is_active = $3, updated_at = NOW() \
             WHERE id = $1 AND employer_id = $2 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(owner.user_id)
        .bind(is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!(user_id = %user_id, is_active, "user status changed");
        User::try_from(row)
    }
}
