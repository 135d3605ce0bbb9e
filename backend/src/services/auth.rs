//! Authentication service for login, owner bootstrap and access tokens

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::models::{Role, User};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::users::{UserRow, USER_COLUMNS};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// First owner account, accepted only while no owner exists
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterOwnerInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_id: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &User, expiry_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id.to_string(),
            roles: vec![user.role.as_str().to_string()],
            employer_id: user.employer_id.map(|id| id.to_string()),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Turn verified claims into the request's user. Unknown roles are
    /// dropped; a token left with no role is rejected.
    pub fn into_auth_user(self) -> AppResult<AuthUser> {
        let user_id = Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)?;
        let roles: Vec<Role> = self.roles.iter().filter_map(|r| r.parse().ok()).collect();
        if roles.is_empty() {
            return Err(AppError::InvalidToken);
        }
        let employer_id = self
            .employer_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AppError::InvalidToken)?;

        Ok(AuthUser {
            user_id,
            roles,
            employer_id,
        })
    }
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

pub fn encode_access_token(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify signature and expiry of an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "access token rejected");
        AppError::InvalidToken
    })
}

pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

fn invalid_login() -> AppError {
    AppError::Unauthorized {
        message: "Invalid email or password".to_string(),
        message_id: "Email atau kata sandi salah".to_string(),
    }
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate user with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthTokens> {
        input.validate()?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(input.email.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(invalid_login)?;

        if !row.is_active {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_id: "Akun dinonaktifkan".to_string(),
            });
        }

        let valid = verify(&input.password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(invalid_login());
        }

        let user = User::try_from(row)?;
        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
        self.issue(user)
    }

    /// Create the first owner account. Fails once any owner exists.
    pub async fn register_owner(&self, input: RegisterOwnerInput) -> AppResult<AuthTokens> {
        input.validate()?;

        let owners = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'OWNER'")
            .fetch_one(&self.db)
            .await?;
        if owners > 0 {
            return Err(AppError::Conflict {
                resource: "owner".to_string(),
                message: "An owner account already exists".to_string(),
                message_id: "Akun pemilik sudah ada".to_string(),
            });
        }

        let password_hash = hash_password(&input.password)?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, name, password_hash, role, employer_id, is_active) \
             VALUES ($1, $2, $3, $4, 'OWNER', NULL, TRUE) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.email.trim().to_lowercase())
        .bind(input.name.trim())
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::DuplicateEntry("email".to_string())
            }
            other => AppError::DatabaseError(other),
        })?;

        let user = User::try_from(row)?;
        tracing::info!(user_id = %user.id, "owner account created");
        self.issue(user)
    }

    fn issue(&self, user: User) -> AppResult<AuthTokens> {
        let claims = Claims::for_user(&user, self.access_token_expiry);
        let access_token = encode_access_token(&claims, &self.jwt_secret)?;
        Ok(AuthTokens {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-length";

    fn staff(employer: Uuid) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "kasir@kedai.id".to_string(),
            name: "Kasir".to_string(),
            role: Role::Pegawai,
            employer_id: Some(employer),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_round_trip_keeps_role_and_employer() {
        let employer = Uuid::new_v4();
        let user = staff(employer);
        let token = encode_access_token(&Claims::for_user(&user, 3600), SECRET).unwrap();

        let auth = decode_access_token(&token, SECRET)
            .and_then(Claims::into_auth_user)
            .unwrap();
        assert_eq!(auth.user_id, user.id);
        assert_eq!(auth.roles, vec![Role::Pegawai]);
        assert_eq!(auth.employer_id, Some(employer));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = encode_access_token(&Claims::for_user(&staff(Uuid::new_v4()), 3600), SECRET)
            .unwrap();
        assert!(matches!(
            decode_access_token(&token, "another-secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = encode_access_token(&Claims::for_user(&staff(Uuid::new_v4()), -3600), SECRET)
            .unwrap();
        assert!(decode_access_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_claims_without_known_role_are_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            roles: vec!["ADMIN".to_string()],
            employer_id: None,
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.into_auth_user(), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_login_input_validation() {
        let input = LoginInput {
            email: "bukan-email".to_string(),
            password: "rahasia123".to_string(),
        };
        assert!(input.validate().is_err());
    }
}
