//! Authentication middleware
//!
//! JWT authentication and role-based access control

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::models::Role;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
    /// Owner a staff account works for, carried in the token
    pub employer_id: Option<Uuid>,
}

impl AuthUser {
    pub fn new(user_id: Uuid, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            roles,
            employer_id: None,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_owner(&self) -> bool {
        self.has_role(Role::Owner)
    }

    /// Fail with `Forbidden` unless the user holds at least one of `roles`
    pub fn require_any_role(&self, roles: &[Role]) -> AppResult<()> {
        if roles.iter().any(|r| self.has_role(*r)) {
            Ok(())
        } else {
            let wanted = roles
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(" or ");
            Err(AppError::Forbidden(format!("Requires role {}", wanted)))
        }
    }
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.to_string(),
        None => {
            return unauthorized("Missing or invalid Authorization header").into_response();
        }
    };

    let auth_user = match decode_access_token(&token, &state.config.jwt.secret)
        .and_then(|claims| claims.into_auth_user())
    {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    tracing::debug!(user_id = %auth_user.user_id, "authenticated request");
    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

fn unauthorized(message: &str) -> AppError {
    AppError::Unauthorized {
        message: message.to_string(),
        message_id: "Silakan masuk terlebih dahulu".to_string(),
    }
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| unauthorized("Authentication required"))
    }
}
