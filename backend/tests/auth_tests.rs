//! Authentication and authorization tests
//!
//! Property-based and unit tests for:
//! - access token round trips keeping user, role and employer
//! - role checks used by every protected handler
//! - account input validation

use chrono::Utc;
use kedai_backend::error::AppError;
use kedai_backend::middleware::AuthUser;
use kedai_backend::services::auth::{decode_access_token, encode_access_token, Claims, LoginInput};
use kedai_backend::services::users::CreateUserInput;
use proptest::prelude::*;
use shared::models::{Role, User};
use uuid::Uuid;
use validator::Validate;

const SECRET: &str = "integration-test-secret";

// ============================================================================
// Property Test Strategies
// ============================================================================

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Owner), Just(Role::Pegawai)]
}

/// Generate valid email addresses
fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z]{5,10}@[a-z]{3,8}\\.(com|id|co\\.id)"
}

/// Generate valid passwords (8+ chars)
fn password_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!@#$%]{8,20}"
}

fn user(role: Role, employer_id: Option<Uuid>) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: "pemilik@kedai.id".to_string(),
        name: "Pemilik".to_string(),
        role,
        employer_id,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// A token carries the user's id, role and employer back unchanged
    #[test]
    fn prop_token_round_trip(role in role_strategy(), has_employer in any::<bool>()) {
        let employer = has_employer.then(Uuid::new_v4);
        let account = user(role, employer);

        let token = encode_access_token(&Claims::for_user(&account, 600), SECRET).unwrap();
        let auth = decode_access_token(&token, SECRET)
            .and_then(Claims::into_auth_user)
            .unwrap();

        prop_assert_eq!(auth.user_id, account.id);
        prop_assert_eq!(auth.roles, vec![role]);
        prop_assert_eq!(auth.employer_id, employer);
    }

    /// Owners pass every role check, staff only checks that list them
    #[test]
    fn prop_role_checks(role in role_strategy()) {
        let auth = AuthUser::new(Uuid::new_v4(), vec![role]);
        prop_assert!(auth.require_any_role(&[Role::Owner, Role::Pegawai]).is_ok());
        prop_assert_eq!(auth.require_any_role(&[Role::Owner]).is_ok(), role == Role::Owner);
    }

    /// Well formed account input passes validation
    #[test]
    fn prop_valid_account_input(email in email_strategy(), password in password_strategy()) {
        let input = CreateUserInput {
            name: "Kasir Pagi".to_string(),
            email,
            password,
            role: None,
        };
        prop_assert!(input.validate().is_ok());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_tampered_token_is_rejected() {
    let token = encode_access_token(&Claims::for_user(&user(Role::Owner, None), 600), SECRET).unwrap();
    let mut tampered = token.clone();
    tampered.push('x');
    assert!(matches!(
        decode_access_token(&tampered, SECRET),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_short_password_is_rejected() {
    let input = CreateUserInput {
        name: "Kasir".to_string(),
        email: "kasir@kedai.id".to_string(),
        password: "pendek".to_string(),
        role: Some(Role::Pegawai),
    };
    let err = AppError::from(input.validate().unwrap_err());
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "password"));
}

#[test]
fn test_login_requires_password() {
    let input = LoginInput {
        email: "pemilik@kedai.id".to_string(),
        password: String::new(),
    };
    assert!(input.validate().is_err());
}
