//! Owner resolution
//!
//! Staff accounts write against their owner's catalog rather than their own,
//! and owners may read a designated shared catalog. The engine receives a
//! [`TenancyResolver`] instead of scattering owner fallbacks through queries.

use shared::models::Role;
use uuid::Uuid;

use crate::config::TenancyConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Owners whose records a request may touch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerScope {
    /// Owner new records are written for
    pub owner_id: Uuid,
    /// Shared catalog owner whose products and suppliers are also visible
    pub fallback_owner_id: Option<Uuid>,
}

impl OwnerScope {
    pub fn single(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            fallback_owner_id: None,
        }
    }

    /// Every owner id records may belong to
    pub fn owner_ids(&self) -> Vec<Uuid> {
        let mut ids = vec![self.owner_id];
        if let Some(fallback) = self.fallback_owner_id {
            if fallback != self.owner_id {
                ids.push(fallback);
            }
        }
        ids
    }

    pub fn covers(&self, owner_id: Uuid) -> bool {
        self.owner_id == owner_id || self.fallback_owner_id == Some(owner_id)
    }
}

/// Maps the current user to the owner scope their requests act in
pub trait TenancyResolver: Send + Sync {
    fn resolve(&self, user: &AuthUser) -> AppResult<OwnerScope>;
}

/// Resolver driven by the employer recorded on the account and the
/// configured designated owner
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTenancy {
    designated_owner_id: Option<Uuid>,
}

impl ConfiguredTenancy {
    pub fn new(designated_owner_id: Option<Uuid>) -> Self {
        Self {
            designated_owner_id,
        }
    }

    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(config.designated_owner_id)
    }
}

impl TenancyResolver for ConfiguredTenancy {
    fn resolve(&self, user: &AuthUser) -> AppResult<OwnerScope> {
        if user.has_role(Role::Owner) {
            return Ok(OwnerScope {
                owner_id: user.user_id,
                fallback_owner_id: self.designated_owner_id.filter(|id| *id != user.user_id),
            });
        }

        if user.has_role(Role::Pegawai) {
            let owner_id = user
                .employer_id
                .or(self.designated_owner_id)
                .ok_or_else(|| {
                    AppError::Forbidden("Staff account is not assigned to an owner".to_string())
                })?;
            return Ok(OwnerScope {
                owner_id,
                fallback_owner_id: self.designated_owner_id.filter(|id| *id != owner_id),
            });
        }

        Err(AppError::Forbidden("Account has no recognised role".to_string()))
    }
}
