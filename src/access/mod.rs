//! Caller identity and capability checks.
//!
//! Authentication and permission-bit evaluation live upstream; this module
//! only models the actor record the gateway hands us and the capability
//! queries the transfer core asks of it.

use std::collections::HashSet;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Permission string constants for compile-time safety
pub mod perm {
    /// Grants every permission (super admin).
    pub const ALL: &str = "*";
    /// Grants visibility into every business location.
    pub const LOCATIONS_ALL: &str = "locations:all";

    // Transfers
    pub const TRANSFERS_READ: &str = "transfers:read";
    pub const TRANSFERS_CREATE: &str = "transfers:create";
    pub const TRANSFERS_UPDATE: &str = "transfers:update";
    pub const TRANSFERS_CHECK: &str = "transfers:check";
    pub const TRANSFERS_SEND: &str = "transfers:send";
    pub const TRANSFERS_RECEIVE: &str = "transfers:receive";
    pub const TRANSFERS_COMPLETE: &str = "transfers:complete";
    pub const TRANSFERS_CANCEL: &str = "transfers:cancel";

    // Stock ledger
    pub const STOCK_READ: &str = "stock:read";
    pub const STOCK_ADJUST: &str = "stock:adjust";
}

/// The authenticated actor record supplied by the caller's environment.
///
/// The core trusts this record; it never re-authenticates.
#[derive(Debug, Clone)]
pub struct AuthenticatedActor {
    pub id: Uuid,
    pub business_id: Uuid,
    pub username: String,
    pub permissions: Vec<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuthenticatedActor {
    /// Check if the actor has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == permission || p == perm::ALL)
    }

    pub fn is_super_admin(&self) -> bool {
        self.permissions.iter().any(|p| p == perm::ALL)
    }

    /// Whether the actor may act on or see every location of the business.
    pub fn has_all_locations(&self) -> bool {
        self.has_permission(perm::LOCATIONS_ALL)
    }

    /// Fails with `Forbidden` unless the actor holds `permission`.
    pub fn require(&self, permission: &str) -> Result<(), ServiceError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "missing permission '{}'",
                permission
            )))
        }
    }
}

/// Which locations an actor may see or act from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// All locations in the business.
    All,
    /// Only the explicitly assigned locations (possibly empty).
    Locations(HashSet<Uuid>),
}

impl AccessScope {
    pub fn contains(&self, location_id: Uuid) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Locations(ids) => ids.contains(&location_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AccessScope::All => false,
            AccessScope::Locations(ids) => ids.is_empty(),
        }
    }
}

const HDR_ACTOR_ID: &str = "x-actor-id";
const HDR_BUSINESS_ID: &str = "x-business-id";
const HDR_ACTOR_NAME: &str = "x-actor-name";
const HDR_PERMISSIONS: &str = "x-actor-permissions";
const HDR_FORWARDED_FOR: &str = "x-forwarded-for";

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_str(parts, HDR_ACTOR_ID)
            .ok_or_else(|| ServiceError::AuthError("missing actor identity".to_string()))
            .and_then(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| ServiceError::AuthError("malformed actor id".to_string()))
            })?;

        let business_id = header_str(parts, HDR_BUSINESS_ID)
            .ok_or_else(|| ServiceError::AuthError("missing business identity".to_string()))
            .and_then(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| ServiceError::AuthError("malformed business id".to_string()))
            })?;

        let username = header_str(parts, HDR_ACTOR_NAME)
            .unwrap_or_default()
            .to_string();

        let permissions = header_str(parts, HDR_PERMISSIONS)
            .map(|raw| {
                raw.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let ip_address = header_str(parts, HDR_FORWARDED_FOR)
            .and_then(|raw| raw.split(',').next())
            .map(|ip| ip.trim().to_string());

        let user_agent = header_str(parts, "user-agent").map(|ua| ua.to_string());

        Ok(AuthenticatedActor {
            id,
            business_id,
            username,
            permissions,
            ip_address,
            user_agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(permissions: Vec<&str>) -> AuthenticatedActor {
        AuthenticatedActor {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            username: "tester".to_string(),
            permissions: permissions.into_iter().map(String::from).collect(),
            ip_address: None,
            user_agent: None,
        }
    }

    #[test]
    fn wildcard_grants_everything() {
        let admin = actor(vec![perm::ALL]);
        assert!(admin.has_permission(perm::TRANSFERS_SEND));
        assert!(admin.is_super_admin());
        assert!(admin.has_all_locations());
    }

    #[test]
    fn explicit_permissions_only() {
        let clerk = actor(vec![perm::TRANSFERS_READ, perm::TRANSFERS_CREATE]);
        assert!(clerk.has_permission(perm::TRANSFERS_CREATE));
        assert!(!clerk.has_permission(perm::TRANSFERS_SEND));
        assert!(clerk.require(perm::TRANSFERS_SEND).is_err());
        assert!(!clerk.has_all_locations());
    }

    #[test]
    fn scope_contains() {
        let id = Uuid::new_v4();
        let scope = AccessScope::Locations([id].into_iter().collect());
        assert!(scope.contains(id));
        assert!(!scope.contains(Uuid::new_v4()));
        assert!(AccessScope::All.contains(Uuid::new_v4()));
        assert!(AccessScope::Locations(HashSet::new()).is_empty());
    }
}
