//! Role and ownership gates applied before every mutating operation.
//!
//! The session transport resolves a caller to an [`Identity`]; the services
//! here check it against an explicit capability table instead of scattering
//! allowed-role sets across call sites. The ownership check is a second,
//! separate gate with its own error so the transport can distinguish "wrong
//! role" from "right role, wrong resource".

use serde::{Deserialize, Serialize};

use super::domain::{Role, UserId};

/// The authenticated caller, as established by the (external) session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

/// Operations the marketplace gates on role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Submit join requests and review one's own applications.
    ApplyToListings,
    /// Create, edit, and delete one's own listings.
    ManageListings,
    /// Decide join requests routed to an owner.
    DecideRequests,
    /// Approve or reject listings awaiting review.
    ReviewListings,
}

impl Capability {
    /// The full allowed-role table. Admin appears wherever it is allowed;
    /// nothing is implied by hierarchy.
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Capability::ApplyToListings => &[Role::Student],
            Capability::ManageListings => &[Role::PgOwner, Role::Admin],
            Capability::DecideRequests => &[Role::PgOwner, Role::Admin],
            Capability::ReviewListings => &[Role::Admin],
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Capability::ApplyToListings => "apply to listings",
            Capability::ManageListings => "manage listings",
            Capability::DecideRequests => "decide join requests",
            Capability::ReviewListings => "review listings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role '{}' may not {}", .role.label(), .capability.label())]
    Forbidden { role: Role, capability: Capability },
    #[error("caller does not own this resource")]
    NotOwner,
}

/// Role gate: the caller must be present and hold a role the capability
/// table allows.
pub fn require(
    identity: Option<&Identity>,
    capability: Capability,
) -> Result<&Identity, AccessError> {
    let identity = identity.ok_or(AccessError::Unauthenticated)?;
    if capability.allowed_roles().contains(&identity.role) {
        Ok(identity)
    } else {
        Err(AccessError::Forbidden {
            role: identity.role,
            capability,
        })
    }
}

/// Ownership gate, applied after the role gate: the caller must be the
/// stored owner of the resource.
pub fn require_owner(identity: &Identity, owner: &UserId) -> Result<(), AccessError> {
    if identity.user_id == *owner {
        Ok(())
    } else {
        Err(AccessError::NotOwner)
    }
}
