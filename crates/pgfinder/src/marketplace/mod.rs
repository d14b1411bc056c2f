//! The marketplace core: listing and join-request lifecycles plus the
//! role-based access rules every mutating operation passes through.
//!
//! Control flow in one line: an owner submits a listing, an admin approves
//! it, a student requests to join, the owner approves the request, and that
//! approval takes one room off the listing through an atomic store
//! primitive.

pub mod access;
pub mod accounts;
pub mod domain;
pub mod listings;
pub mod requests;
pub mod router;
pub mod store;
pub mod validate;

#[cfg(test)]
mod tests;

pub use access::{AccessError, Capability, Identity};
pub use accounts::{AccountError, AccountService, HasherError, PasswordHasher, Signup};
pub use domain::{
    JoinRequest, Listing, ListingDraft, ListingId, ListingPatch, ListingStatus, RequestId,
    RequestStatus, Role, SearchFilters, User, UserId, UserView,
};
pub use listings::{ListingError, ListingService};
pub use requests::{Decision, RequestError, RequestService};
pub use router::{identity_from_headers, marketplace_router, MarketplaceState};
pub use store::{ListingStore, RequestStore, StatusCounts, StoreError, UserStore};
