//! Persistence ports. The marketplace treats storage as a generic document
//! store reachable through these traits; adapters (in-memory, or a real
//! database) live with the binary that wires the services together.

use serde::Serialize;

use super::domain::{
    JoinRequest, Listing, ListingId, ListingStatus, RequestId, SearchFilters, User, UserId,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("no capacity remaining")]
    NoCapacity,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Per-status listing tallies for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// User records, unique by normalized email.
pub trait UserStore: Send + Sync {
    /// Insert the user unless the email is already taken. The check and the
    /// insert are a single atomic step; `Conflict` reports a taken email.
    fn insert_unique_email(&self, user: User) -> Result<User, StoreError>;
    fn fetch(&self, id: &UserId) -> Result<Option<User>, StoreError>;
    fn fetch_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Listing records with the room-reservation primitive.
pub trait ListingStore: Send + Sync {
    fn insert(&self, listing: Listing) -> Result<Listing, StoreError>;
    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, StoreError>;
    /// Whole-record replace; `NotFound` if the id is unknown.
    fn update(&self, listing: Listing) -> Result<(), StoreError>;
    fn delete(&self, id: &ListingId) -> Result<(), StoreError>;
    /// All listings, newest-created first.
    fn all(&self) -> Result<Vec<Listing>, StoreError>;
    /// The owner's listings, newest-created first.
    fn by_owner(&self, owner: &UserId) -> Result<Vec<Listing>, StoreError>;
    /// Listings in a review state, newest-created first.
    fn by_status(&self, status: ListingStatus) -> Result<Vec<Listing>, StoreError>;
    /// Approved listings with availability matching the filters,
    /// newest-created first.
    fn search(&self, filters: &SearchFilters) -> Result<Vec<Listing>, StoreError>;
    fn status_counts(&self) -> Result<StatusCounts, StoreError>;
    /// Atomically decrement `available_rooms` if it is above zero and
    /// return the updated listing. `NoCapacity` when the listing is full;
    /// the count never goes below zero, concurrent callers included.
    fn reserve_room(&self, id: &ListingId) -> Result<Listing, StoreError>;
}

/// Join-request records with the duplicate-application guard.
pub trait RequestStore: Send + Sync {
    /// Insert the request unless a live (pending or approved) request
    /// already exists for the same `(student, listing)` pair. The check and
    /// the insert are a single atomic step; `Conflict` reports a duplicate.
    fn insert_unless_live(&self, request: JoinRequest) -> Result<JoinRequest, StoreError>;
    /// Advisory duplicate probe so callers can order their failure modes;
    /// `insert_unless_live` remains the authoritative guard.
    fn has_live(&self, student: &UserId, listing: &ListingId) -> Result<bool, StoreError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<JoinRequest>, StoreError>;
    fn update(&self, request: JoinRequest) -> Result<(), StoreError>;
    /// The student's requests, newest-created first.
    fn by_student(&self, student: &UserId) -> Result<Vec<JoinRequest>, StoreError>;
    /// Requests routed to an owner (by creation-time snapshot),
    /// newest-created first.
    fn by_owner(&self, owner: &UserId) -> Result<Vec<JoinRequest>, StoreError>;
    /// Requests against one listing, newest-created first.
    fn by_listing(&self, listing: &ListingId) -> Result<Vec<JoinRequest>, StoreError>;
}
