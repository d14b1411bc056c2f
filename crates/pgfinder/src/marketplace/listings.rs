use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::access::{self, AccessError, Capability, Identity};
use super::domain::{Listing, ListingDraft, ListingId, ListingPatch, ListingStatus, SearchFilters};
use super::store::{ListingStore, StatusCounts, StoreError};
use super::validate::ValidationError;

/// Listing lifecycle: owner submission, admin review, public search.
pub struct ListingService<S> {
    store: Arc<S>,
}

impl<S> Clone for ListingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> ListingService<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Submit a new listing. It enters the admin review queue as `Pending`
    /// and stays out of search until approved.
    pub fn create(
        &self,
        caller: Option<&Identity>,
        draft: ListingDraft,
    ) -> Result<Listing, ListingError> {
        let caller = access::require(caller, Capability::ManageListings)?;
        let listing = Listing::from_draft(caller.user_id, draft, Utc::now())?;
        let stored = self.store.insert(listing)?;
        info!(listing = %stored.id, owner = %stored.owner_id, "pg listing created");
        Ok(stored)
    }

    /// Public search over approved listings with availability. An empty
    /// filter set returns all of them, newest first.
    pub fn search(&self, filters: &SearchFilters) -> Result<Vec<Listing>, ListingError> {
        Ok(self.store.search(filters)?)
    }

    /// Public single-listing fetch.
    pub fn get(&self, id: &ListingId) -> Result<Listing, ListingError> {
        self.store.fetch(id)?.ok_or(ListingError::NotFound)
    }

    /// The caller's own listings, newest first.
    pub fn my_listings(&self, caller: Option<&Identity>) -> Result<Vec<Listing>, ListingError> {
        let caller = access::require(caller, Capability::ManageListings)?;
        Ok(self.store.by_owner(&caller.user_id)?)
    }

    /// Owner edit. Applies only the supplied fields, then sends the listing
    /// back through review: edits always re-enter `Pending`, which also
    /// clears the verified flag.
    pub fn update(
        &self,
        caller: Option<&Identity>,
        id: &ListingId,
        mut patch: ListingPatch,
    ) -> Result<Listing, ListingError> {
        let caller = access::require(caller, Capability::ManageListings)?;
        let mut listing = self.store.fetch(id)?.ok_or(ListingError::NotFound)?;
        access::require_owner(caller, &listing.owner_id)?;

        patch.status = Some(ListingStatus::Pending);
        listing.apply(patch, Utc::now());
        self.store.update(listing.clone()).map_err(not_found)?;
        info!(listing = %listing.id, "pg listing updated, re-entering review");
        Ok(listing)
    }

    /// Admin approval. Idempotent: approving an approved listing is a
    /// no-op that leaves it approved and verified.
    pub fn approve(
        &self,
        caller: Option<&Identity>,
        id: &ListingId,
    ) -> Result<Listing, ListingError> {
        access::require(caller, Capability::ReviewListings)?;
        let mut listing = self.store.fetch(id)?.ok_or(ListingError::NotFound)?;
        listing.status = ListingStatus::Approved;
        listing.is_verified = true;
        listing.rejection_reason = None;
        listing.updated_at = Utc::now();
        self.store.update(listing.clone()).map_err(not_found)?;
        info!(listing = %listing.id, "pg listing approved");
        Ok(listing)
    }

    /// Admin rejection with an optional reason shown to the owner.
    pub fn reject(
        &self,
        caller: Option<&Identity>,
        id: &ListingId,
        reason: Option<String>,
    ) -> Result<Listing, ListingError> {
        access::require(caller, Capability::ReviewListings)?;
        let mut listing = self.store.fetch(id)?.ok_or(ListingError::NotFound)?;
        listing.status = ListingStatus::Rejected;
        listing.is_verified = false;
        listing.rejection_reason = reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        listing.updated_at = Utc::now();
        self.store.update(listing.clone()).map_err(not_found)?;
        info!(listing = %listing.id, "pg listing rejected");
        Ok(listing)
    }

    /// Hard delete by the owning owner, or an admin. Outstanding join
    /// requests are left untouched; see DESIGN notes on orphans.
    pub fn delete(&self, caller: Option<&Identity>, id: &ListingId) -> Result<(), ListingError> {
        let caller = access::require(caller, Capability::ManageListings)?;
        let listing = self.store.fetch(id)?.ok_or(ListingError::NotFound)?;
        if caller.role != super::domain::Role::Admin {
            access::require_owner(caller, &listing.owner_id)?;
        }
        self.store.delete(id).map_err(not_found)?;
        info!(listing = %listing.id, "pg listing deleted");
        Ok(())
    }

    /// Admin review queue: pending listings, newest first.
    pub fn pending_review(&self, caller: Option<&Identity>) -> Result<Vec<Listing>, ListingError> {
        access::require(caller, Capability::ReviewListings)?;
        Ok(self.store.by_status(ListingStatus::Pending)?)
    }

    /// Admin listing browser, optionally restricted to one review state.
    pub fn listings_for_review(
        &self,
        caller: Option<&Identity>,
        status: Option<ListingStatus>,
    ) -> Result<Vec<Listing>, ListingError> {
        access::require(caller, Capability::ReviewListings)?;
        match status {
            Some(status) => Ok(self.store.by_status(status)?),
            None => Ok(self.store.all()?),
        }
    }

    /// Admin dashboard tallies.
    pub fn stats(&self, caller: Option<&Identity>) -> Result<StatusCounts, ListingError> {
        access::require(caller, Capability::ReviewListings)?;
        Ok(self.store.status_counts()?)
    }
}

fn not_found(err: StoreError) -> ListingError {
    match err {
        StoreError::NotFound => ListingError::NotFound,
        other => ListingError::Store(other),
    }
}

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("listing not found")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ListingError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
