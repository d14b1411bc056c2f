use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::access::{self, AccessError, Capability, Identity};
use super::domain::{JoinRequest, ListingId, RequestId, RequestStatus};
use super::store::{ListingStore, RequestStore, StoreError};

/// The owner's verdict on a pending join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

/// Join-request lifecycle: student submission, owner decision, and the
/// room-count side effect that links an approval back to the listing.
pub struct RequestService<R, L> {
    requests: Arc<R>,
    listings: Arc<L>,
}

impl<R, L> Clone for RequestService<R, L> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            listings: self.listings.clone(),
        }
    }
}

impl<R, L> RequestService<R, L>
where
    R: RequestStore + 'static,
    L: ListingStore + 'static,
{
    pub fn new(requests: Arc<R>, listings: Arc<L>) -> Self {
        Self { requests, listings }
    }

    /// Submit a request against a listing. A student may hold at most one
    /// live (pending or approved) request per listing; rejected requests
    /// free the pair for another attempt. The owner reference is copied
    /// from the listing here and never re-derived.
    pub fn submit(
        &self,
        caller: Option<&Identity>,
        listing_id: &ListingId,
        message: Option<String>,
    ) -> Result<JoinRequest, RequestError> {
        let caller = access::require(caller, Capability::ApplyToListings)?;

        if self.requests.has_live(&caller.user_id, listing_id)? {
            return Err(RequestError::Duplicate);
        }
        let listing = self
            .listings
            .fetch(listing_id)?
            .ok_or(RequestError::ListingNotFound)?;
        if listing.available_rooms == 0 {
            return Err(RequestError::NoAvailability);
        }

        let request = JoinRequest::new(
            caller.user_id,
            *listing_id,
            listing.owner_id,
            message,
            Utc::now(),
        );
        let stored = self
            .requests
            .insert_unless_live(request)
            .map_err(|err| match err {
                StoreError::Conflict => RequestError::Duplicate,
                other => RequestError::Store(other),
            })?;
        info!(request = %stored.id, student = %stored.student_id, listing = %stored.listing_id,
            "join request submitted");
        Ok(stored)
    }

    /// Decide a pending request. Only the owner the request was routed to
    /// at submission time may decide it; both outcomes are terminal.
    ///
    /// Approval takes the room through the store's conditional decrement
    /// before the status write, so two concurrent approvals against a
    /// one-room listing cannot both land: the loser fails with
    /// `NoAvailability` and its request stays pending.
    pub fn decide(
        &self,
        caller: Option<&Identity>,
        id: &RequestId,
        decision: Decision,
        response: Option<String>,
    ) -> Result<JoinRequest, RequestError> {
        let caller = access::require(caller, Capability::DecideRequests)?;
        let mut request = self.requests.fetch(id)?.ok_or(RequestError::NotFound)?;
        access::require_owner(caller, &request.listing_owner_id)?;
        if request.status != RequestStatus::Pending {
            return Err(RequestError::AlreadyDecided);
        }

        if decision == Decision::Approve {
            self.listings
                .reserve_room(&request.listing_id)
                .map_err(|err| match err {
                    StoreError::NoCapacity => RequestError::NoAvailability,
                    StoreError::NotFound => RequestError::ListingNotFound,
                    other => RequestError::Store(other),
                })?;
        }

        request.status = match decision {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        };
        request.response_message = response
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        request.updated_at = Utc::now();
        self.requests.update(request.clone())?;
        info!(request = %request.id, status = request.status.label(), "join request decided");
        Ok(request)
    }

    /// The student's own requests, newest first.
    pub fn my_requests(&self, caller: Option<&Identity>) -> Result<Vec<JoinRequest>, RequestError> {
        let caller = access::require(caller, Capability::ApplyToListings)?;
        Ok(self.requests.by_student(&caller.user_id)?)
    }

    /// Requests routed to the calling owner, newest first.
    pub fn received(&self, caller: Option<&Identity>) -> Result<Vec<JoinRequest>, RequestError> {
        let caller = access::require(caller, Capability::DecideRequests)?;
        Ok(self.requests.by_owner(&caller.user_id)?)
    }

    /// Requests against one of the caller's listings, newest first.
    pub fn for_listing(
        &self,
        caller: Option<&Identity>,
        listing_id: &ListingId,
    ) -> Result<Vec<JoinRequest>, RequestError> {
        let caller = access::require(caller, Capability::DecideRequests)?;
        let listing = self
            .listings
            .fetch(listing_id)?
            .ok_or(RequestError::ListingNotFound)?;
        access::require_owner(caller, &listing.owner_id)?;
        Ok(self.requests.by_listing(listing_id)?)
    }
}

/// Error raised by the join-request service.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("a request for this listing is already pending or approved")]
    Duplicate,
    #[error("listing not found")]
    ListingNotFound,
    #[error("join request not found")]
    NotFound,
    #[error("no rooms available in this listing")]
    NoAvailability,
    #[error("join request has already been decided")]
    AlreadyDecided,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RequestError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
