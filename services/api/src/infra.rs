use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;
use pgfinder::marketplace::{
    AccountService, HasherError, JoinRequest, Listing, ListingId, ListingService, ListingStatus,
    ListingStore, MarketplaceState, PasswordHasher, RequestId, RequestService, RequestStore,
    SearchFilters, StatusCounts, StoreError, User, UserId, UserStore,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Services =
    MarketplaceState<InMemoryListingStore, InMemoryRequestStore, InMemoryUserStore, BcryptHasher>;

/// Wire the services against the in-memory adapters. Store handles are
/// constructed here and injected; nothing initializes lazily.
pub(crate) fn build_services() -> Services {
    let listing_store = Arc::new(InMemoryListingStore::default());
    let request_store = Arc::new(InMemoryRequestStore::default());
    let user_store = Arc::new(InMemoryUserStore::default());
    let hasher = Arc::new(BcryptHasher::default());

    MarketplaceState {
        listings: Arc::new(ListingService::new(listing_store.clone())),
        requests: Arc::new(RequestService::new(request_store, listing_store)),
        accounts: Arc::new(AccountService::new(user_store, hasher)),
    }
}

/// Bcrypt adapter behind the core's hashing port.
pub(crate) struct BcryptHasher {
    cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, HasherError> {
        bcrypt::hash(password, self.cost).map_err(|err| HasherError(err.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, HasherError> {
        bcrypt::verify(password, hash).map_err(|err| HasherError(err.to_string()))
    }
}

#[derive(Default)]
pub(crate) struct InMemoryUserStore {
    records: Mutex<HashMap<UserId, User>>,
}

impl UserStore for InMemoryUserStore {
    fn insert_unique_email(&self, user: User) -> Result<User, StoreError> {
        let mut guard = self.records.lock().expect("user store mutex poisoned");
        if guard.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict);
        }
        guard.insert(user.id, user.clone());
        Ok(user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let guard = self.records.lock().expect("user store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let guard = self.records.lock().expect("user store mutex poisoned");
        Ok(guard.values().find(|u| u.email == email).cloned())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryListingStore {
    records: Mutex<HashMap<ListingId, Listing>>,
}

fn newest_first(mut listings: Vec<Listing>) -> Vec<Listing> {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    listings
}

impl ListingStore for InMemoryListingStore {
    fn insert(&self, listing: Listing) -> Result<Listing, StoreError> {
        let mut guard = self.records.lock().expect("listing store mutex poisoned");
        if guard.contains_key(&listing.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        let guard = self.records.lock().expect("listing store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, listing: Listing) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("listing store mutex poisoned");
        if !guard.contains_key(&listing.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(listing.id, listing);
        Ok(())
    }

    fn delete(&self, id: &ListingId) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("listing store mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    fn all(&self) -> Result<Vec<Listing>, StoreError> {
        let guard = self.records.lock().expect("listing store mutex poisoned");
        Ok(newest_first(guard.values().cloned().collect()))
    }

    fn by_owner(&self, owner: &UserId) -> Result<Vec<Listing>, StoreError> {
        let guard = self.records.lock().expect("listing store mutex poisoned");
        Ok(newest_first(
            guard
                .values()
                .filter(|l| l.owner_id == *owner)
                .cloned()
                .collect(),
        ))
    }

    fn by_status(&self, status: ListingStatus) -> Result<Vec<Listing>, StoreError> {
        let guard = self.records.lock().expect("listing store mutex poisoned");
        Ok(newest_first(
            guard
                .values()
                .filter(|l| l.status == status)
                .cloned()
                .collect(),
        ))
    }

    fn search(&self, filters: &SearchFilters) -> Result<Vec<Listing>, StoreError> {
        let guard = self.records.lock().expect("listing store mutex poisoned");
        Ok(newest_first(
            guard
                .values()
                .filter(|l| filters.matches(l))
                .cloned()
                .collect(),
        ))
    }

    fn status_counts(&self) -> Result<StatusCounts, StoreError> {
        let guard = self.records.lock().expect("listing store mutex poisoned");
        let mut counts = StatusCounts::default();
        for listing in guard.values() {
            counts.total += 1;
            match listing.status {
                ListingStatus::Pending => counts.pending += 1,
                ListingStatus::Approved => counts.approved += 1,
                ListingStatus::Rejected => counts.rejected += 1,
            }
        }
        Ok(counts)
    }

    // The whole map sits behind one mutex, so check-and-decrement holds the
    // lock for both steps; a real adapter must use the store's conditional
    // update instead.
    fn reserve_room(&self, id: &ListingId) -> Result<Listing, StoreError> {
        let mut guard = self.records.lock().expect("listing store mutex poisoned");
        let listing = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if listing.available_rooms == 0 {
            return Err(StoreError::NoCapacity);
        }
        listing.available_rooms -= 1;
        Ok(listing.clone())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryRequestStore {
    records: Mutex<HashMap<RequestId, JoinRequest>>,
}

fn requests_newest_first(mut requests: Vec<JoinRequest>) -> Vec<JoinRequest> {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    requests
}

impl RequestStore for InMemoryRequestStore {
    fn insert_unless_live(&self, request: JoinRequest) -> Result<JoinRequest, StoreError> {
        let mut guard = self.records.lock().expect("request store mutex poisoned");
        let duplicate = guard.values().any(|r| {
            r.student_id == request.student_id
                && r.listing_id == request.listing_id
                && r.status.is_live()
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }
        guard.insert(request.id, request.clone());
        Ok(request)
    }

    fn has_live(&self, student: &UserId, listing: &ListingId) -> Result<bool, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        Ok(guard
            .values()
            .any(|r| r.student_id == *student && r.listing_id == *listing && r.status.is_live()))
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<JoinRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, request: JoinRequest) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("request store mutex poisoned");
        if !guard.contains_key(&request.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(request.id, request);
        Ok(())
    }

    fn by_student(&self, student: &UserId) -> Result<Vec<JoinRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        Ok(requests_newest_first(
            guard
                .values()
                .filter(|r| r.student_id == *student)
                .cloned()
                .collect(),
        ))
    }

    fn by_owner(&self, owner: &UserId) -> Result<Vec<JoinRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        Ok(requests_newest_first(
            guard
                .values()
                .filter(|r| r.listing_owner_id == *owner)
                .cloned()
                .collect(),
        ))
    }

    fn by_listing(&self, listing: &ListingId) -> Result<Vec<JoinRequest>, StoreError> {
        let guard = self.records.lock().expect("request store mutex poisoned");
        Ok(requests_newest_first(
            guard
                .values()
                .filter(|r| r.listing_id == *listing)
                .cloned()
                .collect(),
        ))
    }
}
