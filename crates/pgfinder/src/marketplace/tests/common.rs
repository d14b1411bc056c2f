use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::marketplace::accounts::{AccountService, HasherError, PasswordHasher};
use crate::marketplace::domain::{
    JoinRequest, Listing, ListingDraft, ListingId, ListingStatus, RequestId, Role, SearchFilters,
    User, UserId,
};
use crate::marketplace::listings::ListingService;
use crate::marketplace::requests::RequestService;
use crate::marketplace::router::{marketplace_router, MarketplaceState};
use crate::marketplace::store::{
    ListingStore, RequestStore, StatusCounts, StoreError, UserStore,
};
use crate::marketplace::Identity;

pub(super) fn student() -> Identity {
    Identity {
        user_id: UserId::generate(),
        role: Role::Student,
    }
}

pub(super) fn owner() -> Identity {
    Identity {
        user_id: UserId::generate(),
        role: Role::PgOwner,
    }
}

pub(super) fn admin() -> Identity {
    Identity {
        user_id: UserId::generate(),
        role: Role::Admin,
    }
}

pub(super) fn draft() -> ListingDraft {
    ListingDraft {
        name: "Sunrise PG".to_string(),
        address: "12 MG Road".to_string(),
        city: "Delhi".to_string(),
        state: "Delhi".to_string(),
        pincode: "110001".to_string(),
        rent: 8000.0,
        deposit: Some(16000.0),
        available_rooms: 3,
        total_rooms: 5,
        facilities: vec!["WiFi".to_string(), "Food".to_string()],
        description: "Walking distance from the metro.".to_string(),
        contact_phone: "9876543210".to_string(),
        contact_email: "Owner@SunrisePG.example".to_string(),
        nearby_colleges: vec!["Delhi University".to_string()],
        nearby_workplaces: vec!["Connaught Place".to_string()],
        latitude: Some(28.63),
        longitude: Some(77.22),
    }
}

pub(super) fn draft_named(name: &str, city: &str, rent: f64) -> ListingDraft {
    ListingDraft {
        name: name.to_string(),
        city: city.to_string(),
        rent,
        ..draft()
    }
}

pub(super) struct Fixture {
    pub(super) listings: ListingService<MemoryListingStore>,
    pub(super) requests: RequestService<MemoryRequestStore, MemoryListingStore>,
    pub(super) accounts: AccountService<MemoryUserStore, PlainHasher>,
    pub(super) listing_store: Arc<MemoryListingStore>,
    pub(super) request_store: Arc<MemoryRequestStore>,
    pub(super) user_store: Arc<MemoryUserStore>,
}

pub(super) fn fixture() -> Fixture {
    let listing_store = Arc::new(MemoryListingStore::default());
    let request_store = Arc::new(MemoryRequestStore::default());
    let user_store = Arc::new(MemoryUserStore::default());
    Fixture {
        listings: ListingService::new(listing_store.clone()),
        requests: RequestService::new(request_store.clone(), listing_store.clone()),
        accounts: AccountService::new(user_store.clone(), Arc::new(PlainHasher)),
        listing_store,
        request_store,
        user_store,
    }
}

/// Create-and-approve shortcut so request tests start from a searchable
/// listing.
pub(super) fn approved_listing(fx: &Fixture, owner: &Identity, draft: ListingDraft) -> Listing {
    let listing = fx
        .listings
        .create(Some(owner), draft)
        .expect("listing creates");
    fx.listings
        .approve(Some(&admin()), &listing.id)
        .expect("listing approves")
}

pub(super) fn router_fixture() -> (axum::Router, Fixture) {
    let fx = fixture();
    let state = MarketplaceState {
        listings: Arc::new(fx.listings.clone()),
        requests: Arc::new(fx.requests.clone()),
        accounts: Arc::new(fx.accounts.clone()),
    };
    (marketplace_router(state), fx)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Test hasher with a recognizable prefix; the real adapter lives with the
/// service binary.
pub(super) struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, HasherError> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, HasherError> {
        Ok(hash == format!("plain${password}"))
    }
}

#[derive(Default)]
pub(super) struct MemoryUserStore {
    records: Mutex<HashMap<UserId, User>>,
}

impl UserStore for MemoryUserStore {
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
pub(super) struct MemoryListingStore {
    records: Mutex<HashMap<ListingId, Listing>>,
}

fn newest_first(mut listings: Vec<Listing>) -> Vec<Listing> {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    listings
}

impl ListingStore for MemoryListingStore {
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
pub(super) struct MemoryRequestStore {
    records: Mutex<HashMap<RequestId, JoinRequest>>,
}

fn requests_newest_first(mut requests: Vec<JoinRequest>) -> Vec<JoinRequest> {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    requests
}

impl RequestStore for MemoryRequestStore {
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

/// Fault double: every operation reports the backing store as offline.
pub(super) struct UnavailableListingStore;

impl ListingStore for UnavailableListingStore {
    fn insert(&self, _listing: Listing) -> Result<Listing, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ListingId) -> Result<Option<Listing>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _listing: Listing) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &ListingId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn by_owner(&self, _owner: &UserId) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn by_status(&self, _status: ListingStatus) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn search(&self, _filters: &SearchFilters) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn status_counts(&self) -> Result<StatusCounts, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn reserve_room(&self, _id: &ListingId) -> Result<Listing, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}
