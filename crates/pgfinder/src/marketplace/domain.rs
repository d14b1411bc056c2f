use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{self, ValidationError};

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// Identifier wrapper for PG listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub Uuid);

/// Identifier wrapper for join requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

macro_rules! id_impls {
    ($name:ident) => {
        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_impls!(UserId);
id_impls!(ListingId);
id_impls!(RequestId);

/// Role assigned at signup; fixed for the lifetime of the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    PgOwner,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::PgOwner => "pg_owner",
            Role::Admin => "admin",
        }
    }
}

/// Review state of a listing. Only `Approved` listings surface in search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
        }
    }
}

/// Lifecycle state of a join request. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// A live request blocks a student from re-applying to the same listing.
    pub const fn is_live(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Approved)
    }
}

/// A registered account. The password never appears here in plaintext; the
/// hash is produced behind the `PasswordHasher` port.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::generate(),
            name,
            email,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Serializable projection without the credential.
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Public projection of a user record for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A PG property record, owned by a `pg_owner` and reviewed by an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner_id: UserId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub rent: f64,
    pub deposit: f64,
    pub available_rooms: u32,
    pub total_rooms: u32,
    pub facilities: Vec<String>,
    pub description: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub nearby_colleges: Vec<String>,
    pub nearby_workplaces: Vec<String>,
    // Stored for display only; nothing in the core computes with these.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ListingStatus,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Build a new listing from an owner submission, normalizing text fields
    /// and enforcing the room-count bounds. New listings always start
    /// `Pending` and unverified.
    pub fn from_draft(
        owner_id: UserId,
        draft: ListingDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = validate::required_text("name", &draft.name)?;
        let address = validate::required_text("address", &draft.address)?;
        let city = validate::required_text("city", &draft.city)?;

        if !draft.rent.is_finite() || draft.rent <= 0.0 {
            return Err(ValidationError::new("rent", "a positive rent is required"));
        }
        let deposit = draft.deposit.unwrap_or(0.0);
        if !deposit.is_finite() || deposit < 0.0 {
            return Err(ValidationError::new("deposit", "deposit cannot be negative"));
        }
        if draft.total_rooms == 0 {
            return Err(ValidationError::new(
                "total_rooms",
                "total rooms must be greater than zero",
            ));
        }
        if draft.available_rooms > draft.total_rooms {
            return Err(ValidationError::new(
                "available_rooms",
                "available rooms cannot exceed total rooms",
            ));
        }

        Ok(Self {
            id: ListingId::generate(),
            owner_id,
            name,
            address,
            city,
            state: trimmed(&draft.state),
            pincode: trimmed(&draft.pincode),
            rent: draft.rent,
            deposit,
            available_rooms: draft.available_rooms,
            total_rooms: draft.total_rooms,
            facilities: cleaned_list(draft.facilities),
            description: trimmed(&draft.description),
            contact_phone: trimmed(&draft.contact_phone),
            contact_email: draft.contact_email.trim().to_lowercase(),
            nearby_colleges: cleaned_list(draft.nearby_colleges),
            nearby_workplaces: cleaned_list(draft.nearby_workplaces),
            latitude: draft.latitude,
            longitude: draft.longitude,
            status: ListingStatus::Pending,
            is_verified: false,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update. Only supplied fields change. Moving the
    /// status anywhere other than `Approved` clears `is_verified`, which
    /// keeps the `is_verified => Approved` invariant under every edit.
    pub fn apply(&mut self, patch: ListingPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = trimmed(&name);
        }
        if let Some(address) = patch.address {
            self.address = trimmed(&address);
        }
        if let Some(city) = patch.city {
            self.city = trimmed(&city);
        }
        if let Some(state) = patch.state {
            self.state = trimmed(&state);
        }
        if let Some(pincode) = patch.pincode {
            self.pincode = trimmed(&pincode);
        }
        if let Some(rent) = patch.rent {
            self.rent = rent;
        }
        if let Some(deposit) = patch.deposit {
            self.deposit = deposit;
        }
        if let Some(available_rooms) = patch.available_rooms {
            self.available_rooms = available_rooms;
        }
        if let Some(total_rooms) = patch.total_rooms {
            self.total_rooms = total_rooms;
        }
        if let Some(facilities) = patch.facilities {
            self.facilities = cleaned_list(facilities);
        }
        if let Some(description) = patch.description {
            self.description = trimmed(&description);
        }
        if let Some(contact_phone) = patch.contact_phone {
            self.contact_phone = trimmed(&contact_phone);
        }
        if let Some(contact_email) = patch.contact_email {
            self.contact_email = contact_email.trim().to_lowercase();
        }
        if let Some(nearby_colleges) = patch.nearby_colleges {
            self.nearby_colleges = cleaned_list(nearby_colleges);
        }
        if let Some(nearby_workplaces) = patch.nearby_workplaces {
            self.nearby_workplaces = cleaned_list(nearby_workplaces);
        }
        if let Some(latitude) = patch.latitude {
            self.latitude = Some(latitude);
        }
        if let Some(longitude) = patch.longitude {
            self.longitude = Some(longitude);
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status != ListingStatus::Approved {
                self.is_verified = false;
            }
        }
        self.updated_at = now;
    }

    /// Searchable means an admin approved the listing and a room is free.
    pub fn is_available(&self) -> bool {
        self.status == ListingStatus::Approved && self.available_rooms > 0
    }
}

/// Owner-supplied fields for a new listing, pre-normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingDraft {
    pub name: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    pub rent: f64,
    #[serde(default)]
    pub deposit: Option<f64>,
    pub available_rooms: u32,
    pub total_rooms: u32,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub nearby_colleges: Vec<String>,
    #[serde(default)]
    pub nearby_workplaces: Vec<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub rent: Option<f64>,
    pub deposit: Option<f64>,
    pub available_rooms: Option<u32>,
    pub total_rooms: Option<u32>,
    pub facilities: Option<Vec<String>>,
    pub description: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub nearby_colleges: Option<Vec<String>>,
    pub nearby_workplaces: Option<Vec<String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<ListingStatus>,
}

/// Search criteria over approved listings. Every populated filter must
/// match (AND semantics); an empty filter set matches every available
/// listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub city: Option<String>,
    pub min_rent: Option<f64>,
    pub max_rent: Option<f64>,
    #[serde(default)]
    pub facilities: Vec<String>,
    pub nearby_college: Option<String>,
    pub nearby_workplace: Option<String>,
}

impl SearchFilters {
    /// Whether a listing satisfies the baseline availability predicate and
    /// every populated filter.
    pub fn matches(&self, listing: &Listing) -> bool {
        if !listing.is_available() {
            return false;
        }
        if let Some(city) = &self.city {
            if !contains_ignore_case(&listing.city, city) {
                return false;
            }
        }
        if let Some(min_rent) = self.min_rent {
            if listing.rent < min_rent {
                return false;
            }
        }
        if let Some(max_rent) = self.max_rent {
            if listing.rent > max_rent {
                return false;
            }
        }
        if !self
            .facilities
            .iter()
            .all(|wanted| listing.facilities.iter().any(|f| f == wanted))
        {
            return false;
        }
        if let Some(college) = &self.nearby_college {
            if !any_contains_ignore_case(&listing.nearby_colleges, college) {
                return false;
            }
        }
        if let Some(workplace) = &self.nearby_workplace {
            if !any_contains_ignore_case(&listing.nearby_workplaces, workplace) {
                return false;
            }
        }
        true
    }
}

/// A student's application to occupy a room in a listing. The owner
/// reference is a snapshot taken when the request was created, so the
/// request keeps routing to whoever listed the property at that time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: RequestId,
    pub student_id: UserId,
    pub listing_id: ListingId,
    pub listing_owner_id: UserId,
    pub message: String,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JoinRequest {
    pub fn new(
        student_id: UserId,
        listing_id: ListingId,
        listing_owner_id: UserId,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            student_id,
            listing_id,
            listing_owner_id,
            message: message.as_deref().map(str::trim).unwrap_or("").to_string(),
            status: RequestStatus::Pending,
            response_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

fn cleaned_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn any_contains_ignore_case(haystack: &[String], needle: &str) -> bool {
    haystack
        .iter()
        .any(|entry| contains_ignore_case(entry, needle))
}
