use std::sync::Arc;

use chrono::Utc;
use clap::Args;

use crate::infra::{BcryptHasher, InMemoryListingStore, InMemoryRequestStore, InMemoryUserStore};
use pgfinder::marketplace::{
    AccountError, AccountService, Decision, HasherError, Identity, ListingDraft, ListingError,
    ListingService, PasswordHasher, RequestError, RequestService, Role, SearchFilters, Signup,
    StoreError, User, UserStore,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the join-request portion of the walkthrough.
    #[arg(long)]
    pub(crate) skip_requests: bool,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum DemoError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hasher(#[from] HasherError),
}

/// Seed sample accounts and listings, then walk the full lifecycle the way
/// the HTTP layer would drive it.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), DemoError> {
    let listing_store = Arc::new(InMemoryListingStore::default());
    let request_store = Arc::new(InMemoryRequestStore::default());
    let user_store = Arc::new(InMemoryUserStore::default());
    let hasher = Arc::new(BcryptHasher::default());

    let listings = ListingService::new(listing_store.clone());
    let requests = RequestService::new(request_store, listing_store);
    let accounts = AccountService::new(user_store.clone(), hasher.clone());

    println!("PG marketplace demo");
    println!("\n1. Registering sample accounts");

    let owner_user = accounts.register(Signup {
        name: "Rajesh Kumar".to_string(),
        email: "pgowner1@example.com".to_string(),
        password: "owner123".to_string(),
        role: Role::PgOwner,
    })?;
    let student_user = accounts.register(Signup {
        name: "John Student".to_string(),
        email: "student@example.com".to_string(),
        password: "student123".to_string(),
        role: Role::Student,
    })?;
    let second_student_user = accounts.register(Signup {
        name: "Sarah Student".to_string(),
        email: "sarah@example.com".to_string(),
        password: "student123".to_string(),
        role: Role::Student,
    })?;

    // Admin accounts are provisioned, not registered, so the demo writes
    // one straight into the store.
    let admin_user = user_store.insert_unique_email(User::new(
        "Admin User".to_string(),
        "admin@example.com".to_string(),
        hasher.hash("admin123")?,
        Role::Admin,
        Utc::now(),
    ))?;

    let owner = identity(&owner_user);
    let student = identity(&student_user);
    let second_student = identity(&second_student_user);
    let admin = identity(&admin_user);
    println!("   owner={} student={} admin={}", owner_user.email, student_user.email, admin_user.email);

    println!("\n2. Owner submits listings");
    let sunrise = listings.create(
        Some(&owner),
        draft("Sunrise PG", "Delhi", 8000.0, 2, &["WiFi", "Food", "Laundry"]),
    )?;
    let lakeview = listings.create(
        Some(&owner),
        draft("Lakeview PG", "Pune", 9500.0, 3, &["WiFi", "AC"]),
    )?;
    let cramped = listings.create(
        Some(&owner),
        draft("Cramped PG", "Delhi", 4000.0, 1, &[]),
    )?;
    println!("   {} listings await review", listings.pending_review(Some(&admin))?.len());

    println!("\n3. Admin reviews the queue");
    listings.approve(Some(&admin), &sunrise.id)?;
    listings.approve(Some(&admin), &lakeview.id)?;
    listings.reject(
        Some(&admin),
        &cramped.id,
        Some("Photos do not match the floor plan".to_string()),
    )?;
    let counts = listings.stats(Some(&admin))?;
    println!(
        "   approved={} rejected={} pending={}",
        counts.approved, counts.rejected, counts.pending
    );

    println!("\n4. Student searches in Delhi under 9000");
    let results = listings.search(&SearchFilters {
        city: Some("Delhi".to_string()),
        max_rent: Some(9000.0),
        ..SearchFilters::default()
    })?;
    for listing in &results {
        println!(
            "   {} — rent {} — {} room(s) free",
            listing.name, listing.rent, listing.available_rooms
        );
    }

    if args.skip_requests {
        println!("\nSkipping the join-request walkthrough (--skip-requests)");
        return Ok(());
    }

    println!("\n5. Students apply to Sunrise PG");
    let first = requests.submit(
        Some(&student),
        &sunrise.id,
        Some("Looking for a room near campus".to_string()),
    )?;
    match requests.submit(Some(&student), &sunrise.id, None) {
        Err(RequestError::Duplicate) => {
            println!("   duplicate application blocked while the first is live")
        }
        other => {
            other?;
        }
    }
    let second = requests.submit(Some(&second_student), &sunrise.id, None)?;

    println!("\n6. Owner decides");
    requests.decide(
        Some(&owner),
        &first.id,
        Decision::Approve,
        Some("Welcome aboard".to_string()),
    )?;
    requests.decide(
        Some(&owner),
        &second.id,
        Decision::Reject,
        Some("Room went to an earlier applicant".to_string()),
    )?;

    let after = listings.get(&sunrise.id)?;
    println!(
        "   {} now has {} of {} room(s) free",
        after.name, after.available_rooms, after.total_rooms
    );
    println!(
        "   owner inbox holds {} request(s)",
        requests.received(Some(&owner))?.len()
    );

    Ok(())
}

fn identity(user: &User) -> Identity {
    Identity {
        user_id: user.id,
        role: user.role,
    }
}

fn draft(name: &str, city: &str, rent: f64, rooms: u32, facilities: &[&str]) -> ListingDraft {
    ListingDraft {
        name: name.to_string(),
        address: "12 MG Road".to_string(),
        city: city.to_string(),
        state: "".to_string(),
        pincode: "110001".to_string(),
        rent,
        deposit: Some(rent * 2.0),
        available_rooms: rooms,
        total_rooms: rooms,
        facilities: facilities.iter().map(|f| f.to_string()).collect(),
        description: "Walking distance from the metro.".to_string(),
        contact_phone: "9876543210".to_string(),
        contact_email: "pgowner1@example.com".to_string(),
        nearby_colleges: vec!["Delhi University".to_string()],
        nearby_workplaces: vec!["Connaught Place".to_string()],
        latitude: None,
        longitude: None,
    }
}
