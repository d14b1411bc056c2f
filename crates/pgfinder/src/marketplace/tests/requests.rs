use super::common::*;

use crate::marketplace::access::AccessError;
use crate::marketplace::domain::{ListingId, RequestStatus};
use crate::marketplace::requests::{Decision, RequestError};
use crate::marketplace::store::RequestStore;

#[test]
fn submit_creates_pending_request_with_owner_snapshot() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let listing = approved_listing(&fx, &owner, draft());

    let request = fx
        .requests
        .submit(
            Some(&student),
            &listing.id,
            Some("  Looking for a room near campus.  ".to_string()),
        )
        .expect("request submits");

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.student_id, student.user_id);
    assert_eq!(request.listing_id, listing.id);
    assert_eq!(request.listing_owner_id, owner.user_id);
    assert_eq!(request.message, "Looking for a room near campus.");
    assert!(request.response_message.is_none());
}

#[test]
fn submit_is_student_only() {
    let fx = fixture();
    let owner = owner();
    let listing = approved_listing(&fx, &owner, draft());

    let err = fx
        .requests
        .submit(Some(&owner), &listing.id, None)
        .expect_err("owners cannot apply");
    assert!(matches!(
        err,
        RequestError::Access(AccessError::Forbidden { .. })
    ));

    let err = fx
        .requests
        .submit(None, &listing.id, None)
        .expect_err("anonymous cannot apply");
    assert!(matches!(
        err,
        RequestError::Access(AccessError::Unauthenticated)
    ));
}

#[test]
fn duplicate_submission_blocked_until_rejection_frees_the_pair() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let listing = approved_listing(&fx, &owner, draft());

    let first = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect("first request submits");

    let err = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect_err("second live request rejected");
    assert!(matches!(err, RequestError::Duplicate));

    fx.requests
        .decide(Some(&owner), &first.id, Decision::Reject, None)
        .expect("owner rejects");

    fx.requests
        .submit(Some(&student), &listing.id, None)
        .expect("rejection frees the pair for a retry");
}

#[test]
fn approved_requests_also_block_resubmission() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let listing = approved_listing(&fx, &owner, draft());

    let request = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect("request submits");
    fx.requests
        .decide(Some(&owner), &request.id, Decision::Approve, None)
        .expect("owner approves");

    let err = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect_err("approved request still blocks the pair");
    assert!(matches!(err, RequestError::Duplicate));
}

#[test]
fn submit_rejects_unknown_and_sold_out_listings() {
    let fx = fixture();
    let owner = owner();
    let student = student();

    let err = fx
        .requests
        .submit(Some(&student), &ListingId::generate(), None)
        .expect_err("unknown listing rejected");
    assert!(matches!(err, RequestError::ListingNotFound));

    let mut sold_out = draft();
    sold_out.available_rooms = 0;
    let listing = approved_listing(&fx, &owner, sold_out);
    let err = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect_err("sold-out listing rejected");
    assert!(matches!(err, RequestError::NoAvailability));
}

#[test]
fn approval_takes_exactly_one_room() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let mut one_room = draft();
    one_room.available_rooms = 1;
    one_room.total_rooms = 1;
    let listing = approved_listing(&fx, &owner, one_room);

    let request = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect("request submits");
    let approved = fx
        .requests
        .decide(
            Some(&owner),
            &request.id,
            Decision::Approve,
            Some("Welcome aboard".to_string()),
        )
        .expect("owner approves");

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.response_message.as_deref(), Some("Welcome aboard"));
    let listing = fx.listings.get(&listing.id).expect("listing fetches");
    assert_eq!(listing.available_rooms, 0);
}

#[test]
fn approval_never_drives_availability_below_zero() {
    let fx = fixture();
    let owner = owner();
    let first_student = student();
    let second_student = student();
    let mut one_room = draft();
    one_room.available_rooms = 1;
    one_room.total_rooms = 1;
    let listing = approved_listing(&fx, &owner, one_room);

    let winner = fx
        .requests
        .submit(Some(&first_student), &listing.id, None)
        .expect("first request submits");
    let loser = fx
        .requests
        .submit(Some(&second_student), &listing.id, None)
        .expect("second request submits");

    fx.requests
        .decide(Some(&owner), &winner.id, Decision::Approve, None)
        .expect("first approval lands");
    let err = fx
        .requests
        .decide(Some(&owner), &loser.id, Decision::Approve, None)
        .expect_err("second approval fails on capacity");
    assert!(matches!(err, RequestError::NoAvailability));

    let listing = fx.listings.get(&listing.id).expect("listing fetches");
    assert_eq!(listing.available_rooms, 0);
    let loser = fx
        .request_store
        .fetch(&loser.id)
        .expect("request fetches")
        .expect("request exists");
    assert_eq!(loser.status, RequestStatus::Pending, "failed approval leaves the request open");
}

#[test]
fn rejection_leaves_availability_untouched() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let listing = approved_listing(&fx, &owner, draft());

    let request = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect("request submits");
    fx.requests
        .decide(Some(&owner), &request.id, Decision::Reject, None)
        .expect("owner rejects");

    let after = fx.listings.get(&listing.id).expect("listing fetches");
    assert_eq!(after.available_rooms, listing.available_rooms);
}

#[test]
fn decisions_are_terminal() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let listing = approved_listing(&fx, &owner, draft());

    let request = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect("request submits");
    fx.requests
        .decide(Some(&owner), &request.id, Decision::Reject, None)
        .expect("owner rejects");

    let err = fx
        .requests
        .decide(Some(&owner), &request.id, Decision::Approve, None)
        .expect_err("decided requests stay decided");
    assert!(matches!(err, RequestError::AlreadyDecided));
}

#[test]
fn only_the_snapshotted_owner_may_decide() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let listing = approved_listing(&fx, &owner, draft());
    let request = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect("request submits");

    let err = fx
        .requests
        .decide(Some(&self::owner()), &request.id, Decision::Approve, None)
        .expect_err("other owners cannot decide");
    assert!(matches!(err, RequestError::Access(AccessError::NotOwner)));

    // Role alone is not enough: an admin who does not own the listing is
    // still not the request's owner.
    let err = fx
        .requests
        .decide(Some(&admin()), &request.id, Decision::Approve, None)
        .expect_err("non-owning admins cannot decide");
    assert!(matches!(err, RequestError::Access(AccessError::NotOwner)));
}

#[test]
fn orphaned_requests_keep_routing_to_the_snapshotted_owner() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let listing = approved_listing(&fx, &owner, draft());
    let request = fx
        .requests
        .submit(Some(&student), &listing.id, None)
        .expect("request submits");

    fx.listings
        .delete(Some(&owner), &listing.id)
        .expect("owner deletes listing");

    // The request survives the delete and still reaches the owner's queue.
    let received = fx.requests.received(Some(&owner)).expect("queue loads");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, request.id);

    // Approval cannot reserve a room on a missing listing; rejection still
    // closes the request out.
    let err = fx
        .requests
        .decide(Some(&owner), &request.id, Decision::Approve, None)
        .expect_err("approval fails without the listing");
    assert!(matches!(err, RequestError::ListingNotFound));
    let rejected = fx
        .requests
        .decide(Some(&owner), &request.id, Decision::Reject, None)
        .expect("rejection still lands");
    assert_eq!(rejected.status, RequestStatus::Rejected);
}

#[test]
fn queries_return_newest_first_per_viewer() {
    let fx = fixture();
    let owner = owner();
    let student = student();
    let first = approved_listing(&fx, &owner, draft_named("First PG", "Delhi", 6000.0));
    let second = approved_listing(&fx, &owner, draft_named("Second PG", "Pune", 7000.0));

    let older = fx
        .requests
        .submit(Some(&student), &first.id, None)
        .expect("first request submits");
    let newer = fx
        .requests
        .submit(Some(&student), &second.id, None)
        .expect("second request submits");

    let mine = fx.requests.my_requests(Some(&student)).expect("mine loads");
    let ids: Vec<_> = mine.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    let received = fx.requests.received(Some(&owner)).expect("received loads");
    assert_eq!(received.len(), 2);

    let per_listing = fx
        .requests
        .for_listing(Some(&owner), &first.id)
        .expect("listing queue loads");
    assert_eq!(per_listing.len(), 1);
    assert_eq!(per_listing[0].id, older.id);

    let err = fx
        .requests
        .for_listing(Some(&self::owner()), &first.id)
        .expect_err("other owners cannot read the queue");
    assert!(matches!(err, RequestError::Access(AccessError::NotOwner)));
}
