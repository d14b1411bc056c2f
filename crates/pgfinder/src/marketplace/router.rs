use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::access::{AccessError, Identity};
use super::accounts::{AccountError, AccountService, PasswordHasher, Signup};
use super::domain::{
    ListingDraft, ListingId, ListingPatch, ListingStatus, RequestId, Role, SearchFilters, UserId,
};
use super::listings::{ListingError, ListingService};
use super::requests::{Decision, RequestError, RequestService};
use super::store::{ListingStore, RequestStore, UserStore};

/// Shared handles for the marketplace endpoints.
pub struct MarketplaceState<LS, RS, US, H> {
    pub listings: Arc<ListingService<LS>>,
    pub requests: Arc<RequestService<RS, LS>>,
    pub accounts: Arc<AccountService<US, H>>,
}

impl<LS, RS, US, H> Clone for MarketplaceState<LS, RS, US, H> {
    fn clone(&self) -> Self {
        Self {
            listings: self.listings.clone(),
            requests: self.requests.clone(),
            accounts: self.accounts.clone(),
        }
    }
}

/// Router builder exposing the marketplace lifecycle over HTTP. Session
/// transport is not handled here: the embedding service resolves whatever
/// auth it uses into the `x-user-id`/`x-user-role` headers consumed below.
pub fn marketplace_router<LS, RS, US, H>(state: MarketplaceState<LS, RS, US, H>) -> Router
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    Router::new()
        .route("/api/v1/auth/register", post(register_handler::<LS, RS, US, H>))
        .route("/api/v1/auth/login", post(login_handler::<LS, RS, US, H>))
        .route(
            "/api/v1/listings",
            get(search_handler::<LS, RS, US, H>).post(create_listing_handler::<LS, RS, US, H>),
        )
        .route("/api/v1/listings/mine", get(my_listings_handler::<LS, RS, US, H>))
        .route(
            "/api/v1/listings/:listing_id",
            get(get_listing_handler::<LS, RS, US, H>)
                .patch(update_listing_handler::<LS, RS, US, H>)
                .delete(delete_listing_handler::<LS, RS, US, H>),
        )
        .route(
            "/api/v1/listings/:listing_id/requests",
            get(listing_requests_handler::<LS, RS, US, H>),
        )
        .route("/api/v1/requests", post(submit_request_handler::<LS, RS, US, H>))
        .route("/api/v1/requests/mine", get(my_requests_handler::<LS, RS, US, H>))
        .route(
            "/api/v1/requests/received",
            get(received_requests_handler::<LS, RS, US, H>),
        )
        .route(
            "/api/v1/requests/:request_id/approve",
            post(approve_request_handler::<LS, RS, US, H>),
        )
        .route(
            "/api/v1/requests/:request_id/reject",
            post(reject_request_handler::<LS, RS, US, H>),
        )
        .route(
            "/api/v1/admin/listings",
            get(review_listings_handler::<LS, RS, US, H>),
        )
        .route(
            "/api/v1/admin/listings/pending",
            get(pending_listings_handler::<LS, RS, US, H>),
        )
        .route(
            "/api/v1/admin/listings/stats",
            get(listing_stats_handler::<LS, RS, US, H>),
        )
        .route(
            "/api/v1/admin/listings/:listing_id/approve",
            post(approve_listing_handler::<LS, RS, US, H>),
        )
        .route(
            "/api/v1/admin/listings/:listing_id/reject",
            post(reject_listing_handler::<LS, RS, US, H>),
        )
        .with_state(state)
}

/// Parse the identity headers the session layer injects. Absent or garbled
/// headers mean an anonymous caller, which the services reject where it
/// matters.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let user_id = headers.get("x-user-id")?.to_str().ok()?;
    let role = headers.get("x-user-role")?.to_str().ok()?;
    let user_id = Uuid::parse_str(user_id.trim()).ok()?;
    let role = match role.trim() {
        "student" => Role::Student,
        "pg_owner" => Role::PgOwner,
        "admin" => Role::Admin,
        _ => return None,
    };
    Some(Identity {
        user_id: UserId(user_id),
        role,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginBody {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequestBody {
    listing_id: Uuid,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DecisionBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectListingBody {
    #[serde(default)]
    reason: Option<String>,
}

/// Query-string shape for search; facilities arrive comma-separated.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchParams {
    city: Option<String>,
    min_rent: Option<f64>,
    max_rent: Option<f64>,
    facilities: Option<String>,
    nearby_college: Option<String>,
    nearby_workplace: Option<String>,
}

impl SearchParams {
    fn into_filters(self) -> SearchFilters {
        SearchFilters {
            city: clean(self.city),
            min_rent: self.min_rent,
            max_rent: self.max_rent,
            facilities: self
                .facilities
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            nearby_college: clean(self.nearby_college),
            nearby_workplace: clean(self.nearby_workplace),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReviewParams {
    status: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) async fn register_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Json(signup): Json<Signup>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    match state.accounts.register(signup) {
        Ok(user) => (StatusCode::CREATED, Json(user.view())).into_response(),
        Err(err) => account_error_response(err),
    }
}

pub(crate) async fn login_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Json(body): Json<LoginBody>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    match state.accounts.authenticate(&body.email, &body.password) {
        Ok(user) => {
            let identity = AccountService::<US, H>::identity_of(&user);
            (
                StatusCode::OK,
                Json(json!({ "user": user.view(), "identity": identity })),
            )
                .into_response()
        }
        Err(err) => account_error_response(err),
    }
}

pub(crate) async fn search_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Query(params): Query<SearchParams>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let filters = params.into_filters();
    match state.listings.search(&filters) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn create_listing_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    headers: HeaderMap,
    Json(draft): Json<ListingDraft>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.listings.create(identity.as_ref(), draft) {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn my_listings_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.listings.my_listings(identity.as_ref()) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn get_listing_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Path(listing_id): Path<Uuid>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    match state.listings.get(&ListingId(listing_id)) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn update_listing_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
    Json(patch): Json<ListingPatch>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state
        .listings
        .update(identity.as_ref(), &ListingId(listing_id), patch)
    {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn delete_listing_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.listings.delete(identity.as_ref(), &ListingId(listing_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn listing_requests_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state
        .requests
        .for_listing(identity.as_ref(), &ListingId(listing_id))
    {
        Ok(requests) => (StatusCode::OK, Json(requests)).into_response(),
        Err(err) => request_error_response(err),
    }
}

pub(crate) async fn submit_request_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    headers: HeaderMap,
    Json(body): Json<SubmitRequestBody>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.requests.submit(
        identity.as_ref(),
        &ListingId(body.listing_id),
        body.message,
    ) {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(err) => request_error_response(err),
    }
}

pub(crate) async fn my_requests_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.requests.my_requests(identity.as_ref()) {
        Ok(requests) => (StatusCode::OK, Json(requests)).into_response(),
        Err(err) => request_error_response(err),
    }
}

pub(crate) async fn received_requests_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.requests.received(identity.as_ref()) {
        Ok(requests) => (StatusCode::OK, Json(requests)).into_response(),
        Err(err) => request_error_response(err),
    }
}

pub(crate) async fn approve_request_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Path(request_id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    decide_request(state, request_id, headers, body, Decision::Approve)
}

pub(crate) async fn reject_request_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Path(request_id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    decide_request(state, request_id, headers, body, Decision::Reject)
}

fn decide_request<LS, RS, US, H>(
    state: MarketplaceState<LS, RS, US, H>,
    request_id: Uuid,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
    decision: Decision,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    let message = body.map(|Json(b)| b.message).unwrap_or_default();
    match state.requests.decide(
        identity.as_ref(),
        &RequestId(request_id),
        decision,
        message,
    ) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => request_error_response(err),
    }
}

pub(crate) async fn review_listings_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Query(params): Query<ReviewParams>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some("pending") => Some(ListingStatus::Pending),
        Some("approved") => Some(ListingStatus::Approved),
        Some("rejected") => Some(ListingStatus::Rejected),
        Some(other) => {
            let payload = json!({ "error": format!("unknown status filter '{other}'") });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };
    match state.listings.listings_for_review(identity.as_ref(), status) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn pending_listings_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.listings.pending_review(identity.as_ref()) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn listing_stats_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.listings.stats(identity.as_ref()) {
        Ok(counts) => (StatusCode::OK, Json(counts)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn approve_listing_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    match state.listings.approve(identity.as_ref(), &ListingId(listing_id)) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

pub(crate) async fn reject_listing_handler<LS, RS, US, H>(
    State(state): State<MarketplaceState<LS, RS, US, H>>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<RejectListingBody>>,
) -> Response
where
    LS: ListingStore + 'static,
    RS: RequestStore + 'static,
    US: UserStore + 'static,
    H: PasswordHasher + 'static,
{
    let identity = identity_from_headers(&headers);
    let reason = body.map(|Json(b)| b.reason).unwrap_or_default();
    match state
        .listings
        .reject(identity.as_ref(), &ListingId(listing_id), reason)
    {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => listing_error_response(err),
    }
}

fn access_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AccessError::Forbidden { .. } | AccessError::NotOwner => StatusCode::FORBIDDEN,
    }
}

fn listing_error_response(err: ListingError) -> Response {
    let status = match &err {
        ListingError::Access(access) => access_status(access),
        ListingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ListingError::NotFound => StatusCode::NOT_FOUND,
        ListingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, &err.to_string())
}

fn request_error_response(err: RequestError) -> Response {
    let status = match &err {
        RequestError::Access(access) => access_status(access),
        RequestError::Duplicate
        | RequestError::NoAvailability
        | RequestError::AlreadyDecided => StatusCode::CONFLICT,
        RequestError::ListingNotFound | RequestError::NotFound => StatusCode::NOT_FOUND,
        RequestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, &err.to_string())
}

fn account_error_response(err: AccountError) -> Response {
    let status = match &err {
        AccountError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AccountError::AlreadyRegistered => StatusCode::CONFLICT,
        AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AccountError::Hasher(_) | AccountError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, &err.to_string())
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
