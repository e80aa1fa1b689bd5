use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::Form;
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{ContactForm, ContactQueryParams, InterestForm, InterestQueryParams},
    middleware::AuthUser,
    models::{ContactInfo, ProfileResponse, ProfileUpdateRequest},
    services::{
        interest::split_csv,
        profile::{self, UpdateMode},
    },
    utils::ValidatedJson,
    AppState,
};

#[utoipa::path(
    get,
    path = "/v1/profile/",
    responses(
        (status = 200, description = "Own profile, created empty on first access", body = ProfileResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("bearer_auth" = []), ("basic_auth" = []), ("session_cookie" = []))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = profile::own_profile(state.store.as_ref(), &ctx.user).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

#[utoipa::path(
    put,
    path = "/v1/profile/",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile replaced", body = ProfileResponse),
        (status = 400, description = "Invalid field value", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("bearer_auth" = []), ("basic_auth" = []), ("session_cookie" = []))
)]
pub async fn put_profile(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<ProfileUpdateRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile =
        profile::update_profile(state.store.as_ref(), &ctx.user, req, UpdateMode::Replace).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

#[utoipa::path(
    patch,
    path = "/v1/profile/",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid field value", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("bearer_auth" = []), ("basic_auth" = []), ("session_cookie" = []))
)]
pub async fn patch_profile(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<ProfileUpdateRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile =
        profile::update_profile(state.store.as_ref(), &ctx.user, req, UpdateMode::Partial).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

#[utoipa::path(
    get,
    path = "/v1/profile/interested/",
    params(InterestQueryParams),
    responses(
        (status = 200, description = "Uuids of interested users", body = Vec<Uuid>),
        (status = 404, description = "Neither divisions nor concepts given", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("basic_auth" = []), ("session_cookie" = []))
)]
pub async fn interested_get(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Query(params): Query<InterestQueryParams>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let ids = profile::interested_users(
        state.store.as_ref(),
        split_csv(params.division.as_deref()),
        split_csv(params.yso.as_deref()),
    )
    .await?;
    Ok(Json(ids))
}

#[utoipa::path(
    post,
    path = "/v1/profile/interested/",
    request_body(content = InterestForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Uuids of interested users", body = Vec<Uuid>),
        (status = 404, description = "Neither divisions nor concepts given", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("basic_auth" = []), ("session_cookie" = []))
)]
pub async fn interested_post(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Form(form): Form<InterestForm>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let ids = profile::interested_users(state.store.as_ref(), form.divisions, form.yso).await?;
    Ok(Json(ids))
}

#[utoipa::path(
    get,
    path = "/v1/profile/contact_info/",
    params(ContactQueryParams),
    responses(
        (status = 200, description = "Contact fields keyed by user uuid", body = BTreeMap<String, ContactInfo>),
        (status = 404, description = "No ids given", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("basic_auth" = []), ("session_cookie" = []))
)]
pub async fn contact_info_get(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Query(params): Query<ContactQueryParams>,
) -> Result<Json<BTreeMap<String, ContactInfo>>, AppError> {
    let contacts =
        profile::contact_info(state.store.as_ref(), split_csv(params.ids.as_deref())).await?;
    Ok(Json(contacts))
}

#[utoipa::path(
    post,
    path = "/v1/profile/contact_info/",
    request_body(content = ContactForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Contact fields keyed by user uuid", body = BTreeMap<String, ContactInfo>),
        (status = 404, description = "No ids given", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("basic_auth" = []), ("session_cookie" = []))
)]
pub async fn contact_info_post(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Form(form): Form<ContactForm>,
) -> Result<Json<BTreeMap<String, ContactInfo>>, AppError> {
    let contacts = profile::contact_info(state.store.as_ref(), form.ids).await?;
    Ok(Json(contacts))
}
