use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    middleware::{AuthContext, AuthUser},
    models::{User, UserResponse},
    AppState,
};

/// Serialize a user for the calling application. AD groups are withheld
/// when the token's application has not opted in.
async fn user_response(
    state: &AppState,
    ctx: &AuthContext,
    user: &User,
) -> Result<UserResponse, AppError> {
    let show_groups = ctx
        .application
        .as_ref()
        .map_or(true, |app| app.include_ad_groups);

    let ad_groups = if show_groups {
        Some(state.store.user_ad_groups(user.id).await?)
    } else {
        None
    };

    Ok(UserResponse::new(user, ad_groups))
}

#[utoipa::path(
    get,
    path = "/v1/user/",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Token lacks the read scope", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(user_response(&state, &ctx, &ctx.user).await?))
}

/// Superusers may look up anyone; everybody else only themselves.
#[utoipa::path(
    get,
    path = "/v1/user/{username}/",
    params(("username" = String, Path, description = "Username to look up")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found or not visible", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let not_found = || AppError::NotFound(anyhow::anyhow!("Not found."));

    let user = if ctx.user.is_superuser {
        state
            .store
            .find_user_by_username(&username)
            .await?
            .ok_or_else(not_found)?
    } else if ctx.user.username == username {
        ctx.user.clone()
    } else {
        return Err(not_found());
    };

    Ok(Json(user_response(&state, &ctx, &user).await?))
}
