use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{JwtTokenQuery, JwtTokenResponse},
    middleware::AuthUser,
    services::app_token::issue_app_token,
    AppState,
};

#[utoipa::path(
    get,
    path = "/v1/jwt-token/",
    params(JwtTokenQuery),
    responses(
        (status = 200, description = "Signed token for the target application", body = JwtTokenResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "No permission for the target application", body = ErrorResponse),
        (status = 404, description = "Unknown target application", body = ErrorResponse)
    ),
    tag = "Token",
    security(("bearer_auth" = []))
)]
pub async fn get_jwt_token(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(query): Query<JwtTokenQuery>,
) -> Result<Json<JwtTokenResponse>, AppError> {
    let (Some(access_token), Some(requester)) = (&ctx.access_token, &ctx.application) else {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Token is not bound to an application"
        )));
    };

    let issued = issue_app_token(
        state.store.as_ref(),
        &state.jwt,
        &ctx.user,
        requester,
        access_token,
        query.target_app.as_deref(),
    )
    .await?;

    Ok(Json(JwtTokenResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}
