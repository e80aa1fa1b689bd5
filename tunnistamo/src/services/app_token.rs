//! App-to-app token issuance.

use super::error::ServiceError;
use super::jwt::{IssuedToken, JwtService};
use super::metrics;
use super::store::Store;
use crate::models::{AccessToken, Application, User};

/// Issue a token about `user` addressed to `target_app`.
///
/// A blank or missing `target_app` means the requester itself. Any other
/// target requires a permission edge from the requester, unless it names the
/// requester's own client id. The token expires with the caller's access token.
pub async fn issue_app_token(
    store: &dyn Store,
    jwt: &JwtService,
    user: &User,
    requester: &Application,
    access_token: &AccessToken,
    target_app: Option<&str>,
) -> Result<IssuedToken, ServiceError> {
    let target_app = target_app.map(str::trim).filter(|t| !t.is_empty());

    let target = match target_app {
        None => requester.clone(),
        Some(client_id) if client_id == requester.client_id => requester.clone(),
        Some(client_id) => {
            let target = store
                .find_application_by_client_id(client_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Not found.".to_string()))?;

            if store
                .find_app_permission(requester.id, target.id)
                .await?
                .is_none()
            {
                tracing::warn!(
                    requester = %requester.client_id,
                    target = %target.client_id,
                    "App-to-app token denied"
                );
                metrics::record_app_token_denied();
                return Err(ServiceError::PermissionDenied(format!(
                    "no permissions for app {}",
                    target.client_id
                )));
            }
            target
        }
    };

    let ad_groups = if target.include_ad_groups {
        store.user_ad_groups(user.id).await?
    } else {
        Vec::new()
    };

    let claims = jwt.claims_for(user, ad_groups, &target, access_token.expires);
    let issued = jwt.sign(&claims, &target, access_token.expires)?;

    metrics::record_app_token_issued(&target.client_id);
    tracing::info!(
        requester = %requester.client_id,
        target = %target.client_id,
        user = %user.uuid,
        "Issued app-to-app token"
    );

    Ok(issued)
}
