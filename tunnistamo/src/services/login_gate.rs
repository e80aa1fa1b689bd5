//! Post-login allow-list check.

use std::collections::HashSet;

use service_core::error::AppError;

use super::metrics;
use super::session::Session;
use super::store::Store;
use crate::models::Application;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// A user is logged in but no backend was recorded for the login.
    NoBackendRecorded,
    /// The backend used is not among the application's login methods.
    BackendNotAllowed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Allow,
    Deny(DenyReason),
}

/// Decide whether the session's login may continue to `application`.
/// Without an application context the login always proceeds.
pub async fn check_login(
    store: &dyn Store,
    session: &Session,
    application: Option<&Application>,
) -> Result<GateOutcome, AppError> {
    let Some(application) = application else {
        return Ok(GateOutcome::Allow);
    };

    let allowed: HashSet<String> = store
        .application_login_methods(application.id)
        .await?
        .into_iter()
        .map(|m| m.provider_id)
        .collect();

    let outcome = match session.last_login_backend.as_deref() {
        None => GateOutcome::Deny(DenyReason::NoBackendRecorded),
        Some(backend) if !allowed.contains(backend) => {
            GateOutcome::Deny(DenyReason::BackendNotAllowed(backend.to_string()))
        }
        Some(_) => GateOutcome::Allow,
    };

    if let GateOutcome::Deny(reason) = &outcome {
        tracing::warn!(
            client_id = %application.client_id,
            user_id = session.user_id,
            reason = ?reason,
            "Login method not allowed for application"
        );
        metrics::record_login_denied(reason);
    }

    Ok(outcome)
}

/// `<login_url>?next=<encoded full path>`.
pub fn login_redirect(login_url: &str, next: &str) -> String {
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}next={}",
        login_url,
        separator,
        urlencoding::encode(next)
    )
}
