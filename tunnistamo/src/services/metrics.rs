//! Domain counters. Rendered by the recorder installed in `main`; without a
//! recorder (tests) the macros are no-ops.

use metrics::counter;

use super::login_gate::DenyReason;

pub fn record_app_token_issued(target: &str) {
    counter!("tunnistamo_app_tokens_issued_total", "target" => target.to_string()).increment(1);
}

pub fn record_app_token_denied() {
    counter!("tunnistamo_app_tokens_denied_total").increment(1);
}

pub fn record_login_denied(reason: &DenyReason) {
    let reason = match reason {
        DenyReason::NoBackendRecorded => "no_backend",
        DenyReason::BackendNotAllowed(_) => "backend_not_allowed",
    };
    counter!("tunnistamo_login_gate_denied_total", "reason" => reason).increment(1);
}
