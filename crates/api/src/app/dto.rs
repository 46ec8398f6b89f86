use serde::Deserialize;
use serde_json::{json, Value};

use signon_accounts::{Application, User};
use signon_revocation::SuspensionReport;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub application_id: String,
    pub permission: String,
}

#[derive(Debug, Deserialize)]
pub struct SuspensionRequest {
    pub suspended: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetryRevocationRequest {
    /// Failed applications to retry once; empty retries all failures under the retry policy.
    #[serde(default)]
    pub application_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterApplicationRequest {
    pub name: String,
    pub redirect_uri: String,
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub supported_permissions: Vec<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn user_to_json(user: &User) -> Value {
    let grants = user
        .grants
        .iter()
        .map(|g| {
            json!({
                "application_id": g.application_id.to_string(),
                "permissions": g.permissions().iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "id": user.id.to_string(),
        "email": user.email,
        "name": user.name,
        "state": user.status.to_string(),
        "reason_for_suspension": user.reason_for_suspension,
        "suspended_at": user.suspended_at.map(|t| t.to_rfc3339()),
        "grants": grants,
        "version": user.version,
    })
}

/// Application as shown to administrators. The bearer token is never echoed.
pub fn application_to_json(application: &Application) -> Value {
    json!({
        "id": application.id.to_string(),
        "name": application.name,
        "redirect_uri": application.contract.redirect_uri,
        "has_bearer_token": application.contract.bearer_token.is_some(),
        "supported_permissions": application.supported_permission_strings(),
    })
}

fn application_ref(application: &Application) -> Value {
    json!({
        "id": application.id.to_string(),
        "name": application.name,
    })
}

pub fn report_to_json(report: &SuspensionReport) -> Value {
    json!({
        "user_id": report.user_id.to_string(),
        "complete": report.is_complete(),
        "successes": report.successes().iter().map(application_ref).collect::<Vec<_>>(),
        "failures": report
            .failures()
            .iter()
            .map(|f| json!({ "application": application_ref(&f.application), "reason": f.reason }))
            .collect::<Vec<_>>(),
    })
}
