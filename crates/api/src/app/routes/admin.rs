//! Admin routes for user accounts and suspension.
//!
//! Suspending a user records the suspension first and then revokes the
//! user's access in every application they used. The response always carries
//! the revocation report, so partial failures are visible to the operator.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use signon_core::{ApplicationId, UserId};

use crate::app::{dto, errors, services::AppServices};

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/permissions", post(grant_permission))
        .route("/users/:id/suspension", put(update_suspension).get(get_suspension_report))
        .route("/users/:id/suspension/retry", post(retry_revocation))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /admin/users - Create a new user
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    match services.create_user(body.email, body.name) {
        Ok(user) => (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/users - List users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_users() {
        Ok(users) => {
            let items = users.iter().map(dto::user_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/users/:id - Get a user
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.get_user(user_id) {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /admin/users/:id/permissions - Grant a permission on an application
pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::GrantPermissionRequest>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let application_id: ApplicationId = match errors::parse_id(&body.application_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.grant_permission(user_id, application_id, body.permission) {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /admin/users/:id/suspension - Suspend or unsuspend a user
pub async fn update_suspension(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SuspensionRequest>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if !body.suspended {
        return match services.unsuspend_user(user_id) {
            Ok(user) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "user": dto::user_to_json(&user),
                    "state": user.status.to_string(),
                })),
            )
                .into_response(),
            Err(e) => errors::service_error_to_response(e),
        };
    }

    let Some(reason) = body.reason else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "reason for suspension is required",
        );
    };

    match services.suspend_user(user_id, reason).await {
        Ok((user, report)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "user": dto::user_to_json(&user),
                "state": user.status.to_string(),
                "report": dto::report_to_json(&report),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/users/:id/suspension - Latest revocation report of a suspended user
pub async fn get_suspension_report(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.suspension_report(user_id) {
        Ok(report) => (StatusCode::OK, Json(dto::report_to_json(&report))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /admin/users/:id/suspension/retry - Retry failed revocations
pub async fn retry_revocation(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::RetryRevocationRequest>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut application_ids = Vec::with_capacity(body.application_ids.len());
    for raw in &body.application_ids {
        match errors::parse_id::<ApplicationId>(raw) {
            Ok(id) => application_ids.push(id),
            Err(resp) => return resp,
        }
    }

    match services.retry_revocation(user_id, &application_ids).await {
        Ok(report) => (StatusCode::OK, Json(dto::report_to_json(&report))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
