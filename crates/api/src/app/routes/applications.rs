use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};

use signon_core::ApplicationId;

use crate::app::services::{AppServices, NewApplication};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/applications", post(register_application).get(list_applications))
        .route("/applications/:id", delete(remove_application))
}

pub async fn register_application(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterApplicationRequest>,
) -> axum::response::Response {
    let new = NewApplication {
        name: body.name,
        redirect_uri: body.redirect_uri,
        bearer_token: body.bearer_token,
        supported_permissions: body.supported_permissions,
    };

    match services.register_application(new) {
        Ok(application) => (
            StatusCode::CREATED,
            Json(dto::application_to_json(&application)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_applications(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_applications() {
        Ok(applications) => {
            let items = applications
                .iter()
                .map(dto::application_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Removing an application also drops every grant held on it.
pub async fn remove_application(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let application_id: ApplicationId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.remove_application(application_id) {
        Ok((application, affected)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "application": dto::application_to_json(&application),
                "users_affected": affected,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
