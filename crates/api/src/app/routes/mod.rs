use axum::Router;

pub mod admin;
pub mod applications;
pub mod system;

/// Router for the administrative endpoints.
pub fn router() -> Router {
    Router::new().nest("/admin", admin::router().merge(applications::router()))
}
