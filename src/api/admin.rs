//! Admin API endpoints.
//!
//! The gate only lets principals holding `ListUsers` through.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{Principal, UserProfile};
use crate::directory::UserDirectory;

#[derive(Clone)]
pub struct AdminState {
    pub directory: Arc<dyn UserDirectory>,
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .with_state(state)
}

/// List every account.
async fn list_users(
    State(state): State<AdminState>,
    Principal(admin): Principal,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .directory
        .list_identities()
        .await
        .db_err("Failed to list users")?;

    tracing::debug!(admin_id = admin.id, count = users.len(), "Listed users");
    Ok(Json(
        users.iter().map(UserProfile::from).collect::<Vec<_>>(),
    ))
}
