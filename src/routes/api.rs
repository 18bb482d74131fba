// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::NewListing;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Listing, User};
use crate::services::ReindexSummary;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API routes (require authentication).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users", get(list_users))
        .route("/listings", post(create_listing))
        .route("/listings/my-listings", get(my_listings))
        .route("/admin/reindex", post(reindex))
}

/// Query parameters for paginated endpoints.
#[derive(Deserialize)]
pub struct PageParams {
    #[serde(default)]
    offset: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
}

fn require_superuser(auth: &AuthUser) -> Result<()> {
    if !auth.user.is_superuser {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        ));
    }
    Ok(())
}

// ─── Users ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonated_by: Option<u64>,
}

/// Get the current user.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user: auth.user,
        impersonated_by: auth.impersonated_by,
    })
}

#[derive(Deserialize)]
pub struct UserSearchParams {
    /// Partial email match
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    offset: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
    pub total_count: u64,
}

/// List or search users. Superusers only.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<UserSearchParams>,
) -> Result<Json<UsersResponse>> {
    require_superuser(&auth)?;

    let page = state
        .config
        .page_bounds
        .resolve(params.offset, params.page_size)?;

    let (users, total_count) = match params.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => state.users.search_by_email(email, page).await?,
        _ => state.users.all_users(page).await?,
    };

    Ok(Json(UsersResponse { users, total_count }))
}

// ─── Listings ────────────────────────────────────────────────

/// Create a listing coordinated by the current user.
async fn create_listing(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(new): Json<NewListing>,
) -> Result<(StatusCode, Json<Listing>)> {
    if new.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }

    let listing = state.store.create_listing(new, &auth.user);
    state.listings.add(&listing).await?;

    Ok((StatusCode::CREATED, Json(listing)))
}

#[derive(Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
    pub total_count: u64,
}

/// Listings the current user coordinates.
async fn my_listings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListingsResponse>> {
    let page = state
        .config
        .page_bounds
        .resolve(params.offset, params.page_size)?;

    let (listings, total_count) = state
        .listings
        .search_by_coordinator_id(auth.user.id, page)
        .await?;

    Ok(Json(ListingsResponse {
        listings,
        total_count,
    }))
}

// ─── Admin ───────────────────────────────────────────────────

/// Push every stored user and listing to the search index. Superusers only.
async fn reindex(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ReindexSummary>> {
    require_superuser(&auth)?;

    tracing::info!(user_id = auth.user.id, "Reindex requested");
    let summary = crate::services::reindex(&state.store, &state.users, &state.listings).await;
    Ok(Json(summary))
}
