//! Admin write endpoints.
//!
//! Guarded by the admin capability token. Every write invalidates the
//! tenant's cache so readers see fresh data on next access, and publishes
//! the matching lifecycle event.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::content::BlockSummary;
use crate::error::{AppError, AppResult};
use crate::events::{LISTING_UPDATED, PAGE_PUBLISHED};
use crate::models::TenantId;
use crate::services::upload::SignedUpload;
use crate::state::AppState;

use super::helpers::{require_admin, resolve_tenant};

/// Query parameters accepted on admin endpoints.
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// Explicit tenant override; falls back to Host-header resolution.
    #[serde(default)]
    pub client: Option<String>,
}

/// Body for signed-upload issuance.
#[derive(Debug, Deserialize)]
pub struct SignUploadRequest {
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String {
    "uploads".to_string()
}

/// Create the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/blocks", get(list_blocks))
        .route("/admin/pages/{slug}", put(upsert_page))
        .route("/admin/settings", put(upsert_settings))
        .route("/admin/listings", post(create_listing))
        .route("/admin/listings/{id}", delete(delete_listing))
        .route("/admin/cache/invalidate", post(invalidate_cache))
        .route("/admin/uploads/sign", post(sign_upload))
}

/// Check the capability token and resolve the target tenant.
async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    params: &AdminQuery,
) -> AppResult<TenantId> {
    require_admin(state, headers)?;
    resolve_tenant(state, headers, params.client.as_deref())
        .await
        .ok_or_else(|| AppError::BadRequest("tenant no resuelto".to_string()))
}

/// Available block types for the admin builder.
async fn list_blocks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<BlockSummary>>> {
    require_admin(&state, &headers)?;
    Ok(Json(state.registry().available()))
}

/// Create or replace a page document.
async fn upsert_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Query(params): Query<AdminQuery>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let tenant = authorize(&state, &headers, &params).await?;
    if !body.is_object() {
        return Err(AppError::BadRequest("el documento debe ser un objeto".to_string()));
    }

    let published = body.get("status").and_then(Value::as_str) == Some("published");

    let collection = format!("clients/{tenant}/pages");
    state
        .store()
        .set_document(&collection, &slug, body, false)
        .await
        .map_err(AppError::Internal)?;

    state.cache().invalidate(&tenant);

    if published {
        state.emit_event(PAGE_PUBLISHED, &tenant, json!({ "slug": slug }));
    }

    info!(tenant = %tenant, slug = %slug, published, "page saved");
    Ok(Json(json!({ "saved": true, "slug": slug })))
}

/// Update the tenant's public settings (shallow merge).
async fn upsert_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AdminQuery>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let tenant = authorize(&state, &headers, &params).await?;
    if !body.is_object() {
        return Err(AppError::BadRequest("el documento debe ser un objeto".to_string()));
    }

    let collection = format!("clients/{tenant}/settings");
    state
        .store()
        .set_document(&collection, "public", body, true)
        .await
        .map_err(AppError::Internal)?;

    state.cache().invalidate(&tenant);

    info!(tenant = %tenant, "settings saved");
    Ok(Json(json!({ "saved": true })))
}

/// Create a listing document.
async fn create_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AdminQuery>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let tenant = authorize(&state, &headers, &params).await?;
    if !body.is_object() {
        return Err(AppError::BadRequest("el documento debe ser un objeto".to_string()));
    }

    let collection = format!("clients/{tenant}/content/listings");
    let id = state
        .store()
        .add_document(&collection, body)
        .await
        .map_err(AppError::Internal)?;

    state.cache().invalidate(&tenant);
    state.emit_event(LISTING_UPDATED, &tenant, json!({ "listingId": id }));

    info!(tenant = %tenant, listing_id = %id, "listing created");
    Ok(Json(json!({ "saved": true, "id": id })))
}

/// Delete a listing document.
async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<AdminQuery>,
) -> AppResult<Json<Value>> {
    let tenant = authorize(&state, &headers, &params).await?;

    let collection = format!("clients/{tenant}/content/listings");
    state
        .store()
        .delete_document(&collection, &id)
        .await
        .map_err(AppError::Internal)?;

    state.cache().invalidate(&tenant);
    state.emit_event(LISTING_UPDATED, &tenant, json!({ "listingId": id, "deleted": true }));

    info!(tenant = %tenant, listing_id = %id, "listing deleted");
    Ok(Json(json!({ "deleted": true })))
}

/// Explicitly purge the tenant's cache.
async fn invalidate_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AdminQuery>,
) -> AppResult<Json<Value>> {
    let tenant = authorize(&state, &headers, &params).await?;
    state.cache().invalidate(&tenant);
    Ok(Json(json!({ "invalidated": true })))
}

/// Issue a short-lived signed upload ticket scoped to the tenant's folder.
async fn sign_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AdminQuery>,
    Json(request): Json<SignUploadRequest>,
) -> AppResult<Json<SignedUpload>> {
    let tenant = authorize(&state, &headers, &params).await?;

    let uploads = state
        .uploads()
        .ok_or_else(|| AppError::BadRequest("subidas firmadas no configuradas".to_string()))?;

    Ok(Json(uploads.issue(&tenant, &request.folder)))
}
