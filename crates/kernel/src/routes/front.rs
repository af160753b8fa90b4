//! Public page rendering routes.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::state::AppState;

use super::helpers::{render_document, render_not_found, render_unconfigured, resolve_tenant};

/// Slug rendered for the site root.
const HOME_SLUG: &str = "home";

/// Query parameters accepted on public pages.
#[derive(Debug, Deserialize)]
pub struct FrontQuery {
    /// Explicit tenant override, for tests and previews.
    #[serde(default)]
    pub client: Option<String>,
}

/// Create the public router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(front_page))
        .route("/{slug}", get(page_by_slug))
}

/// Front page: renders the tenant's `home` page.
async fn front_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FrontQuery>,
) -> Response {
    render_page(&state, HOME_SLUG, &headers, &params).await
}

/// Any other published page by slug.
async fn page_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Query(params): Query<FrontQuery>,
) -> Response {
    render_page(&state, &slug, &headers, &params).await
}

async fn render_page(
    state: &AppState,
    slug: &str,
    headers: &HeaderMap,
    params: &FrontQuery,
) -> Response {
    let Some(tenant) = resolve_tenant(state, headers, params.client.as_deref()).await else {
        return Html(render_unconfigured()).into_response();
    };

    let settings = state.cache().get_settings(&tenant).await;

    let Some(page) = state.cache().get_page(&tenant, slug).await else {
        return (StatusCode::NOT_FOUND, Html(render_not_found())).into_response();
    };

    let body = state
        .assembler()
        .render_page(&page, &tenant, settings.as_deref())
        .await;

    Html(render_document(settings.as_deref(), &page, &body)).into_response()
}
