//! Shared route helpers: tenant resolution from the request, admin
//! authorization, and the HTML document shell.

use axum::http::{HeaderMap, header};

use crate::content::html_escape;
use crate::error::{AppError, AppResult};
use crate::models::{Page, PublicSettings, TenantId};
use crate::state::AppState;

/// Header carrying the admin capability token.
const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Resolve the request's tenant from an explicit override or the Host
/// header.
pub async fn resolve_tenant(
    state: &AppState,
    headers: &HeaderMap,
    override_id: Option<&str>,
) -> Option<TenantId> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    state.resolver().resolve(host, override_id).await
}

/// Require the admin capability for a write endpoint.
///
/// The capability check is a shared-token comparison; when no token is
/// configured, admin routes are disabled entirely.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = state.config().admin_token.as_deref() else {
        return Err(AppError::Unauthorized);
    };

    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided == Some(expected) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Wrap rendered page content in the HTML document shell.
pub fn render_document(settings: Option<&PublicSettings>, page: &Page, body: &str) -> String {
    let site_name = settings.map(|s| s.name.as_str()).filter(|n| !n.is_empty());
    let title = match (page.meta.title.as_deref(), site_name) {
        (Some(title), Some(name)) => format!("{title} | {name}"),
        (Some(title), None) => title.to_string(),
        (None, Some(name)) => name.to_string(),
        (None, None) => "Sitio".to_string(),
    };

    let description = match page.meta.description.as_deref() {
        Some(text) => format!(
            "<meta name=\"description\" content=\"{}\">",
            html_escape(text)
        ),
        None => String::new(),
    };

    let theme_color = settings
        .and_then(|s| s.theme_color.as_deref())
        .unwrap_or("#E50914");

    format!(
        "<!DOCTYPE html><html lang=\"es\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title>{description}\
         <meta name=\"theme-color\" content=\"{}\">\
         </head><body><main id=\"pageContent\">{body}</main></body></html>",
        html_escape(&title),
        html_escape(theme_color)
    )
}

/// Spanish 404 page.
pub fn render_not_found() -> String {
    "<!DOCTYPE html><html lang=\"es\"><head><meta charset=\"utf-8\">\
     <title>404</title></head><body><section class=\"section-not-found\">\
     <h1>404</h1><p>La página no fue encontrada.</p>\
     <a href=\"/\" class=\"btn btn-primary\">Volver al inicio</a>\
     </section></body></html>"
        .to_string()
}

/// Placeholder for requests whose hostname resolves to no tenant.
pub fn render_unconfigured() -> String {
    "<!DOCTYPE html><html lang=\"es\"><head><meta charset=\"utf-8\">\
     <title>Sitio no configurado</title></head><body>\
     <section class=\"section-unconfigured\"><h1>Sitio no configurado</h1>\
     <p>Este dominio todavía no está asociado a ningún sitio.</p>\
     </section></body></html>"
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(meta: serde_json::Value) -> Page {
        serde_json::from_value(json!({ "status": "published", "meta": meta })).unwrap()
    }

    #[test]
    fn document_title_combines_page_and_site() {
        let settings = PublicSettings {
            name: "AutoElite".to_string(),
            ..Default::default()
        };
        let html = render_document(Some(&settings), &page(json!({ "title": "Inicio" })), "<p>x</p>");
        assert!(html.contains("<title>Inicio | AutoElite</title>"));
        assert!(html.contains("<main id=\"pageContent\"><p>x</p></main>"));
    }

    #[test]
    fn document_falls_back_to_site_name() {
        let settings = PublicSettings {
            name: "AutoElite".to_string(),
            ..Default::default()
        };
        let html = render_document(Some(&settings), &page(json!({})), "");
        assert!(html.contains("<title>AutoElite</title>"));
    }

    #[test]
    fn document_description_is_escaped() {
        let html = render_document(
            None,
            &page(json!({ "description": "Autos \"premium\" & más" })),
            "",
        );
        assert!(html.contains("Autos &quot;premium&quot; &amp; más"));
    }

    #[test]
    fn not_found_page_is_spanish() {
        assert!(render_not_found().contains("La página no fue encontrada."));
    }

    #[test]
    fn unconfigured_placeholder_names_the_problem() {
        assert!(render_unconfigured().contains("Sitio no configurado"));
    }
}
