//! Page assembly.
//!
//! Renders a resolved page's ordered block list into HTML. Each block moves
//! from pending to either rendered or errored; a failing block produces a
//! visible inline error fragment and never affects its siblings. Blocks are
//! resolved sequentially so output order always matches the declared order,
//! even though the listings grid performs an additional async fetch.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cache::TenantDataCache;
use crate::models::{Listing, ListingQuery, Page, PublicSettings, TenantId};
use crate::services::media::{self, MediaPreset};

use super::block_render::{format_price, html_escape, render_error_fallback};
use super::block_types::{BlockRegistry, LISTINGS_GRID_TYPE, RenderContext, validate_props};

/// Placeholder image for listings without media.
const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x200?text=Sin+imagen";

/// Renders pages block by block through the registry and the data cache.
#[derive(Clone)]
pub struct PageAssembler {
    inner: Arc<AssemblerInner>,
}

struct AssemblerInner {
    registry: Arc<BlockRegistry>,
    cache: TenantDataCache,
}

impl PageAssembler {
    /// Create an assembler over a block registry and the tenant data cache.
    pub fn new(registry: Arc<BlockRegistry>, cache: TenantDataCache) -> Self {
        Self {
            inner: Arc::new(AssemblerInner { registry, cache }),
        }
    }

    /// Render a page to HTML: the concatenation of its block fragments in
    /// declared order.
    pub async fn render_page(
        &self,
        page: &Page,
        tenant: &TenantId,
        settings: Option<&PublicSettings>,
    ) -> String {
        self.render_blocks(page, tenant, settings).await.concat()
    }

    /// Render each block to its own fragment, preserving order.
    ///
    /// Always returns exactly one fragment per block; errored blocks yield
    /// error fragments.
    pub async fn render_blocks(
        &self,
        page: &Page,
        tenant: &TenantId,
        settings: Option<&PublicSettings>,
    ) -> Vec<String> {
        let ctx = RenderContext { tenant, settings };
        let mut fragments = Vec::with_capacity(page.blocks.len());

        for block in &page.blocks {
            let fragment = self.render_block(&block.block_type, &block.props, &ctx).await;
            fragments.push(fragment);
        }

        debug!(
            tenant = %tenant,
            slug = %page.slug,
            blocks = fragments.len(),
            "page assembled"
        );
        fragments
    }

    async fn render_block(
        &self,
        block_type: &str,
        props: &Value,
        ctx: &RenderContext<'_>,
    ) -> String {
        let Some(definition) = self.inner.registry.get(block_type) else {
            return render_error_fallback(&format!("Tipo de sección desconocido: {block_type}"));
        };

        let errors = validate_props(&definition.schema, props);
        if !errors.is_empty() {
            return render_error_fallback(&format!("{block_type}: {}", errors.join("; ")));
        }

        if block_type == LISTINGS_GRID_TYPE {
            return self.render_listings_grid(props, ctx).await;
        }

        match (definition.render)(props, ctx) {
            Ok(html) => html,
            Err(error) => render_error_fallback(&error.to_string()),
        }
    }

    /// Render the dynamic listings grid: fetch through the cache with the
    /// block's declared filter/sort props, then render cards. An empty
    /// result set renders an explicit no-items message, not an empty void.
    async fn render_listings_grid(&self, props: &Value, ctx: &RenderContext<'_>) -> String {
        let query: ListingQuery =
            serde_json::from_value(props.clone()).unwrap_or_default();

        let listings = self.inner.cache.get_listings(ctx.tenant, &query).await;

        let title_html = match props.get("title").and_then(Value::as_str) {
            Some(title) if !title.is_empty() => {
                format!("<h2 class=\"section-title\">{}</h2>", html_escape(title))
            }
            _ => String::new(),
        };

        if listings.is_empty() {
            return format!(
                "<section class=\"section-listings\"><div class=\"container\">{title_html}\
                 <p class=\"listings-empty\">No hay elementos disponibles en este momento.</p>\
                 </div></section>"
            );
        }

        let columns = props.get("columns").and_then(Value::as_u64).unwrap_or(3);
        let cards: String = listings.iter().map(render_listing_card).collect();

        format!(
            "<section class=\"section-listings\"><div class=\"container\">{title_html}\
             <div class=\"grid\" style=\"grid-template-columns: repeat({columns}, 1fr);\">{cards}</div>\
             </div></section>"
        )
    }
}

/// Render one listing card: image with graceful fallback, title, optional
/// subtitle/description, formatted price when present.
fn render_listing_card(listing: &Listing) -> String {
    let image = listing.card_image().unwrap_or(PLACEHOLDER_IMAGE);
    let image = media::display_url(image, MediaPreset::Card);

    let subtitle = match listing.subtitle.as_deref() {
        Some(text) => format!("<p class=\"card-subtitle\">{}</p>", html_escape(text)),
        None => String::new(),
    };
    let description = match listing.description.as_deref() {
        Some(text) => format!("<p class=\"card-description\">{}</p>", html_escape(text)),
        None => String::new(),
    };
    let price = match listing.price {
        Some(price) => format!("<div class=\"card-price\">{}</div>", format_price(price)),
        None => String::new(),
    };

    format!(
        "<article class=\"listing-card\" data-id=\"{}\">\
         <img src=\"{}\" alt=\"{}\" loading=\"lazy\">\
         <div class=\"card-body\"><h3>{}</h3>{subtitle}{description}{price}</div>\
         </article>",
        html_escape(&listing.id),
        html_escape(&image),
        html_escape(&listing.title),
        html_escape(&listing.title)
    )
}
