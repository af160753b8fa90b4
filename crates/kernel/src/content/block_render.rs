//! Render functions for the standard block types.
//!
//! Each renderer converts validated block props into an HTML fragment.
//! Renderers never panic: internal failures come back as [`RenderError`]
//! and the assembler converts them into a visible inline error fragment.
//! All interpolated text is escaped; `richText` is the one deliberate
//! passthrough (admin-authored, trusted HTML).

use serde_json::Value;

use crate::services::media::{self, MediaPreset};

use super::block_types::{RenderContext, RenderError};

/// Fallback theme color when neither props nor settings provide one.
const DEFAULT_THEME_COLOR: &str = "#E50914";

/// Escape HTML special characters for safe interpolation.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Visible, styled error fragment shown in place of a failed block.
pub fn render_error_fallback(message: &str) -> String {
    format!(
        "<div class=\"section-error\">⚠️ Error renderizando sección: {}</div>",
        html_escape(message)
    )
}

/// Format a price the way the sites show it: "$ 1.234.567", no decimals.
pub fn format_price(price: f64) -> String {
    let negative = price < 0.0;
    let rounded = price.abs().round() as u64;
    let digits = rounded.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("$ -{grouped}")
    } else {
        format!("$ {grouped}")
    }
}

fn prop_str<'a>(props: &'a Value, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn prop_or<'a>(props: &'a Value, key: &str, default: &'a str) -> &'a str {
    prop_str(props, key).unwrap_or(default)
}

fn prop_u64(props: &Value, key: &str, default: u64) -> u64 {
    props.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn prop_items<'a>(props: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    props.get(key).and_then(Value::as_array)
}

fn optional_heading(props: &Value) -> String {
    match prop_str(props, "title") {
        Some(title) => format!("<h2 class=\"section-title\">{}</h2>", html_escape(title)),
        None => String::new(),
    }
}

/// Hero banner: title + subtitle + optional background image + CTA button.
pub fn render_hero(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let title = prop_or(props, "title", "Bienvenido");
    let subtitle = prop_str(props, "subtitle");

    let bg_style = match prop_str(props, "bgImage") {
        Some(url) => format!(
            " style=\"background-image: url('{}');\"",
            html_escape(&media::display_url(url, MediaPreset::Hero))
        ),
        None => String::new(),
    };

    let subtitle_html = match subtitle {
        Some(text) => format!("<p class=\"hero-subtitle\">{}</p>", html_escape(text)),
        None => String::new(),
    };

    let cta_html = match props.get("cta") {
        Some(cta) => match (
            cta.get("text").and_then(Value::as_str),
            cta.get("link").and_then(Value::as_str),
        ) {
            (Some(text), Some(link)) if !text.is_empty() && !link.is_empty() => format!(
                "<a href=\"{}\" class=\"btn btn-primary\">{}</a>",
                html_escape(link),
                html_escape(text)
            ),
            _ => String::new(),
        },
        None => String::new(),
    };

    Ok(format!(
        "<section class=\"section-hero\"{bg_style}><div class=\"container\">\
         <h1>{}</h1>{subtitle_html}{cta_html}</div></section>",
        html_escape(title)
    ))
}

/// Rich text passthrough with alignment. The HTML is admin-authored and
/// trusted; it is not escaped or sanitized here.
pub fn render_rich_text(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let html = prop_or(props, "html", "");
    let alignment = prop_or(props, "alignment", "left");

    Ok(format!(
        "<section class=\"section-richtext\" style=\"text-align: {alignment};\">\
         <div class=\"container\">{html}</div></section>"
    ))
}

/// Static services grid. Requires a non-empty items array.
pub fn render_services_grid(
    props: &Value,
    _ctx: &RenderContext<'_>,
) -> Result<String, RenderError> {
    let items = prop_items(props, "items")
        .filter(|items| !items.is_empty())
        .ok_or_else(|| RenderError::new("servicesGrid", "items debe ser una lista no vacía"))?;

    let cards: String = items
        .iter()
        .map(|item| {
            let icon = match item.get("icon").and_then(Value::as_str) {
                Some(icon) => format!("<div class=\"service-icon\">{}</div>", html_escape(icon)),
                None => String::new(),
            };
            let description = match item.get("description").and_then(Value::as_str) {
                Some(text) => format!("<p>{}</p>", html_escape(text)),
                None => String::new(),
            };
            format!(
                "<div class=\"service-item\">{icon}<h3>{}</h3>{description}</div>",
                html_escape(item.get("title").and_then(Value::as_str).unwrap_or_default())
            )
        })
        .collect();

    let columns = prop_u64(props, "columns", 3);
    Ok(format!(
        "<section class=\"section-services\"><div class=\"container\">{}\
         <div class=\"grid\" style=\"grid-template-columns: repeat({columns}, 1fr);\">{cards}</div>\
         </div></section>",
        optional_heading(props)
    ))
}

/// Testimonial cards. Requires a non-empty items array.
pub fn render_testimonials(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let items = prop_items(props, "items")
        .filter(|items| !items.is_empty())
        .ok_or_else(|| RenderError::new("testimonials", "items debe ser una lista no vacía"))?;

    let cards: String = items
        .iter()
        .map(|item| {
            let author = item.get("author").and_then(Value::as_str).unwrap_or("Anónimo");
            let photo = match item.get("photo").and_then(Value::as_str) {
                Some(url) => format!(
                    "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                    html_escape(&media::display_url(url, MediaPreset::Card)),
                    html_escape(author)
                ),
                None => String::new(),
            };
            let role = match item.get("role").and_then(Value::as_str) {
                Some(role) => format!("<small>{}</small>", html_escape(role)),
                None => String::new(),
            };
            format!(
                "<div class=\"testimonial-card\"><p class=\"quote\">\"{}\"</p>{photo}\
                 <strong>{}</strong>{role}</div>",
                html_escape(item.get("quote").and_then(Value::as_str).unwrap_or_default()),
                html_escape(author)
            )
        })
        .collect();

    Ok(format!(
        "<section class=\"section-testimonials\"><div class=\"container\">{}\
         <div class=\"grid\">{cards}</div></div></section>",
        optional_heading(props)
    ))
}

/// FAQ accordion. Requires a non-empty items array.
pub fn render_faq(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let items = prop_items(props, "items")
        .filter(|items| !items.is_empty())
        .ok_or_else(|| RenderError::new("faq", "items debe ser una lista no vacía"))?;

    let entries: String = items
        .iter()
        .map(|item| {
            format!(
                "<details class=\"faq-item\"><summary>{}</summary><div>{}</div></details>",
                html_escape(item.get("question").and_then(Value::as_str).unwrap_or_default()),
                html_escape(item.get("answer").and_then(Value::as_str).unwrap_or_default())
            )
        })
        .collect();

    Ok(format!(
        "<section class=\"section-faq\"><div class=\"container\">{}{entries}</div></section>",
        optional_heading(props)
    ))
}

/// Highlighted call-to-action banner. Falls back to the tenant's theme color.
pub fn render_call_to_action(
    props: &Value,
    ctx: &RenderContext<'_>,
) -> Result<String, RenderError> {
    let theme = ctx
        .settings
        .and_then(|s| s.theme_color.as_deref())
        .unwrap_or(DEFAULT_THEME_COLOR);
    let bg_color = prop_or(props, "bgColor", theme);

    Ok(format!(
        "<section class=\"section-cta\" style=\"background-color: {bg_color};\">\
         <div class=\"container\"><h2>{}</h2>\
         <a href=\"{}\" class=\"btn btn-white\">{}</a></div></section>",
        html_escape(prop_or(props, "text", "¿Listo para comenzar?")),
        html_escape(prop_or(props, "buttonLink", "/")),
        html_escape(prop_or(props, "buttonText", "Comenzar"))
    ))
}

/// Static fallback for the listings grid.
///
/// The page assembler intercepts this type and renders fetched listings; this
/// shell only appears if the type is rendered outside the assembler.
pub fn render_listings_shell(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let columns = prop_u64(props, "columns", 3);
    Ok(format!(
        "<section class=\"section-listings\"><div class=\"container\">{}\
         <div class=\"grid\" style=\"grid-template-columns: repeat({columns}, 1fr);\">\
         <p class=\"listings-loading\">Cargando elementos…</p></div></div></section>",
        optional_heading(props)
    ))
}

/// Contact form whose field list is itself schema-declared.
pub fn render_contact_form(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let title = prop_or(props, "title", "Contáctanos");
    let submit_text = prop_or(props, "submitText", "Enviar");

    let fields_html: String = prop_items(props, "fields")
        .map(|fields| {
            fields
                .iter()
                .filter_map(|field| {
                    let name = field.get("name").and_then(Value::as_str)?;
                    let field_type = field.get("type").and_then(Value::as_str).unwrap_or("text");
                    let required = field
                        .get("required")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    let required_attr = if required { " required" } else { "" };
                    let placeholder = capitalize(name);

                    Some(if field_type == "textarea" {
                        format!(
                            "<div class=\"form-field\"><textarea name=\"{}\" \
                             placeholder=\"{}\"{required_attr}></textarea></div>",
                            html_escape(name),
                            html_escape(&placeholder)
                        )
                    } else {
                        format!(
                            "<div class=\"form-field\"><input type=\"{}\" name=\"{}\" \
                             placeholder=\"{}\"{required_attr}></div>",
                            html_escape(field_type),
                            html_escape(name),
                            html_escape(&placeholder)
                        )
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(format!(
        "<section class=\"section-contact-form\"><div class=\"container\">\
         <h2>{}</h2><form class=\"contact-form\" method=\"post\" action=\"/api/leads\">\
         {fields_html}<button type=\"submit\" class=\"btn btn-primary\">{}</button>\
         </form></div></section>",
        html_escape(title),
        html_escape(submit_text)
    ))
}

/// Social network links with per-network icons.
pub fn render_social_links(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let links = prop_items(props, "links")
        .filter(|links| !links.is_empty())
        .ok_or_else(|| RenderError::new("socialLinks", "links debe ser una lista no vacía"))?;

    let anchors: String = links
        .iter()
        .filter_map(|link| {
            let name = link.get("name").and_then(Value::as_str)?;
            let url = link.get("url").and_then(Value::as_str)?;
            let icon = social_icon(name);
            Some(format!(
                "<a href=\"{}\" class=\"social-link\" target=\"_blank\" \
                 rel=\"noopener noreferrer\" title=\"{}\">{icon}</a>",
                html_escape(url),
                html_escape(name)
            ))
        })
        .collect();

    Ok(format!(
        "<section class=\"section-social-links\"><div class=\"container\">{anchors}</div></section>"
    ))
}

fn social_icon(name: &str) -> &'static str {
    match name.to_ascii_lowercase().as_str() {
        "instagram" => "📷",
        "facebook" => "👍",
        "linkedin" => "💼",
        "twitter" => "🐦",
        "whatsapp" => "💬",
        "youtube" => "🎥",
        "tiktok" => "🎵",
        _ => "🔗",
    }
}

/// Simple announcement banner.
pub fn render_banner(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let bg_color = prop_or(props, "bgColor", DEFAULT_THEME_COLOR);
    let text_color = prop_or(props, "textColor", "#ffffff");
    let icon = match prop_str(props, "icon") {
        Some(icon) => format!("<span class=\"banner-icon\">{}</span> ", html_escape(icon)),
        None => String::new(),
    };

    Ok(format!(
        "<section class=\"section-banner\" style=\"background-color: {bg_color}; color: {text_color};\">\
         <div class=\"container\">{icon}<span>{}</span></div></section>",
        html_escape(prop_or(props, "text", "Anuncio importante"))
    ))
}

/// Image gallery grid. Requires a non-empty items array.
pub fn render_gallery(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let items = prop_items(props, "items")
        .filter(|items| !items.is_empty())
        .ok_or_else(|| RenderError::new("gallery", "items debe ser una lista no vacía"))?;

    let figures: String = items
        .iter()
        .filter_map(|item| {
            let url = item.get("url").and_then(Value::as_str)?;
            let alt = item.get("alt").and_then(Value::as_str).unwrap_or("Imagen de galería");
            Some(format!(
                "<figure class=\"gallery-item\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></figure>",
                html_escape(&media::display_url(url, MediaPreset::Card)),
                html_escape(alt)
            ))
        })
        .collect();

    let columns = prop_u64(props, "columns", 3);
    Ok(format!(
        "<section class=\"section-gallery\"><div class=\"container\">\
         <div class=\"grid\" style=\"grid-template-columns: repeat({columns}, 1fr);\">{figures}</div>\
         </div></section>"
    ))
}

/// Opening-hours table.
pub fn render_hours(props: &Value, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
    let schedule = prop_items(props, "schedule")
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| RenderError::new("hours", "schedule debe ser una lista no vacía"))?;

    let rows: String = schedule
        .iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                html_escape(row.get("day").and_then(Value::as_str).unwrap_or_default()),
                html_escape(row.get("hours").and_then(Value::as_str).unwrap_or("Cerrado"))
            )
        })
        .collect();

    Ok(format!(
        "<section class=\"section-hours\"><div class=\"container\">{}\
         <table class=\"hours-table\">{rows}</table></div></section>",
        optional_heading(props)
    ))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{PublicSettings, TenantId};
    use serde_json::json;

    fn tenant() -> TenantId {
        TenantId::new("acme")
    }

    fn ctx<'a>(tenant: &'a TenantId, settings: Option<&'a PublicSettings>) -> RenderContext<'a> {
        RenderContext { tenant, settings }
    }

    #[test]
    fn escape_special_chars() {
        assert_eq!(html_escape("<>&\"'"), "&lt;&gt;&amp;&quot;&#x27;");
        assert_eq!(html_escape("hola mundo"), "hola mundo");
    }

    #[test]
    fn hero_with_all_props() {
        let t = tenant();
        let html = render_hero(
            &json!({
                "title": "Bienvenido",
                "subtitle": "Los mejores autos",
                "bgImage": "https://res.cloudinary.com/demo/image/upload/v1/bg.jpg",
                "cta": { "text": "Ver catálogo", "link": "/vehiculos" }
            }),
            &ctx(&t, None),
        )
        .unwrap();

        assert!(html.contains("<h1>Bienvenido</h1>"));
        assert!(html.contains("Los mejores autos"));
        assert!(html.contains("w_800"), "hero image should use the hero preset: {html}");
        assert!(html.contains("href=\"/vehiculos\""));
    }

    #[test]
    fn hero_defaults_title() {
        let t = tenant();
        let html = render_hero(&json!({}), &ctx(&t, None)).unwrap();
        assert!(html.contains("<h1>Bienvenido</h1>"));
        assert!(!html.contains("btn-primary"));
    }

    #[test]
    fn hero_escapes_title() {
        let t = tenant();
        let html = render_hero(
            &json!({ "title": "<script>alert('xss')</script>" }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn rich_text_passes_html_through() {
        let t = tenant();
        let html = render_rich_text(
            &json!({ "html": "<p>Texto <b>rico</b></p>", "alignment": "center" }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("<p>Texto <b>rico</b></p>"));
        assert!(html.contains("text-align: center;"));
    }

    #[test]
    fn services_grid_requires_items() {
        let t = tenant();
        let err = render_services_grid(&json!({ "items": [] }), &ctx(&t, None)).unwrap_err();
        assert!(err.to_string().contains("servicesGrid"));
        assert!(err.to_string().contains("no vacía"));
    }

    #[test]
    fn services_grid_renders_items() {
        let t = tenant();
        let html = render_services_grid(
            &json!({
                "title": "Servicios",
                "items": [
                    { "title": "Financiación", "icon": "💳", "description": "Planes a medida" },
                    { "title": "Garantía" }
                ],
                "columns": 2
            }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("<h2 class=\"section-title\">Servicios</h2>"));
        assert!(html.contains("<h3>Financiación</h3>"));
        assert!(html.contains("repeat(2, 1fr)"));
    }

    #[test]
    fn testimonials_empty_items_is_an_error() {
        let t = tenant();
        assert!(render_testimonials(&json!({ "items": [] }), &ctx(&t, None)).is_err());
    }

    #[test]
    fn testimonials_render_author_and_quote() {
        let t = tenant();
        let html = render_testimonials(
            &json!({ "items": [ { "quote": "Excelente atención", "author": "Ana", "role": "Clienta" } ] }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("Excelente atención"));
        assert!(html.contains("<strong>Ana</strong>"));
        assert!(html.contains("<small>Clienta</small>"));
    }

    #[test]
    fn faq_renders_details() {
        let t = tenant();
        let html = render_faq(
            &json!({ "items": [ { "question": "¿Aceptan permutas?", "answer": "Sí" } ] }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("<summary>¿Aceptan permutas?</summary>"));
    }

    #[test]
    fn cta_uses_settings_theme_color() {
        let t = tenant();
        let settings = PublicSettings {
            theme_color: Some("#123456".to_string()),
            ..Default::default()
        };
        let html = render_call_to_action(
            &json!({ "text": "Llamanos", "buttonText": "Llamar", "buttonLink": "tel:+54379" }),
            &ctx(&t, Some(&settings)),
        )
        .unwrap();
        assert!(html.contains("background-color: #123456;"));
    }

    #[test]
    fn cta_prop_color_wins_over_settings() {
        let t = tenant();
        let settings = PublicSettings {
            theme_color: Some("#123456".to_string()),
            ..Default::default()
        };
        let html = render_call_to_action(
            &json!({
                "text": "x", "buttonText": "y", "buttonLink": "/", "bgColor": "#abcdef"
            }),
            &ctx(&t, Some(&settings)),
        )
        .unwrap();
        assert!(html.contains("background-color: #abcdef;"));
    }

    #[test]
    fn contact_form_renders_declared_fields() {
        let t = tenant();
        let html = render_contact_form(
            &json!({
                "title": "Escribinos",
                "fields": [
                    { "name": "nombre", "type": "text", "required": true },
                    { "name": "email", "type": "email", "required": true },
                    { "name": "mensaje", "type": "textarea" }
                ],
                "submitText": "Enviar consulta"
            }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("action=\"/api/leads\""));
        assert!(html.contains("<input type=\"email\" name=\"email\" placeholder=\"Email\" required>"));
        assert!(html.contains("<textarea name=\"mensaje\""));
        assert!(html.contains(">Enviar consulta</button>"));
    }

    #[test]
    fn social_links_icons() {
        let t = tenant();
        let html = render_social_links(
            &json!({ "links": [
                { "name": "instagram", "url": "https://instagram.com/acme" },
                { "name": "otra-red", "url": "https://example.com" }
            ] }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("📷"));
        assert!(html.contains("🔗"));
        assert!(html.contains("rel=\"noopener noreferrer\""));
    }

    #[test]
    fn banner_colors_and_icon() {
        let t = tenant();
        let html = render_banner(
            &json!({ "text": "Feriado: cerrado", "icon": "⚠️", "bgColor": "#000", "textColor": "#fff" }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("background-color: #000"));
        assert!(html.contains("Feriado: cerrado"));
        assert!(html.contains("⚠️"));
    }

    #[test]
    fn gallery_uses_card_preset() {
        let t = tenant();
        let html = render_gallery(
            &json!({ "items": [
                { "url": "https://res.cloudinary.com/demo/image/upload/v1/a.jpg", "alt": "Frente" }
            ] }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("w_300,h_300"));
        assert!(html.contains("alt=\"Frente\""));
    }

    #[test]
    fn hours_table() {
        let t = tenant();
        let html = render_hours(
            &json!({ "schedule": [
                { "day": "Lunes", "hours": "9:00 - 18:00" },
                { "day": "Domingo" }
            ] }),
            &ctx(&t, None),
        )
        .unwrap();
        assert!(html.contains("<td>Lunes</td><td>9:00 - 18:00</td>"));
        assert!(html.contains("<td>Domingo</td><td>Cerrado</td>"));
    }

    #[test]
    fn listings_shell_shows_loading() {
        let t = tenant();
        let html = render_listings_shell(&json!({ "columns": 4 }), &ctx(&t, None)).unwrap();
        assert!(html.contains("Cargando elementos…"));
        assert!(html.contains("repeat(4, 1fr)"));
    }

    #[test]
    fn error_fallback_is_escaped() {
        let html = render_error_fallback("hero: <script>");
        assert!(html.contains("section-error"));
        assert!(html.contains("Error renderizando sección"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(1250000.0), "$ 1.250.000");
        assert_eq!(format_price(999.0), "$ 999");
        assert_eq!(format_price(1000.0), "$ 1.000");
        assert_eq!(format_price(0.0), "$ 0");
        assert_eq!(format_price(1234567.89), "$ 1.234.568");
        assert_eq!(format_price(-5000.0), "$ -5.000");
    }
}
