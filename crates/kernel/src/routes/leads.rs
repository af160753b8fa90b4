//! Lead submission endpoint.
//!
//! Validates a contact-form submission against the field list the page's
//! contact-form block declares, sanitizes text, persists the lead under the
//! tenant, and emits `form.submitted` for the notification collaborators.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::events::FORM_SUBMITTED;
use crate::models::Lead;
use crate::state::AppState;
use crate::validation::{FieldRule, validate_fields};

use super::front::FrontQuery;
use super::helpers::resolve_tenant;

/// A contact-form submission.
#[derive(Debug, Deserialize)]
pub struct LeadSubmission {
    /// Slug of the page the form lives on.
    pub page: String,

    /// Id of the contact-form block; optional when the page has only one.
    #[serde(default)]
    pub block: Option<String>,

    /// Submitted field values keyed by field name.
    pub data: BTreeMap<String, Value>,
}

/// Create the leads router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/leads", post(submit_lead))
}

async fn submit_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FrontQuery>,
    Json(submission): Json<LeadSubmission>,
) -> AppResult<Json<Value>> {
    let tenant = resolve_tenant(&state, &headers, params.client.as_deref())
        .await
        .ok_or_else(|| AppError::BadRequest("tenant no resuelto".to_string()))?;

    // The page must be published and must declare a contact form.
    let page = state
        .cache()
        .get_page(&tenant, &submission.page)
        .await
        .ok_or(AppError::NotFound)?;

    let block = page
        .blocks
        .iter()
        .filter(|block| block.block_type == "contactForm")
        .find(|block| match &submission.block {
            Some(id) => &block.id == id,
            None => true,
        })
        .ok_or_else(|| AppError::BadRequest("la página no tiene formulario".to_string()))?;

    let rules = rules_from_form_props(&block.props);
    let result = validate_fields(&submission.data, &rules);
    if !result.is_valid {
        return Err(AppError::Validation(result));
    }

    // Only declared fields are persisted; free-form extras are dropped.
    let data: BTreeMap<String, Value> = submission
        .data
        .into_iter()
        .filter(|(field, _)| rules.contains_key(field))
        .map(|(field, value)| (field, sanitize_value(value)))
        .collect();

    let lead = Lead {
        id: String::new(),
        page_slug: page.slug.clone(),
        block_id: Some(block.id.clone()),
        data,
        submitted_at: Utc::now(),
    };

    let collection = format!("clients/{tenant}/leads");
    let lead_value = serde_json::to_value(&lead).map_err(anyhow::Error::from)?;
    let lead_id = state
        .store()
        .add_document(&collection, lead_value)
        .await
        .map_err(AppError::Internal)?;

    info!(tenant = %tenant, lead_id = %lead_id, page = %page.slug, "lead captured");

    state.emit_event(
        FORM_SUBMITTED,
        &tenant,
        json!({
            "leadId": lead_id,
            "pageSlug": page.slug,
            "blockId": block.id,
            "data": serde_json::to_value(&lead.data).unwrap_or(Value::Null),
        }),
    );

    Ok(Json(json!({
        "success": true,
        "leadId": lead_id,
        "message": "Formulario enviado correctamente"
    })))
}

/// Build validation rules from a contact-form block's declared field list.
///
/// Each declared field becomes a rule whose kind is the field's input type;
/// the string kinds cover text/tel/textarea and `email` gets format
/// checking.
fn rules_from_form_props(props: &Value) -> BTreeMap<String, FieldRule> {
    let mut rules = BTreeMap::new();

    let Some(fields) = props.get("fields").and_then(Value::as_array) else {
        return rules;
    };

    for field in fields {
        let Some(name) = field.get("name").and_then(Value::as_str) else {
            continue;
        };
        let kind = field.get("type").and_then(Value::as_str).unwrap_or("text");
        let required = field
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        rules.insert(name.to_string(), FieldRule::of(kind, required));
    }

    rules
}

/// Neutralize markup in submitted string values; leads are plain text.
fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(ammonia::clean_text(&text)),
        other => other,
    }
}
