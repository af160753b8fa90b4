//! Field-level validation.
//!
//! Pure validators per primitive kind (string, email, url, number,
//! file-like), composable into block/form schemas. Validation never raises:
//! results come back as [`ValidationResult`] data so callers can render
//! field-level feedback. Rule kinds are dispatched by string key because
//! rules are stored as data inside block props; an unknown kind is a
//! recoverable warning, not a fatal error.
//!
//! Error messages are the user-facing Spanish strings the sites ship with.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RFC-lite email shape: something@something.tld, no whitespace.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid");
    re
});

/// Outcome of validating one value against one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub valid: bool,
    pub error: Option<String>,
}

impl RuleOutcome {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

/// Aggregated result of validating a field map.
///
/// `errors` holds one message per failing field; `warnings` records fields
/// skipped because their rule kind was unknown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// A validation rule attached to one field.
///
/// Deserialized from stored block props, e.g.
/// `{ "type": "email", "required": true }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRule {
    /// Rule kind: `string`/`text`, `email`, `url`, `number`, `file`, `image`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub options: RuleOptions,
}

impl FieldRule {
    /// Shorthand constructor for a rule with default options.
    pub fn of(kind: impl Into<String>, required: bool) -> Self {
        Self {
            kind: kind.into(),
            required,
            options: RuleOptions::default(),
        }
    }
}

/// Options modifying a rule; all optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Size ceiling for file-like values, in kilobytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_kb: Option<u64>,

    /// MIME allow-list for file-like values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    /// Extension allow-list for file-like values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
}

/// Metadata of an uploaded file, validated by the `file`/`image` kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub name: String,
    pub size: u64,

    #[serde(default)]
    pub mime: String,
}

/// Validate a string value.
pub fn validate_string(value: &str, required: bool, options: &RuleOptions) -> RuleOutcome {
    if value.is_empty() {
        if required {
            return RuleOutcome::fail("Campo requerido");
        }
        return RuleOutcome::ok();
    }

    let chars = value.chars().count();
    if let Some(min) = options.min_length
        && chars < min
    {
        return RuleOutcome::fail(format!("Mínimo {min} caracteres"));
    }
    if let Some(max) = options.max_length
        && chars > max
    {
        return RuleOutcome::fail(format!("Máximo {max} caracteres"));
    }
    if let Some(pattern) = &options.pattern {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(value) => return RuleOutcome::fail("Formato inválido"),
            Ok(_) => {}
            Err(_) => return RuleOutcome::fail("Formato inválido"),
        }
    }

    RuleOutcome::ok()
}

/// Validate an email address (RFC-lite).
pub fn validate_email(value: &str) -> RuleOutcome {
    if EMAIL_RE.is_match(value) {
        RuleOutcome::ok()
    } else {
        RuleOutcome::fail("Email inválido")
    }
}

/// Validate that a value parses as an absolute URL.
pub fn validate_url(value: &str) -> RuleOutcome {
    match url::Url::parse(value) {
        Ok(_) => RuleOutcome::ok(),
        Err(_) => RuleOutcome::fail("URL inválida"),
    }
}

/// Validate a numeric value with optional bounds. NaN is rejected.
pub fn validate_number(value: &Value, options: &RuleOptions) -> RuleOutcome {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let Some(number) = number.filter(|n| !n.is_nan()) else {
        return RuleOutcome::fail("Debe ser un número");
    };

    if let Some(min) = options.min
        && number < min
    {
        return RuleOutcome::fail(format!("Mínimo: {min}"));
    }
    if let Some(max) = options.max
        && number > max
    {
        return RuleOutcome::fail(format!("Máximo: {max}"));
    }

    RuleOutcome::ok()
}

/// Validate file metadata against a size ceiling and MIME/extension
/// allow-lists.
pub fn validate_file(meta: &FileMeta, options: &RuleOptions) -> RuleOutcome {
    let max_kb = options.max_size_kb.unwrap_or(10 * 1024);
    if meta.size > max_kb * 1024 {
        return RuleOutcome::fail(format!("Máximo {max_kb}KB"));
    }

    if !options.types.is_empty() && !options.types.iter().any(|t| t == &meta.mime) {
        return RuleOutcome::fail(format!("Tipos permitidos: {}", options.types.join(", ")));
    }

    if !options.extensions.is_empty() {
        let ext = meta
            .name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !options.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            return RuleOutcome::fail(format!(
                "Tipos permitidos: {}",
                options.extensions.join(", ")
            ));
        }
    }

    RuleOutcome::ok()
}

/// Apply one rule to one (possibly absent) value.
///
/// Returns `None` when the rule kind is unknown, so callers can record a
/// warning instead of failing.
pub fn validate_value(value: Option<&Value>, rule: &FieldRule) -> Option<RuleOutcome> {
    let text = value.and_then(Value::as_str).unwrap_or_default();

    match rule.kind.as_str() {
        "string" | "text" | "textarea" | "tel" => {
            Some(validate_string(text, rule.required, &rule.options))
        }
        "email" | "url" | "number" => {
            // Format kinds: absent or empty values only fail when required.
            let is_empty = match value {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if is_empty {
                return Some(if rule.required {
                    RuleOutcome::fail("Campo requerido")
                } else {
                    RuleOutcome::ok()
                });
            }
            Some(match rule.kind.as_str() {
                "email" => validate_email(text),
                "url" => validate_url(text),
                _ => validate_number(value.unwrap_or(&Value::Null), &rule.options),
            })
        }
        "file" | "image" => {
            let Some(value) = value else {
                return Some(if rule.required {
                    RuleOutcome::fail("Campo requerido")
                } else {
                    RuleOutcome::ok()
                });
            };
            match serde_json::from_value::<FileMeta>(value.clone()) {
                Ok(meta) => Some(validate_file(&meta, &rule.options)),
                Err(_) => Some(RuleOutcome::fail("Archivo inválido")),
            }
        }
        _ => None,
    }
}

/// Validate a data map against a rules map, collecting every field's error.
///
/// Does not short-circuit: a UI must be able to highlight all invalid fields
/// at once.
pub fn validate_fields(
    data: &BTreeMap<String, Value>,
    rules: &BTreeMap<String, FieldRule>,
) -> ValidationResult {
    let mut errors = BTreeMap::new();
    let mut warnings = Vec::new();

    for (field, rule) in rules {
        match validate_value(data.get(field), rule) {
            Some(outcome) => {
                if let Some(message) = outcome.error {
                    errors.insert(field.clone(), message);
                }
            }
            None => warnings.push(format!("Validador desconocido: {}", rule.kind)),
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn rules(entries: &[(&str, FieldRule)]) -> BTreeMap<String, FieldRule> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn required_string_missing() {
        let outcome = validate_string("", true, &RuleOptions::default());
        assert_eq!(outcome.error.as_deref(), Some("Campo requerido"));
    }

    #[test]
    fn string_min_length() {
        let options = RuleOptions {
            min_length: Some(5),
            ..Default::default()
        };
        let outcome = validate_string("hola", true, &options);
        assert_eq!(outcome.error.as_deref(), Some("Mínimo 5 caracteres"));
    }

    #[test]
    fn string_max_length() {
        let options = RuleOptions {
            max_length: Some(3),
            ..Default::default()
        };
        let outcome = validate_string("demasiado", false, &options);
        assert_eq!(outcome.error.as_deref(), Some("Máximo 3 caracteres"));
    }

    #[test]
    fn string_pattern() {
        let options = RuleOptions {
            pattern: Some(r"^\d+$".to_string()),
            ..Default::default()
        };
        assert!(validate_string("12345", false, &options).valid);
        assert_eq!(
            validate_string("abc", false, &options).error.as_deref(),
            Some("Formato inválido")
        );
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("ana@example.com").valid);
        assert_eq!(
            validate_email("bad").error.as_deref(),
            Some("Email inválido")
        );
        assert!(!validate_email("a b@example.com").valid);
        assert!(!validate_email("nodomain@host").valid);
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("https://example.com/p?x=1").valid);
        assert_eq!(
            validate_url("no es una url").error.as_deref(),
            Some("URL inválida")
        );
    }

    #[test]
    fn number_rejects_non_numeric() {
        let outcome = validate_number(&json!("abc"), &RuleOptions::default());
        assert_eq!(outcome.error.as_deref(), Some("Debe ser un número"));
    }

    #[test]
    fn number_bounds() {
        let options = RuleOptions {
            min: Some(1.0),
            max: Some(10.0),
            ..Default::default()
        };
        assert!(validate_number(&json!(5), &options).valid);
        assert_eq!(
            validate_number(&json!(0), &options).error.as_deref(),
            Some("Mínimo: 1")
        );
        assert_eq!(
            validate_number(&json!(11), &options).error.as_deref(),
            Some("Máximo: 10")
        );
    }

    #[test]
    fn number_accepts_numeric_strings() {
        assert!(validate_number(&json!("42.5"), &RuleOptions::default()).valid);
    }

    #[test]
    fn file_size_ceiling() {
        let meta = FileMeta {
            name: "foto.jpg".to_string(),
            size: 6 * 1024 * 1024,
            mime: "image/jpeg".to_string(),
        };
        let options = RuleOptions {
            max_size_kb: Some(5120),
            ..Default::default()
        };
        assert_eq!(
            validate_file(&meta, &options).error.as_deref(),
            Some("Máximo 5120KB")
        );
    }

    #[test]
    fn file_mime_allow_list() {
        let meta = FileMeta {
            name: "doc.exe".to_string(),
            size: 100,
            mime: "application/octet-stream".to_string(),
        };
        let options = RuleOptions {
            types: vec!["image/jpeg".to_string(), "image/png".to_string()],
            ..Default::default()
        };
        let outcome = validate_file(&meta, &options);
        assert!(!outcome.valid);
        assert!(outcome.error.unwrap().starts_with("Tipos permitidos:"));
    }

    #[test]
    fn file_extension_allow_list() {
        let meta = FileMeta {
            name: "informe.PDF".to_string(),
            size: 100,
            mime: "application/pdf".to_string(),
        };
        let options = RuleOptions {
            extensions: vec!["pdf".to_string(), "doc".to_string()],
            ..Default::default()
        };
        assert!(validate_file(&meta, &options).valid);
    }

    #[test]
    fn validate_fields_aggregates_all_errors() {
        let data = data(&[
            ("nombre", json!("")),
            ("email", json!("bad")),
            ("edad", json!("no")),
        ]);
        let rules = rules(&[
            ("nombre", FieldRule::of("string", true)),
            ("email", FieldRule::of("email", true)),
            ("edad", FieldRule::of("number", false)),
        ]);

        let result = validate_fields(&data, &rules);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.errors["nombre"], "Campo requerido");
        assert_eq!(result.errors["email"], "Email inválido");
        assert_eq!(result.errors["edad"], "Debe ser un número");
    }

    #[test]
    fn invalid_email_scenario() {
        let data = data(&[("email", json!("bad"))]);
        let rules = rules(&[("email", FieldRule::of("email", false))]);

        let result = validate_fields(&data, &rules);
        assert!(!result.is_valid);
        assert_eq!(result.errors["email"], "Email inválido");
    }

    #[test]
    fn optional_format_field_skips_when_absent() {
        let data = BTreeMap::new();
        let rules = rules(&[("web", FieldRule::of("url", false))]);
        let result = validate_fields(&data, &rules);
        assert!(result.is_valid);
    }

    #[test]
    fn unknown_rule_kind_is_a_warning() {
        let data = data(&[("color", json!("azul"))]);
        let rules = rules(&[
            ("color", FieldRule::of("colorimetry", false)),
            ("email", FieldRule::of("email", true)),
        ]);

        let result = validate_fields(&data, &rules);
        // The unknown kind is skipped, the known one still runs.
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("colorimetry"));
        assert_eq!(result.errors["email"], "Campo requerido");
    }
}
