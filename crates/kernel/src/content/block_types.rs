//! Block type registry and pre-render prop validation.
//!
//! Every page block carries a string `type` looked up here. A
//! [`BlockDefinition`] bundles the admin-facing metadata, the field schema
//! (used both for admin-form generation and pre-render validation), and the
//! render function. Render functions return `Result` so a failing block
//! degrades to an inline error fragment instead of blanking the page.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{PublicSettings, TenantId};

use super::block_render;

/// Type name of the dynamically-fetched listings grid, which the page
/// assembler renders through the data cache instead of the registry's
/// synchronous fallback.
pub const LISTINGS_GRID_TYPE: &str = "listingsGrid";

/// Context threaded into every block render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub tenant: &'a TenantId,
    pub settings: Option<&'a PublicSettings>,
}

/// A block render failure, converted by the assembler into a visible error
/// fragment naming the block type and reason.
#[derive(Debug, Clone, Error)]
#[error("{block_type}: {message}")]
pub struct RenderError {
    pub block_type: String,
    pub message: String,
}

impl RenderError {
    pub fn new(block_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            message: message.into(),
        }
    }
}

/// Signature of a block render function.
pub type RenderFn = fn(&Value, &RenderContext<'_>) -> Result<String, RenderError>;

/// Primitive type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    /// Reference to an uploaded media asset (a URL in practice).
    AssetId,
    Url,
}

impl FieldType {
    fn label(self) -> &'static str {
        match self {
            Self::String => "texto",
            Self::Number => "número",
            Self::Boolean => "booleano",
            Self::Object => "objeto",
            Self::Array => "lista",
            Self::AssetId => "imagen",
            Self::Url => "URL",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String | Self::AssetId | Self::Url => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// Declaration of one schema field: type, requiredness, enum constraint,
/// default, and item shape for arrays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub required: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Shape of each array item, keyed by item field name.
    #[serde(rename = "itemsSchema", skip_serializing_if = "Option::is_none")]
    pub items: Option<BTreeMap<String, FieldSpec>>,
}

impl FieldSpec {
    /// Start a field spec of the given type.
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            label: None,
            enum_values: Vec::new(),
            default: None,
            items: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn items(mut self, items: BTreeMap<String, FieldSpec>) -> Self {
        self.items = Some(items);
        self
    }
}

/// Definition of a single block type.
pub struct BlockDefinition {
    pub type_name: String,
    pub label: String,
    pub icon: String,
    pub description: String,
    pub category: String,
    pub schema: BTreeMap<String, FieldSpec>,
    pub render: RenderFn,
}

/// Admin-facing summary of an available block type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    #[serde(rename = "type")]
    pub type_name: String,
    pub label: String,
    pub icon: String,
    pub description: String,
    pub category: String,
}

/// Registry of block definitions, keyed by type name.
pub struct BlockRegistry {
    types: HashMap<String, BlockDefinition>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with the standard block types.
    pub fn with_standard_types() -> Self {
        let mut registry = Self::new();
        registry.register_standard_types();
        registry
    }

    /// Register a block definition.
    pub fn register(&mut self, definition: BlockDefinition) {
        self.types.insert(definition.type_name.clone(), definition);
    }

    /// Look up a block type by name.
    pub fn get(&self, type_name: &str) -> Option<&BlockDefinition> {
        self.types.get(type_name)
    }

    /// Check whether a block type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Admin-facing list of available block types, sorted by type name.
    pub fn available(&self) -> Vec<BlockSummary> {
        let mut summaries: Vec<BlockSummary> = self
            .types
            .values()
            .map(|def| BlockSummary {
                type_name: def.type_name.clone(),
                label: def.label.clone(),
                icon: def.icon.clone(),
                description: def.description.clone(),
                category: def.category.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        summaries
    }

    /// Register the standard block types.
    pub fn register_standard_types(&mut self) {
        self.register(BlockDefinition {
            type_name: "hero".to_string(),
            label: "Hero Banner".to_string(),
            icon: "🎬".to_string(),
            description: "Banner principal con título, subtítulo e imagen".to_string(),
            category: "layout".to_string(),
            schema: BTreeMap::from([
                (
                    "title".to_string(),
                    FieldSpec::of(FieldType::String).required().label("Título"),
                ),
                (
                    "subtitle".to_string(),
                    FieldSpec::of(FieldType::String).label("Subtítulo"),
                ),
                (
                    "bgImage".to_string(),
                    FieldSpec::of(FieldType::AssetId).label("Imagen de fondo"),
                ),
                (
                    "cta".to_string(),
                    FieldSpec::of(FieldType::Object).label("Botón CTA"),
                ),
            ]),
            render: block_render::render_hero,
        });

        self.register(BlockDefinition {
            type_name: "richText".to_string(),
            label: "Texto Rico".to_string(),
            icon: "📝".to_string(),
            description: "Párrafos y contenido HTML".to_string(),
            category: "content".to_string(),
            schema: BTreeMap::from([
                (
                    "html".to_string(),
                    FieldSpec::of(FieldType::String).required().label("Contenido HTML"),
                ),
                (
                    "alignment".to_string(),
                    FieldSpec::of(FieldType::String)
                        .label("Alineación")
                        .one_of(&["left", "center", "right"])
                        .default_value(Value::String("left".to_string())),
                ),
            ]),
            render: block_render::render_rich_text,
        });

        self.register(BlockDefinition {
            type_name: "servicesGrid".to_string(),
            label: "Grid de Servicios".to_string(),
            icon: "🎯".to_string(),
            description: "Mostrar servicios en grid".to_string(),
            category: "content".to_string(),
            schema: BTreeMap::from([
                ("title".to_string(), FieldSpec::of(FieldType::String).label("Título")),
                (
                    "items".to_string(),
                    FieldSpec::of(FieldType::Array).label("Servicios").items(BTreeMap::from([
                        ("title".to_string(), FieldSpec::of(FieldType::String).required()),
                        ("icon".to_string(), FieldSpec::of(FieldType::String)),
                        ("description".to_string(), FieldSpec::of(FieldType::String)),
                    ])),
                ),
                (
                    "columns".to_string(),
                    FieldSpec::of(FieldType::Number).default_value(Value::from(3)),
                ),
            ]),
            render: block_render::render_services_grid,
        });

        self.register(BlockDefinition {
            type_name: "testimonials".to_string(),
            label: "Testimonios".to_string(),
            icon: "💬".to_string(),
            description: "Tarjetas de testimonios con foto y cita".to_string(),
            category: "content".to_string(),
            schema: BTreeMap::from([
                ("title".to_string(), FieldSpec::of(FieldType::String).label("Título")),
                (
                    "items".to_string(),
                    FieldSpec::of(FieldType::Array).label("Testimonios").items(BTreeMap::from([
                        ("quote".to_string(), FieldSpec::of(FieldType::String).required()),
                        ("author".to_string(), FieldSpec::of(FieldType::String).required()),
                        ("role".to_string(), FieldSpec::of(FieldType::String)),
                        ("photo".to_string(), FieldSpec::of(FieldType::AssetId)),
                    ])),
                ),
            ]),
            render: block_render::render_testimonials,
        });

        self.register(BlockDefinition {
            type_name: "faq".to_string(),
            label: "Preguntas Frecuentes".to_string(),
            icon: "❓".to_string(),
            description: "Acordeón de FAQs".to_string(),
            category: "content".to_string(),
            schema: BTreeMap::from([
                ("title".to_string(), FieldSpec::of(FieldType::String).label("Título")),
                (
                    "items".to_string(),
                    FieldSpec::of(FieldType::Array).label("Preguntas").items(BTreeMap::from([
                        ("question".to_string(), FieldSpec::of(FieldType::String).required()),
                        ("answer".to_string(), FieldSpec::of(FieldType::String).required()),
                    ])),
                ),
            ]),
            render: block_render::render_faq,
        });

        self.register(BlockDefinition {
            type_name: "callToAction".to_string(),
            label: "Llamado a Acción".to_string(),
            icon: "📢".to_string(),
            description: "Banner destacado con botón".to_string(),
            category: "layout".to_string(),
            schema: BTreeMap::from([
                (
                    "text".to_string(),
                    FieldSpec::of(FieldType::String).required().label("Texto"),
                ),
                (
                    "buttonText".to_string(),
                    FieldSpec::of(FieldType::String).required().label("Texto del botón"),
                ),
                (
                    "buttonLink".to_string(),
                    FieldSpec::of(FieldType::String).required().label("URL del botón"),
                ),
                (
                    "bgColor".to_string(),
                    FieldSpec::of(FieldType::String).label("Color de fondo"),
                ),
            ]),
            render: block_render::render_call_to_action,
        });

        self.register(BlockDefinition {
            type_name: LISTINGS_GRID_TYPE.to_string(),
            label: "Grid de Productos/Listados".to_string(),
            icon: "🏪".to_string(),
            description: "Grid dinámico de items (productos, vehículos, servicios, etc.)"
                .to_string(),
            category: "content".to_string(),
            schema: BTreeMap::from([
                ("title".to_string(), FieldSpec::of(FieldType::String).label("Título")),
                (
                    "filters".to_string(),
                    FieldSpec::of(FieldType::Object).label("Filtros"),
                ),
                ("sort".to_string(), FieldSpec::of(FieldType::Object).label("Orden")),
                (
                    "limit".to_string(),
                    FieldSpec::of(FieldType::Number).default_value(Value::from(12)),
                ),
                (
                    "columns".to_string(),
                    FieldSpec::of(FieldType::Number).default_value(Value::from(3)),
                ),
            ]),
            render: block_render::render_listings_shell,
        });

        self.register(BlockDefinition {
            type_name: "contactForm".to_string(),
            label: "Formulario de Contacto".to_string(),
            icon: "✉️".to_string(),
            description: "Formulario dinámico para recolectar leads".to_string(),
            category: "interaction".to_string(),
            schema: BTreeMap::from([
                ("title".to_string(), FieldSpec::of(FieldType::String).label("Título")),
                (
                    "fields".to_string(),
                    FieldSpec::of(FieldType::Array)
                        .label("Campos del formulario")
                        .items(BTreeMap::from([
                            ("name".to_string(), FieldSpec::of(FieldType::String).required()),
                            (
                                "type".to_string(),
                                FieldSpec::of(FieldType::String)
                                    .one_of(&["text", "email", "tel", "textarea"]),
                            ),
                            ("required".to_string(), FieldSpec::of(FieldType::Boolean)),
                        ])),
                ),
                (
                    "submitText".to_string(),
                    FieldSpec::of(FieldType::String)
                        .label("Texto del botón")
                        .default_value(Value::String("Enviar".to_string())),
                ),
            ]),
            render: block_render::render_contact_form,
        });

        self.register(BlockDefinition {
            type_name: "socialLinks".to_string(),
            label: "Redes Sociales".to_string(),
            icon: "🔗".to_string(),
            description: "Enlaces a redes sociales".to_string(),
            category: "content".to_string(),
            schema: BTreeMap::from([(
                "links".to_string(),
                FieldSpec::of(FieldType::Array).label("Enlaces").items(BTreeMap::from([
                    ("name".to_string(), FieldSpec::of(FieldType::String).required()),
                    ("url".to_string(), FieldSpec::of(FieldType::Url).required()),
                ])),
            )]),
            render: block_render::render_social_links,
        });

        self.register(BlockDefinition {
            type_name: "banner".to_string(),
            label: "Banner Simple".to_string(),
            icon: "📋".to_string(),
            description: "Banner con fondo y texto".to_string(),
            category: "layout".to_string(),
            schema: BTreeMap::from([
                ("text".to_string(), FieldSpec::of(FieldType::String).required()),
                ("bgColor".to_string(), FieldSpec::of(FieldType::String)),
                ("textColor".to_string(), FieldSpec::of(FieldType::String)),
                ("icon".to_string(), FieldSpec::of(FieldType::String)),
            ]),
            render: block_render::render_banner,
        });

        self.register(BlockDefinition {
            type_name: "gallery".to_string(),
            label: "Galería".to_string(),
            icon: "🖼️".to_string(),
            description: "Galería de imágenes en grid".to_string(),
            category: "content".to_string(),
            schema: BTreeMap::from([
                (
                    "items".to_string(),
                    FieldSpec::of(FieldType::Array).label("Imágenes").items(BTreeMap::from([
                        ("url".to_string(), FieldSpec::of(FieldType::AssetId).required()),
                        ("alt".to_string(), FieldSpec::of(FieldType::String)),
                    ])),
                ),
                (
                    "columns".to_string(),
                    FieldSpec::of(FieldType::Number).default_value(Value::from(3)),
                ),
            ]),
            render: block_render::render_gallery,
        });

        self.register(BlockDefinition {
            type_name: "hours".to_string(),
            label: "Horarios".to_string(),
            icon: "🕐".to_string(),
            description: "Tabla de horarios de atención".to_string(),
            category: "content".to_string(),
            schema: BTreeMap::from([
                ("title".to_string(), FieldSpec::of(FieldType::String).label("Título")),
                (
                    "schedule".to_string(),
                    FieldSpec::of(FieldType::Array).label("Horarios").items(BTreeMap::from([
                        ("day".to_string(), FieldSpec::of(FieldType::String).required()),
                        ("hours".to_string(), FieldSpec::of(FieldType::String)),
                    ])),
                ),
            ]),
            render: block_render::render_hours,
        });
    }
}

/// Validate block props against a field schema, aggregating every violation.
///
/// Returns Spanish, user-facing messages; an empty list means the props are
/// valid. Empty arrays are legal at this level; grid renderers enforce
/// their own non-empty requirement.
pub fn validate_props(schema: &BTreeMap<String, FieldSpec>, props: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let empty = serde_json::Map::new();
    let props = match props {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            errors.push("las propiedades deben ser un objeto".to_string());
            return errors;
        }
    };

    for (name, spec) in schema {
        let value = props.get(name).filter(|v| !v.is_null());

        let Some(value) = value else {
            if spec.required {
                errors.push(format!("{name}: campo requerido"));
            }
            continue;
        };

        if !spec.field_type.matches(value) {
            errors.push(format!(
                "{name}: tipo inválido, se esperaba {}",
                spec.field_type.label()
            ));
            continue;
        }

        if spec.field_type == FieldType::Url
            && let Some(raw) = value.as_str()
            && url::Url::parse(raw).is_err()
        {
            errors.push(format!("{name}: URL inválida"));
            continue;
        }

        if !spec.enum_values.is_empty()
            && let Some(raw) = value.as_str()
            && !spec.enum_values.iter().any(|allowed| allowed == raw)
        {
            errors.push(format!("{name}: valor fuera de la lista"));
            continue;
        }

        if let (Some(item_schema), Some(items)) = (&spec.items, value.as_array()) {
            for (index, item) in items.iter().enumerate() {
                let Some(item) = item.as_object() else {
                    errors.push(format!("{name}[{index}]: debe ser un objeto"));
                    continue;
                };
                for (field, field_spec) in item_schema {
                    let present = item.get(field).filter(|v| !v.is_null());
                    match present {
                        None if field_spec.required => {
                            errors.push(format!("{name}[{index}]: falta '{field}'"));
                        }
                        Some(v) if !field_spec.field_type.matches(v) => {
                            errors.push(format!(
                                "{name}[{index}].{field}: tipo inválido, se esperaba {}",
                                field_spec.field_type.label()
                            ));
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    errors
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_all_standard_types() {
        let registry = BlockRegistry::with_standard_types();
        assert_eq!(registry.len(), 12);

        let expected = [
            "hero",
            "richText",
            "servicesGrid",
            "testimonials",
            "faq",
            "callToAction",
            "listingsGrid",
            "contactForm",
            "socialLinks",
            "banner",
            "gallery",
            "hours",
        ];
        for name in &expected {
            assert!(
                registry.contains(name),
                "expected block type '{name}' to be registered"
            );
        }
    }

    #[test]
    fn available_is_sorted_and_complete() {
        let registry = BlockRegistry::with_standard_types();
        let summaries = registry.available();
        assert_eq!(summaries.len(), 12);
        let mut names: Vec<&str> = summaries.iter().map(|s| s.type_name.as_str()).collect();
        let sorted = names.clone();
        names.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(
            summaries.iter().find(|s| s.type_name == "hero").unwrap().label,
            "Hero Banner"
        );
    }

    #[test]
    fn unknown_type_is_a_miss() {
        let registry = BlockRegistry::with_standard_types();
        assert!(registry.get("carousel").is_none());
    }

    #[test]
    fn valid_hero_props() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("hero").unwrap().schema;
        let errors = validate_props(schema, &json!({ "title": "Bienvenido" }));
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn missing_required_field() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("hero").unwrap().schema;
        let errors = validate_props(schema, &json!({ "subtitle": "solo" }));
        assert_eq!(errors, vec!["title: campo requerido"]);
    }

    #[test]
    fn wrong_primitive_type() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("hero").unwrap().schema;
        let errors = validate_props(schema, &json!({ "title": 42 }));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("tipo inválido"));
    }

    #[test]
    fn enum_constraint() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("richText").unwrap().schema;
        let errors = validate_props(
            schema,
            &json!({ "html": "<p>Hola</p>", "alignment": "diagonal" }),
        );
        assert_eq!(errors, vec!["alignment: valor fuera de la lista"]);
    }

    #[test]
    fn array_item_shape() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("testimonials").unwrap().schema;
        let errors = validate_props(
            schema,
            &json!({ "items": [
                { "quote": "Excelente", "author": "Ana" },
                { "quote": "Sin autor" },
                "no soy un objeto"
            ] }),
        );
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("items[1]: falta 'author'"));
        assert!(errors[1].contains("items[2]: debe ser un objeto"));
    }

    #[test]
    fn multiple_errors_aggregate() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("callToAction").unwrap().schema;
        let errors = validate_props(schema, &json!({}));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn url_field_must_parse() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("socialLinks").unwrap().schema;
        let errors = validate_props(
            schema,
            &json!({ "links": [ { "name": "instagram", "url": "https://instagram.com/x" } ] }),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn null_props_are_an_empty_object() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("banner").unwrap().schema;
        let errors = validate_props(schema, &Value::Null);
        assert_eq!(errors, vec!["text: campo requerido"]);
    }

    #[test]
    fn non_object_props_rejected() {
        let registry = BlockRegistry::with_standard_types();
        let schema = &registry.get("banner").unwrap().schema;
        let errors = validate_props(schema, &json!([1, 2]));
        assert_eq!(errors, vec!["las propiedades deben ser un objeto"]);
    }

    #[test]
    fn custom_type_registration() {
        let mut registry = BlockRegistry::new();
        assert!(registry.is_empty());
        registry.register(BlockDefinition {
            type_name: "countdown".to_string(),
            label: "Cuenta Regresiva".to_string(),
            icon: "⏳".to_string(),
            description: "Widget de prueba".to_string(),
            category: "interaction".to_string(),
            schema: BTreeMap::new(),
            render: |_, _| Ok("<section></section>".to_string()),
        });
        assert!(registry.contains("countdown"));
        assert_eq!(registry.len(), 1);
    }
}
