//! JSON Schema converter.
//!
//! Default implementation of [`ToolSchemaPort`] that produces provider-neutral
//! JSON Schema for the planner's tool surface.

use dispatch_application::ports::tool_schema::ToolSchemaPort;
use dispatch_domain::{ActionDescriptor, FieldSpec, InputSchema, Refinement};
use serde_json::{Map, Value, json};

/// Regex advertised for `PositiveDecimal` string fields: a decimal literal
/// with at least one non-zero digit.
const POSITIVE_DECIMAL_PATTERN: &str = r"^(0*[1-9][0-9]*(\.[0-9]+)?|0+\.[0-9]*[1-9][0-9]*)$";

/// Default implementation producing provider-neutral JSON Schema.
///
/// Field types map one-to-one onto JSON Schema types. Refinements become the
/// matching keywords:
/// - `Pattern` → `pattern`, `PositiveDecimal` → `pattern`
/// - `MinLength` / `MaxLength` → `minLength` / `maxLength`
/// - `Min` / `Max` → `minimum` / `maximum`, `Positive` → `exclusiveMinimum: 0`
/// - `OneOf` → `enum`
/// - `MinItems` / `MaxItems` → `minItems` / `maxItems`
///
/// A keyword that is already set (two patterns, say) goes into `allOf`
/// instead of replacing the first one.
pub struct JsonSchemaConverter;

impl JsonSchemaConverter {
    fn field_schema(&self, field: &FieldSpec) -> Value {
        let mut prop = Map::new();
        prop.insert("type".to_string(), json!(field.field_type.as_str()));
        if !field.description.is_empty() {
            prop.insert("description".to_string(), json!(field.description));
        }
        if let Some(default) = &field.default {
            prop.insert("default".to_string(), default.clone());
        }

        let mut all_of = Vec::new();
        for refinement in &field.refinements {
            let (key, value) = match refinement {
                Refinement::Pattern { regex, .. } => ("pattern", json!(regex.as_str())),
                Refinement::PositiveDecimal => ("pattern", json!(POSITIVE_DECIMAL_PATTERN)),
                Refinement::MinLength(n) => ("minLength", json!(n)),
                Refinement::MaxLength(n) => ("maxLength", json!(n)),
                Refinement::Min(n) => ("minimum", json!(n)),
                Refinement::Max(n) => ("maximum", json!(n)),
                Refinement::Positive => ("exclusiveMinimum", json!(0)),
                Refinement::OneOf(options) => ("enum", json!(options)),
                Refinement::MinItems(n) => ("minItems", json!(n)),
                Refinement::MaxItems(n) => ("maxItems", json!(n)),
            };
            match prop.get(key) {
                Some(existing) if *existing != value => {
                    let mut extra = Map::new();
                    extra.insert(key.to_string(), value);
                    all_of.push(Value::Object(extra));
                }
                _ => {
                    prop.insert(key.to_string(), value);
                }
            }
        }
        if !all_of.is_empty() {
            prop.insert("allOf".to_string(), Value::Array(all_of));
        }

        if let Some(nested) = &field.properties {
            for (key, value) in self.object_schema(nested) {
                if key != "type" {
                    prop.insert(key, value);
                }
            }
        }
        if let Some(items) = &field.items {
            prop.insert("items".to_string(), self.field_schema(items));
        }

        Value::Object(prop)
    }

    fn object_schema(&self, schema: &InputSchema) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in schema.fields() {
            properties.insert(field.name.clone(), self.field_schema(field));
            if field.required {
                required.push(json!(field.name));
            }
        }

        let mut object = Map::new();
        object.insert("type".to_string(), json!("object"));
        object.insert("properties".to_string(), Value::Object(properties));
        object.insert("required".to_string(), Value::Array(required));
        if schema.is_strict() {
            object.insert("additionalProperties".to_string(), json!(false));
        }
        object
    }
}

impl ToolSchemaPort for JsonSchemaConverter {
    fn input_schema(&self, schema: &InputSchema) -> Value {
        Value::Object(self.object_schema(schema))
    }

    fn action_schema(&self, descriptor: &ActionDescriptor) -> Value {
        let mut definition = json!({
            "name": descriptor.name(),
            "description": descriptor.description(),
            "input_schema": self.input_schema(descriptor.input_schema()),
            "requires_confirmation": descriptor.requires_confirmation(),
        });
        if !descriptor.aliases().is_empty() {
            definition["aliases"] = json!(descriptor.aliases());
        }
        if !descriptor.examples().is_empty() {
            definition["examples"] = json!(descriptor.examples());
        }
        definition
    }
}
