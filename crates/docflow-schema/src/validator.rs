//! JSON Schema (Draft-07) validation, with default-filling: any missing
//! property whose subschema carries a `default` is filled into the instance
//! before that property is validated. The fill only reaches as deep as the
//! `properties`/`items` recursion naturally goes — no global deep-merge.

use docflow_core::error::{DocflowError, Result};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub json_path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

pub struct SchemaValidator;

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, data: &Value, schema: &Value) -> Result<ValidationResult> {
        let mut instance = data.clone();
        fill_defaults(&mut instance, schema);

        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| DocflowError::schema_validation(e.to_string()))?;

        let mut errors: Vec<ValidationError> = Vec::new();
        if let Err(iter) = compiled.validate(&instance) {
            for error in iter {
                errors.push(ValidationError {
                    json_path: format_path(&error.instance_path.to_string()),
                    message: error.to_string(),
                });
            }
        }

        errors.sort_by(|a, b| {
            (&a.json_path, &a.message).cmp(&(&b.json_path, &b.message))
        });

        let is_valid = errors.is_empty();
        Ok(ValidationResult { is_valid, errors })
    }
}

fn format_path(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        "$".to_string()
    } else {
        format!("$.{}", trimmed.replace('/', "."))
    }
}

fn fill_defaults(instance: &mut Value, schema: &Value) {
    if let Some(obj) = instance.as_object_mut() {
        if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
            for (key, subschema) in properties {
                if !obj.contains_key(key) {
                    if let Some(default) = subschema.get("default") {
                        obj.insert(key.clone(), default.clone());
                    }
                }
                if let Some(value) = obj.get_mut(key) {
                    fill_defaults(value, subschema);
                }
            }
        }
    } else if let Some(arr) = instance.as_array_mut() {
        if let Some(items_schema) = schema.get("items") {
            for item in arr.iter_mut() {
                fill_defaults(item, items_schema);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_instance_has_no_errors() {
        let schema = json!({
            "type": "object",
            "required": ["x"],
            "properties": {"x": {"type": "integer"}}
        });
        let result = SchemaValidator::new().validate(&json!({"x": 1}), &schema).unwrap();
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn type_mismatch_reports_path_and_message() {
        let schema = json!({
            "type": "object",
            "required": ["x"],
            "properties": {"x": {"type": "integer"}}
        });
        let result = SchemaValidator::new()
            .validate(&json!({"x": "one"}), &schema)
            .unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].json_path, "$.x");
        assert!(result.errors[0].message.contains("integer"));
    }

    #[test]
    fn missing_property_with_default_is_filled_before_validation() {
        let schema = json!({
            "type": "object",
            "required": ["status"],
            "properties": {"status": {"type": "string", "default": "pending"}}
        });
        let result = SchemaValidator::new().validate(&json!({}), &schema).unwrap();
        assert!(result.is_valid);
    }

    #[test]
    fn validation_is_deterministic() {
        let schema = json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}}
        });
        let data = json!({"a": "x", "b": "y"});
        let first = SchemaValidator::new().validate(&data, &schema).unwrap();
        let second = SchemaValidator::new().validate(&data, &schema).unwrap();
        assert_eq!(first, second);
    }
}
