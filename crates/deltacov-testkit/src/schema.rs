//! JSON schema validation for the serialized DTOs.
//!
//! Schemas are derived with `schemars` from the same types that produce the
//! JSON, so a failure here means a serde attribute and the schema disagree.

use deltacov_types::{ConfigFile, DeltaReport};
use jsonschema::JSONSchema;
use schemars::JsonSchema;

#[derive(Debug)]
pub struct SchemaValidationError {
    pub errors: Vec<String>,
}

impl std::fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "schema validation failed: {}", self.errors.join("; "))
    }
}

impl std::error::Error for SchemaValidationError {}

/// Compile the schemars-derived schema for `T`.
pub fn compile_schema<T: JsonSchema>() -> JSONSchema {
    let schema = schemars::schema_for!(T);
    let value = serde_json::to_value(&schema).expect("schema should serialize");
    JSONSchema::compile(&value).expect("schema should compile")
}

pub fn validate_config_file(config: &ConfigFile) -> Result<(), SchemaValidationError> {
    let json = serde_json::to_value(config).expect("ConfigFile should serialize");
    validate_json::<ConfigFile>(&json)
}

pub fn validate_delta_report(report: &DeltaReport) -> Result<(), SchemaValidationError> {
    let json = serde_json::to_value(report).expect("DeltaReport should serialize");
    validate_json::<DeltaReport>(&json)
}

/// Validate an arbitrary JSON value, e.g. a receipt read back from disk.
pub fn validate_json<T: JsonSchema>(json: &serde_json::Value) -> Result<(), SchemaValidationError> {
    let schema = compile_schema::<T>();
    let result = schema.validate(json);
    match result {
        Ok(()) => Ok(()),
        Err(errors) => Err(SchemaValidationError {
            errors: errors.map(|e| e.to_string()).collect(),
        }),
    }
}
