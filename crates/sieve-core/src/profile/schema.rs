//! JSON Schema validation for target profiles.
//!
//! Profiles are validated against schema/target_profile.schema.json,
//! embedded at compile time.

use std::sync::OnceLock;

/// Embedded profile schema.
const PROFILE_SCHEMA_JSON: &str = include_str!("../../../../schema/target_profile.schema.json");

/// Compiled validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(PROFILE_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(Clone::clone)
}

/// Validate a profile JSON value against the schema.
///
/// Returns every violation, formatted as `"<message> at <path>"`.
pub fn validate_profile_schema(profile_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(profile_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
