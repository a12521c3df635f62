//! Value normalization and validators shared by resource schemas

use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::validator::Validator;

use crate::api::ApiError;

/// Normalize line endings and check that `input` parses as YAML.
/// The normalized text is returned unchanged otherwise; empty stays empty.
pub fn normalize_yaml(input: &str) -> Result<String, ApiError> {
    if input.is_empty() {
        return Ok(String::new());
    }

    let normalized = input.replace("\r\n", "\n");
    serde_yaml::from_str::<serde_yaml::Value>(&normalized)
        .map_err(|e| ApiError::Config(format!("invalid YAML: {}", e)))?;
    Ok(normalized)
}

/// String must be a parseable YAML document
pub struct YamlString;

impl Validator for YamlString {
    fn description(&self) -> String {
        "value must be a valid YAML document".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        match value.as_str() {
            Some(s) => match normalize_yaml(s) {
                Ok(_) => vec![],
                Err(e) => vec![Diagnostic::error(
                    format!("{} must be valid YAML", path),
                    e.to_string(),
                )
                .with_attribute(path.clone())],
            },
            None => vec![],
        }
    }
}
