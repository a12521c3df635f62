//! Schema types and builders for tfplug
//!
//! A schema lists the attributes of a provider, resource or data source and
//! carries the few constraints the provider checks itself before touching a
//! remote API: required attributes, mutually exclusive attributes and
//! per-attribute validators. Planning and diffing stay with the host.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use crate::validator::Validator;
use std::collections::HashSet;
use std::sync::Arc;

/// Terraform attribute types
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
}

#[derive(Debug, Clone)]
pub struct Schema {
    /// Incremented when stored state needs migration
    pub version: i64,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value replaces the remote object
    pub force_new: bool,
    pub conflicts_with: Vec<String>,
    pub validators: Vec<Arc<dyn Validator>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("force_new", &self.force_new)
            .field("conflicts_with", &self.conflicts_with)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Whether a configured value counts as "set" for conflict checks.
/// Empty strings are treated like unset, unknown values like set.
fn is_set(value: Option<&Dynamic>) -> bool {
    match value {
        None | Some(Dynamic::Null) => false,
        Some(Dynamic::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Check required attributes, conflicting attributes and validators
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        let mut reported_conflicts: HashSet<(String, String)> = HashSet::new();

        for attr in &self.attributes {
            let path = AttributePath::new(&attr.name);
            let value = config.get(&path);

            if attr.required && matches!(value, None | Some(Dynamic::Null)) {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required, but no definition was found.", attr.name),
                    )
                    .with_attribute(path.clone()),
                );
                continue;
            }

            if !is_set(value) {
                continue;
            }

            for other in &attr.conflicts_with {
                if !is_set(config.get(&AttributePath::new(other))) {
                    continue;
                }
                let pair = if attr.name < *other {
                    (attr.name.clone(), other.clone())
                } else {
                    (other.clone(), attr.name.clone())
                };
                if reported_conflicts.insert(pair) {
                    diagnostics.push(
                        Diagnostic::error(
                            "Conflicting configuration arguments",
                            format!("\"{}\": conflicts with {}", attr.name, other),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }

            if let Some(v) = value.filter(|v| !v.is_unknown()) {
                for validator in &attr.validators {
                    diagnostics.extend(validator.validate(v, &path));
                }
            }
        }

        diagnostics
    }
}

/// Builder for schemas
pub struct SchemaBuilder {
    version: i64,
    description: String,
    attributes: Vec<Attribute>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            version: 0,
            description: String::new(),
            attributes: Vec::new(),
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            version: self.version,
            description: self.description,
            attributes: self.attributes,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, r#type: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                conflicts_with: Vec::new(),
                validators: Vec::new(),
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.attribute.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    pub fn conflicts_with(mut self, names: &[&str]) -> Self {
        self.attribute
            .conflicts_with
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}
