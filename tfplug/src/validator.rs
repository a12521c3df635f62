//! Attribute validators run by `Schema::validate`

use crate::types::{AttributePath, Diagnostic, Dynamic};

/// Validator checks one configured attribute value. Null and unknown values
/// are filtered out before validators run.
pub trait Validator: Send + Sync {
    fn description(&self) -> String;

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic>;
}

fn invalid(path: &AttributePath, summary: String, detail: String) -> Vec<Diagnostic> {
    vec![Diagnostic::error(summary, detail).with_attribute(path.clone())]
}

/// String must be one of a fixed set
pub struct StringInSlice {
    pub values: Vec<String>,
    pub ignore_case: bool,
}

impl StringInSlice {
    pub fn new(values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|v| v.to_string()).collect(),
            ignore_case: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

impl Validator for StringInSlice {
    fn description(&self) -> String {
        format!("value must be one of {:?}", self.values)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        let Some(s) = value.as_str() else {
            return vec![];
        };

        let found = self.values.iter().any(|v| {
            if self.ignore_case {
                v.eq_ignore_ascii_case(s)
            } else {
                v == s
            }
        });

        if found {
            vec![]
        } else {
            invalid(
                path,
                format!("Invalid value for {}", path),
                format!("expected one of {:?}, got {:?}", self.values, s),
            )
        }
    }
}

/// Number must lie in an inclusive range
pub struct NumberBetween {
    pub min: f64,
    pub max: f64,
}

impl Validator for NumberBetween {
    fn description(&self) -> String {
        format!("value must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        match value.as_number() {
            Some(n) if n < self.min || n > self.max => invalid(
                path,
                format!("Invalid value for {}", path),
                format!("expected {} to be in [{}, {}], got {}", path, self.min, self.max, n),
            ),
            _ => vec![],
        }
    }
}

/// String must be an RFC 3339 timestamp
pub struct Rfc3339Timestamp;

impl Validator for Rfc3339Timestamp {
    fn description(&self) -> String {
        "value must be an RFC3339 timestamp".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
        match value.as_str() {
            Some(s) => match chrono::DateTime::parse_from_rfc3339(s) {
                Ok(_) => vec![],
                Err(e) => invalid(
                    path,
                    format!("{:?} is not a valid RFC3339 timestamp for {:?}", s, path.to_string()),
                    e.to_string(),
                ),
            },
            None => vec![],
        }
    }
}
