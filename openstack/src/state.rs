//! Attribute helpers shared by resources and data sources

use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use crate::api::ApiError;

/// Non-empty string attribute
pub fn opt_string(state: &DynamicValue, name: &str) -> Option<String> {
    state
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
}

/// Configured or not yet known; empty strings count as unset
pub fn is_set(state: &DynamicValue, name: &str) -> bool {
    match state.get(&AttributePath::new(name)) {
        None | Some(Dynamic::Null) => false,
        Some(Dynamic::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

pub fn opt_i64(state: &DynamicValue, name: &str) -> Option<i64> {
    state
        .get_number(&AttributePath::new(name))
        .ok()
        .map(|n| n as i64)
}

pub fn opt_bool(state: &DynamicValue, name: &str) -> Option<bool> {
    state.get_bool(&AttributePath::new(name)).ok()
}

/// Map of strings; empty when null, unknown or absent
pub fn string_map(state: &DynamicValue, name: &str) -> HashMap<String, String> {
    state
        .get_string_map(&AttributePath::new(name))
        .unwrap_or_default()
}

pub fn set_string(state: &mut DynamicValue, name: &str, value: impl Into<String>) -> Result<(), ApiError> {
    state.set_string(&AttributePath::new(name), value.into())?;
    Ok(())
}

/// Writes null for `None`
pub fn set_opt_string(
    state: &mut DynamicValue,
    name: &str,
    value: Option<impl Into<String>>,
) -> Result<(), ApiError> {
    let path = AttributePath::new(name);
    match value {
        Some(v) => state.set_string(&path, v.into())?,
        None => state.set_null(&path)?,
    }
    Ok(())
}

pub fn set_opt_i64(state: &mut DynamicValue, name: &str, value: Option<i64>) -> Result<(), ApiError> {
    let path = AttributePath::new(name);
    match value {
        Some(v) => state.set_number(&path, v as f64)?,
        None => state.set_null(&path)?,
    }
    Ok(())
}

pub fn set_string_map(
    state: &mut DynamicValue,
    name: &str,
    value: HashMap<String, String>,
) -> Result<(), ApiError> {
    state.set_string_map(&AttributePath::new(name), value)?;
    Ok(())
}

pub fn set_string_list(state: &mut DynamicValue, name: &str, value: &[String]) -> Result<(), ApiError> {
    let list = value.iter().map(|s| Dynamic::String(s.clone())).collect();
    state.set_list(&AttributePath::new(name), list)?;
    Ok(())
}

/// Replace values still unknown after apply with null
pub fn clear_unknowns(value: &mut Dynamic) {
    match value {
        Dynamic::Unknown => *value = Dynamic::Null,
        Dynamic::List(items) => items.iter_mut().for_each(clear_unknowns),
        Dynamic::Map(map) => map.values_mut().for_each(clear_unknowns),
        _ => {}
    }
}
