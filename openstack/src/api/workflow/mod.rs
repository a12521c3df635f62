//! Workflow (Mistral) v2 API

pub mod cron_triggers;
pub mod workbooks;
pub mod workflows;

pub use cron_triggers::{CreateCronTriggerRequest, CronTrigger, CronTriggerListFilter, CronTriggersApi};
pub use workbooks::{CreateWorkbookRequest, Workbook, WorkbooksApi};
pub use workflows::{CreateWorkflowRequest, Workflow, WorkflowListFilter, WorkflowsApi};

use super::ServiceClient;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

impl ServiceClient {
    /// Cron trigger operations
    pub fn cron_triggers(&self) -> CronTriggersApi<'_> {
        CronTriggersApi::new(self)
    }

    /// Workbook operations
    pub fn workbooks(&self) -> WorkbooksApi<'_> {
        WorkbooksApi::new(self)
    }

    /// Workflow definition operations
    pub fn workflows(&self) -> WorkflowsApi<'_> {
        WorkflowsApi::new(self)
    }
}

/// Mistral returns workflow input/params as a JSON document embedded in a
/// string; older releases return the object itself. Values are flattened to
/// strings.
pub(crate) fn deserialize_embedded_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let object = match value {
        None | Some(serde_json::Value::Null) => return Ok(HashMap::new()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => return Ok(HashMap::new()),
        Some(serde_json::Value::String(s)) => {
            serde_json::from_str::<serde_json::Value>(&s).map_err(serde::de::Error::custom)?
        }
        Some(other) => other,
    };

    match object {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect()),
        serde_json::Value::Null => Ok(HashMap::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected an object, got {}",
            other
        ))),
    }
}
