//! Cron trigger API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

use super::deserialize_embedded_map;
use crate::api::common::{deserialize_timestamp_option, ApiQueryParams};
use crate::api::{ApiError, ServiceClient};

#[derive(Debug, Clone, Deserialize)]
pub struct CronTrigger {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_embedded_map")]
    pub workflow_input: HashMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_embedded_map")]
    pub workflow_params: HashMap<String, String>,
    #[serde(default)]
    pub remaining_executions: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_timestamp_option")]
    pub first_execution_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp_option")]
    pub created_at: Option<DateTime<Utc>>,
}

fn serialize_embedded_map<S>(value: &HashMap<String, String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let encoded = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&encoded)
}

/// Request body for `POST /cron_triggers`
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateCronTriggerRequest {
    pub name: String,
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(
        skip_serializing_if = "HashMap::is_empty",
        serialize_with = "serialize_embedded_map"
    )]
    pub workflow_input: HashMap<String, String>,
    #[serde(
        skip_serializing_if = "HashMap::is_empty",
        serialize_with = "serialize_embedded_map"
    )]
    pub workflow_params: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_executions: Option<i64>,
    /// UTC, formatted `YYYY-MM-DD HH:MM`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_execution_time: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CronTriggerListFilter {
    pub name: Option<String>,
    pub workflow_id: Option<String>,
    pub project_id: Option<String>,
}

impl CronTriggerListFilter {
    fn to_query_params(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_optional("name", self.name.as_ref().map(|n| format!("eq:{}", n)))
            .add_optional("workflow_id", self.workflow_id.as_ref())
            .add_optional("project_id", self.project_id.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct CronTriggerList {
    #[serde(default)]
    cron_triggers: Vec<CronTrigger>,
}

/// Cron triggers API
pub struct CronTriggersApi<'a> {
    client: &'a ServiceClient,
}

impl<'a> CronTriggersApi<'a> {
    pub fn new(client: &'a ServiceClient) -> Self {
        Self { client }
    }

    /// POST /cron_triggers
    pub async fn create(&self, request: &CreateCronTriggerRequest) -> Result<CronTrigger, ApiError> {
        self.client.post("cron_triggers", request).await
    }

    /// GET /cron_triggers/{id}
    pub async fn get(&self, id: &str) -> Result<CronTrigger, ApiError> {
        self.client
            .get(&format!("cron_triggers/{}", urlencoding::encode(id)))
            .await
    }

    /// GET /cron_triggers
    pub async fn list(&self, filter: &CronTriggerListFilter) -> Result<Vec<CronTrigger>, ApiError> {
        let list: CronTriggerList = self
            .client
            .get_with_params("cron_triggers", &filter.to_query_params())
            .await?;
        Ok(list.cron_triggers)
    }

    /// DELETE /cron_triggers/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("cron_triggers/{}", urlencoding::encode(id)))
            .await
    }
}
