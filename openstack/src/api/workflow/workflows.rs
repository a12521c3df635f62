//! Workflow definition API implementation

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::common::{deserialize_timestamp_option, ApiQueryParams};
use crate::api::{ApiError, ServiceClient};

#[derive(Debug, Clone, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp_option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parameters for `POST /workflows`; the definition is sent as raw YAML
#[derive(Debug, Clone)]
pub struct CreateWorkflowRequest {
    pub scope: String,
    pub namespace: Option<String>,
    pub definition: String,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowListFilter {
    pub name: Option<String>,
    pub namespace: Option<String>,
}

impl WorkflowListFilter {
    fn to_query_params(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_optional("name", self.name.as_ref().map(|n| format!("eq:{}", n)))
            .add_optional("namespace", self.namespace.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowList {
    #[serde(default)]
    workflows: Vec<Workflow>,
}

/// Workflows API
pub struct WorkflowsApi<'a> {
    client: &'a ServiceClient,
}

impl<'a> WorkflowsApi<'a> {
    pub fn new(client: &'a ServiceClient) -> Self {
        Self { client }
    }

    /// POST /workflows. One definition may declare several workflows; all
    /// of them are returned in definition order.
    pub async fn create(&self, request: &CreateWorkflowRequest) -> Result<Vec<Workflow>, ApiError> {
        let params = ApiQueryParams::new()
            .add("scope", &request.scope)
            .add_optional("namespace", request.namespace.as_ref());
        let path = format!("workflows{}", params.to_query_string());
        let list: WorkflowList = self
            .client
            .post_text(&path, request.definition.clone())
            .await?;
        Ok(list.workflows)
    }

    /// GET /workflows/{id}
    pub async fn get(&self, id: &str) -> Result<Workflow, ApiError> {
        self.client
            .get(&format!("workflows/{}", urlencoding::encode(id)))
            .await
    }

    /// GET /workflows
    pub async fn list(&self, filter: &WorkflowListFilter) -> Result<Vec<Workflow>, ApiError> {
        let list: WorkflowList = self
            .client
            .get_with_params("workflows", &filter.to_query_params())
            .await?;
        Ok(list.workflows)
    }

    /// DELETE /workflows/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("workflows/{}", urlencoding::encode(id)))
            .await
    }
}
