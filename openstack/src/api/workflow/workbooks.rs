//! Workbook API implementation

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::common::{deserialize_timestamp_option, ApiQueryParams};
use crate::api::{ApiError, ServiceClient};

#[derive(Debug, Clone, Deserialize)]
pub struct Workbook {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
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

/// Parameters for `POST /workbooks`; the definition is sent as raw YAML
#[derive(Debug, Clone)]
pub struct CreateWorkbookRequest {
    pub scope: String,
    pub namespace: Option<String>,
    pub definition: String,
}

/// Workbooks API
pub struct WorkbooksApi<'a> {
    client: &'a ServiceClient,
}

impl<'a> WorkbooksApi<'a> {
    pub fn new(client: &'a ServiceClient) -> Self {
        Self { client }
    }

    /// POST /workbooks
    pub async fn create(&self, request: &CreateWorkbookRequest) -> Result<Workbook, ApiError> {
        let params = ApiQueryParams::new()
            .add("scope", &request.scope)
            .add_optional("namespace", request.namespace.as_ref());
        let path = format!("workbooks{}", params.to_query_string());
        self.client
            .post_text(&path, request.definition.clone())
            .await
    }

    /// GET /workbooks/{id}
    pub async fn get(&self, id: &str) -> Result<Workbook, ApiError> {
        self.client
            .get(&format!("workbooks/{}", urlencoding::encode(id)))
            .await
    }

    /// DELETE /workbooks/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("workbooks/{}", urlencoding::encode(id)))
            .await
    }
}
