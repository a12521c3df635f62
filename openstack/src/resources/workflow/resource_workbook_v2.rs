//! Mistral workbook resource

use async_trait::async_trait;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;
use tfplug::validator::StringInSlice;

use crate::api::common::format_timestamp;
use crate::api::workflow::{CreateWorkbookRequest, Workbook};
use crate::api::{ApiError, ServiceClient};
use crate::clients::Service;
use crate::lifecycle::ManagedResource;
use crate::state;
use crate::verify::{normalize_yaml, YamlString};

#[derive(Default)]
pub struct WorkbookV2;

impl WorkbookV2 {
    fn create_request(config: &DynamicValue) -> Result<CreateWorkbookRequest, ApiError> {
        let definition = normalize_yaml(&state::opt_string(config, "definition").unwrap_or_default())?;
        Ok(CreateWorkbookRequest {
            scope: state::opt_string(config, "scope").unwrap_or_default(),
            namespace: state::opt_string(config, "namespace"),
            definition,
        })
    }

    fn write_state(workbook: Workbook, state: &mut DynamicValue) -> Result<(), ApiError> {
        let definition = workbook
            .definition
            .map(|d| normalize_yaml(&d).unwrap_or(d));

        state::set_string(state, "name", workbook.name)?;
        state::set_opt_string(state, "scope", workbook.scope)?;
        state::set_opt_string(state, "namespace", workbook.namespace)?;
        state::set_opt_string(state, "definition", definition)?;
        state::set_string_list(state, "tags", &workbook.tags)?;
        state::set_opt_string(state, "project_id", workbook.project_id)?;
        state::set_opt_string(
            state,
            "created_at",
            workbook.created_at.as_ref().map(format_timestamp),
        )
    }
}

#[async_trait]
impl ManagedResource for WorkbookV2 {
    const TYPE_NAME: &'static str = "openstack_workflow_workbook_v2";
    const SERVICE: Service = Service::Workflow;
    const VERSION: u32 = 2;

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a V2 workbook in the OpenStack workflow service")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("scope", AttributeType::String)
                    .required()
                    .force_new()
                    .validator(StringInSlice::new(&["private", "public"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("namespace", AttributeType::String)
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("definition", AttributeType::String)
                    .description("Workbook definition in the Mistral YAML language")
                    .required()
                    .force_new()
                    .validator(YamlString)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Set(Box::new(AttributeType::String)))
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn create(&self, client: &ServiceClient, config: &DynamicValue) -> Result<String, ApiError> {
        let request = Self::create_request(config)?;
        tracing::debug!("{} create options: {:?}", Self::TYPE_NAME, request);
        let workbook = client.workbooks().create(&request).await?;
        Ok(workbook.id)
    }

    async fn read(
        &self,
        client: &ServiceClient,
        id: &str,
        state: &mut DynamicValue,
    ) -> Result<(), ApiError> {
        let workbook = client.workbooks().get(id).await?;
        tracing::debug!("Retrieved {} {}: {:?}", Self::TYPE_NAME, id, workbook);
        Self::write_state(workbook, state)
    }

    async fn delete(&self, client: &ServiceClient, id: &str) -> Result<(), ApiError> {
        client.workbooks().delete(id).await
    }
}
