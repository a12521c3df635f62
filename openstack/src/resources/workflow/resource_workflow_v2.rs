//! Mistral workflow definition resource

use async_trait::async_trait;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;
use tfplug::validator::StringInSlice;

use crate::api::common::format_timestamp;
use crate::api::workflow::{CreateWorkflowRequest, Workflow};
use crate::api::{ApiError, ServiceClient};
use crate::clients::Service;
use crate::lifecycle::ManagedResource;
use crate::state;
use crate::verify::{normalize_yaml, YamlString};

#[derive(Default)]
pub struct WorkflowV2;

impl WorkflowV2 {
    pub(crate) fn write_state(workflow: Workflow, state: &mut DynamicValue) -> Result<(), ApiError> {
        // Stored definitions are kept as returned when they no longer parse
        let definition = workflow
            .definition
            .map(|d| normalize_yaml(&d).unwrap_or(d));

        state::set_string(state, "name", workflow.name)?;
        state::set_opt_string(state, "scope", workflow.scope)?;
        state::set_opt_string(state, "namespace", workflow.namespace)?;
        state::set_opt_string(state, "definition", definition)?;
        state::set_opt_string(state, "input", workflow.input)?;
        state::set_string_list(state, "tags", &workflow.tags)?;
        state::set_opt_string(state, "project_id", workflow.project_id)?;
        state::set_opt_string(
            state,
            "created_at",
            workflow.created_at.as_ref().map(format_timestamp),
        )
    }
}

#[async_trait]
impl ManagedResource for WorkflowV2 {
    const TYPE_NAME: &'static str = "openstack_workflow_workflow_v2";
    const SERVICE: Service = Service::Workflow;
    const VERSION: u32 = 2;

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a V2 workflow definition in the OpenStack workflow service")
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
                    .description("Visibility of the workflow: private or public")
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
                    .description("Workflow definition in the Mistral YAML language")
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
                AttributeBuilder::new("input", AttributeType::String)
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
        let definition = normalize_yaml(&state::opt_string(config, "definition").unwrap_or_default())?;
        let request = CreateWorkflowRequest {
            scope: state::opt_string(config, "scope").unwrap_or_default(),
            namespace: state::opt_string(config, "namespace"),
            definition,
        };
        tracing::debug!("{} create options: {:?}", Self::TYPE_NAME, request);

        // One definition may declare several workflows; the last is the one managed here
        let created = client.workflows().create(&request).await?;
        created
            .into_iter()
            .last()
            .map(|w| w.id)
            .ok_or_else(|| ApiError::Parse("workflow service returned no workflows".to_string()))
    }

    async fn read(
        &self,
        client: &ServiceClient,
        id: &str,
        state: &mut DynamicValue,
    ) -> Result<(), ApiError> {
        let workflow = client.workflows().get(id).await?;
        tracing::debug!("Retrieved {} {}: {:?}", Self::TYPE_NAME, id, workflow);
        Self::write_state(workflow, state)
    }

    async fn delete(&self, client: &ServiceClient, id: &str) -> Result<(), ApiError> {
        client.workflows().delete(id).await
    }
}
