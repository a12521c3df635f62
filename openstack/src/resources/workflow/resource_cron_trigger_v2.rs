//! Mistral cron trigger resource

use async_trait::async_trait;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::Rfc3339Timestamp;

use crate::api::common::{format_timestamp, parse_timestamp};
use crate::api::workflow::{CreateCronTriggerRequest, CronTrigger};
use crate::api::{ApiError, ServiceClient};
use crate::clients::Service;
use crate::lifecycle::ManagedResource;
use crate::state;

#[derive(Default)]
pub struct CronTriggerV2;

impl CronTriggerV2 {
    fn create_request(config: &DynamicValue) -> Result<CreateCronTriggerRequest, ApiError> {
        let first_execution_time = match state::opt_string(config, "first_execution_time") {
            Some(value) => {
                let at = parse_timestamp(&value).ok_or_else(|| {
                    ApiError::Config(format!("invalid first_execution_time {:?}", value))
                })?;
                Some(at.format("%Y-%m-%d %H:%M").to_string())
            }
            None => None,
        };

        Ok(CreateCronTriggerRequest {
            name: state::opt_string(config, "name").unwrap_or_default(),
            pattern: state::opt_string(config, "pattern").unwrap_or_default(),
            workflow_id: state::opt_string(config, "workflow_id"),
            workflow_name: state::opt_string(config, "workflow_name"),
            workflow_input: state::string_map(config, "workflow_input"),
            workflow_params: state::string_map(config, "workflow_params"),
            remaining_executions: state::opt_i64(config, "remaining_executions"),
            first_execution_time,
        })
    }

    pub(crate) fn write_state(trigger: CronTrigger, state: &mut DynamicValue) -> Result<(), ApiError> {
        state::set_string(state, "name", trigger.name)?;
        state::set_opt_string(state, "pattern", trigger.pattern)?;
        state::set_opt_string(state, "workflow_id", trigger.workflow_id)?;
        state::set_opt_string(state, "workflow_name", trigger.workflow_name)?;
        state::set_string_map(state, "workflow_input", trigger.workflow_input)?;
        state::set_string_map(state, "workflow_params", trigger.workflow_params)?;
        state::set_opt_i64(state, "remaining_executions", trigger.remaining_executions)?;
        state::set_opt_string(state, "project_id", trigger.project_id)?;
        state::set_opt_string(
            state,
            "created_at",
            trigger.created_at.as_ref().map(format_timestamp),
        )
    }
}

#[async_trait]
impl ManagedResource for CronTriggerV2 {
    const TYPE_NAME: &'static str = "openstack_workflow_cron_trigger_v2";
    const SERVICE: Service = Service::Workflow;
    const VERSION: u32 = 2;

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a V2 cron trigger in the OpenStack workflow service")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Cron trigger identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region of the workflow service; defaults to the provider region")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the cron trigger")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("workflow_id", AttributeType::String)
                    .description("ID of the workflow to run")
                    .optional()
                    .computed()
                    .force_new()
                    .conflicts_with(&["workflow_name"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("workflow_name", AttributeType::String)
                    .description("Name of the workflow to run")
                    .optional()
                    .computed()
                    .force_new()
                    .conflicts_with(&["workflow_id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "workflow_input",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description("Input passed to the workflow")
                .optional()
                .force_new()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "workflow_params",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description("Execution parameters passed to the workflow")
                .optional()
                .force_new()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("pattern", AttributeType::String)
                    .description("Cron expression, e.g. \"0 5 * * *\"")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("remaining_executions", AttributeType::Number)
                    .description("Number of executions left before the trigger is removed")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("first_execution_time", AttributeType::String)
                    .description("RFC3339 time of the first execution")
                    .optional()
                    .force_new()
                    .validator(Rfc3339Timestamp)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project owning the cron trigger")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("Creation time in RFC3339 format")
                    .computed()
                    .build(),
            )
            .build()
    }

    fn check_config(config: &DynamicValue) -> Vec<Diagnostic> {
        if state::is_set(config, "workflow_id") || state::is_set(config, "workflow_name") {
            return vec![];
        }
        vec![Diagnostic::error(
            "Missing workflow",
            "Either \"workflow_id\" or \"workflow_name\" must be set",
        )
        .with_attribute(AttributePath::new("workflow_id"))]
    }

    async fn create(&self, client: &ServiceClient, config: &DynamicValue) -> Result<String, ApiError> {
        let request = Self::create_request(config)?;
        tracing::debug!("{} create options: {:?}", Self::TYPE_NAME, request);
        let trigger = client.cron_triggers().create(&request).await?;
        Ok(trigger.id)
    }

    async fn read(
        &self,
        client: &ServiceClient,
        id: &str,
        state: &mut DynamicValue,
    ) -> Result<(), ApiError> {
        let trigger = client.cron_triggers().get(id).await?;
        tracing::debug!("Retrieved {} {}: {:?}", Self::TYPE_NAME, id, trigger);
        Self::write_state(trigger, state)
    }

    async fn delete(&self, client: &ServiceClient, id: &str) -> Result<(), ApiError> {
        client.cron_triggers().delete(id).await
    }
}
