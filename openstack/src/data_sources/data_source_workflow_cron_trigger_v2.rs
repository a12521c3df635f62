//! Cron trigger lookup

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceWithConfigure,
    ReadDataSourceRequest, ReadDataSourceResponse, ValidateDataSourceConfigRequest,
    ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

use super::single_result;
use crate::api::common::format_timestamp;
use crate::api::workflow::{CronTrigger, CronTriggerListFilter};
use crate::api::ApiError;
use crate::clients::Service;
use crate::provider_data::{extract_provider_data, OpenStackProviderData};
use crate::resources::workflow::CronTriggerV2;
use crate::state;

#[derive(Default)]
pub struct CronTriggerV2DataSource {
    provider_data: Option<OpenStackProviderData>,
}

impl CronTriggerV2DataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> Box<dyn DataSourceWithConfigure> {
        Box::new(Self::new())
    }

    fn filter(config: &DynamicValue) -> CronTriggerListFilter {
        CronTriggerListFilter {
            name: state::opt_string(config, "name"),
            workflow_id: state::opt_string(config, "workflow_id"),
            project_id: state::opt_string(config, "project_id"),
        }
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let provider_data = self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })?;

        let region = provider_data
            .config
            .region_for(state::opt_string(config, "region").as_deref());
        let client = provider_data
            .client_for(Service::Workflow, 2, &region)
            .await
            .map_err(|e| {
                Diagnostic::error("Error creating OpenStack workflow client", e.to_string())
            })?;

        let triggers = client
            .cron_triggers()
            .list(&Self::filter(config))
            .await
            .map_err(|e| Diagnostic::error("Unable to retrieve cron triggers", format!("API error: {}", e)))?;
        let trigger = single_result(self.type_name(), triggers)?;

        let mut state = config.clone();
        state::clear_unknowns(&mut state.value);
        Self::write_state(&mut state, trigger, &region)
            .map_err(|e| Diagnostic::error("Failed to set cron trigger attributes", e.to_string()))?;
        Ok(state)
    }

    fn write_state(state: &mut DynamicValue, trigger: CronTrigger, region: &str) -> Result<(), ApiError> {
        state::set_string(state, "id", trigger.id.as_str())?;
        state::set_string(state, "region", region)?;
        state::set_opt_string(
            state,
            "first_execution_time",
            trigger.first_execution_time.as_ref().map(format_timestamp),
        )?;
        CronTriggerV2::write_state(trigger, state)
    }
}

#[async_trait]
impl DataSource for CronTriggerV2DataSource {
    fn type_name(&self) -> &str {
        "openstack_workflow_cron_trigger_v2"
    }

    fn schema(&self) -> Schema {
        let computed = |name: &str, r#type: AttributeType| {
            AttributeBuilder::new(name, r#type).computed().build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Looks up a V2 cron trigger in the OpenStack workflow service")
            .attribute(computed("id", AttributeType::String))
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Exact name of the cron trigger")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("workflow_id", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(computed("workflow_name", AttributeType::String))
            .attribute(computed(
                "workflow_input",
                AttributeType::Map(Box::new(AttributeType::String)),
            ))
            .attribute(computed(
                "workflow_params",
                AttributeType::Map(Box::new(AttributeType::String)),
            ))
            .attribute(computed("pattern", AttributeType::String))
            .attribute(computed("remaining_executions", AttributeType::Number))
            .attribute(computed("first_execution_time", AttributeType::String))
            .attribute(computed("created_at", AttributeType::String))
            .build()
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: self.schema().validate(&request.config),
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let result = match ctx.run(self.lookup(&request.config)).await {
            Ok(result) => result,
            Err(e) => Err(Diagnostic::error("Cron trigger lookup interrupted", e.to_string())),
        };

        match result {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(diagnostic) => ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: vec![diagnostic],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for CronTriggerV2DataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match extract_provider_data(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(d) => diagnostics.push(d),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}
