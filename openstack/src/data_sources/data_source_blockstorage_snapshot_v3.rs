//! Block storage snapshot lookup

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceWithConfigure,
    ReadDataSourceRequest, ReadDataSourceResponse, ValidateDataSourceConfigRequest,
    ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

use super::{single_result, MULTIPLE_RESULTS};
use crate::api::blockstorage::snapshots::most_recent;
use crate::api::blockstorage::{Snapshot, SnapshotListFilter};
use crate::api::ApiError;
use crate::clients::Service;
use crate::provider_data::{extract_provider_data, OpenStackProviderData};
use crate::state;

#[derive(Default)]
pub struct SnapshotV3DataSource {
    provider_data: Option<OpenStackProviderData>,
}

impl SnapshotV3DataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> Box<dyn DataSourceWithConfigure> {
        Box::new(Self::new())
    }

    /// Pick one snapshot; several matches need `most_recent`
    fn select(snapshots: Vec<Snapshot>, recent: bool) -> Result<Snapshot, Diagnostic> {
        if snapshots.len() > 1 && recent {
            return most_recent(snapshots).ok_or_else(|| {
                Diagnostic::error(super::NO_RESULTS, "No snapshot matched the query")
            });
        }
        single_result("openstack_blockstorage_snapshot_v3", snapshots).map_err(|mut d| {
            if d.summary == MULTIPLE_RESULTS {
                d.detail = format!("{}, or set `most_recent` attribute to true", d.detail);
            }
            d
        })
    }

    fn write_state(state: &mut DynamicValue, snapshot: Snapshot, region: &str) -> Result<(), ApiError> {
        state::set_string(state, "id", snapshot.id)?;
        state::set_string(state, "region", region)?;
        state::set_opt_string(state, "name", snapshot.name)?;
        state::set_opt_string(state, "description", snapshot.description)?;
        state::set_opt_i64(state, "size", Some(snapshot.size))?;
        state::set_string(state, "status", snapshot.status)?;
        state::set_string(state, "volume_id", snapshot.volume_id)?;
        state::set_string_map(state, "metadata", snapshot.metadata)
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
            .client_for(Service::BlockStorage, 3, &region)
            .await
            .map_err(|e| {
                Diagnostic::error("Error creating OpenStack block storage client", e.to_string())
            })?;

        let filter = SnapshotListFilter {
            name: state::opt_string(config, "name"),
            status: state::opt_string(config, "status"),
            volume_id: state::opt_string(config, "volume_id"),
        };
        let snapshots = client.snapshots().list(&filter).await.map_err(|e| {
            Diagnostic::error(
                "Unable to query openstack_blockstorage_snapshots_v3",
                format!("API error: {}", e),
            )
        })?;

        let recent = state::opt_bool(config, "most_recent").unwrap_or(false);
        let snapshot = Self::select(snapshots, recent)?;

        let mut state = config.clone();
        state::clear_unknowns(&mut state.value);
        Self::write_state(&mut state, snapshot, &region)
            .map_err(|e| Diagnostic::error("Failed to set snapshot attributes", e.to_string()))?;
        Ok(state)
    }
}

#[async_trait]
impl DataSource for SnapshotV3DataSource {
    fn type_name(&self) -> &str {
        "openstack_blockstorage_snapshot_v3"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Looks up a V3 block storage snapshot")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("volume_id", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("most_recent", AttributeType::Bool)
                    .description("Pick the newest snapshot when several match")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("metadata", AttributeType::Map(Box::new(AttributeType::String)))
                    .computed()
                    .build(),
            )
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
            Err(e) => Err(Diagnostic::error("Snapshot lookup interrupted", e.to_string())),
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
impl DataSourceWithConfigure for SnapshotV3DataSource {
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
