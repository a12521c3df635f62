//! Cinder v3 volume resource

use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::NumberBetween;

use crate::api::blockstorage::{CreateVolumeRequest, UpdateVolumeRequest, Volume};
use crate::api::{ApiError, ServiceClient};
use crate::clients::Service;
use crate::lifecycle::ManagedResource;
use crate::state;
use crate::waiter::{wait_for, WaitSpec, DELETED};

const CREATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
pub struct VolumeV3;

impl VolumeV3 {
    fn create_request(config: &DynamicValue) -> CreateVolumeRequest {
        CreateVolumeRequest {
            size: state::opt_i64(config, "size").unwrap_or_default(),
            name: state::opt_string(config, "name"),
            description: state::opt_string(config, "description"),
            volume_type: state::opt_string(config, "volume_type"),
            availability_zone: state::opt_string(config, "availability_zone"),
            metadata: state::string_map(config, "metadata"),
        }
    }

    fn write_state(volume: Volume, state: &mut DynamicValue) -> Result<(), ApiError> {
        state::set_opt_string(state, "name", volume.name)?;
        state::set_opt_string(state, "description", volume.description)?;
        state::set_opt_i64(state, "size", Some(volume.size))?;
        state::set_opt_string(state, "volume_type", volume.volume_type)?;
        state::set_opt_string(state, "availability_zone", volume.availability_zone)?;
        state::set_string_map(state, "metadata", volume.metadata)?;
        state::set_string(state, "status", volume.status)
    }

    fn sizes(prior: &DynamicValue, planned: &DynamicValue) -> (i64, i64) {
        let old_size = state::opt_i64(prior, "size").unwrap_or_default();
        let new_size = state::opt_i64(planned, "size").unwrap_or(old_size);
        (old_size, new_size)
    }

    /// Wait until the volume settles in `available`
    async fn wait_available(
        ctx: &Context,
        client: &ServiceClient,
        id: &str,
        pending: &[&str],
        timeout: Duration,
    ) -> Result<(), ApiError> {
        let spec = WaitSpec::new(pending, &["available"], timeout)
            .failure(&["error"])
            .interval(Duration::from_secs(10))
            .max_retries(client.max_retries());

        wait_for(ctx, &spec, move || async move {
            let volume = client.volumes().get(id).await?;
            let status = volume.status.clone();
            Ok((volume, status))
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ManagedResource for VolumeV3 {
    const TYPE_NAME: &'static str = "openstack_blockstorage_volume_v3";
    const SERVICE: Service = Service::BlockStorage;
    const VERSION: u32 = 3;
    const UPDATABLE: bool = true;

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a V3 volume in the OpenStack block storage service")
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
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Size in GiB; can only grow in place")
                    .required()
                    .validator(NumberBetween {
                        min: 1.0,
                        max: f64::MAX,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("volume_type", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("availability_zone", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("metadata", AttributeType::Map(Box::new(AttributeType::String)))
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn check_update(prior: &DynamicValue, planned: &DynamicValue) -> Vec<Diagnostic> {
        let (old_size, new_size) = Self::sizes(prior, planned);
        if new_size < old_size {
            return vec![Diagnostic::error(
                "Invalid volume size",
                format!(
                    "volume size cannot shrink from {} to {} GiB",
                    old_size, new_size
                ),
            )
            .with_attribute(AttributePath::new("size"))];
        }
        Vec::new()
    }

    async fn create(&self, client: &ServiceClient, config: &DynamicValue) -> Result<String, ApiError> {
        let request = Self::create_request(config);
        tracing::debug!("{} create options: {:?}", Self::TYPE_NAME, request);
        let volume = client.volumes().create(&request).await?;
        Ok(volume.id)
    }

    async fn wait_created(
        &self,
        ctx: &Context,
        client: &ServiceClient,
        id: &str,
    ) -> Result<(), ApiError> {
        Self::wait_available(ctx, client, id, &["downloading", "creating"], CREATE_TIMEOUT).await
    }

    async fn read(
        &self,
        client: &ServiceClient,
        id: &str,
        state: &mut DynamicValue,
    ) -> Result<(), ApiError> {
        let volume = client.volumes().get(id).await?;
        tracing::debug!("Retrieved {} {}: {:?}", Self::TYPE_NAME, id, volume);
        Self::write_state(volume, state)
    }

    async fn update(
        &self,
        ctx: &Context,
        client: &ServiceClient,
        id: &str,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<(), ApiError> {
        let name = state::opt_string(planned, "name");
        let description = state::opt_string(planned, "description");
        if name != state::opt_string(prior, "name")
            || description != state::opt_string(prior, "description")
        {
            let request = UpdateVolumeRequest {
                name: Some(name.unwrap_or_default()),
                description: Some(description.unwrap_or_default()),
            };
            client.volumes().update(id, &request).await?;
        }

        let (old_size, new_size) = Self::sizes(prior, planned);
        if new_size > old_size {
            client.volumes().extend(id, new_size).await?;
            Self::wait_available(ctx, client, id, &["extending"], UPDATE_TIMEOUT).await?;
        }
        Ok(())
    }

    async fn delete(&self, client: &ServiceClient, id: &str) -> Result<(), ApiError> {
        client.volumes().delete(id).await
    }

    async fn wait_deleted(
        &self,
        ctx: &Context,
        client: &ServiceClient,
        id: &str,
    ) -> Result<(), ApiError> {
        let spec = WaitSpec::new(&["deleting", "downloading", "available"], &[DELETED], DELETE_TIMEOUT)
            .failure(&["error_deleting"])
            .interval(Duration::from_secs(10))
            .max_retries(client.max_retries());

        wait_for(ctx, &spec, move || async move {
            match client.volumes().get(id).await {
                Ok(volume) => Ok(((), volume.status)),
                Err(e) if e.is_not_found() => Ok(((), DELETED.to_string())),
                Err(e) => Err(e),
            }
        })
        .await
    }
}
