//! Resource lifecycle controller
//!
//! `Lifecycle<K>` drives Create, Read, Update, Delete and Import for any
//! `ManagedResource` kind. Kinds only describe their remote calls; state
//! capture, drift handling and idempotent delete live here.
//!
//! ```text
//! Absent -> Creating -> Present -> (Updating) -> Deleting -> Absent
//! ```
//!
//! The remote identifier is written to state as soon as the create call
//! returns, so an object whose follow-up wait or read fails stays tracked.

use async_trait::async_trait;
use std::future::Future;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::Schema;
use tfplug::types::{has_errors, AttributePath, Diagnostic, DynamicValue};

use crate::api::{ApiError, ServiceClient};
use crate::clients::Service;
use crate::config::Config;
use crate::provider_data::{extract_provider_data, OpenStackProviderData};
use crate::state;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
    /// Read failed for a reason other than NotFound
    Unknown,
}

/// Identity of one managed remote object. The id never changes once known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub kind: &'static str,
    pub id: String,
    pub region: String,
}

impl ResourceHandle {
    /// `None` when the state carries no identifier
    pub fn from_state(kind: &'static str, state: &DynamicValue, config: &Config) -> Option<Self> {
        let id = state::opt_string(state, "id")?;
        let region = config.region_for(state::opt_string(state, "region").as_deref());
        Some(Self { kind, id, region })
    }

    pub fn write_to(&self, state: &mut DynamicValue) -> Result<(), ApiError> {
        state::set_string(state, "id", self.id.as_str())?;
        state::set_string(state, "region", self.region.as_str())
    }

    fn transition(&self, from: ResourceState, to: ResourceState) {
        tracing::debug!("{} {}: {:?} -> {:?}", self.kind, self.id, from, to);
    }
}

/// Treat NotFound as success; used where "already gone" is the goal
pub fn check_deleted(result: Result<(), ApiError>) -> Result<(), ApiError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// Run `fut` under the context's cancellation and deadline
pub async fn cancellable<T, F>(ctx: &Context, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    ctx.run(fut).await?
}

/// One remote object type. Implementations describe the remote calls only.
#[async_trait]
pub trait ManagedResource: Default + Send + Sync + 'static {
    const TYPE_NAME: &'static str;
    const SERVICE: Service;
    const VERSION: u32;
    /// Whether `update` may change the object in place
    const UPDATABLE: bool = false;

    fn schema() -> Schema;

    /// Checks the schema cannot express
    fn check_config(_config: &DynamicValue) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Checks on a planned change, run before any remote call is made
    fn check_update(_prior: &DynamicValue, _planned: &DynamicValue) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Key of the contended remote object for create and delete
    fn lock_key(_state: &DynamicValue) -> Option<String> {
        None
    }

    /// Issue the create call and return the new identifier
    async fn create(&self, client: &ServiceClient, config: &DynamicValue) -> Result<String, ApiError>;

    async fn wait_created(
        &self,
        _ctx: &Context,
        _client: &ServiceClient,
        _id: &str,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    /// Fetch the object and write its attributes into `state`
    async fn read(
        &self,
        client: &ServiceClient,
        id: &str,
        state: &mut DynamicValue,
    ) -> Result<(), ApiError>;

    async fn update(
        &self,
        _ctx: &Context,
        _client: &ServiceClient,
        _id: &str,
        _prior: &DynamicValue,
        _planned: &DynamicValue,
    ) -> Result<(), ApiError> {
        Err(ApiError::Config(format!(
            "{} does not support in-place updates",
            Self::TYPE_NAME
        )))
    }

    async fn delete(&self, client: &ServiceClient, id: &str) -> Result<(), ApiError>;

    async fn wait_deleted(
        &self,
        _ctx: &Context,
        _client: &ServiceClient,
        _id: &str,
    ) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct Lifecycle<K: ManagedResource> {
    kind: K,
    provider_data: Option<OpenStackProviderData>,
}

impl<K: ManagedResource> Lifecycle<K> {
    pub fn new() -> Self {
        Self {
            kind: K::default(),
            provider_data: None,
        }
    }

    /// Factory registered with the provider
    pub fn factory() -> Box<dyn ResourceWithConfigure> {
        Box::new(Self::new())
    }

    fn provider_data(&self) -> Result<&OpenStackProviderData, Diagnostic> {
        self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })
    }

    async fn client(&self, data: &OpenStackProviderData, region: &str) -> Result<ServiceClient, Diagnostic> {
        data.client_for(K::SERVICE, K::VERSION, region)
            .await
            .map_err(|e| {
                Diagnostic::error(
                    format!("Error creating OpenStack {} client", K::SERVICE.name()),
                    e.to_string(),
                )
            })
    }

    fn check(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = K::schema().validate(config);
        diagnostics.extend(K::check_config(config));
        diagnostics
    }

    fn api_error(summary: String, e: &ApiError) -> Diagnostic {
        Diagnostic::error(summary, format!("API error: {}", e))
    }
}

#[async_trait]
impl<K: ManagedResource> Resource for Lifecycle<K> {
    fn type_name(&self) -> &str {
        K::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        K::schema()
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: self.check(&request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = self.check(&request.config);
        if has_errors(&diagnostics) {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let data = match self.provider_data() {
            Ok(data) => data,
            Err(d) => {
                diagnostics.push(d);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let region = data
            .config
            .region_for(state::opt_string(&request.config, "region").as_deref());
        let client = match self.client(data, &region).await {
            Ok(client) => client,
            Err(d) => {
                diagnostics.push(d);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let lock = match K::lock_key(&request.config) {
            Some(key) => Some(data.mutex.lock(&key).await),
            None => None,
        };

        tracing::debug!("{}: {:?} -> {:?}", K::TYPE_NAME, ResourceState::Absent, ResourceState::Creating);
        let created = cancellable(&ctx, self.kind.create(&client, &request.config)).await;
        drop(lock);

        let id = match created {
            Ok(id) => id,
            Err(ApiError::Cancelled) => {
                diagnostics.push(Diagnostic::error(
                    format!("Creation of {} was cancelled", K::TYPE_NAME),
                    "The operation was interrupted before OpenStack confirmed the create request",
                ));
                diagnostics.push(Diagnostic::warning(
                    "Possible dangling resource",
                    format!(
                        "The {} may have been created remotely without being recorded in state. \
                         Check OpenStack and import or remove it manually.",
                        K::TYPE_NAME
                    ),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
            Err(e) => {
                diagnostics.push(Self::api_error(
                    format!("Unable to create {}", K::TYPE_NAME),
                    &e,
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let handle = ResourceHandle {
            kind: K::TYPE_NAME,
            id,
            region,
        };
        let mut new_state = request.planned_state;
        state::clear_unknowns(&mut new_state.value);
        if let Err(e) = handle.write_to(&mut new_state) {
            diagnostics.push(Self::api_error(
                format!("Failed to record id of {}", K::TYPE_NAME),
                &e,
            ));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        if let Err(e) = self.kind.wait_created(&ctx, &client, &handle.id).await {
            diagnostics.push(Self::api_error(
                format!("Error waiting for {} {} to become ready", K::TYPE_NAME, handle.id),
                &e,
            ));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }
        handle.transition(ResourceState::Creating, ResourceState::Present);

        if let Err(e) = cancellable(&ctx, self.kind.read(&client, &handle.id, &mut new_state)).await {
            diagnostics.push(Self::api_error(
                format!("Error retrieving {} {} after create", K::TYPE_NAME, handle.id),
                &e,
            ));
        }

        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let data = match self.provider_data() {
            Ok(data) => data,
            Err(d) => {
                diagnostics.push(d);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        let Some(handle) = ResourceHandle::from_state(K::TYPE_NAME, &request.current_state, &data.config)
        else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
            };
        };

        let client = match self.client(data, &handle.region).await {
            Ok(client) => client,
            Err(d) => {
                diagnostics.push(d);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        let mut new_state = request.current_state.clone();
        let result = match handle.write_to(&mut new_state) {
            Ok(()) => cancellable(&ctx, self.kind.read(&client, &handle.id, &mut new_state)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => ReadResourceResponse {
                new_state: Some(new_state),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} {} not found, removing from state", K::TYPE_NAME, handle.id);
                handle.transition(ResourceState::Present, ResourceState::Absent);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                handle.transition(ResourceState::Present, ResourceState::Unknown);
                diagnostics.push(Self::api_error(
                    format!("Error retrieving {} {}", K::TYPE_NAME, handle.id),
                    &e,
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = self.check(&request.config);
        diagnostics.extend(K::check_update(&request.prior_state, &request.planned_state));
        if has_errors(&diagnostics) {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        if !K::UPDATABLE {
            diagnostics.push(Diagnostic::error(
                "Update not supported",
                format!(
                    "{} cannot be updated in place; changing its arguments requires replacement",
                    K::TYPE_NAME
                ),
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let data = match self.provider_data() {
            Ok(data) => data,
            Err(d) => {
                diagnostics.push(d);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let Some(handle) = ResourceHandle::from_state(K::TYPE_NAME, &request.prior_state, &data.config)
        else {
            diagnostics.push(Diagnostic::error(
                "Missing resource id",
                format!("{} has no id in prior state", K::TYPE_NAME),
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        let client = match self.client(data, &handle.region).await {
            Ok(client) => client,
            Err(d) => {
                diagnostics.push(d);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        handle.transition(ResourceState::Present, ResourceState::Updating);
        let updated = cancellable(
            &ctx,
            self.kind.update(
                &ctx,
                &client,
                &handle.id,
                &request.prior_state,
                &request.planned_state,
            ),
        )
        .await;
        if let Err(e) = updated {
            diagnostics.push(Self::api_error(
                format!("Error updating {} {}", K::TYPE_NAME, handle.id),
                &e,
            ));
            // Earlier steps of a multi-call update may already be applied.
            let mut refreshed = request.prior_state.clone();
            let new_state =
                match cancellable(&ctx, self.kind.read(&client, &handle.id, &mut refreshed)).await {
                    Ok(()) => refreshed,
                    Err(read_err) => {
                        tracing::debug!(
                            "Could not refresh {} {} after failed update: {}",
                            K::TYPE_NAME,
                            handle.id,
                            read_err
                        );
                        request.prior_state
                    }
                };
            return UpdateResourceResponse {
                new_state,
                diagnostics,
            };
        }
        handle.transition(ResourceState::Updating, ResourceState::Present);

        let mut new_state = request.planned_state;
        state::clear_unknowns(&mut new_state.value);
        let result = match handle.write_to(&mut new_state) {
            Ok(()) => cancellable(&ctx, self.kind.read(&client, &handle.id, &mut new_state)).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            diagnostics.push(Self::api_error(
                format!("Error retrieving {} {} after update", K::TYPE_NAME, handle.id),
                &e,
            ));
        }

        UpdateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let data = match self.provider_data() {
            Ok(data) => data,
            Err(d) => {
                diagnostics.push(d);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let Some(handle) = ResourceHandle::from_state(K::TYPE_NAME, &request.prior_state, &data.config)
        else {
            return DeleteResourceResponse { diagnostics };
        };

        let client = match self.client(data, &handle.region).await {
            Ok(client) => client,
            Err(d) => {
                diagnostics.push(d);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let _lock = match K::lock_key(&request.prior_state) {
            Some(key) => Some(data.mutex.lock(&key).await),
            None => None,
        };

        handle.transition(ResourceState::Present, ResourceState::Deleting);
        let deleted = check_deleted(cancellable(&ctx, self.kind.delete(&client, &handle.id)).await);
        if let Err(e) = deleted {
            diagnostics.push(Self::api_error(
                format!("Error deleting {} {}", K::TYPE_NAME, handle.id),
                &e,
            ));
            return DeleteResourceResponse { diagnostics };
        }

        if let Err(e) = self.kind.wait_deleted(&ctx, &client, &handle.id).await {
            diagnostics.push(Self::api_error(
                format!("Error waiting for {} {} to delete", K::TYPE_NAME, handle.id),
                &e,
            ));
            return DeleteResourceResponse { diagnostics };
        }

        handle.transition(ResourceState::Deleting, ResourceState::Absent);
        DeleteResourceResponse { diagnostics }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(AttributePath::new("id"), &request, &mut response);
        if has_errors(&response.diagnostics) {
            return response;
        }

        let mut imported = Vec::new();
        for mut resource in std::mem::take(&mut response.imported_resources) {
            let read = self
                .read(
                    ctx.clone(),
                    ReadResourceRequest {
                        type_name: resource.type_name.clone(),
                        current_state: resource.state,
                    },
                )
                .await;
            let failed = has_errors(&read.diagnostics);
            response.diagnostics.extend(read.diagnostics);

            match read.new_state {
                Some(state) if !failed => {
                    resource.state = state;
                    imported.push(resource);
                }
                Some(_) => {}
                None => response.diagnostics.push(Diagnostic::error(
                    "Cannot import non-existent remote object",
                    format!(
                        "{} {} does not exist in OpenStack",
                        K::TYPE_NAME,
                        request.id
                    ),
                )),
            }
        }
        response.imported_resources = imported;
        response
    }
}

#[async_trait]
impl<K: ManagedResource> ResourceWithConfigure for Lifecycle<K> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match extract_provider_data(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(d) => diagnostics.push(d),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, ProviderConfig};
    use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

    fn config() -> Config {
        let env = Environment::from_pairs(&[
            ("OS_AUTH_URL", "http://keystone:5000/v3"),
            ("OS_REGION_NAME", "RegionOne"),
        ]);
        Config::resolve(&ProviderConfig::default(), &env, None).unwrap()
    }

    #[derive(Default)]
    struct Fixed;

    #[async_trait]
    impl ManagedResource for Fixed {
        const TYPE_NAME: &'static str = "openstack_fixed";
        const SERVICE: Service = Service::Network;
        const VERSION: u32 = 2;

        fn schema() -> Schema {
            SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("name", AttributeType::String)
                        .required()
                        .build(),
                )
                .build()
        }

        async fn create(&self, _client: &ServiceClient, _config: &DynamicValue) -> Result<String, ApiError> {
            Ok("fixed-1".to_string())
        }

        async fn read(
            &self,
            _client: &ServiceClient,
            _id: &str,
            _state: &mut DynamicValue,
        ) -> Result<(), ApiError> {
            Ok(())
        }

        async fn delete(&self, _client: &ServiceClient, _id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn named(name: &str) -> DynamicValue {
        let mut state = DynamicValue::object();
        state::set_string(&mut state, "name", name).unwrap();
        state
    }

    #[test]
    fn not_found_counts_as_deleted() {
        assert!(check_deleted(Err(ApiError::NotFound("gone".into()))).is_ok());
        assert!(check_deleted(Ok(())).is_ok());
        assert!(matches!(
            check_deleted(Err(ApiError::Conflict("in use".into()))),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn handle_falls_back_to_provider_region() {
        let config = config();

        let mut state = DynamicValue::object();
        assert_eq!(ResourceHandle::from_state("kind", &state, &config), None);

        state::set_string(&mut state, "id", "r-1").unwrap();
        state::set_string(&mut state, "region", "").unwrap();
        let handle = ResourceHandle::from_state("kind", &state, &config).unwrap();
        assert_eq!(handle.region, "RegionOne");

        state::set_string(&mut state, "region", "RegionTwo").unwrap();
        let handle = ResourceHandle::from_state("kind", &state, &config).unwrap();
        assert_eq!(handle.id, "r-1");
        assert_eq!(handle.region, "RegionTwo");

        let mut written = DynamicValue::object();
        handle.write_to(&mut written).unwrap();
        assert_eq!(state::opt_string(&written, "region").as_deref(), Some("RegionTwo"));
    }

    #[tokio::test]
    async fn invalid_config_stops_create_before_any_call() {
        let lifecycle = Lifecycle::<Fixed>::new();
        let response = lifecycle
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: Fixed::TYPE_NAME.to_string(),
                    planned_state: DynamicValue::object(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(state::opt_string(&response.new_state, "id"), None);
    }

    #[tokio::test]
    async fn unconfigured_create_reports_provider_state() {
        let lifecycle = Lifecycle::<Fixed>::new();
        let response = lifecycle
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: Fixed::TYPE_NAME.to_string(),
                    planned_state: named("a"),
                    config: named("a"),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn fixed_kinds_refuse_in_place_update() {
        let lifecycle = Lifecycle::<Fixed>::new();
        let response = lifecycle
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: Fixed::TYPE_NAME.to_string(),
                    prior_state: named("a"),
                    planned_state: named("b"),
                    config: named("b"),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Update not supported");
        assert_eq!(response.new_state, named("a"));
    }
}
