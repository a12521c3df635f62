pub mod api;
pub mod clients;
pub mod config;
pub mod data_sources;
pub mod lifecycle;
pub mod logging;
pub mod mutexkv;
pub mod provider_data;
pub mod resources;
pub mod state;
pub mod verify;
pub mod waiter;

pub use provider_data::OpenStackProviderData;

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceFactory;
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse, Provider};
use tfplug::resource::ResourceFactory;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::Diagnostic;

use crate::api::{ApiError, Session};
use crate::config::{CloudsFile, Config, Environment, ProviderConfig};
use crate::lifecycle::{Lifecycle, ManagedResource};
use crate::resources::{CronTriggerV2, SecGroupRuleV2, VolumeV3, WorkbookV2, WorkflowV2};

#[derive(Default)]
pub struct OpenStackProvider {
    /// Process environment when `None`
    environment: Option<Environment>,
    provider_data: Option<OpenStackProviderData>,
}

impl OpenStackProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve credentials against `environment` instead of the process env
    pub fn with_environment(environment: Environment) -> Self {
        Self {
            environment: Some(environment),
            provider_data: None,
        }
    }

    pub fn provider_data(&self) -> Option<&OpenStackProviderData> {
        self.provider_data.as_ref()
    }

    fn resolve_config(&self, request: &ConfigureProviderRequest) -> Result<Config, ApiError> {
        let environment = self
            .environment
            .clone()
            .unwrap_or_else(Environment::from_process);
        let explicit = ProviderConfig::from_dynamic(&request.config);

        let clouds = if explicit.cloud.is_some() || environment.get("OS_CLOUD").is_some() {
            CloudsFile::discover(&environment)?
        } else {
            None
        };

        let mut config = Config::resolve(&explicit, &environment, clouds.as_ref())?;
        config.terraform_version = request.terraform_version.clone();
        Ok(config)
    }
}

fn register<K: ManagedResource>(factories: &mut HashMap<String, ResourceFactory>) {
    factories.insert(K::TYPE_NAME.to_string(), Lifecycle::<K>::factory);
}

fn string_attr(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .build()
}

fn secret_attr(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .sensitive()
        .build()
}

fn bool_attr(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::Bool)
        .description(description)
        .optional()
        .build()
}

#[async_trait]
impl Provider for OpenStackProvider {
    fn type_name(&self) -> &str {
        "openstack"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("OpenStack provider")
            .attribute(string_attr("auth_url", "Identity service URL (OS_AUTH_URL)"))
            .attribute(string_attr("region", "Default region (OS_REGION_NAME)"))
            .attribute(string_attr("user_name", "Username (OS_USERNAME)"))
            .attribute(string_attr("user_id", "User ID (OS_USER_ID)"))
            .attribute(string_attr(
                "application_credential_id",
                "Application credential ID (OS_APPLICATION_CREDENTIAL_ID)",
            ))
            .attribute(string_attr(
                "application_credential_name",
                "Application credential name (OS_APPLICATION_CREDENTIAL_NAME)",
            ))
            .attribute(secret_attr(
                "application_credential_secret",
                "Application credential secret (OS_APPLICATION_CREDENTIAL_SECRET)",
            ))
            .attribute(string_attr("tenant_id", "Project ID (OS_TENANT_ID / OS_PROJECT_ID)"))
            .attribute(string_attr(
                "tenant_name",
                "Project name (OS_TENANT_NAME / OS_PROJECT_NAME)",
            ))
            .attribute(secret_attr("password", "Password (OS_PASSWORD)"))
            .attribute(secret_attr("token", "Existing token (OS_TOKEN / OS_AUTH_TOKEN)"))
            .attribute(string_attr("user_domain_name", "User domain name (OS_USER_DOMAIN_NAME)"))
            .attribute(string_attr("user_domain_id", "User domain ID (OS_USER_DOMAIN_ID)"))
            .attribute(string_attr(
                "project_domain_name",
                "Project domain name (OS_PROJECT_DOMAIN_NAME)",
            ))
            .attribute(string_attr(
                "project_domain_id",
                "Project domain ID (OS_PROJECT_DOMAIN_ID)",
            ))
            .attribute(string_attr("domain_id", "Domain ID for user and project (OS_DOMAIN_ID)"))
            .attribute(string_attr(
                "domain_name",
                "Domain name for user and project (OS_DOMAIN_NAME)",
            ))
            .attribute(string_attr(
                "default_domain",
                "Domain ID used when no other domain is given (OS_DEFAULT_DOMAIN)",
            ))
            .attribute(bool_attr("system_scope", "Request a system-scoped token (OS_SYSTEM_SCOPE)"))
            .attribute(bool_attr("insecure", "Skip TLS verification (OS_INSECURE)"))
            .attribute(string_attr(
                "endpoint_type",
                "Catalog interface: public, internal or admin (OS_ENDPOINT_TYPE)",
            ))
            .attribute(string_attr("cacert_file", "CA bundle, path or PEM (OS_CACERT)"))
            .attribute(string_attr("cert", "Client certificate, path or PEM (OS_CERT)"))
            .attribute(secret_attr("key", "Client key, path or PEM (OS_KEY)"))
            .attribute(string_attr("cloud", "Entry in clouds.yaml (OS_CLOUD)"))
            .attribute(
                AttributeBuilder::new("max_retries", AttributeType::Number)
                    .description("Retries for transient API errors")
                    .optional()
                    .validator(tfplug::validator::NumberBetween {
                        min: 0.0,
                        max: 100.0,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "endpoint_overrides",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description("Service endpoints used instead of the catalog, keyed by service")
                .optional()
                .build(),
            )
            .attribute(bool_attr(
                "disable_no_cache_header",
                "Do not send Cache-Control: no-cache",
            ))
            .attribute(bool_attr(
                "delayed_auth",
                "Authenticate on first use instead of at configure (OS_DELAYED_AUTH)",
            ))
            .attribute(bool_attr(
                "allow_reauth",
                "Re-authenticate when the token expires (OS_ALLOW_REAUTH)",
            ))
            .attribute(bool_attr("enable_logging", "Log API requests and responses"))
            .build()
    }

    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = self.schema().validate(&request.config);
        if tfplug::types::has_errors(&diagnostics) {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        }

        let config = match self.resolve_config(&request) {
            Ok(config) => config,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Invalid OpenStack provider configuration",
                    e.to_string(),
                ));
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        logging::init(config.enable_logging);
        tracing::debug!("Configuring OpenStack provider for {}", config.auth_url);

        let delayed_auth = config.delayed_auth;
        let session = match Session::new(Arc::new(config)) {
            Ok(session) => session,
            Err(e) => {
                diagnostics.push(Diagnostic::error("Failed to create API client", e.to_string()));
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        if !delayed_auth {
            let authenticated = match ctx.run(session.authenticate()).await {
                Ok(result) => result,
                Err(e) => Err(ApiError::from(e)),
            };
            if let Err(e) = authenticated {
                diagnostics.push(Diagnostic::error(
                    "Error authenticating with OpenStack",
                    e.to_string(),
                ));
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        }

        let data = OpenStackProviderData::new(session);
        self.provider_data = Some(data.clone());
        ConfigureProviderResponse {
            diagnostics,
            provider_data: Some(Arc::new(data) as Arc<dyn Any + Send + Sync>),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories = HashMap::new();
        register::<CronTriggerV2>(&mut factories);
        register::<WorkflowV2>(&mut factories);
        register::<WorkbookV2>(&mut factories);
        register::<SecGroupRuleV2>(&mut factories);
        register::<VolumeV3>(&mut factories);
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "openstack_workflow_cron_trigger_v2".to_string(),
            data_sources::CronTriggerV2DataSource::factory,
        );
        factories.insert(
            "openstack_workflow_workflow_v2".to_string(),
            data_sources::WorkflowV2DataSource::factory,
        );
        factories.insert(
            "openstack_blockstorage_snapshot_v3".to_string(),
            data_sources::SnapshotV3DataSource::factory,
        );
        factories
    }
}
