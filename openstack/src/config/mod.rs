//! Credential resolution
//!
//! Every field is resolved independently: explicit provider configuration
//! first, then environment variables, then the selected `clouds.yaml`
//! profile, then a built-in default.

pub mod clouds;

pub use clouds::{CloudAuth, CloudProfile, CloudsFile};

use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use crate::api::ApiError;

/// Provider block as written by the user. `None` means not configured.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub auth_url: Option<String>,
    pub region: Option<String>,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
    pub application_credential_id: Option<String>,
    pub application_credential_name: Option<String>,
    pub application_credential_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub user_domain_name: Option<String>,
    pub user_domain_id: Option<String>,
    pub project_domain_name: Option<String>,
    pub project_domain_id: Option<String>,
    pub domain_id: Option<String>,
    pub domain_name: Option<String>,
    pub default_domain: Option<String>,
    pub system_scope: Option<bool>,
    pub insecure: Option<bool>,
    pub endpoint_type: Option<String>,
    pub cacert_file: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub cloud: Option<String>,
    pub max_retries: Option<u32>,
    pub endpoint_overrides: HashMap<String, String>,
    pub disable_no_cache_header: Option<bool>,
    pub delayed_auth: Option<bool>,
    pub allow_reauth: Option<bool>,
    pub enable_logging: Option<bool>,
}

fn string_attr(config: &DynamicValue, name: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
}

fn bool_attr(config: &DynamicValue, name: &str) -> Option<bool> {
    config.get_bool(&AttributePath::new(name)).ok()
}

impl ProviderConfig {
    /// Decode the provider block. Null and unknown attributes stay `None`.
    pub fn from_dynamic(config: &DynamicValue) -> Self {
        let endpoint_overrides = match config.get(&AttributePath::new("endpoint_overrides")) {
            Some(Dynamic::Map(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            _ => HashMap::new(),
        };

        Self {
            auth_url: string_attr(config, "auth_url"),
            region: string_attr(config, "region"),
            user_name: string_attr(config, "user_name"),
            user_id: string_attr(config, "user_id"),
            application_credential_id: string_attr(config, "application_credential_id"),
            application_credential_name: string_attr(config, "application_credential_name"),
            application_credential_secret: string_attr(config, "application_credential_secret"),
            tenant_id: string_attr(config, "tenant_id"),
            tenant_name: string_attr(config, "tenant_name"),
            password: string_attr(config, "password"),
            token: string_attr(config, "token"),
            user_domain_name: string_attr(config, "user_domain_name"),
            user_domain_id: string_attr(config, "user_domain_id"),
            project_domain_name: string_attr(config, "project_domain_name"),
            project_domain_id: string_attr(config, "project_domain_id"),
            domain_id: string_attr(config, "domain_id"),
            domain_name: string_attr(config, "domain_name"),
            default_domain: string_attr(config, "default_domain"),
            system_scope: bool_attr(config, "system_scope"),
            insecure: bool_attr(config, "insecure"),
            endpoint_type: string_attr(config, "endpoint_type"),
            cacert_file: string_attr(config, "cacert_file"),
            cert: string_attr(config, "cert"),
            key: string_attr(config, "key"),
            cloud: string_attr(config, "cloud"),
            max_retries: config
                .get_number(&AttributePath::new("max_retries"))
                .ok()
                .map(|n| n.max(0.0) as u32),
            endpoint_overrides,
            disable_no_cache_header: bool_attr(config, "disable_no_cache_header"),
            delayed_auth: bool_attr(config, "delayed_auth"),
            allow_reauth: bool_attr(config, "allow_reauth"),
            enable_logging: bool_attr(config, "enable_logging"),
        }
    }
}

/// Snapshot of environment variables consulted during resolution
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            vars: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Value of `name` when set and non-empty
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// First non-empty value among `names`
    pub fn first(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|n| self.get(n)).map(|v| v.to_string())
    }

    fn first_bool(&self, names: &[&str]) -> Option<bool> {
        self.first(names).and_then(|v| parse_bool(&v))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" => Some(true),
        "0" | "f" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Keystone catalog interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointInterface {
    Public,
    Internal,
    Admin,
}

impl EndpointInterface {
    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value {
            "public" | "publicURL" => Ok(Self::Public),
            "internal" | "internalURL" => Ok(Self::Internal),
            "admin" | "adminURL" => Ok(Self::Admin),
            other => Err(ApiError::Config(format!(
                "Invalid endpoint type provided: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Admin => "admin",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Password {
        password: String,
    },
    Token {
        token: String,
    },
    ApplicationCredential {
        id: Option<String>,
        name: Option<String>,
        secret: String,
    },
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { .. } => f.write_str("Password"),
            Self::Token { .. } => f.write_str("Token"),
            Self::ApplicationCredential { id, name, .. } => f
                .debug_struct("ApplicationCredential")
                .field("id", id)
                .field("name", name)
                .finish(),
        }
    }
}

/// Normalized credential set, immutable once resolved
#[derive(Debug, Clone)]
pub struct Config {
    pub auth_url: String,
    pub region: String,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub user_domain_name: Option<String>,
    pub user_domain_id: Option<String>,
    pub project_domain_name: Option<String>,
    pub project_domain_id: Option<String>,
    pub domain_id: Option<String>,
    pub domain_name: Option<String>,
    pub default_domain: String,
    pub system_scope: bool,
    pub auth: AuthMethod,
    pub insecure: bool,
    pub cacert_file: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub endpoint_type: EndpointInterface,
    pub endpoint_overrides: HashMap<String, String>,
    pub max_retries: u32,
    pub delayed_auth: bool,
    pub allow_reauth: bool,
    pub enable_logging: bool,
    pub disable_no_cache_header: bool,
    pub terraform_version: String,
}

/// explicit -> env -> cloud profile
fn pick(explicit: &Option<String>, env: Option<String>, cloud: Option<&String>) -> Option<String> {
    explicit
        .clone()
        .or(env)
        .or_else(|| cloud.filter(|s| !s.is_empty()).cloned())
}

fn pick_bool(explicit: Option<bool>, env: Option<bool>, cloud: Option<bool>) -> Option<bool> {
    explicit.or(env).or(cloud)
}

impl Config {
    pub fn resolve(
        explicit: &ProviderConfig,
        env: &Environment,
        clouds: Option<&CloudsFile>,
    ) -> Result<Self, ApiError> {
        let cloud_name = explicit.cloud.clone().or_else(|| env.first(&["OS_CLOUD"]));
        let profile = match &cloud_name {
            Some(name) => {
                let profile = clouds.and_then(|c| c.cloud(name)).ok_or_else(|| {
                    ApiError::Auth(format!("cloud {} does not exist in clouds.yaml", name))
                })?;
                Some(profile.clone())
            }
            None => None,
        };
        let profile = profile.unwrap_or_default();
        let auth = &profile.auth;

        let auth_url = pick(&explicit.auth_url, env.first(&["OS_AUTH_URL"]), auth.auth_url.as_ref())
            .ok_or_else(|| {
                ApiError::Auth(
                    "One of 'auth_url' or 'cloud' must be specified (or set OS_AUTH_URL)"
                        .to_string(),
                )
            })?;

        let region = pick(
            &explicit.region,
            env.first(&["OS_REGION_NAME"]),
            profile.region_name.as_ref(),
        )
        .unwrap_or_default();

        let user_name = pick(&explicit.user_name, env.first(&["OS_USERNAME"]), auth.username.as_ref());
        let user_id = pick(&explicit.user_id, env.first(&["OS_USER_ID"]), auth.user_id.as_ref());
        let tenant_id = pick(
            &explicit.tenant_id,
            env.first(&["OS_TENANT_ID", "OS_PROJECT_ID"]),
            auth.project_id.as_ref(),
        );
        let tenant_name = pick(
            &explicit.tenant_name,
            env.first(&["OS_TENANT_NAME", "OS_PROJECT_NAME"]),
            auth.project_name.as_ref(),
        );
        let password = pick(&explicit.password, env.first(&["OS_PASSWORD"]), auth.password.as_ref());
        let token = pick(
            &explicit.token,
            env.first(&["OS_TOKEN", "OS_AUTH_TOKEN"]),
            auth.token.as_ref(),
        );
        let app_cred_id = pick(
            &explicit.application_credential_id,
            env.first(&["OS_APPLICATION_CREDENTIAL_ID"]),
            auth.application_credential_id.as_ref(),
        );
        let app_cred_name = pick(
            &explicit.application_credential_name,
            env.first(&["OS_APPLICATION_CREDENTIAL_NAME"]),
            auth.application_credential_name.as_ref(),
        );
        let app_cred_secret = pick(
            &explicit.application_credential_secret,
            env.first(&["OS_APPLICATION_CREDENTIAL_SECRET"]),
            auth.application_credential_secret.as_ref(),
        );

        let mut user_domain_name = pick(
            &explicit.user_domain_name,
            env.first(&["OS_USER_DOMAIN_NAME"]),
            auth.user_domain_name.as_ref(),
        );
        let mut user_domain_id = pick(
            &explicit.user_domain_id,
            env.first(&["OS_USER_DOMAIN_ID"]),
            auth.user_domain_id.as_ref(),
        );
        let mut project_domain_name = pick(
            &explicit.project_domain_name,
            env.first(&["OS_PROJECT_DOMAIN_NAME"]),
            auth.project_domain_name.as_ref(),
        );
        let mut project_domain_id = pick(
            &explicit.project_domain_id,
            env.first(&["OS_PROJECT_DOMAIN_ID"]),
            auth.project_domain_id.as_ref(),
        );
        let domain_id = pick(&explicit.domain_id, env.first(&["OS_DOMAIN_ID"]), auth.domain_id.as_ref());
        let domain_name = pick(
            &explicit.domain_name,
            env.first(&["OS_DOMAIN_NAME"]),
            auth.domain_name.as_ref(),
        );
        let default_domain = pick(&explicit.default_domain, env.first(&["OS_DEFAULT_DOMAIN"]), None)
            .unwrap_or_else(|| "default".to_string());

        let no_scoped_domain = user_domain_name.is_none()
            && user_domain_id.is_none()
            && project_domain_name.is_none()
            && project_domain_id.is_none();
        if no_scoped_domain {
            if let Some(id) = &domain_id {
                user_domain_id = Some(id.clone());
                project_domain_id = Some(id.clone());
            } else if let Some(name) = &domain_name {
                user_domain_name = Some(name.clone());
                project_domain_name = Some(name.clone());
            } else {
                user_domain_id = Some(default_domain.clone());
                project_domain_id = Some(default_domain.clone());
            }
        }

        let auth_method = if let Some(token) = token {
            AuthMethod::Token { token }
        } else if app_cred_id.is_some() || app_cred_name.is_some() {
            let secret = app_cred_secret.ok_or_else(|| {
                ApiError::Auth("application_credential_secret is required".to_string())
            })?;
            if app_cred_id.is_none() && user_name.is_none() && user_id.is_none() {
                return Err(ApiError::Auth(
                    "application_credential_name requires user_name or user_id".to_string(),
                ));
            }
            AuthMethod::ApplicationCredential {
                id: app_cred_id,
                name: app_cred_name,
                secret,
            }
        } else {
            AuthMethod::Password {
                password: password.unwrap_or_default(),
            }
        };

        let system_scope = pick_bool(
            explicit.system_scope,
            env.first_bool(&["OS_SYSTEM_SCOPE"]),
            auth.system_scope.as_deref().map(|s| s == "all"),
        )
        .unwrap_or(false);

        let insecure = pick_bool(
            explicit.insecure,
            env.first_bool(&["OS_INSECURE"]),
            profile.verify.map(|verify| !verify),
        )
        .unwrap_or(false);

        let endpoint_type = match pick(
            &explicit.endpoint_type,
            env.first(&["OS_ENDPOINT_TYPE"]),
            profile.interface.as_ref(),
        ) {
            Some(value) => EndpointInterface::parse(&value)?,
            None => EndpointInterface::Public,
        };

        let enable_logging = explicit.enable_logging.unwrap_or(false) || tf_log_forces_debug(env);

        Ok(Self {
            auth_url,
            region,
            user_name,
            user_id,
            tenant_id,
            tenant_name,
            user_domain_name,
            user_domain_id,
            project_domain_name,
            project_domain_id,
            domain_id,
            domain_name,
            default_domain,
            system_scope,
            auth: auth_method,
            insecure,
            cacert_file: pick(&explicit.cacert_file, env.first(&["OS_CACERT"]), profile.cacert.as_ref()),
            cert: pick(&explicit.cert, env.first(&["OS_CERT"]), profile.cert.as_ref()),
            key: pick(&explicit.key, env.first(&["OS_KEY"]), profile.key.as_ref()),
            endpoint_type,
            endpoint_overrides: explicit.endpoint_overrides.clone(),
            max_retries: explicit.max_retries.unwrap_or(0),
            delayed_auth: pick_bool(explicit.delayed_auth, env.first_bool(&["OS_DELAYED_AUTH"]), None)
                .unwrap_or(true),
            allow_reauth: pick_bool(explicit.allow_reauth, env.first_bool(&["OS_ALLOW_REAUTH"]), None)
                .unwrap_or(true),
            enable_logging,
            disable_no_cache_header: explicit.disable_no_cache_header.unwrap_or(false),
            terraform_version: String::new(),
        })
    }

    /// Region of a resource: its own `region` attribute, else the provider's
    pub fn region_for(&self, resource_region: Option<&str>) -> String {
        resource_region
            .filter(|r| !r.is_empty())
            .map(|r| r.to_string())
            .unwrap_or_else(|| self.region.clone())
    }
}

/// TF_LOG=DEBUG/TRACE turns on HTTP logging unless OS_DEBUG is set
fn tf_log_forces_debug(env: &Environment) -> bool {
    let verbose = env
        .get("TF_LOG")
        .map(|level| matches!(level.to_ascii_uppercase().as_str(), "DEBUG" | "TRACE"))
        .unwrap_or(false);
    verbose && env.get("OS_DEBUG").is_none()
}
