//! `clouds.yaml` profiles
//!
//! Only the subset of os-client-config keys this provider consumes is
//! modelled; unknown keys are ignored.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::Environment;
use crate::api::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudsFile {
    #[serde(default)]
    pub clouds: HashMap<String, CloudProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudProfile {
    #[serde(default)]
    pub auth: CloudAuth,
    pub auth_type: Option<String>,
    pub region_name: Option<String>,
    pub interface: Option<String>,
    /// `verify: false` disables certificate verification
    pub verify: Option<bool>,
    pub cacert: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudAuth {
    pub auth_url: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub user_domain_name: Option<String>,
    pub user_domain_id: Option<String>,
    pub project_domain_name: Option<String>,
    pub project_domain_id: Option<String>,
    pub domain_id: Option<String>,
    pub domain_name: Option<String>,
    pub application_credential_id: Option<String>,
    pub application_credential_name: Option<String>,
    pub application_credential_secret: Option<String>,
    pub system_scope: Option<String>,
}

impl CloudsFile {
    pub fn parse(contents: &str) -> Result<Self, ApiError> {
        serde_yaml::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Failed to parse clouds.yaml: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }

    /// Candidate locations, most specific first
    pub fn search_paths(env: &Environment) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(explicit) = env.get("OS_CLIENT_CONFIG_FILE") {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("clouds.yaml"));
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("openstack").join("clouds.yaml"));
        }
        paths.push(PathBuf::from("/etc/openstack/clouds.yaml"));
        paths
    }

    /// Load the first `clouds.yaml` that exists, if any
    pub fn discover(env: &Environment) -> Result<Option<Self>, ApiError> {
        for path in Self::search_paths(env) {
            if path.is_file() {
                tracing::debug!("Loading cloud profiles from {}", path.display());
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }

    pub fn cloud(&self, name: &str) -> Option<&CloudProfile> {
        self.clouds.get(name)
    }
}
