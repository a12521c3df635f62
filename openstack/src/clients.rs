//! Service client cache
//!
//! One `ServiceClient` per (service, API version, region), built lazily from
//! the session catalog and reused for the provider's lifetime.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::{ApiError, ServiceClient, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Identity,
    Network,
    BlockStorage,
    Workflow,
}

impl Service {
    /// Key used in `endpoint_overrides`
    pub fn name(&self) -> &'static str {
        match self {
            Service::Identity => "identity",
            Service::Network => "network",
            Service::BlockStorage => "volumev3",
            Service::Workflow => "workflowv2",
        }
    }

    /// Catalog types to try, in order
    fn catalog_types(&self) -> &'static [&'static str] {
        match self {
            Service::Identity => &["identity"],
            Service::Network => &["network"],
            Service::BlockStorage => &["volumev3", "block-storage"],
            Service::Workflow => &["workflowv2"],
        }
    }

    fn supported_version(&self) -> u32 {
        match self {
            Service::Identity => 3,
            Service::Network => 2,
            Service::BlockStorage => 3,
            Service::Workflow => 2,
        }
    }

    /// Neutron's catalog entry is unversioned
    fn resource_base(&self) -> &'static str {
        match self {
            Service::Network => "v2.0/",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceClientKey {
    pub service: Service,
    pub version: u32,
    pub region: String,
}

pub struct ClientCache {
    session: Session,
    clients: Mutex<HashMap<ServiceClientKey, ServiceClient>>,
}

impl ClientCache {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn cached(&self, key: &ServiceClientKey) -> Option<ServiceClient> {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    /// Client for `service` at `version` in `region` (provider region when
    /// empty). Identical arguments always yield the same instance.
    pub async fn client_for(
        &self,
        service: Service,
        version: u32,
        region: &str,
    ) -> Result<ServiceClient, ApiError> {
        let config = self.session.config();
        let region = if region.is_empty() {
            config.region.clone()
        } else {
            region.to_string()
        };

        if version != service.supported_version() {
            return Err(ApiError::Config(format!(
                "{} API version {} is not supported",
                service.name(),
                version
            )));
        }

        let key = ServiceClientKey {
            service,
            version,
            region: region.clone(),
        };
        if let Some(client) = self.cached(&key) {
            return Ok(client);
        }

        let endpoint = match config.endpoint_overrides.get(service.name()) {
            Some(url) => {
                tracing::debug!("Using endpoint override for {}: {}", service.name(), url);
                url.clone()
            }
            None => {
                let catalog = self.session.catalog().await?;
                catalog
                    .endpoint_for(
                        service.catalog_types(),
                        &region,
                        config.endpoint_type.as_str(),
                    )
                    .ok_or_else(|| ApiError::ServiceUnavailable {
                        service: service.name().to_string(),
                        region: region.clone(),
                    })?
            }
        };

        let mut endpoint = endpoint;
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        endpoint.push_str(service.resource_base());

        let client = ServiceClient::new(
            service.name(),
            &region,
            &endpoint,
            self.session.clone(),
        )?;

        // A concurrent caller may have inserted first; keep whichever won.
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let client = clients.entry(key).or_insert(client).clone();
        tracing::debug!(
            "Using {} client for region {:?} at {}",
            service.name(),
            region,
            client.base_url()
        );
        Ok(client)
    }
}
