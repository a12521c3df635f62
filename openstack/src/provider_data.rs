//! Provider data structure passed to resources and data sources

use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

use crate::api::{ApiError, ServiceClient, Session};
use crate::clients::{ClientCache, Service};
use crate::config::Config;
use crate::mutexkv::MutexKV;

/// Everything shared by the resources of one configured provider
#[derive(Clone)]
pub struct OpenStackProviderData {
    pub config: Arc<Config>,
    pub clients: Arc<ClientCache>,
    pub mutex: Arc<MutexKV>,
}

impl OpenStackProviderData {
    pub fn new(session: Session) -> Self {
        Self {
            config: session.config().clone(),
            clients: Arc::new(ClientCache::new(session)),
            mutex: Arc::new(MutexKV::new()),
        }
    }

    pub async fn client_for(
        &self,
        service: Service,
        version: u32,
        region: &str,
    ) -> Result<ServiceClient, ApiError> {
        self.clients.client_for(service, version, region).await
    }
}

/// Recover provider data handed to a resource or data source by `configure`
pub fn extract_provider_data(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<OpenStackProviderData, Diagnostic> {
    let data = provider_data.ok_or_else(|| {
        Diagnostic::error(
            "No provider data",
            "No provider data was provided to the resource",
        )
    })?;

    data.downcast_ref::<OpenStackProviderData>()
        .cloned()
        .ok_or_else(|| {
            Diagnostic::error(
                "Invalid provider data",
                "Failed to extract OpenStackProviderData from provider data",
            )
        })
}
