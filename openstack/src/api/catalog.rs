//! Keystone v3 service catalog

use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

impl Endpoint {
    fn in_region(&self, region: &str) -> bool {
        region.is_empty()
            || self.region.as_deref() == Some(region)
            || self.region_id.as_deref() == Some(region)
    }
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// URL of the first endpoint matching one of `service_types` (in order of
    /// preference), the region and the interface. An empty region matches any.
    pub fn endpoint_for(
        &self,
        service_types: &[&str],
        region: &str,
        interface: &str,
    ) -> Option<String> {
        service_types.iter().find_map(|service_type| {
            self.entries
                .iter()
                .filter(|entry| entry.service_type == *service_type)
                .flat_map(|entry| entry.endpoints.iter())
                .find(|endpoint| endpoint.interface == interface && endpoint.in_region(region))
                .map(|endpoint| endpoint.url.clone())
        })
    }
}
