//! Snapshot API implementation

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::api::common::{deserialize_timestamp_option, ApiQueryParams};
use crate::api::{ApiError, ServiceClient};

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub status: String,
    pub size: i64,
    pub volume_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_timestamp_option")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotListFilter {
    pub name: Option<String>,
    pub status: Option<String>,
    pub volume_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotList {
    #[serde(default)]
    snapshots: Vec<Snapshot>,
}

/// Snapshots API
pub struct SnapshotsApi<'a> {
    client: &'a ServiceClient,
}

impl<'a> SnapshotsApi<'a> {
    pub fn new(client: &'a ServiceClient) -> Self {
        Self { client }
    }

    /// GET /snapshots/detail
    pub async fn list(&self, filter: &SnapshotListFilter) -> Result<Vec<Snapshot>, ApiError> {
        let params = ApiQueryParams::new()
            .add_optional("name", filter.name.as_ref())
            .add_optional("status", filter.status.as_ref())
            .add_optional("volume_id", filter.volume_id.as_ref());
        let list: SnapshotList = self.client.get_with_params("snapshots/detail", &params).await?;
        Ok(list.snapshots)
    }
}

/// Newest snapshot by `created_at`; snapshots without a timestamp sort first
pub fn most_recent(snapshots: Vec<Snapshot>) -> Option<Snapshot> {
    snapshots.into_iter().max_by_key(|s| s.created_at)
}
