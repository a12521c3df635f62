//! Volume API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::common::deserialize_timestamp_option;
use crate::api::{ApiError, ServiceClient};

#[derive(Debug, Clone, Deserialize)]
pub struct Volume {
    pub id: String,
    pub status: String,
    pub size: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_timestamp_option")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateVolumeRequest {
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Name and description can change without touching the data
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateVolumeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
struct VolumeEnvelopeOut<'a, T> {
    volume: &'a T,
}

#[derive(Deserialize)]
struct VolumeEnvelope {
    volume: Volume,
}

#[derive(Serialize)]
struct ExtendAction {
    #[serde(rename = "os-extend")]
    extend: ExtendSize,
}

#[derive(Serialize)]
struct ExtendSize {
    new_size: i64,
}

/// Volumes API
pub struct VolumesApi<'a> {
    client: &'a ServiceClient,
}

impl<'a> VolumesApi<'a> {
    pub fn new(client: &'a ServiceClient) -> Self {
        Self { client }
    }

    fn path(id: &str) -> String {
        format!("volumes/{}", urlencoding::encode(id))
    }

    /// POST /volumes
    pub async fn create(&self, request: &CreateVolumeRequest) -> Result<Volume, ApiError> {
        let envelope: VolumeEnvelope = self
            .client
            .post("volumes", &VolumeEnvelopeOut { volume: request })
            .await?;
        Ok(envelope.volume)
    }

    /// GET /volumes/{id}
    pub async fn get(&self, id: &str) -> Result<Volume, ApiError> {
        let envelope: VolumeEnvelope = self.client.get(&Self::path(id)).await?;
        Ok(envelope.volume)
    }

    /// PUT /volumes/{id}
    pub async fn update(&self, id: &str, request: &UpdateVolumeRequest) -> Result<Volume, ApiError> {
        let envelope: VolumeEnvelope = self
            .client
            .put(&Self::path(id), &VolumeEnvelopeOut { volume: request })
            .await?;
        Ok(envelope.volume)
    }

    /// POST /volumes/{id}/action with `os-extend`
    pub async fn extend(&self, id: &str, new_size: i64) -> Result<(), ApiError> {
        self.client
            .post_no_content(
                &format!("{}/action", Self::path(id)),
                &ExtendAction {
                    extend: ExtendSize { new_size },
                },
            )
            .await
    }

    /// DELETE /volumes/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Self::path(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_action_shape() {
        let json = serde_json::to_value(ExtendAction {
            extend: ExtendSize { new_size: 20 },
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"os-extend": {"new_size": 20}}));
    }

    #[test]
    fn volume_without_name_deserializes() {
        let volume: Volume = serde_json::from_value(serde_json::json!({
            "id": "v1",
            "status": "creating",
            "size": 1,
            "name": null,
            "metadata": {},
            "created_at": "2024-05-01T10:00:00.000000"
        }))
        .unwrap();
        assert_eq!(volume.name, None);
        assert_eq!(volume.status, "creating");
        assert!(volume.created_at.is_some());
    }
}
