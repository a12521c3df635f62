//! Security group rule API implementation

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ServiceClient};

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityGroupRule {
    pub id: String,
    pub direction: String,
    pub ethertype: String,
    pub security_group_id: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub port_range_min: Option<i64>,
    #[serde(default)]
    pub port_range_max: Option<i64>,
    #[serde(default)]
    pub remote_ip_prefix: Option<String>,
    #[serde(default)]
    pub remote_group_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateSecurityGroupRuleRequest {
    pub direction: String,
    pub ethertype: String,
    pub security_group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Serialize)]
struct CreateEnvelope<'a> {
    security_group_rule: &'a CreateSecurityGroupRuleRequest,
}

#[derive(Deserialize)]
struct RuleEnvelope {
    security_group_rule: SecurityGroupRule,
}

/// Security group rules API
pub struct SecurityGroupRulesApi<'a> {
    client: &'a ServiceClient,
}

impl<'a> SecurityGroupRulesApi<'a> {
    pub fn new(client: &'a ServiceClient) -> Self {
        Self { client }
    }

    /// POST /v2.0/security-group-rules
    pub async fn create(
        &self,
        request: &CreateSecurityGroupRuleRequest,
    ) -> Result<SecurityGroupRule, ApiError> {
        let envelope: RuleEnvelope = self
            .client
            .post(
                "security-group-rules",
                &CreateEnvelope {
                    security_group_rule: request,
                },
            )
            .await?;
        Ok(envelope.security_group_rule)
    }

    /// GET /v2.0/security-group-rules/{id}
    pub async fn get(&self, id: &str) -> Result<SecurityGroupRule, ApiError> {
        let envelope: RuleEnvelope = self
            .client
            .get(&format!("security-group-rules/{}", urlencoding::encode(id)))
            .await?;
        Ok(envelope.security_group_rule)
    }

    /// DELETE /v2.0/security-group-rules/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("security-group-rules/{}", urlencoding::encode(id)))
            .await
    }
}
