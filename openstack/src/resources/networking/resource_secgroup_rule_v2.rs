//! Neutron security group rule resource
//!
//! Rule changes on one security group are serialized through the provider's
//! `MutexKV`, keyed by the parent group id.

use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberBetween, StringInSlice};

use crate::api::networking::{CreateSecurityGroupRuleRequest, SecurityGroupRule};
use crate::api::{ApiError, ServiceClient};
use crate::clients::Service;
use crate::lifecycle::ManagedResource;
use crate::state;
use crate::waiter::{wait_for, WaitSpec, DELETED};

const DELETE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Default)]
pub struct SecGroupRuleV2;

fn port_attribute(name: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::Number)
        .optional()
        .computed()
        .force_new()
        .validator(NumberBetween {
            min: 0.0,
            max: 65535.0,
        })
        .build()
}

impl SecGroupRuleV2 {
    fn create_request(config: &DynamicValue) -> CreateSecurityGroupRuleRequest {
        CreateSecurityGroupRuleRequest {
            direction: state::opt_string(config, "direction").unwrap_or_default(),
            ethertype: state::opt_string(config, "ethertype").unwrap_or_default(),
            security_group_id: state::opt_string(config, "security_group_id").unwrap_or_default(),
            protocol: state::opt_string(config, "protocol"),
            port_range_min: state::opt_i64(config, "port_range_min"),
            port_range_max: state::opt_i64(config, "port_range_max"),
            remote_ip_prefix: state::opt_string(config, "remote_ip_prefix"),
            remote_group_id: state::opt_string(config, "remote_group_id"),
            description: state::opt_string(config, "description"),
            tenant_id: state::opt_string(config, "tenant_id"),
        }
    }

    fn write_state(rule: SecurityGroupRule, state: &mut DynamicValue) -> Result<(), ApiError> {
        state::set_string(state, "direction", rule.direction)?;
        state::set_string(state, "ethertype", rule.ethertype)?;
        state::set_string(state, "security_group_id", rule.security_group_id)?;
        state::set_opt_string(state, "protocol", rule.protocol)?;
        state::set_opt_i64(state, "port_range_min", rule.port_range_min)?;
        state::set_opt_i64(state, "port_range_max", rule.port_range_max)?;
        state::set_opt_string(state, "remote_ip_prefix", rule.remote_ip_prefix)?;
        state::set_opt_string(state, "remote_group_id", rule.remote_group_id)?;
        state::set_opt_string(state, "description", rule.description)?;
        state::set_opt_string(state, "tenant_id", rule.tenant_id)
    }
}

#[async_trait]
impl ManagedResource for SecGroupRuleV2 {
    const TYPE_NAME: &'static str = "openstack_networking_secgroup_rule_v2";
    const SERVICE: Service = Service::Network;
    const VERSION: u32 = 2;

    fn schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a V2 neutron security group rule")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("direction", AttributeType::String)
                    .description("ingress or egress")
                    .required()
                    .force_new()
                    .validator(StringInSlice::new(&["ingress", "egress"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ethertype", AttributeType::String)
                    .description("IPv4 or IPv6")
                    .required()
                    .force_new()
                    .validator(StringInSlice::new(&["IPv4", "IPv6"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("protocol", AttributeType::String)
                    .description("IP protocol name or number; all protocols when unset")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(port_attribute("port_range_min"))
            .attribute(port_attribute("port_range_max"))
            .attribute(
                AttributeBuilder::new("remote_ip_prefix", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .conflicts_with(&["remote_group_id"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("remote_group_id", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .conflicts_with(&["remote_ip_prefix"])
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("security_group_id", AttributeType::String)
                    .description("Security group the rule belongs to")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tenant_id", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .build()
    }

    fn check_config(config: &DynamicValue) -> Vec<Diagnostic> {
        match (
            state::opt_i64(config, "port_range_min"),
            state::opt_i64(config, "port_range_max"),
        ) {
            (Some(min), Some(max)) if min > max => vec![Diagnostic::error(
                "Invalid port range",
                format!("port_range_min ({}) must not exceed port_range_max ({})", min, max),
            )
            .with_attribute(AttributePath::new("port_range_min"))],
            _ => vec![],
        }
    }

    fn lock_key(state: &DynamicValue) -> Option<String> {
        state::opt_string(state, "security_group_id")
    }

    async fn create(&self, client: &ServiceClient, config: &DynamicValue) -> Result<String, ApiError> {
        let request = Self::create_request(config);
        tracing::debug!("{} create options: {:?}", Self::TYPE_NAME, request);
        let rule = client.security_group_rules().create(&request).await?;
        Ok(rule.id)
    }

    async fn read(
        &self,
        client: &ServiceClient,
        id: &str,
        state: &mut DynamicValue,
    ) -> Result<(), ApiError> {
        let rule = client.security_group_rules().get(id).await?;
        tracing::debug!("Retrieved {} {}: {:?}", Self::TYPE_NAME, id, rule);
        Self::write_state(rule, state)
    }

    async fn delete(&self, client: &ServiceClient, id: &str) -> Result<(), ApiError> {
        client.security_group_rules().delete(id).await
    }

    async fn wait_deleted(
        &self,
        ctx: &Context,
        client: &ServiceClient,
        id: &str,
    ) -> Result<(), ApiError> {
        let spec = WaitSpec::new(&["ACTIVE"], &[DELETED], DELETE_TIMEOUT)
            .max_retries(client.max_retries());

        wait_for(ctx, &spec, move || async move {
            match client.security_group_rules().get(id).await {
                Ok(_) => Ok(((), "ACTIVE".to_string())),
                Err(e) if e.is_not_found() => Ok(((), DELETED.to_string())),
                Err(e) => Err(e),
            }
        })
        .await
    }
}
