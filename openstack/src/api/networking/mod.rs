//! Networking (Neutron) v2.0 API

pub mod secgroup_rules;

pub use secgroup_rules::{CreateSecurityGroupRuleRequest, SecurityGroupRule, SecurityGroupRulesApi};

use super::ServiceClient;

impl ServiceClient {
    /// Security group rule operations
    pub fn security_group_rules(&self) -> SecurityGroupRulesApi<'_> {
        SecurityGroupRulesApi::new(self)
    }
}
