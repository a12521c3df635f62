pub mod resource_secgroup_rule_v2;

pub use resource_secgroup_rule_v2::SecGroupRuleV2;
