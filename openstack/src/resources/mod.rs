//! Managed resource kinds, each driven by `Lifecycle`

pub mod blockstorage;
pub mod networking;
pub mod workflow;

pub use blockstorage::VolumeV3;
pub use networking::SecGroupRuleV2;
pub use workflow::{CronTriggerV2, WorkbookV2, WorkflowV2};
