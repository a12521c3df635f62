pub mod resource_cron_trigger_v2;
pub mod resource_workbook_v2;
pub mod resource_workflow_v2;

pub use resource_cron_trigger_v2::CronTriggerV2;
pub use resource_workbook_v2::WorkbookV2;
pub use resource_workflow_v2::WorkflowV2;
