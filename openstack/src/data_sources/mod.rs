pub mod data_source_blockstorage_snapshot_v3;
pub mod data_source_workflow_cron_trigger_v2;
pub mod data_source_workflow_workflow_v2;

pub use data_source_blockstorage_snapshot_v3::SnapshotV3DataSource;
pub use data_source_workflow_cron_trigger_v2::CronTriggerV2DataSource;
pub use data_source_workflow_workflow_v2::WorkflowV2DataSource;

use tfplug::types::Diagnostic;

pub(crate) const NO_RESULTS: &str =
    "Your query returned no results. Please change your search criteria and try again";
pub(crate) const MULTIPLE_RESULTS: &str =
    "Your query returned more than one result. Please try a more specific search criteria";

/// Exactly one match, or a diagnostic naming what went wrong
pub(crate) fn single_result<T: std::fmt::Debug>(kind: &str, mut items: Vec<T>) -> Result<T, Diagnostic> {
    match items.len() {
        0 => Err(Diagnostic::error(NO_RESULTS, format!("No {} matched the query", kind))),
        1 => Ok(items.remove(0)),
        n => {
            tracing::debug!("Multiple {} results found: {:?}", kind, items);
            Err(Diagnostic::error(
                MULTIPLE_RESULTS,
                format!("{} {} objects matched the query", n, kind),
            ))
        }
    }
}
