//! Termination cleanup of remote working areas.

use log::warn;
use serde_json::json;

use crate::domain::{UnitHandle, WorkflowRecord, event_types};
use crate::engine::HostEngine;

/// Clean the remote resources of every unit the workflow submitted.
///
/// Runs at most once per record and only when `clean_workdir` is set.
/// Failures, including folders that are already gone, are recorded as
/// warnings and never fail the workflow.
pub async fn clean_workdir<E: HostEngine + ?Sized>(engine: &E, record: &mut WorkflowRecord) {
    if !record.clean_workdir || record.cleaned {
        return;
    }

    let handles: Vec<UnitHandle> = record.submitted_units().map(|u| u.handle.clone()).collect();
    let mut cleaned = Vec::with_capacity(handles.len());

    for handle in handles {
        match engine.clean_remote_resources(&handle).await {
            Ok(()) => cleaned.push(handle),
            Err(e) => {
                let message = format!("could not clean remote folder of {}: {}", handle, e);
                warn!("[{}] {}", record.id, message);
                record.diagnostics.push(message.clone());
                record.report(
                    event_types::CLEANUP_WARNING,
                    message,
                    json!({"handle": handle, "kind": format!("{:?}", e.kind())}),
                );
            }
        }
    }

    record.cleaned = true;
    let listed = cleaned.iter().map(UnitHandle::as_str).collect::<Vec<_>>().join(", ");
    record.report(
        event_types::CLEANUP_DONE,
        format!("cleaned remote folders of calculations: {}", listed),
        json!({"cleaned": cleaned}),
    );
}
