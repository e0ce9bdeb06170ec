//! Reference handlers for the base workflow.
//!
//! Both handlers turn a clean failure into a restart from the previous state
//! by pointing the next submission at the finished unit's remote folder.
//! Geometry non-convergence runs first because it also replaces the
//! structure, an edit the SCF handler never makes.

use log::warn;

use super::registry::{ErrorHandler, HandlerContext, HandlerRegistry};
use super::verdict::HandlerVerdict;
use crate::domain::{BASE_WORKFLOW_KIND, InputSnapshot, Outcome, slots};

/// Warning codes declared by the external program.
pub mod warning_codes {
    pub const SCF_NOT_CONVERGED: i32 = 410;
    pub const GEOMETRY_NOT_CONVERGED: i32 = 420;
}

/// Output names the reference handlers read.
pub mod outputs {
    pub const OUTPUT_PARAMETERS: &str = "output_parameters";
    pub const OUTPUT_STRUCTURE: &str = "output_structure";
    pub const REMOTE_FOLDER: &str = "remote_folder";
    /// Flag inside `output_parameters`
    pub const VARIABLE_GEOMETRY: &str = "variable_geometry";
}

pub const GEOMETRY_HANDLER_PRIORITY: i32 = 130;
pub const SCF_HANDLER_PRIORITY: i32 = 120;

/// Point `snapshot` at the unit's persistent output area.
fn with_parent_folder(snapshot: InputSnapshot, outcome: &Outcome, ctx: &HandlerContext<'_>) -> InputSnapshot {
    match outcome.output(outputs::REMOTE_FOLDER) {
        Some(folder) => snapshot.with(slots::PARENT_CALC_FOLDER, folder.clone()),
        None => {
            warn!(
                "[{}] unit {} has no '{}' output; next submission starts from scratch",
                ctx.workflow_id,
                ctx.unit.handle,
                outputs::REMOTE_FOLDER
            );
            snapshot
        }
    }
}

/// Geometry convergence was not reached: carry forward the last geometry and
/// restart from the previous state.
pub struct GeometryNotConvergedHandler;

impl ErrorHandler for GeometryNotConvergedHandler {
    fn name(&self) -> &str {
        "geometry_not_converged"
    }

    fn classify(&self, ctx: &HandlerContext<'_>) -> HandlerVerdict {
        let outcome = ctx.outcome;
        if !outcome.has_warning(warning_codes::GEOMETRY_NOT_CONVERGED) {
            return HandlerVerdict::not_handled();
        }

        let variable_geometry = outcome
            .output(outputs::OUTPUT_PARAMETERS)
            .and_then(|p| p.get(outputs::VARIABLE_GEOMETRY))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let mut snapshot = ctx.pending.clone();
        if variable_geometry {
            match outcome.output(outputs::OUTPUT_STRUCTURE) {
                Some(structure) => snapshot = snapshot.with(slots::STRUCTURE, structure.clone()),
                None => warn!(
                    "[{}] unit {} flags variable geometry but produced no '{}'; keeping the current structure",
                    ctx.workflow_id,
                    ctx.unit.handle,
                    outputs::OUTPUT_STRUCTURE
                ),
            }
        }
        let snapshot = with_parent_folder(snapshot, outcome, ctx);

        HandlerVerdict::handled(snapshot).with_message(format!(
            "unit {} did not reach geometry convergence. Will restart.",
            ctx.unit.handle
        ))
    }
}

/// SCF convergence was not reached: restart from the previous state without
/// touching any other input.
pub struct ScfNotConvergedHandler;

impl ErrorHandler for ScfNotConvergedHandler {
    fn name(&self) -> &str {
        "scf_not_converged"
    }

    fn classify(&self, ctx: &HandlerContext<'_>) -> HandlerVerdict {
        if !ctx.outcome.has_warning(warning_codes::SCF_NOT_CONVERGED) {
            return HandlerVerdict::not_handled();
        }

        let snapshot = with_parent_folder(ctx.pending.clone(), ctx.outcome, ctx);
        HandlerVerdict::handled(snapshot).with_message(format!(
            "unit {} did not achieve scf convergence. Will restart.",
            ctx.unit.handle
        ))
    }
}

/// Register the reference handlers for the base workflow kind.
pub fn register_builtin(registry: &mut HandlerRegistry) {
    registry.register(BASE_WORKFLOW_KIND, GEOMETRY_HANDLER_PRIORITY, GeometryNotConvergedHandler);
    registry.register(BASE_WORKFLOW_KIND, SCF_HANDLER_PRIORITY, ScfNotConvergedHandler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LoopState, SubmissionUnit, UnitHandle, UnitOutputs};
    use serde_json::{Value, json};
    use std::collections::BTreeSet;

    fn clean_failure(warnings: &[i32], outputs: Vec<(&str, Value)>) -> Outcome {
        Outcome::FailedCleanly {
            warnings: warnings.iter().copied().collect::<BTreeSet<i32>>(),
            outputs: outputs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<UnitOutputs>(),
        }
    }

    fn classify(handler: &dyn ErrorHandler, outcome: &Outcome, pending: &InputSnapshot) -> HandlerVerdict {
        let unit = SubmissionUnit::new(UnitHandle::new("calc-5"), 1, pending.clone());
        let state = LoopState::new(5);
        let ctx = HandlerContext {
            workflow_id: "wf-test",
            unit: &unit,
            outcome,
            state: &state,
            pending,
        };
        handler.classify(&ctx)
    }

    fn pending() -> InputSnapshot {
        InputSnapshot::new().set(slots::STRUCTURE, json!("initial"))
    }

    #[test]
    fn test_geometry_handler_carries_structure_and_folder() {
        let outcome = clean_failure(
            &[warning_codes::GEOMETRY_NOT_CONVERGED],
            vec![
                ("output_parameters", json!({"variable_geometry": true})),
                ("output_structure", json!("relaxed")),
                ("remote_folder", json!("remote-5")),
            ],
        );
        let verdict = classify(&GeometryNotConvergedHandler, &outcome, &pending());

        assert!(verdict.is_handled);
        assert!(!verdict.stop_further_handlers);
        assert!(verdict.exit_code.is_none());
        let snapshot = verdict.mutated_snapshot.unwrap();
        assert_eq!(snapshot.get(slots::STRUCTURE), Some(&json!("relaxed")));
        assert_eq!(snapshot.get(slots::PARENT_CALC_FOLDER), Some(&json!("remote-5")));
    }

    #[test]
    fn test_geometry_handler_fixed_geometry_keeps_structure() {
        let outcome = clean_failure(
            &[warning_codes::GEOMETRY_NOT_CONVERGED],
            vec![
                ("output_parameters", json!({"variable_geometry": false})),
                ("output_structure", json!("relaxed")),
                ("remote_folder", json!("remote-5")),
            ],
        );
        let snapshot = classify(&GeometryNotConvergedHandler, &outcome, &pending())
            .mutated_snapshot
            .unwrap();
        assert_eq!(snapshot.get(slots::STRUCTURE), Some(&json!("initial")));
    }

    #[test]
    fn test_geometry_handler_missing_structure_is_noop() {
        let outcome = clean_failure(
            &[warning_codes::GEOMETRY_NOT_CONVERGED],
            vec![
                ("output_parameters", json!({"variable_geometry": true})),
                ("remote_folder", json!("remote-5")),
            ],
        );
        let verdict = classify(&GeometryNotConvergedHandler, &outcome, &pending());
        assert!(verdict.is_handled);
        let snapshot = verdict.mutated_snapshot.unwrap();
        assert_eq!(snapshot.get(slots::STRUCTURE), Some(&json!("initial")));
        assert!(snapshot.contains(slots::PARENT_CALC_FOLDER));
    }

    #[test]
    fn test_geometry_handler_ignores_other_warnings() {
        let outcome = clean_failure(&[warning_codes::SCF_NOT_CONVERGED], vec![]);
        let verdict = classify(&GeometryNotConvergedHandler, &outcome, &pending());
        assert!(!verdict.is_handled);
        assert!(verdict.mutated_snapshot.is_none());
    }

    #[test]
    fn test_scf_handler_only_sets_parent_folder() {
        let outcome = clean_failure(
            &[warning_codes::SCF_NOT_CONVERGED],
            vec![
                ("output_structure", json!("should-not-be-used")),
                ("remote_folder", json!("remote-9")),
            ],
        );
        let verdict = classify(&ScfNotConvergedHandler, &outcome, &pending());
        assert!(verdict.is_handled);
        let snapshot = verdict.mutated_snapshot.unwrap();
        assert_eq!(snapshot.get(slots::STRUCTURE), Some(&json!("initial")));
        assert_eq!(snapshot.get(slots::PARENT_CALC_FOLDER), Some(&json!("remote-9")));
    }

    #[test]
    fn test_scf_handler_without_remote_folder() {
        let outcome = clean_failure(&[warning_codes::SCF_NOT_CONVERGED], vec![]);
        let verdict = classify(&ScfNotConvergedHandler, &outcome, &pending());
        assert!(verdict.is_handled);
        assert_eq!(verdict.mutated_snapshot, Some(pending()));
    }
}
