//! Handler dispatch.
//!
//! Runs a workflow kind's handlers against one finished unit, in priority
//! order, and folds their verdicts into a single [`DispatchReport`].

use super::registry::{HandlerContext, HandlerEntry};
use super::verdict::HandlerVerdict;
use crate::domain::{ExitCode, InputSnapshot, LoopState, Outcome, SubmissionUnit};

/// Verdict of one evaluated handler.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedVerdict {
    pub handler: String,
    pub priority: i32,
    pub verdict: HandlerVerdict,
}

/// Folded result of a dispatch pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    /// Verdicts in evaluation order
    pub evaluated: Vec<EvaluatedVerdict>,
    /// At least one handler recognized the failure
    pub handled: bool,
    /// A handler asked to skip the rest of the chain
    pub stopped_early: bool,
    /// Snapshot for the next submission
    pub snapshot: InputSnapshot,
    /// Exit code of the last verdict that carried one
    pub exit_code: Option<ExitCode>,
}

impl DispatchReport {
    /// Names of handlers whose verdict was `is_handled`.
    pub fn fired(&self) -> Vec<&str> {
        self.evaluated
            .iter()
            .filter(|e| e.verdict.is_handled)
            .map(|e| e.handler.as_str())
            .collect()
    }
}

/// Evaluate `entries` (already priority ordered) against a finished unit.
///
/// Each handler sees the snapshot as left by the handlers before it, so the
/// last verdict carrying a snapshot decides what is submitted next.
pub fn dispatch(
    entries: &[&HandlerEntry],
    workflow_id: &str,
    unit: &SubmissionUnit,
    outcome: &Outcome,
    state: &LoopState,
    current: &InputSnapshot,
) -> DispatchReport {
    let mut pending = current.clone();
    let mut evaluated = Vec::with_capacity(entries.len());
    let mut handled = false;
    let mut stopped_early = false;
    let mut exit_code = None;

    for entry in entries {
        let verdict = {
            let ctx = HandlerContext {
                workflow_id,
                unit,
                outcome,
                state,
                pending: &pending,
            };
            entry.handler.classify(&ctx)
        };

        handled |= verdict.is_handled;
        if let Some(snapshot) = &verdict.mutated_snapshot {
            pending = snapshot.clone();
        }
        if let Some(code) = &verdict.exit_code {
            exit_code = Some(code.clone());
        }
        let stop = verdict.stop_further_handlers;

        evaluated.push(EvaluatedVerdict {
            handler: entry.name().to_string(),
            priority: entry.priority,
            verdict,
        });

        if stop {
            stopped_early = true;
            break;
        }
    }

    DispatchReport {
        evaluated,
        handled,
        stopped_early,
        snapshot: pending,
        exit_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UnitHandle;
    use crate::handlers::HandlerRegistry;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn failed_unit() -> (SubmissionUnit, Outcome) {
        let unit = SubmissionUnit::new(UnitHandle::new("calc-1"), 1, InputSnapshot::new());
        let outcome = Outcome::FailedCleanly {
            warnings: BTreeSet::from([1]),
            outputs: Default::default(),
        };
        (unit, outcome)
    }

    fn run(registry: &HandlerRegistry) -> DispatchReport {
        let (unit, outcome) = failed_unit();
        let state = LoopState::new(5);
        let entries = registry.lookup("calc");
        dispatch(&entries, "wf-1", &unit, &outcome, &state, &InputSnapshot::new())
    }

    #[test]
    fn test_empty_chain_is_unhandled() {
        let report = run(&HandlerRegistry::new());
        assert!(!report.handled);
        assert!(report.evaluated.is_empty());
        assert!(report.exit_code.is_none());
    }

    #[test]
    fn test_handlers_see_previous_edits() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("calc", 200, "first", |ctx| {
            HandlerVerdict::handled(ctx.pending.with("a", json!(1)))
        });
        registry.register_fn("calc", 100, "second", |ctx| {
            assert_eq!(ctx.pending.get("a"), Some(&json!(1)));
            HandlerVerdict::handled(ctx.pending.with("b", json!(2)))
        });

        let report = run(&registry);
        assert!(report.handled);
        assert_eq!(report.snapshot.slot_names(), vec!["a", "b"]);
        assert_eq!(report.fired(), vec!["first", "second"]);
    }

    #[test]
    fn test_stop_further_handlers() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("calc", 200, "stopper", |ctx| {
            HandlerVerdict::handled(ctx.pending.with("stopped", json!(true))).stop()
        });
        registry.register_fn("calc", 100, "never", |_| panic!("must not run"));

        let report = run(&registry);
        assert!(report.stopped_early);
        assert_eq!(report.evaluated.len(), 1);
    }

    #[test]
    fn test_last_exit_code_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("calc", 300, "a", |_| HandlerVerdict {
            exit_code: Some(ExitCode::custom(400, "A", "a")),
            ..HandlerVerdict::not_handled()
        });
        registry.register_fn("calc", 200, "b", |_| HandlerVerdict {
            is_handled: true,
            exit_code: Some(ExitCode::custom(401, "B", "b")),
            ..HandlerVerdict::not_handled()
        });
        registry.register_fn("calc", 100, "c", |_| HandlerVerdict::not_handled());

        let report = run(&registry);
        assert!(report.handled);
        assert_eq!(report.exit_code.map(|c| c.status()), Some(401));
    }

    #[test]
    fn test_unhandled_verdicts_keep_snapshot() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("calc", 100, "miss", |_| HandlerVerdict::not_handled());
        let report = run(&registry);
        assert!(!report.handled);
        assert!(report.snapshot.is_empty());
        assert_eq!(report.evaluated.len(), 1);
    }

    #[test]
    fn test_dispatch_is_deterministic() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("calc", 10, "x", |ctx| HandlerVerdict::handled(ctx.pending.with("x", json!(1))));
        registry.register_fn("calc", 10, "y", |ctx| HandlerVerdict::handled(ctx.pending.with("x", json!(2))));

        let first = run(&registry);
        let second = run(&registry);
        assert_eq!(first, second);
        assert_eq!(first.snapshot.get("x"), Some(&json!(2)));
    }
}
