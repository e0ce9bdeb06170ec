//! The restart loop.
//!
//! Each pass submits one unit from the current snapshot, suspends until it is
//! terminal, classifies the outcome and decides whether to stop or go round
//! again. The workflow record is checkpointed before every suspension and
//! after every decision, so a loop can be resumed from storage without
//! resubmitting a unit that is already in flight.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::cleanup::clean_workdir;
use super::collector::ResultCollector;
use crate::config::WorkflowDefaults;
use crate::domain::{
    ExitCode, LoopOutcome, LoopPhase, Outcome, SubmissionUnit, WorkflowContract, WorkflowInputs, WorkflowRecord,
    event_types,
};
use crate::engine::HostEngine;
use crate::error::Result;
use crate::handlers::{HandlerRegistry, dispatch};
use crate::setup::{InputPreparer, PrepareError};
use crate::storage::{Storage, WorkflowStore};

/// Decision taken at the end of a pass.
enum Pass {
    Continue,
    Stop(LoopOutcome),
}

/// Drives one workflow kind against a host engine.
pub struct RestartLoop<E, S>
where
    E: HostEngine,
    S: Storage,
{
    engine: Arc<E>,
    registry: Arc<HandlerRegistry>,
    contract: WorkflowContract,
    store: Arc<WorkflowStore<S>>,
    preparer: Arc<dyn InputPreparer>,
    defaults: WorkflowDefaults,
    cancel: CancellationToken,
}

impl<E, S> RestartLoop<E, S>
where
    E: HostEngine,
    S: Storage,
{
    pub fn new(
        engine: Arc<E>,
        registry: Arc<HandlerRegistry>,
        contract: WorkflowContract,
        store: Arc<WorkflowStore<S>>,
        preparer: Arc<dyn InputPreparer>,
    ) -> Self {
        Self {
            engine,
            registry,
            contract,
            store,
            preparer,
            defaults: WorkflowDefaults::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Defaults for `max_iterations` and `clean_workdir` when inputs omit them.
    pub fn with_defaults(mut self, defaults: WorkflowDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Stop the loop when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this loop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn contract(&self) -> &WorkflowContract {
        &self.contract
    }

    /// Create a workflow from `inputs` and run it to termination.
    pub async fn start(&self, inputs: WorkflowInputs) -> Result<WorkflowRecord> {
        let max_iterations = inputs.effective_max_iterations(&self.defaults);
        let clean = inputs.effective_clean_workdir(&self.defaults);
        let mut record = WorkflowRecord::new(self.contract.kind.clone(), inputs, max_iterations, clean);
        record.report(
            event_types::WORKFLOW_CREATED,
            format!("created {} workflow, max {} iterations", record.kind, max_iterations),
            json!({"max_iterations": max_iterations, "clean_workdir": clean}),
        );

        let prepared = if max_iterations == 0 {
            Err(PrepareError::InvalidInput {
                slot: "max_iterations".to_string(),
                reason: "must be greater than zero".to_string(),
            })
        } else {
            self.preparer.prepare(&self.contract, &record.inputs)
        };

        match prepared {
            Ok(snapshot) => record.snapshot = snapshot,
            Err(e) => {
                warn!("[{}] inputs rejected: {}", record.id, e);
                record.diagnostics.push(e.to_string());
                return self.terminate(record, LoopOutcome::Failed { exit_code: e.exit_code() }).await;
            }
        }

        self.store.save(&record)?;
        self.drive(record).await
    }

    /// Continue a persisted workflow. A terminal record is returned unchanged
    /// apart from any cleanup still owed.
    pub async fn resume(&self, id: &str) -> Result<WorkflowRecord> {
        let mut record = self.store.load(id)?;
        if record.is_terminal() {
            if record.clean_workdir && !record.cleaned {
                clean_workdir(self.engine.as_ref(), &mut record).await;
                self.store.save(&record)?;
            }
            return Ok(record);
        }

        let in_flight = record.in_flight.as_ref().map(|u| u.handle.to_string());
        record.report(
            event_types::WORKFLOW_RESUMED,
            format!("resumed at iteration {} ({:?})", record.state.iteration, record.state.phase),
            json!({"iteration": record.state.iteration, "in_flight": in_flight}),
        );
        self.store.save(&record)?;
        self.drive(record).await
    }

    async fn drive(&self, mut record: WorkflowRecord) -> Result<WorkflowRecord> {
        loop {
            let pass = if record.in_flight.is_some() {
                self.await_in_flight(&mut record).await?
            } else if self.cancel.is_cancelled() {
                Pass::Stop(LoopOutcome::Aborted)
            } else if record.state.phase == LoopPhase::AwaitingTerminal {
                // Suspended with nothing to wait for
                Pass::Stop(LoopOutcome::Failed {
                    exit_code: ExitCode::IterationReturnedNoCalculation,
                })
            } else if !record.state.should_submit() {
                Pass::Stop(LoopOutcome::Failed {
                    exit_code: ExitCode::MaximumIterationsExceeded,
                })
            } else {
                self.submit(&mut record).await?
            };

            match pass {
                Pass::Continue => self.store.save(&record)?,
                Pass::Stop(outcome) => return self.terminate(record, outcome).await,
            }
        }
    }

    /// Submit step. Either leaves a unit in flight or takes the
    /// submission-failure path.
    async fn submit(&self, record: &mut WorkflowRecord) -> Result<Pass> {
        record.state.iteration += 1;
        record.state.phase = LoopPhase::Submitting;
        let iteration = record.state.iteration;
        let fingerprint = record.snapshot.fingerprint();
        let repeated = record.units.last().is_some_and(|u| u.fingerprint == fingerprint);

        record.report(
            event_types::ITERATION_LAUNCHED,
            format!(
                "launching {} iteration #{}{}",
                record.kind,
                iteration,
                if repeated { " with unchanged inputs" } else { "" }
            ),
            json!({"iteration": iteration, "fingerprint": fingerprint}),
        );

        match self.engine.submit(&record.kind, &record.snapshot).await {
            Ok(handle) => {
                debug!("[{}] iteration {} submitted as {}", record.id, iteration, handle);
                record.in_flight = Some(SubmissionUnit::new(handle, iteration, record.snapshot.clone()));
                record.state.phase = LoopPhase::AwaitingTerminal;
                Ok(Pass::Continue)
            }
            Err(e) => Ok(self.submission_failure(record, &e.to_string())),
        }
    }

    /// Suspension point: wait for the in-flight unit or for cancellation.
    async fn await_in_flight(&self, record: &mut WorkflowRecord) -> Result<Pass> {
        let Some(handle) = record.in_flight.as_ref().map(|u| u.handle.clone()) else {
            return Ok(Pass::Continue);
        };
        record.state.phase = LoopPhase::AwaitingTerminal;

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            outcome = self.engine.await_terminal(&handle) => Some(outcome?),
        };

        match outcome {
            Some(outcome) => self.classify(record, outcome).await,
            None => {
                info!("[{}] cancellation requested while waiting for {}", record.id, handle);
                if let Err(e) = self.engine.cancel(&handle).await {
                    warn!("[{}] failed to cancel {}: {}", record.id, handle, e);
                }
                if let Some(unit) = record.in_flight.take() {
                    record.units.push(unit);
                }
                Ok(Pass::Stop(LoopOutcome::Aborted))
            }
        }
    }

    /// Classify the terminal outcome of the in-flight unit.
    async fn classify(&self, record: &mut WorkflowRecord, outcome: Outcome) -> Result<Pass> {
        record.state.phase = LoopPhase::Classifying;
        let Some(mut unit) = record.in_flight.take() else {
            return Ok(Pass::Stop(LoopOutcome::Failed {
                exit_code: ExitCode::IterationReturnedNoCalculation,
            }));
        };
        unit.record_outcome(outcome.clone());
        record.units.push(unit.clone());
        record.report(
            event_types::UNIT_TERMINAL,
            format!("calculation {} terminated: {}", unit.handle, outcome.label()),
            json!({"handle": unit.handle, "iteration": unit.iteration, "outcome": outcome.label()}),
        );

        match &outcome {
            Outcome::Success { .. } => {
                if !self.engine.is_finished_ok(&unit.handle).await? {
                    return Ok(Pass::Stop(LoopOutcome::Failed {
                        exit_code: ExitCode::UnexpectedCalculationState,
                    }));
                }
                record.state.mark_success(unit);
                Ok(Pass::Stop(LoopOutcome::Finished))
            }
            Outcome::SubmissionFailed => Ok(self.submission_failure(record, "the engine could not launch the unit")),
            Outcome::FailedCleanly { .. } | Outcome::CrashedOrTimedOut => {
                if record.state.iterations_exhausted() {
                    return Ok(Pass::Stop(LoopOutcome::Failed {
                        exit_code: ExitCode::MaximumIterationsExceeded,
                    }));
                }
                record.state.consecutive_submission_failures = false;
                Ok(self.run_handlers(record, &unit, &outcome))
            }
        }
    }

    fn run_handlers(&self, record: &mut WorkflowRecord, unit: &SubmissionUnit, outcome: &Outcome) -> Pass {
        let entries = self.registry.lookup(&record.kind);
        if entries.is_empty() {
            return self.unhandled_failure(record, unit, "no calculation error handlers were registered");
        }
        if outcome.declared_warnings().is_none() {
            return self.unhandled_failure(record, unit, "the calculation declared no warnings to inspect");
        }

        let report = dispatch(&entries, &record.id, unit, outcome, &record.state, &record.snapshot);
        record.state.phase = LoopPhase::Deciding;

        for evaluated in report.evaluated.iter().filter(|e| e.verdict.is_handled) {
            let message = evaluated
                .verdict
                .message
                .clone()
                .unwrap_or_else(|| format!("{} handled calculation {}", evaluated.handler, unit.handle));
            record.report(
                event_types::HANDLER_FIRED,
                message,
                json!({"handler": evaluated.handler, "priority": evaluated.priority}),
            );
        }

        if !report.handled {
            return self.unhandled_failure(record, unit, "no handler recognized the failure");
        }
        if let Some(exit_code) = report.exit_code {
            return Pass::Stop(LoopOutcome::Failed { exit_code });
        }
        record.snapshot = report.snapshot;
        Pass::Continue
    }

    fn submission_failure(&self, record: &mut WorkflowRecord, reason: &str) -> Pass {
        record.state.phase = LoopPhase::Deciding;
        if record.state.consecutive_submission_failures {
            return Pass::Stop(LoopOutcome::Failed {
                exit_code: ExitCode::SecondConsecutiveSubmissionFailure,
            });
        }
        record.state.consecutive_submission_failures = true;
        record.report(
            event_types::SUBMISSION_FAILED,
            format!("iteration #{} failed to submit, restarting once more: {}", record.state.iteration, reason),
            json!({"iteration": record.state.iteration, "reason": reason}),
        );
        Pass::Continue
    }

    fn unhandled_failure(&self, record: &mut WorkflowRecord, unit: &SubmissionUnit, reason: &str) -> Pass {
        record.state.phase = LoopPhase::Deciding;
        if record.state.consecutive_unexpected_failures {
            return Pass::Stop(LoopOutcome::Failed {
                exit_code: ExitCode::SecondConsecutiveUnhandledFailure,
            });
        }
        record.state.consecutive_unexpected_failures = true;
        record.report(
            event_types::FAILURE_UNHANDLED,
            format!("calculation {} failed for an unknown reason, restarting once more: {}", unit.handle, reason),
            json!({"handle": unit.handle, "reason": reason}),
        );
        Pass::Continue
    }

    /// Record the result, collect outputs on success, clean up, checkpoint.
    async fn terminate(&self, mut record: WorkflowRecord, outcome: LoopOutcome) -> Result<WorkflowRecord> {
        match &outcome {
            LoopOutcome::Finished => {
                record.state.phase = LoopPhase::Finished;
                ResultCollector::new(&self.contract).apply(&mut record);
                let iteration = record.state.last_good_unit.as_ref().map_or(0, |u| u.iteration);
                record.report(
                    event_types::WORKFLOW_FINISHED,
                    format!("workflow finished after iteration #{}", iteration),
                    json!({"iteration": iteration, "outputs": record.outputs.keys().collect::<Vec<_>>()}),
                );
            }
            LoopOutcome::Failed { exit_code } => {
                record.state.phase = LoopPhase::Failed;
                let (status, symbol, message) = exit_code.triple();
                record.report(
                    event_types::EXIT_CODE,
                    exit_code.to_string(),
                    json!({"status": status, "symbol": symbol, "message": message}),
                );
            }
            LoopOutcome::Aborted => {
                record.state.phase = LoopPhase::Aborted;
                record.report(event_types::WORKFLOW_ABORTED, "workflow aborted by cancellation", json!({}));
            }
        }
        record.result = Some(outcome);

        clean_workdir(self.engine.as_ref(), &mut record).await;
        self.store.save(&record)?;
        Ok(record)
    }
}
