//! Harvest orchestrator - fans sweeps out over entities and requests
//!
//! Every fetch of a run, whatever entity it belongs to, first takes a permit
//! from one admission semaphore sized by `max-concurrent-fetches`. Within an
//! entity all planned requests are dispatched at once and their outcomes are
//! folded into the entity's merger one at a time, in arrival order.

use crate::config::HarvestConfig;
use crate::extract::{PageExtractor, ReviewPageExtractor};
use crate::fetch::{FetchClient, FetchOutcome};
use crate::harvest::progress::{HarvestEvent, ProgressReporter, ResolvedAs, TracingReporter};
use crate::harvest::report::HarvestReport;
use crate::merge::AggregateMerger;
use crate::output::AggregateWriter;
use crate::request::{EntityId, RequestPlanner, RequestSpec};
use crate::state::EntityState;
use crate::storage::{CheckpointRecord, CheckpointStore, CompletionSink};
use crate::HarvestError;
use futures::stream::{self, FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Drives entity sweeps from planning to checkpoint
pub struct HarvestOrchestrator {
    client: Arc<FetchClient>,
    planner: RequestPlanner,
    extractor: Arc<dyn PageExtractor>,
    checkpoints: Arc<dyn CheckpointStore>,
    sink: Arc<dyn CompletionSink>,
    writer: AggregateWriter,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
    admission: Semaphore,
    entity_window: usize,
    failure_tolerance: u32,
    run_id: Option<i64>,
}

impl HarvestOrchestrator {
    /// Creates an orchestrator with the review page extractor and tracing progress
    pub fn new(
        config: &HarvestConfig,
        client: Arc<FetchClient>,
        checkpoints: Arc<dyn CheckpointStore>,
        sink: Arc<dyn CompletionSink>,
        writer: AggregateWriter,
    ) -> Self {
        let max_fetches = config.max_concurrent_fetches.max(1) as usize;

        Self {
            client,
            planner: RequestPlanner::from_config(config),
            extractor: Arc::new(ReviewPageExtractor::new()),
            checkpoints,
            sink,
            writer,
            reporter: Arc::new(TracingReporter::default()),
            cancel: CancellationToken::new(),
            admission: Semaphore::new(max_fetches),
            entity_window: max_fetches,
            failure_tolerance: config.failure_tolerance,
            run_id: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Cancelling `cancel` stops new fetches; in-flight fetches run to completion
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run recorded on every checkpoint written
    pub fn with_run_id(mut self, run_id: i64) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn planner(&self) -> &RequestPlanner {
        &self.planner
    }

    /// Harvests every entity in `entities`
    ///
    /// Repeated identifiers are harvested once, at their first position.
    /// Per-request failures never abort the run. An error writing an aggregate
    /// or a checkpoint does: remaining sweeps are cancelled and the first such
    /// error is returned.
    pub async fn run(&self, entities: Vec<EntityId>) -> Result<HarvestReport, HarvestError> {
        let mut seen = HashSet::new();
        let entities: Vec<EntityId> = entities
            .into_iter()
            .filter(|entity| seen.insert(entity.clone()))
            .collect();

        self.reporter.report(HarvestEvent::RunStarted {
            entities: entities.len(),
        });

        let fetch_stats_before = self.client.stats();
        let run_cancel = self.cancel.child_token();
        let cancel = &run_cancel;

        let mut sweeps = stream::iter(entities)
            .map(move |entity| async move {
                let result = self.harvest_entity(&entity, cancel).await;
                (entity, result)
            })
            .buffer_unordered(self.entity_window);

        let mut report = HarvestReport::default();
        let mut fatal = None;

        while let Some((entity, result)) = sweeps.next().await {
            match result {
                Ok(entity_report) => report.merge(&entity_report),
                Err(e) => {
                    tracing::error!(entity = %entity, error = %e, "Aborting harvest");
                    run_cancel.cancel();
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
            }
        }

        self.client.flush().await;

        if let Some(e) = fatal {
            return Err(e);
        }

        report.record_fetch_stats(fetch_stats_before, self.client.stats());

        Ok(report)
    }

    /// Runs one entity through its lifecycle and reports what happened to it
    async fn harvest_entity(
        &self,
        entity: &EntityId,
        cancel: &CancellationToken,
    ) -> Result<HarvestReport, HarvestError> {
        let mut report = HarvestReport::default();
        let mut state = EntityState::Pending;

        if cancel.is_cancelled() {
            state = self.transition(entity, state, EntityState::Cancelled)?;
            report.record_state(state);
            return Ok(report);
        }

        if self.checkpoints.is_complete(entity)? {
            state = self.transition(entity, state, EntityState::Skipped)?;
            report.record_state(state);
            return Ok(report);
        }

        state = self.transition(entity, state, EntityState::InFlight)?;

        let specs = self.planner.plan_entity(entity);
        let planned = specs.len();
        self.reporter.report(HarvestEvent::EntityPlanned {
            entity: entity.clone(),
            requests: planned,
        });

        let mut merger = AggregateMerger::new(entity.clone());
        let mut resolved = 0;

        let mut pending: FuturesUnordered<_> = specs
            .into_iter()
            .map(|spec| self.dispatch(spec, cancel))
            .collect();

        while let Some(result) = pending.next().await {
            let Some((spec, outcome)) = result else {
                continue;
            };
            resolved += 1;

            report.record_outcome(&outcome);
            self.reporter.report(HarvestEvent::RequestResolved {
                request: spec.clone(),
                outcome: ResolvedAs::of(&outcome),
            });

            match outcome {
                FetchOutcome::Success { body, .. } => {
                    merger.merge(&spec, self.extractor.extract(&body));
                }
                other => merger.record_outcome(&spec, &other),
            }
        }

        if resolved < planned {
            state = self.transition(entity, state, EntityState::Cancelled)?;
            report.record_state(state);
            return Ok(report);
        }

        let aggregate = merger.finalize();
        let finished = EntityState::for_failures(aggregate.failure_count(), self.failure_tolerance);

        self.writer.write(&aggregate)?;
        self.checkpoints.mark_complete(&CheckpointRecord::new(
            entity.clone(),
            finished,
            aggregate.failure_count() as u64,
            aggregate.review_count() as u64,
            self.run_id,
        ))?;
        self.sink.acknowledge(entity)?;

        state = self.transition(entity, state, finished)?;
        self.reporter.report(HarvestEvent::EntityFinished {
            entity: entity.clone(),
            state,
            reviews: aggregate.review_count(),
            failures: aggregate.failure_count(),
        });
        report.record_state(state);

        Ok(report)
    }

    /// Fetches `spec` once a permit is free, unless the run is cancelled first
    async fn dispatch(
        &self,
        spec: RequestSpec,
        cancel: &CancellationToken,
    ) -> Option<(RequestSpec, FetchOutcome)> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            permit = self.admission.acquire() => permit.ok()?,
        };

        if cancel.is_cancelled() {
            return None;
        }

        let outcome = self.client.fetch(&spec).await;
        drop(permit);

        Some((spec, outcome))
    }

    fn transition(
        &self,
        entity: &EntityId,
        from: EntityState,
        to: EntityState,
    ) -> Result<EntityState, HarvestError> {
        if !from.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition { from, to });
        }

        self.reporter.report(HarvestEvent::EntityTransition {
            entity: entity.clone(),
            from,
            to,
        });
        Ok(to)
    }
}
