use std::sync::Arc;
use std::time::Instant;

use crate::action::{ActionCatalog, OutcomeStatus};
use crate::client::{TargetClient, TargetRequest, TargetResponse};
use crate::config::ThinkTime;
use crate::registry::{EntityId, EntityRegistry};
use crate::schedule::RampingSchedule;
use crate::signal::StopSignal;
use crate::stats::RunStats;

/// Everything a workload action sees: the target client, the shared
/// metrics and entity registry, and per-worker identity.
#[derive(Clone)]
pub struct WorkerContext {
    worker_id: u64,
    batch_size: usize,
    base_url: Arc<str>,
    client: Arc<dyn TargetClient>,
    stats: Arc<RunStats>,
    entities: Arc<EntityRegistry>,
}

#[derive(Debug, Clone)]
pub struct CallResult {
    pub success: bool,
    pub response: Option<TargetResponse>,
}

impl WorkerContext {
    pub(crate) fn new(
        worker_id: u64,
        batch_size: usize,
        base_url: Arc<str>,
        client: Arc<dyn TargetClient>,
        stats: Arc<RunStats>,
        entities: Arc<EntityRegistry>,
    ) -> Self {
        Self {
            worker_id,
            batch_size,
            base_url,
            client,
            stats,
            entities,
        }
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn sample_entity(&self) -> Option<EntityId> {
        self.entities.sample()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Execute one labeled target call, recording its latency and outcome
    /// under `<operation>_duration` / `<operation>_errors` as well as the
    /// run-wide request series. Transport and timeout failures count as
    /// failed outcomes but are logged distinctly for diagnosis.
    pub async fn call(&self, operation: &str, request: TargetRequest) -> CallResult {
        let started = Instant::now();
        match self.client.execute(request).await {
            Ok(response) => {
                let failed = !response.is_success();
                self.stats.record_call(operation, response.elapsed, failed);
                if failed {
                    tracing::debug!(
                        operation,
                        status = response.status,
                        "target rejected operation"
                    );
                }
                CallResult {
                    success: !failed,
                    response: Some(response),
                }
            }
            Err(err) => {
                self.stats.record_call(operation, started.elapsed(), true);
                match &err {
                    crate::client::ClientError::Timeout(deadline) => {
                        tracing::warn!(operation, ?deadline, "target call timed out");
                    }
                    crate::client::ClientError::Network(cause) => {
                        tracing::warn!(operation, cause, "target transport failure");
                    }
                }
                CallResult {
                    success: false,
                    response: None,
                }
            }
        }
    }

    /// Issue several calls with overlapping in-flight time. Latencies are
    /// attributed per call; results come back in request order.
    pub async fn call_batch(
        &self,
        operation: &str,
        requests: Vec<TargetRequest>,
    ) -> Vec<CallResult> {
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let ctx = self.clone();
            let operation = operation.to_string();
            handles.push(tokio::spawn(async move {
                ctx.call(&operation, request).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(err) => {
                    tracing::warn!(error = %err, "batch call task failed");
                    results.push(CallResult {
                        success: false,
                        response: None,
                    });
                }
            }
        }
        results
    }
}

/// One worker slot. Spawned once per schedule slot; self-gates on the
/// ramp by comparing its 1-based index against the interpolated target,
/// so the live population converges without any forced termination.
pub(crate) struct WorkerRuntime {
    pub index: u64,
    pub ctx: WorkerContext,
    pub catalog: Arc<ActionCatalog>,
    pub schedule: Arc<RampingSchedule>,
    pub think_time: ThinkTime,
    pub started: Instant,
    pub stop: Arc<StopSignal>,
}

impl WorkerRuntime {
    pub(crate) async fn run(self) {
        tracing::debug!(worker = self.index, "worker ready");

        loop {
            // Stop-signal policy: checked here, i.e. after the previous
            // iteration's think-time, so shutdown latency is bounded by one
            // think-time plus one in-flight action.
            if self.stop.is_raised() {
                break;
            }

            let elapsed = self.started.elapsed();
            if self.schedule.is_done(elapsed) {
                break;
            }

            let target = self.schedule.target_at(elapsed);
            if self.index > target {
                let wait = self.schedule.next_recheck_in(elapsed, self.index);
                tokio::time::sleep(wait.max(std::time::Duration::from_millis(1))).await;
                continue;
            }

            let Some(action) = self.catalog.next_action(self.ctx.entities()) else {
                break;
            };

            let iteration_started = Instant::now();
            let outcome = action.run(self.ctx.clone()).await;

            match outcome.status {
                OutcomeStatus::Completed => {
                    if let Some(id) = &outcome.produced {
                        self.ctx.entities().add(id);
                    }
                }
                OutcomeStatus::Failed => {}
                OutcomeStatus::Skipped => {
                    self.ctx.stats().record_call_skipped(action.name());
                }
            }

            self.ctx.stats().record_iteration(iteration_started.elapsed());

            tokio::time::sleep(self.think_time.sample()).await;
        }

        tracing::debug!(worker = self.index, "worker stopped");
    }
}
