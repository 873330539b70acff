use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use stampede_metrics::{MetricKind, MetricValues};

use crate::action::ActionCatalog;
use crate::client::TargetClient;
use crate::config::RunOptions;
use crate::error::{Error, Result};
use crate::registry::EntityRegistry;
use crate::schedule::RampingSchedule;
use crate::signal::StopSignal;
use crate::stats::RunStats;
use crate::summary::RunSummary;
use crate::thresholds::{CompiledThreshold, evaluate_thresholds};
use crate::worker::{WorkerContext, WorkerRuntime};

/// Handle to an in-flight run. Dropping it does not stop the run; call
/// [`RunHandle::abort`] for an early cooperative shutdown and
/// [`RunHandle::wait`] for the summary.
pub struct RunHandle {
    driver: tokio::task::JoinHandle<Result<RunSummary>>,
    stop: Arc<StopSignal>,
}

impl RunHandle {
    /// Request early termination. Workers finish their in-flight iteration
    /// and exit; already-recorded metrics are kept and summarized.
    pub fn abort(&self) {
        tracing::info!("abort requested");
        self.stop.raise();
    }

    /// Wait for the run to drain and produce its summary.
    pub async fn wait(self) -> Result<RunSummary> {
        self.driver.await?
    }
}

fn validate(options: &RunOptions, catalog: &ActionCatalog) -> Result<Vec<CompiledThreshold>> {
    if options.stages.is_empty()
        || options
            .stages
            .iter()
            .map(|s| s.duration)
            .sum::<std::time::Duration>()
            .is_zero()
    {
        return Err(Error::InvalidStages);
    }
    if catalog.is_empty() {
        return Err(Error::EmptyCatalog);
    }
    if !catalog.weights_are_valid() {
        return Err(Error::InvalidWeights);
    }
    if options.think_time.min > options.think_time.max {
        return Err(Error::InvalidThinkTime);
    }
    if options.batch_size == 0 {
        return Err(Error::InvalidBatchSize);
    }
    crate::thresholds::compile_thresholds(&options.thresholds)
}

/// Validate the configuration and launch the run. All configuration
/// errors surface here, before any worker is spawned.
pub fn start(
    options: RunOptions,
    catalog: ActionCatalog,
    client: Arc<dyn TargetClient>,
) -> Result<RunHandle> {
    let thresholds = validate(&options, &catalog)?;
    let stop = Arc::new(StopSignal::default());

    let driver = tokio::spawn(drive(options, catalog, client, thresholds, stop.clone()));

    Ok(RunHandle { driver, stop })
}

async fn drive(
    options: RunOptions,
    catalog: ActionCatalog,
    client: Arc<dyn TargetClient>,
    thresholds: Vec<CompiledThreshold>,
    stop: Arc<StopSignal>,
) -> Result<RunSummary> {
    let schedule = Arc::new(RampingSchedule::new(
        options.start_workers,
        &options.stages,
    ));
    let catalog = Arc::new(catalog);
    let stats = Arc::new(RunStats::default());
    let entities = Arc::new(EntityRegistry::default());
    let base_url: Arc<str> = Arc::from(options.target_base_url.as_str());

    let slots = schedule.max_target();
    tracing::info!(
        slots,
        total = ?schedule.total_duration(),
        actions = catalog.len(),
        "starting run"
    );

    let started = Instant::now();
    let mut workers = Vec::with_capacity(slots as usize);
    for index in 1..=slots {
        let ctx = WorkerContext::new(
            index,
            options.batch_size,
            base_url.clone(),
            client.clone(),
            stats.clone(),
            entities.clone(),
        );
        let runtime = WorkerRuntime {
            index,
            ctx,
            catalog: catalog.clone(),
            schedule: schedule.clone(),
            think_time: options.think_time,
            started,
            stop: stop.clone(),
        };
        workers.push(tokio::spawn(runtime.run()));
    }

    for worker in workers {
        worker.await?;
    }
    let run_duration = started.elapsed();

    let metrics = stats.snapshot();
    let report = evaluate_thresholds(&thresholds, &metrics);

    let mut counters: BTreeMap<String, f64> = metrics
        .iter()
        .filter_map(|m| match m.values {
            MetricValues::Counter { value } if m.kind == MetricKind::Counter => {
                Some((m.name.clone(), value))
            }
            _ => None,
        })
        .collect();
    counters.insert("entities_created".to_string(), entities.len() as f64);

    tracing::info!(
        duration = ?run_duration,
        passed = report.passed,
        "run finished"
    );

    Ok(RunSummary {
        run_duration,
        metrics,
        thresholds: report,
        counters,
    })
}
