//! Core load-generation engine: a staged-concurrency scheduler driving a
//! population of virtual workers, each executing weighted-random actions
//! against a pluggable target client while metrics aggregate centrally.

mod action;
mod client;
mod config;
mod error;
mod registry;
mod report;
mod run;
mod schedule;
mod signal;
mod stats;
mod summary;
mod thresholds;
mod worker;

pub use action::{Action, ActionCatalog, ActionFuture, ActionOutcome, OutcomeStatus};
pub use client::{ClientError, ClientFuture, Method, TargetClient, TargetRequest, TargetResponse};
pub use config::{RunOptions, Stage, ThinkTime};
pub use error::{Error, Result};
pub use registry::{EntityId, EntityRegistry};
pub use report::{ReportError, render_summary, write_summary};
pub use run::{RunHandle, start};
pub use schedule::RampingSchedule;
pub use stats::RunStats;
pub use summary::RunSummary;
pub use thresholds::{
    CompiledThreshold, ThresholdReport, ThresholdResult, ThresholdSpec, evaluate_thresholds,
};
pub use worker::{CallResult, WorkerContext};

pub use stampede_metrics::{
    MetricHandle, MetricKind, MetricSummary, MetricValues, MetricsRegistry, TrendValues,
};
