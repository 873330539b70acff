use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use stampede_core::{
    ActionCatalog, ActionOutcome, ClientFuture, MetricValues, RunOptions, Stage, TargetClient,
    TargetRequest, TargetResponse, ThinkTime, ThresholdSpec, start,
};

/// In-memory target that answers every request with a fixed status after a
/// short simulated service time.
struct MockClient {
    status: u16,
    calls: AtomicU64,
}

impl MockClient {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            status: 200,
            calls: AtomicU64::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            status: 500,
            calls: AtomicU64::new(0),
        })
    }
}

impl TargetClient for MockClient {
    fn execute(&self, _request: TargetRequest) -> ClientFuture<'_> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let status = self.status;
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(TargetResponse {
                status,
                body: String::new(),
                elapsed: Duration::from_millis(1),
            })
        })
    }
}

fn quick_options(stage_ms: u64, target: u64) -> RunOptions {
    let mut options = RunOptions::new(vec![Stage {
        duration: Duration::from_millis(stage_ms),
        target,
    }]);
    options.think_time = ThinkTime::from_millis(0, 1);
    options
}

fn counter_value(values: &MetricValues) -> f64 {
    match values {
        MetricValues::Counter { value } => *value,
        other => panic!("expected counter values, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn seed_only_run_registers_every_created_entity() {
    let next_id = Arc::new(AtomicU64::new(0));
    let catalog = ActionCatalog::new().seed_action("create_item", 1.0, {
        let next_id = next_id.clone();
        move |ctx| {
            let next_id = next_id.clone();
            async move {
                let result = ctx.call("create_item", TargetRequest::get("/items")).await;
                if !result.success {
                    return ActionOutcome::failed();
                }
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                ActionOutcome::created(format!("item-{id}"))
            }
        }
    });

    let handle = start(quick_options(300, 3), catalog, MockClient::ok())
        .unwrap_or_else(|e| panic!("start failed: {e}"));
    let summary = handle
        .wait()
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    let iterations = summary
        .metric("iterations")
        .map(|m| counter_value(&m.values))
        .unwrap_or_else(|| panic!("missing iterations counter"));
    assert!(iterations > 0.0, "no iterations completed");

    // Every iteration created one distinct entity.
    let created = summary
        .counter("entities_created")
        .unwrap_or_else(|| panic!("missing entities_created"));
    assert_eq!(created, iterations);

    assert!(summary.passed());
}

#[tokio::test(flavor = "multi_thread")]
async fn entity_dependent_action_skips_while_registry_is_empty() {
    // No seed action, so the registry stays empty and every iteration must
    // skip instead of issuing a request.
    let catalog = ActionCatalog::new().action("fetch_item", 1.0, |ctx| async move {
        let Some(id) = ctx.sample_entity() else {
            return ActionOutcome::skipped();
        };
        let result = ctx
            .call("fetch_item", TargetRequest::get(&format!("/items/{id}")))
            .await;
        if result.success {
            ActionOutcome::completed()
        } else {
            ActionOutcome::failed()
        }
    });

    let client = MockClient::ok();
    let handle = start(quick_options(200, 2), catalog, client.clone())
        .unwrap_or_else(|e| panic!("start failed: {e}"));
    let summary = handle
        .wait()
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert_eq!(client.calls.load(Ordering::Relaxed), 0);

    let MetricValues::Rate {
        total,
        failures,
        skipped,
        rate,
    } = summary
        .metric("fetch_item_errors")
        .map(|m| m.values.clone())
        .unwrap_or_else(|| panic!("missing fetch_item_errors"))
    else {
        panic!("expected rate values");
    };
    assert_eq!(total, 0);
    assert_eq!(failures, 0);
    assert!(skipped > 0, "expected skipped observations");
    assert_eq!(rate, None);

    // Skips still count as iterations.
    let iterations = summary
        .metric("iterations")
        .map(|m| counter_value(&m.values))
        .unwrap_or_else(|| panic!("missing iterations counter"));
    assert_eq!(iterations, skipped as f64);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_target_trips_the_error_rate_threshold() {
    let catalog = ActionCatalog::new().action("create_item", 1.0, |ctx| async move {
        let result = ctx.call("create_item", TargetRequest::get("/items")).await;
        if result.success {
            ActionOutcome::completed()
        } else {
            ActionOutcome::failed()
        }
    });

    let mut options = quick_options(200, 2);
    options.thresholds = vec![ThresholdSpec::new("request_failed", &["rate<0.5"])];

    let handle = start(options, catalog, MockClient::failing())
        .unwrap_or_else(|e| panic!("start failed: {e}"));
    let summary = handle
        .wait()
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert!(!summary.passed());
    assert_eq!(summary.thresholds.results.len(), 1);
    assert_eq!(summary.thresholds.results[0].observed, Some(1.0));
}

#[tokio::test(flavor = "multi_thread")]
async fn abort_drains_workers_and_keeps_recorded_metrics() {
    let catalog = ActionCatalog::new().action("create_item", 1.0, |ctx| async move {
        let result = ctx.call("create_item", TargetRequest::get("/items")).await;
        if result.success {
            ActionOutcome::completed()
        } else {
            ActionOutcome::failed()
        }
    });

    // A schedule far longer than the test; only abort ends it. Start at
    // full strength so workers iterate immediately.
    let mut options = quick_options(60_000, 2);
    options.start_workers = 2;
    let handle = start(options, catalog, MockClient::ok())
        .unwrap_or_else(|e| panic!("start failed: {e}"));

    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.abort();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap_or_else(|_| panic!("run did not drain after abort"))
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert!(summary.run_duration < Duration::from_secs(60));

    let requests = summary
        .metric("requests")
        .map(|m| counter_value(&m.values))
        .unwrap_or_else(|| panic!("missing requests counter"));
    let iterations = summary
        .metric("iterations")
        .map(|m| counter_value(&m.values))
        .unwrap_or_else(|| panic!("missing iterations counter"));
    assert!(iterations > 0.0, "no iterations before abort");
    assert_eq!(requests, iterations);
}

#[tokio::test(flavor = "multi_thread")]
async fn batched_calls_record_one_sample_per_request() {
    let catalog = ActionCatalog::new().action("burst_create", 1.0, |ctx| async move {
        let requests = (0..ctx.batch_size())
            .map(|_| TargetRequest::get("/items"))
            .collect();
        let results = ctx.call_batch("burst_create", requests).await;
        if results.iter().all(|r| r.success) {
            ActionOutcome::completed()
        } else {
            ActionOutcome::failed()
        }
    });

    let mut options = quick_options(200, 2);
    options.batch_size = 3;

    let handle = start(options, catalog, MockClient::ok())
        .unwrap_or_else(|e| panic!("start failed: {e}"));
    let summary = handle
        .wait()
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    let requests = summary
        .metric("requests")
        .map(|m| counter_value(&m.values))
        .unwrap_or_else(|| panic!("missing requests counter"));
    let iterations = summary
        .metric("iterations")
        .map(|m| counter_value(&m.values))
        .unwrap_or_else(|| panic!("missing iterations counter"));
    assert!(iterations > 0.0, "no iterations completed");
    assert_eq!(requests, iterations * 3.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn weighted_mix_records_per_operation_series() {
    let catalog = ActionCatalog::new()
        .seed_action("create_item", 1.0, |ctx| async move {
            let result = ctx.call("create_item", TargetRequest::get("/items")).await;
            if result.success {
                ActionOutcome::created(format!("item-{}", ctx.worker_id()))
            } else {
                ActionOutcome::failed()
            }
        })
        .action("fetch_item", 3.0, |ctx| async move {
            let Some(id) = ctx.sample_entity() else {
                return ActionOutcome::skipped();
            };
            let result = ctx
                .call("fetch_item", TargetRequest::get(&format!("/items/{id}")))
                .await;
            if result.success {
                ActionOutcome::completed()
            } else {
                ActionOutcome::failed()
            }
        });

    let handle = start(quick_options(400, 4), catalog, MockClient::ok())
        .unwrap_or_else(|e| panic!("start failed: {e}"));
    let summary = handle
        .wait()
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    // The seed runs first, so its series must exist.
    assert!(summary.metric("create_item_duration").is_some());
    assert!(summary.metric("create_item_errors").is_some());
    assert!(summary.counter("entities_created").unwrap_or(0.0) > 0.0);
}
