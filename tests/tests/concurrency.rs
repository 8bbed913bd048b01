use std::time::Duration;

use futures::future::join_all;
use proofplane_kernel::operation::{Operation, Venue};
use proofplane_kernel::strategy::{ExecutionMode, ExecutionPlan, StrategyType};
use proofplane_testing::{
    FixedProbe, Harness, MockLocalProver, MockRemoteProver, Stub, assert_prover_calls, test_config,
};
use serde_json::json;

async fn slow_local_harness() -> Harness {
    Harness::start_with(
        FixedProbe::laptop(),
        test_config(),
        MockLocalProver::with_stub(Stub::Delay(Duration::from_millis(50))),
        MockRemoteProver::new(),
        None,
    )
    .await
    .unwrap()
}

async fn run_local_batch(h: &Harness, count: usize) {
    let ops = (0..count).map(|i| {
        h.plane
            .execute(Operation::prove("multiplier", json!({"i": i})).force_local())
    });
    for result in join_all(ops).await {
        assert_eq!(result.unwrap().venue, Venue::Local);
    }
}

fn assert_consistent(plan: &ExecutionPlan) {
    match plan.preference.mode {
        ExecutionMode::ForceServer => assert_eq!(plan.strategy_type(), StrategyType::ServerSide),
        ExecutionMode::ForceLocal => assert_eq!(plan.strategy_type(), StrategyType::FullLocal),
        _ => {}
    }
}

#[tokio::test]
async fn low_resource_runs_one_local_proof_at_a_time() {
    let h = slow_local_harness().await;
    let plan = h
        .plane
        .set_execution_mode(ExecutionMode::Strategy(StrategyType::LowResource))
        .unwrap();
    assert_eq!(plan.strategy.worker_thread_count, 1);

    run_local_batch(&h, 4).await;
    assert_prover_calls!(h.local, 4);
    assert_eq!(h.local.peak_concurrency(), 1);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn full_local_spreads_work_across_threads() {
    let h = slow_local_harness().await;
    assert_eq!(h.plane.plan().strategy.worker_thread_count, 4);

    run_local_batch(&h, 4).await;
    assert!(h.local.peak_concurrency() > 1);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn concurrent_operations_are_counted_exactly() {
    let h = Harness::start(FixedProbe::laptop(), test_config()).await.unwrap();

    let ops = (0..50).map(|i| {
        let plane = &h.plane;
        async move {
            assert_consistent(&plane.plan());
            plane.prove("multiplier", json!({"i": i})).await.unwrap()
        }
    });
    let toggle = async {
        for round in 0..20 {
            let mode = if round % 2 == 0 {
                ExecutionMode::ForceServer
            } else {
                ExecutionMode::ForceLocal
            };
            assert_consistent(&h.plane.set_execution_mode(mode).unwrap());
            tokio::task::yield_now().await;
        }
    };
    let (results, ()) = futures::join!(join_all(ops), toggle);

    let local = results.iter().filter(|r| r.venue == Venue::Local).count();
    let server = results.len() - local;
    assert!(results.iter().all(|r| r.success && !r.fallback_used));

    let stats = h.plane.stats();
    assert_eq!(stats.total, 50);
    assert_eq!(stats.succeeded, 50);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.fallbacks, 0);
    assert_eq!(stats.local_attempts, local as u64);
    assert_eq!(stats.server_attempts, server as u64);
    assert_prover_calls!(h.local, local);
    assert_prover_calls!(h.remote, server);

    h.plane.flush().await;
    assert_eq!(h.telemetry.operations().await.len(), 50);
    h.plane.shutdown().await;
}
