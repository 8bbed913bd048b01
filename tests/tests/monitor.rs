use std::sync::Arc;
use std::time::Duration;

use proofplane_foundation::ResourceSampler;
use proofplane_kernel::operation::Venue;
use proofplane_kernel::strategy::{ExecutionMode, ResourceConstraints, StrategyType};
use proofplane_testing::{
    FixedProbe, Harness, MockLocalProver, MockRemoteProver, ScriptedSampler, test_config,
};
use serde_json::json;

async fn harness_with(sampler: Arc<ScriptedSampler>, interval_secs: u64) -> Harness {
    let config = proofplane_foundation::PlaneConfig {
        monitor_interval_secs: interval_secs,
        ..test_config()
    };
    Harness::start_with(
        FixedProbe::laptop(),
        config,
        MockLocalProver::new(),
        MockRemoteProver::new(),
        Some(sampler as Arc<dyn ResourceSampler>),
    )
    .await
    .unwrap()
}

fn heavy_pressure() -> ResourceConstraints {
    ResourceConstraints {
        memory: true,
        network: true,
        battery: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn severe_pressure_switches_to_server_side_exactly_once() {
    let sampler = Arc::new(ScriptedSampler::constant(heavy_pressure()));
    let h = harness_with(sampler.clone(), 0).await;
    let monitor = h.plane.monitor().clone();
    assert_eq!(h.plane.plan().strategy_type(), StrategyType::FullLocal);

    let switched = monitor.tick().await.unwrap();
    assert_eq!(switched.strategy_type(), StrategyType::ServerSide);

    for _ in 0..5 {
        assert!(monitor.tick().await.is_none());
    }
    assert_eq!(monitor.switch_count(), 1);
    assert_eq!(sampler.sample_count(), 6);
    assert!(monitor.last_constraints().unwrap().severity > 0.99);

    let result = h.plane.prove("multiplier", json!({})).await.unwrap();
    assert_eq!(result.venue, Venue::Server);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn moderate_memory_pressure_picks_low_resource() {
    let sampler = Arc::new(ScriptedSampler::constant(ResourceConstraints {
        memory: true,
        network: true,
        ..Default::default()
    }));
    let h = harness_with(sampler, 0).await;

    let plan = h.plane.monitor().tick().await.unwrap();
    assert_eq!(plan.strategy_type(), StrategyType::LowResource);
    assert_eq!(plan.strategy.server_offload_percentage, 70);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn explicit_choices_outrank_pressure() {
    let sampler = Arc::new(ScriptedSampler::constant(ResourceConstraints {
        memory: true,
        network: true,
        ..Default::default()
    }));
    let h = harness_with(sampler, 0).await;
    let monitor = h.plane.monitor().clone();

    h.plane
        .set_execution_mode(ExecutionMode::Strategy(StrategyType::FullLocal))
        .unwrap();
    assert!(monitor.tick().await.is_none());
    assert_eq!(h.plane.plan().strategy_type(), StrategyType::FullLocal);

    h.plane.set_execution_mode(ExecutionMode::ForceLocal).unwrap();
    let before = h.plane.plan().revision;
    assert!(monitor.tick().await.is_none());
    assert_eq!(h.plane.plan().revision, before);
    assert_eq!(monitor.switch_count(), 0);

    for _ in 0..10 {
        let result = h.plane.prove("multiplier", json!({})).await.unwrap();
        assert_eq!(result.venue, Venue::Local);
    }
    h.plane.shutdown().await;
}

#[tokio::test]
async fn mild_pressure_changes_nothing() {
    let sampler = Arc::new(ScriptedSampler::constant(ResourceConstraints {
        network: true,
        cpu: true,
        storage: true,
        ..Default::default()
    }));
    let h = harness_with(sampler, 0).await;
    let before = h.plane.plan().revision;

    assert!(h.plane.monitor().tick().await.is_none());
    assert_eq!(h.plane.plan().revision, before);
    assert_eq!(h.plane.monitor().switch_count(), 0);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn sampling_failure_is_skipped() {
    let sampler = Arc::new(ScriptedSampler::default());
    sampler.push_failure("sensor unavailable");
    let h = harness_with(sampler, 0).await;

    assert!(h.plane.monitor().tick().await.is_none());
    assert!(h.plane.monitor().last_constraints().is_none());
    h.plane.shutdown().await;
}

#[tokio::test]
async fn switch_is_kept_until_reset() {
    let sampler = Arc::new(ScriptedSampler::new([
        heavy_pressure(),
        ResourceConstraints::default(),
    ]));
    let h = harness_with(sampler, 0).await;
    let monitor = h.plane.monitor().clone();

    monitor.tick().await.unwrap();
    assert!(monitor.tick().await.is_none());
    assert_eq!(h.plane.plan().strategy_type(), StrategyType::ServerSide);

    let plan = h.plane.reset().unwrap();
    assert_eq!(plan.strategy_type(), StrategyType::FullLocal);
    h.plane.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn background_loop_adapts_and_notifies_subscribers() {
    let sampler = Arc::new(ScriptedSampler::constant(heavy_pressure()));
    let h = harness_with(sampler.clone(), 1).await;
    let mut plans = h.plane.subscribe();

    tokio::time::timeout(Duration::from_secs(10), plans.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(plans.borrow().strategy_type(), StrategyType::ServerSide);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.plane.monitor().switch_count(), 1);
    assert!(sampler.sample_count() >= 5);

    h.plane.shutdown().await;
    let samples = sampler.sample_count();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(sampler.sample_count(), samples);
}
