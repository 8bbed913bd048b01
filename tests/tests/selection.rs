use proofplane_kernel::operation::{Complexity, Operation, Venue};
use proofplane_kernel::profile::DeviceTier;
use proofplane_kernel::strategy::{ExecutionMode, ExecutionPreference, StrategyType};
use proofplane_kernel::ProofError;
use proofplane_testing::{FixedProbe, Harness, assert_prover_calls, test_config};
use serde_json::json;

#[tokio::test]
async fn tier_decides_the_initial_strategy() {
    let cases = [
        (FixedProbe::workstation(), DeviceTier::High, StrategyType::HighPerformance),
        (FixedProbe::laptop(), DeviceTier::High, StrategyType::FullLocal),
        (FixedProbe::midrange(), DeviceTier::Medium, StrategyType::Hybrid),
        (FixedProbe::low_end(), DeviceTier::Low, StrategyType::ServerSide),
        (FixedProbe::incompatible(), DeviceTier::Incompatible, StrategyType::ServerSide),
    ];

    for (probe, tier, expected) in cases {
        let h = Harness::start(probe, test_config()).await.unwrap();
        assert_eq!(h.plane.profile().unwrap().tier, tier);
        assert_eq!(h.plane.plan().strategy_type(), expected, "tier {tier}");
        if tier == DeviceTier::High {
            assert!(expected.prefers_local());
        }
        h.plane.shutdown().await;
    }
}

#[tokio::test]
async fn zero_offload_always_runs_locally() {
    let h = Harness::start(FixedProbe::laptop(), test_config()).await.unwrap();
    assert_eq!(h.plane.plan().strategy.server_offload_percentage, 0);

    for i in 0..25 {
        let result = h.plane.prove("multiplier", json!({"a": i, "b": 3})).await.unwrap();
        assert_eq!(result.venue, Venue::Local);
        assert!(!result.fallback_used);
    }
    assert_prover_calls!(h.local, 25);
    assert_prover_calls!(h.remote, 0);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn full_offload_always_runs_remotely() {
    let h = Harness::start(FixedProbe::low_end(), test_config()).await.unwrap();
    assert_eq!(h.plane.plan().strategy.server_offload_percentage, 100);

    for i in 0..25 {
        let result = h.plane.prove("multiplier", json!({"a": i, "b": 3})).await.unwrap();
        assert_eq!(result.venue, Venue::Server);
    }
    assert_prover_calls!(h.remote, 25);
    assert_prover_calls!(h.local, 0);

    let stats = h.plane.stats();
    assert_eq!(stats.total, 25);
    assert_eq!(stats.server_attempts, 25);
    assert_eq!(stats.local_attempts, 0);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn hybrid_routes_by_complexity() {
    let h = Harness::start(FixedProbe::midrange(), test_config()).await.unwrap();
    assert_eq!(h.plane.plan().strategy_type(), StrategyType::Hybrid);

    let low = Operation::prove("hash", json!({"x": 1})).with_complexity(Complexity::Low);
    let high = Operation::prove("rollup", json!({"x": 2})).with_complexity(Complexity::High);

    assert_eq!(h.plane.execute(low).await.unwrap().venue, Venue::Local);
    assert_eq!(h.plane.execute(high).await.unwrap().venue, Venue::Server);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn hybrid_medium_complexity_uses_the_offload_draw() {
    let h = Harness::start(FixedProbe::midrange(), test_config()).await.unwrap();

    let mut local = 0;
    let mut server = 0;
    for _ in 0..200 {
        let op = Operation::prove("transfer", json!({})).with_complexity(Complexity::Medium);
        match h.plane.execute(op).await.unwrap().venue {
            Venue::Local => local += 1,
            Venue::Server => server += 1,
        }
    }
    // 50 % offload; both venues show up over 200 draws
    assert!(local > 0 && server > 0, "local={local} server={server}");
    h.plane.shutdown().await;
}

#[tokio::test]
async fn same_seed_gives_same_venue_sequence() {
    let mut runs = Vec::new();
    for _ in 0..2 {
        let h = Harness::start(FixedProbe::midrange(), test_config()).await.unwrap();
        let mut venues = Vec::new();
        for _ in 0..30 {
            venues.push(h.plane.prove("transfer", json!({})).await.unwrap().venue);
        }
        h.plane.shutdown().await;
        runs.push(venues);
    }
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn execution_mode_applies_to_the_next_operation() {
    let h = Harness::start(FixedProbe::laptop(), test_config()).await.unwrap();
    let before = h.plane.plan().revision;
    assert_eq!(h.plane.prove("multiplier", json!({})).await.unwrap().venue, Venue::Local);

    let plan = h.plane.set_execution_mode(ExecutionMode::ForceServer).unwrap();
    assert!(plan.revision > before);
    assert_eq!(plan.strategy_type(), StrategyType::ServerSide);
    assert_eq!(h.plane.prove("multiplier", json!({})).await.unwrap().venue, Venue::Server);

    h.plane.set_execution_mode(ExecutionMode::Automatic).unwrap();
    assert_eq!(h.plane.plan().strategy_type(), StrategyType::FullLocal);
    assert_eq!(h.plane.prove("multiplier", json!({})).await.unwrap().venue, Venue::Local);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn named_strategy_replaces_the_automatic_choice() {
    let h = Harness::start(FixedProbe::laptop(), test_config()).await.unwrap();
    h.plane
        .set_execution_mode(ExecutionMode::Strategy(StrategyType::ServerSide))
        .unwrap();
    assert_eq!(h.plane.prove("multiplier", json!({})).await.unwrap().venue, Venue::Server);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn forced_local_wins_on_a_low_end_device() {
    let h = Harness::start(FixedProbe::low_end(), test_config()).await.unwrap();

    let op = Operation::prove("multiplier", json!({})).force_local();
    assert_eq!(h.plane.execute(op).await.unwrap().venue, Venue::Local);

    h.plane.set_execution_mode(ExecutionMode::ForceLocal).unwrap();
    assert_eq!(h.plane.prove("multiplier", json!({})).await.unwrap().venue, Venue::Local);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn local_strategy_is_rejected_on_incompatible_devices() {
    let h = Harness::start(FixedProbe::incompatible(), test_config()).await.unwrap();
    let before = h.plane.plan();

    let err = h
        .plane
        .set_execution_mode(ExecutionMode::Strategy(StrategyType::FullLocal))
        .unwrap_err();
    assert!(matches!(err, ProofError::Configuration(_)));
    assert_eq!(h.plane.plan().revision, before.revision);
    h.plane.shutdown().await;

    let config = test_config().with_preference(ExecutionPreference {
        mode: ExecutionMode::Strategy(StrategyType::HighPerformance),
        allow_fallback: true,
    });
    assert!(Harness::start(FixedProbe::incompatible(), config).await.is_err());
}

#[tokio::test]
async fn tailoring_follows_the_host() {
    let probe = FixedProbe::laptop().without(proofplane_kernel::Primitive::PersistentStorage);
    let h = Harness::start(probe, test_config()).await.unwrap();
    let strategy = h.plane.plan().strategy.clone();

    assert_eq!(strategy.worker_thread_count, 4);
    assert!(!strategy.use_local_cache);
    assert_eq!(strategy.memory_limit_mb, 4096);
    assert!(strategy.optimizations.native_threads);
    h.plane.shutdown().await;
}
