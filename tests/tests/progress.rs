use std::sync::Arc;

use parking_lot::Mutex;
use proofplane_kernel::operation::{Operation, ProgressEvent, Venue};
use proofplane_kernel::prover::VerifyRequest;
use proofplane_testing::{
    FixedProbe, Harness, MockLocalProver, MockRemoteProver, test_config,
};
use serde_json::json;

fn assert_contract(events: &[ProgressEvent]) {
    assert!(events.len() > 2, "too few events: {events:?}");
    assert_eq!(events.first().map(|e| e.progress), Some(0));
    assert_eq!(events.last().map(|e| e.progress), Some(100));
    assert!(
        events.windows(2).all(|w| w[0].progress <= w[1].progress),
        "progress went backwards: {events:?}"
    );
}

#[tokio::test]
async fn local_and_remote_streams_have_the_same_shape() {
    let local = Harness::start(FixedProbe::laptop(), test_config()).await.unwrap();
    let remote = Harness::start(FixedProbe::low_end(), test_config()).await.unwrap();

    let on_local = local.plane.prove("multiplier", json!({})).await.unwrap();
    let on_server = remote.plane.prove("multiplier", json!({})).await.unwrap();
    assert_eq!(on_local.venue, Venue::Local);
    assert_eq!(on_server.venue, Venue::Server);

    assert_contract(&on_local.progress);
    assert_contract(&on_server.progress);

    let values = |events: &[ProgressEvent]| events.iter().map(|e| e.progress).collect::<Vec<_>>();
    assert_eq!(values(&on_local.progress), values(&on_server.progress));

    local.plane.shutdown().await;
    remote.plane.shutdown().await;
}

#[tokio::test]
async fn callback_receives_every_event_in_order() {
    let h = Harness::start(FixedProbe::midrange(), test_config()).await.unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let op = Operation::prove("multiplier", json!({}))
        .on_progress(move |event| sink.lock().push(event.clone()));
    let result = h.plane.execute(op).await.unwrap();

    assert_eq!(*seen.lock(), result.progress);
    assert_contract(&result.progress);
    h.plane.shutdown().await;
}

#[tokio::test]
async fn fallback_keeps_the_stream_monotonic() {
    let h = Harness::start_with(
        FixedProbe::laptop(),
        test_config(),
        MockLocalProver::failing("Local proof generation failed"),
        MockRemoteProver::new(),
        None,
    )
    .await
    .unwrap();

    let result = h.plane.prove("multiplier", json!({})).await.unwrap();
    assert!(result.fallback_used);
    assert_contract(&result.progress);
    assert_eq!(
        result.progress.last().map(|e| e.status.as_str()),
        Some("Proof generated on server")
    );
    h.plane.shutdown().await;
}

#[tokio::test]
async fn verification_reports_progress_too() {
    let h = Harness::start(FixedProbe::laptop(), test_config()).await.unwrap();
    let request = VerifyRequest {
        verification_key: json!({"protocol": "groth16"}),
        public_signals: vec!["33".to_string()],
        proof: json!({"pi_a": ["1", "2"]}),
    };

    let result = h.plane.verify("multiplier", &request).await.unwrap();
    assert_contract(&result.progress);
    assert_eq!(
        result.progress.last().map(|e| e.status.as_str()),
        Some("Proof verified locally")
    );
    h.plane.shutdown().await;
}
