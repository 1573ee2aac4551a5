// Lifecycle logging: the manager emits structured start/end events with
// the saved outcome, checkpoint records with resource counters, and error
// events carrying the stable code.
//
// The capture subscriber is process-wide and these tests may interleave,
// so assertions are existence-based over distinct URNs and never clear
// the buffer.

mod common;

use common::{new_resource, new_resource_with_deps, new_snapshot, setup, RecordingPersister};
use keel_core::logging_facility::test_capture::init_test_capture;
use keel_core::model::step::Step;
use keel_core::policy::{CheckpointPolicy, IntegrityPolicy};
use keel_engine::SnapshotManager;

#[test]
fn test_manager_emits_lifecycle_events() {
    let capture = init_test_capture();

    let resource_a = new_resource("log-urn-a");
    let base = new_snapshot(vec![resource_a.clone()]);
    let (manager, _persister) = setup(&base);

    let step = Step::update(resource_a, new_resource("log-urn-a"));
    let mutation = manager.begin_mutation(&step).unwrap();
    mutation.end(&step, true).unwrap();
    manager.close().unwrap();

    capture.assert_event_exists("begin_mutation", "start");
    capture.assert_event_exists("begin_mutation", "end");
    capture.assert_event_exists("end_mutation", "start");
    capture.assert_event_exists("end_mutation", "end");
    capture.assert_event_exists("close", "end");
    capture.assert_event_exists("checkpoint", "checkpoint");

    // Start events carry the URN being mutated.
    assert!(capture
        .urns_with_event("start")
        .iter()
        .any(|urn| urn == "log-urn-a"));

    // Checkpoint records carry the persisted counters.
    let checkpoints = capture.events_for_op("checkpoint");
    assert!(!checkpoints.is_empty());
    assert!(checkpoints
        .iter()
        .all(|e| e.field("resource_count").is_some() && e.field("pending_count").is_some()));

    // An update is always meaningful, so its end reports saved = true.
    assert!(capture
        .events_for_op("end_mutation")
        .iter()
        .any(|e| e.field("saved") == Some("true")));
}

#[test]
fn test_elided_same_ends_with_saved_false() {
    let capture = init_test_capture();

    let resource = new_resource("log-urn-same");
    let base = new_snapshot(vec![resource.clone()]);
    let (manager, persister) = setup(&base);

    let step = Step::same(resource, new_resource("log-urn-same"));
    let mutation = manager.begin_mutation(&step).unwrap();
    mutation.end(&step, true).unwrap();
    assert!(persister.is_empty());

    // The identical same completed without a checkpoint and said so.
    let begin_urns = capture.urns_with_event("start");
    assert!(begin_urns.iter().any(|urn| urn == "log-urn-same"));
    assert!(capture
        .events_for_op("end_mutation")
        .iter()
        .any(|e| e.field("saved") == Some("false")));
}

#[test]
fn test_failed_save_emits_error_event_with_code() {
    let capture = init_test_capture();

    // Invalid base: the dependency never appears in the snapshot.
    let base = new_snapshot(vec![new_resource_with_deps("log-urn-bad", &["log-urn-missing"])]);
    let persister = RecordingPersister::new();
    let manager = SnapshotManager::with_policies(
        Box::new(persister.clone()),
        base.secrets_manager.clone(),
        &base,
        IntegrityPolicy::Enforce,
        CheckpointPolicy::EveryMutation,
    );

    manager.close().unwrap_err();

    capture.assert_error_code("close", "ERR_VERIFICATION_FAILED");
}
