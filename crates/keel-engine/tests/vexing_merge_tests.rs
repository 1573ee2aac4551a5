// The merge operation under a particularly vexing deployment state: a
// replaced resource whose dependency has not been visited must keep its
// base position behind that dependency.

mod common;

use common::{new_resource, new_resource_with_deps, new_snapshot, setup};
use keel_core::model::step::Step;
use keel_core::model::urn::Urn;
use keel_engine::SnapshotManager;

fn apply_step(manager: &SnapshotManager, step: &Step) {
    let mutation = manager.begin_mutation(step).unwrap();
    mutation.end(step, true).unwrap();
}

#[test]
fn test_vexing_deployment() {
    // Base dependency graph:
    //   b -> a, c -> {a, b}, d -> c, e -> c
    let a = new_resource("a");
    let b = new_resource_with_deps("b", &["a"]);
    let c = new_resource_with_deps("c", &["a", "b"]);
    let d = new_resource_with_deps("d", &["c"]);
    let e = new_resource_with_deps("e", &["c"]);
    let base = new_snapshot(vec![a.clone(), b.clone(), c.clone(), d.clone(), e.clone()]);

    let (manager, persister) = setup(&base);

    // The engine emits:
    //   B - Same, depends on nothing
    //   C - CreateReplacement, depends on B
    //   C - Replace
    //   D - Update, depends on new C
    //
    // Conceptually this plan deletes A, but its deletion has not been
    // observed yet: steps arrive in topological order, so if A were kept,
    // a step for it would have come before C's. The replaced C stays in
    // the snapshot pending deletion, and A stays because the old C still
    // depends on it.
    let b_prime = new_resource("b");
    apply_step(&manager, &Step::same(b.clone(), b_prime.clone()));

    let c_prime = new_resource_with_deps("c", &["b"]);
    apply_step(&manager, &Step::create_replacement(c.clone(), c_prime.clone()));
    apply_step(&manager, &Step::replace(c.clone(), c_prime.clone()));

    // cPrime now exists, c is pending deletion; dPrime depends on cPrime.
    let d_prime = new_resource_with_deps("d", &["c"]);
    apply_step(&manager, &Step::update(d.clone(), d_prime.clone()));

    let snap = persister.last();
    assert_eq!(snap.resources.len(), 6);
    let res = &snap.resources;

    // B first, depending on nothing.
    assert_eq!(res[0].urn, b.urn);
    assert!(res[0].dependencies.is_empty());

    // cPrime next, depending on B.
    assert_eq!(res[1].urn, c.urn);
    assert_eq!(res[1].dependencies, vec![Urn::from("b")]);
    assert!(!res[1].delete);

    // d next, depending on cPrime.
    assert_eq!(res[2].urn, d.urn);
    assert_eq!(res[2].dependencies, vec![Urn::from("c")]);

    // a next, depending on nothing.
    assert_eq!(res[3].urn, a.urn);
    assert!(res[3].dependencies.is_empty());

    // The old c follows a, pending deletion, still depending on a and b.
    // The merge must put it after a despite never having seen a in this
    // deployment.
    assert_eq!(res[4].urn, c.urn);
    assert!(res[4].delete);
    assert_eq!(res[4].dependencies.len(), 2);
    assert!(res[4].dependencies.contains(&Urn::from("a")));
    assert!(res[4].dependencies.contains(&Urn::from("b")));

    // e last, still live, depending on c.
    assert_eq!(res[5].urn, e.urn);
    assert_eq!(res[5].dependencies, vec![Urn::from("c")]);
    assert!(!res[5].delete);

    // After a replace there are exactly two entries for the URN: the live
    // replacement and the tombstoned original.
    let c_entries: Vec<_> = res.iter().filter(|r| r.urn == c.urn).collect();
    assert_eq!(c_entries.len(), 2);
    assert_eq!(c_entries.iter().filter(|r| r.delete).count(), 1);

    // Every snapshot saved along the way satisfies the integrity
    // invariants, tombstones included.
    for saved in persister.saved() {
        saved.verify_integrity().unwrap();
    }
}

#[test]
fn test_deletion_removes_resource_from_merged_snapshot() {
    let resource_a = new_resource("a");
    let base = new_snapshot(vec![resource_a.clone()]);
    let (manager, persister) = setup(&base);

    let step = Step::delete(resource_a);
    let mutation = manager.begin_mutation(&step).unwrap();
    mutation.end(&step, true).unwrap();

    // The end marks the resource done; the merge drops it.
    let snap = persister.last();
    assert!(snap.resources.is_empty());
}

#[test]
fn test_failed_delete_keeps_resource() {
    let resource_a = new_resource("a");
    let base = new_snapshot(vec![resource_a.clone()]);
    let (manager, persister) = setup(&base);

    let step = Step::delete(resource_a.clone());
    let mutation = manager.begin_mutation(&step).unwrap();
    mutation.end(&step, false).unwrap();

    let snap = persister.last();
    assert_eq!(snap.resources.len(), 1);
    assert_eq!(snap.resources[0].urn, resource_a.urn);
}

#[test]
fn test_create_over_tombstoned_duplicate_is_legal() {
    // The base carries a pending-deletion entry for the URN; creating a
    // fresh resource with the same URN appends the new live state while
    // the tombstone stays put.
    let mut doomed = new_resource("a");
    doomed.delete = true;
    let base = new_snapshot(vec![doomed.clone()]);
    let (manager, persister) = setup(&base);

    let fresh = new_resource("a");
    let step = Step::create(fresh.clone());
    let mutation = manager.begin_mutation(&step).unwrap();
    mutation.end(&step, true).unwrap();

    let snap = persister.last();
    assert_eq!(snap.resources.len(), 2);
    assert!(!snap.resources[0].delete);
    assert!(snap.resources[1].delete);
    snap.verify_integrity().unwrap();

    // Deleting the tombstone afterwards leaves only the fresh resource.
    let step = Step::delete(doomed);
    let mutation = manager.begin_mutation(&step).unwrap();
    mutation.end(&step, true).unwrap();

    let snap = persister.last();
    assert_eq!(snap.resources.len(), 1);
    assert!(!snap.resources[0].delete);
}
