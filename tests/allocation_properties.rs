//! Property-style tests for the allocation engine and fleet registry.
//!
//! Covers capacity conservation, allocation atomicity under true parallel
//! callers, rollback completeness, and the replenishment state transitions.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use der_dispatch::core::{
    AllocationEngine, DemandEvent, DerId, DerState, DispatchError, EventPriority, FleetRegistry,
    ResourceUnit,
};

fn fleet_with(capacities: &[f64]) -> Arc<FleetRegistry> {
    let fleet = Arc::new(FleetRegistry::new());
    for (i, cap) in capacities.iter().enumerate() {
        fleet
            .register(ResourceUnit::new(format!("der_{i}"), *cap, format!("location_{i}")).unwrap())
            .unwrap();
    }
    fleet
}

fn event(priority: EventPriority, requirement: f64) -> DemandEvent {
    DemandEvent::new(priority, requirement, Duration::from_millis(5), "grid_stability").unwrap()
}

#[test]
fn insufficient_aggregate_fast_fails_without_mutation() {
    let fleet = fleet_with(&[100.0, 50.0]);
    let engine = AllocationEngine::new(Arc::clone(&fleet));

    let err = engine.allocate(&event(EventPriority::Critical, 160.0)).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::InsufficientAggregateCapacity { required, available }
            if required == 160.0 && available == 150.0
    ));
    for unit in fleet.snapshot() {
        assert_eq!(unit.available(), unit.capacity());
        assert_eq!(unit.state(), DerState::Available);
    }
}

#[test]
fn greedy_split_and_release_round_trip() {
    let fleet = fleet_with(&[100.0, 50.0]);
    let engine = AllocationEngine::new(Arc::clone(&fleet));

    let record = engine.allocate(&event(EventPriority::High, 120.0)).unwrap();
    assert_eq!(record.total(), 120.0);

    let a = fleet.get(&DerId::from("der_0")).unwrap();
    let b = fleet.get(&DerId::from("der_1")).unwrap();
    assert_eq!((a.available(), a.state()), (0.0, DerState::Depleted));
    assert_eq!((b.available(), b.state()), (30.0, DerState::Dispatched));

    engine.release(record);
    let a = fleet.get(&DerId::from("der_0")).unwrap();
    let b = fleet.get(&DerId::from("der_1")).unwrap();
    assert_eq!((a.available(), a.state()), (100.0, DerState::Available));
    assert_eq!((b.available(), b.state()), (50.0, DerState::Available));
}

#[test]
fn replenish_tick_revives_depleted_unit() {
    let fleet = fleet_with(&[50.0]);
    let engine = AllocationEngine::new(Arc::clone(&fleet));

    let record = engine.allocate(&event(EventPriority::Medium, 50.0)).unwrap();
    let unit = fleet.get(&DerId::from("der_0")).unwrap();
    assert_eq!((unit.available(), unit.state()), (0.0, DerState::Depleted));

    let snapshot = fleet.replenish_all(10.0);
    assert_eq!(snapshot.total_available, 10.0);
    let unit = fleet.get(&DerId::from("der_0")).unwrap();
    assert_eq!((unit.available(), unit.state()), (10.0, DerState::Available));

    // Release after replenishment clamps at total capacity.
    engine.release(record);
    let unit = fleet.get(&DerId::from("der_0")).unwrap();
    assert_eq!(unit.available(), 50.0);
}

#[test]
fn parallel_allocations_never_overdraw() {
    let fleet = fleet_with(&[100.0, 100.0, 100.0, 100.0]);
    let engine = Arc::new(AllocationEngine::new(Arc::clone(&fleet)));
    let total = fleet.total_capacity();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let mut granted = 0.0;
            for _ in 0..50 {
                match engine.allocate(&event(EventPriority::High, 90.0)) {
                    Ok(record) => {
                        granted += record.total();
                        engine.release(record);
                    }
                    Err(
                        DispatchError::InsufficientAggregateCapacity { .. }
                        | DispatchError::PartialAllocationRace { .. },
                    ) => {}
                    Err(other) => panic!("unexpected failure: {other}"),
                }
            }
            granted
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Every allocation was released, so the fleet must be whole again and
    // no unit may ever have gone outside its bounds.
    assert!((fleet.total_available_capacity() - total).abs() < 1e-6);
    for unit in fleet.snapshot() {
        assert!(unit.available() >= 0.0);
        assert!(unit.available() <= unit.capacity());
        assert_eq!(unit.state(), DerState::Available);
    }
}

#[test]
fn parallel_allocation_with_replenishment_keeps_bounds() {
    let fleet = fleet_with(&[80.0, 80.0]);
    let engine = Arc::new(AllocationEngine::new(Arc::clone(&fleet)));

    let allocators: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..100 {
                    if let Ok(record) = engine.allocate(&event(EventPriority::Low, 60.0)) {
                        thread::yield_now();
                        engine.release(record);
                    }
                }
            })
        })
        .collect();

    let replenish_fleet = Arc::clone(&fleet);
    let replenisher = thread::spawn(move || {
        for _ in 0..200 {
            let snapshot = replenish_fleet.replenish_all(5.0);
            assert!(snapshot.total_available <= snapshot.total_capacity + 1e-9);
            thread::yield_now();
        }
    });

    for handle in allocators {
        handle.join().unwrap();
    }
    replenisher.join().unwrap();

    for unit in fleet.snapshot() {
        assert!(unit.available() >= 0.0);
        assert!(unit.available() <= unit.capacity());
    }
}
