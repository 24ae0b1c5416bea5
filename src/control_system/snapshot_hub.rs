use crate::lights::vehicle::Road;
use crate::lights::LightEvent;
use crate::models::snapshot::IntersectionSnapshot;
use log::error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

/// Receives the latest intersection snapshot on every change and heartbeat.
/// Read-only controller calls (`get_state`, `light`) are fine from inside it.
pub type StateObserver = Arc<dyn Fn(&IntersectionSnapshot) + Send + Sync>;

/// Folds light events and controller changes into one snapshot and pushes
/// it to the observer.
///
/// Pushes are delivered one at a time, in the order the snapshots were
/// taken, so the observer never sees an older state after a newer one.
pub struct SnapshotHub {
    latest: Mutex<IntersectionSnapshot>,
    // Held from taking a snapshot until the observer returns.
    delivery: Mutex<()>,
    observer: Option<StateObserver>,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Plain data; a poisoned guard is still whole.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SnapshotHub {
    pub fn new(observer: Option<StateObserver>) -> Self {
        Self {
            latest: Mutex::new(IntersectionSnapshot::idle()),
            delivery: Mutex::new(()),
            observer,
        }
    }

    pub fn apply(&self, event: LightEvent) {
        self.update(|snap| match event {
            LightEvent::Vehicle {
                road: Road::Main,
                state,
            } => snap.main_road = state,
            LightEvent::Vehicle {
                road: Road::Side,
                state,
            } => snap.side_road = state,
            LightEvent::Pedestrian(status) => {
                snap.pedestrian = status.state;
                snap.pedestrian_request = status.has_request;
            }
        });
    }

    pub fn update(&self, change: impl FnOnce(&mut IntersectionSnapshot)) {
        let _delivery = relock(&self.delivery);
        let snap = {
            let mut latest = relock(&self.latest);
            change(&mut latest);
            latest.clone()
        };
        self.push(&snap);
    }

    /// Re-push the current snapshot unchanged.
    pub fn emit(&self) {
        if self.observer.is_some() {
            let _delivery = relock(&self.delivery);
            let snap = self.latest();
            self.push(&snap);
        }
    }

    pub fn latest(&self) -> IntersectionSnapshot {
        relock(&self.latest).clone()
    }

    fn push(&self, snap: &IntersectionSnapshot) {
        let Some(observer) = &self.observer else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| observer(snap))).is_err() {
            error!("Error in state change notification: observer panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lights::pedestrian::{PedestrianLightState, PedestrianStatus};
    use crate::lights::vehicle::VehicleLightState;
    use crate::models::phase::Phase;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};
    use std::thread;

    fn recording() -> (Arc<Mutex<Vec<IntersectionSnapshot>>>, StateObserver) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (
            seen,
            Arc::new(move |snap: &IntersectionSnapshot| sink.lock().unwrap().push(snap.clone())),
        )
    }

    #[test]
    fn light_events_land_in_matching_fields() {
        let (seen, observer) = recording();
        let hub = SnapshotHub::new(Some(observer));

        hub.apply(LightEvent::Vehicle {
            road: Road::Side,
            state: VehicleLightState::Red,
        });
        hub.apply(LightEvent::Pedestrian(PedestrianStatus {
            state: PedestrianLightState::Red,
            has_request: true,
        }));

        let latest = hub.latest();
        assert_eq!(latest.main_road, VehicleLightState::Yellow);
        assert_eq!(latest.side_road, VehicleLightState::Red);
        assert!(latest.pedestrian_request);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn heartbeat_repeats_latest() {
        let (seen, observer) = recording();
        let hub = SnapshotHub::new(Some(observer));
        hub.update(|snap| snap.set_phase(Phase::SideOnly));
        hub.emit();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[1].status_text, "Side road traffic flowing");
    }

    #[test]
    fn panicking_observer_does_not_break_the_hub() {
        let observer: StateObserver =
            Arc::new(|_: &IntersectionSnapshot| panic!("observer failure"));
        let hub = SnapshotHub::new(Some(observer));
        hub.update(|snap| snap.is_running = true);
        assert!(hub.latest().is_running);
    }

    #[test]
    fn works_without_observer() {
        let hub = SnapshotHub::new(None);
        hub.emit();
        hub.update(|snap| snap.pedestrian_request = true);
        assert!(hub.latest().pedestrian_request);
    }

    #[test]
    fn heartbeats_never_deliver_a_stale_snapshot() {
        let hub_cell: Arc<OnceLock<Weak<SnapshotHub>>> = Arc::new(OnceLock::new());
        let stale = Arc::new(AtomicUsize::new(0));
        let observer: StateObserver = {
            let hub_cell = Arc::clone(&hub_cell);
            let stale = Arc::clone(&stale);
            Arc::new(move |snap: &IntersectionSnapshot| {
                if let Some(hub) = hub_cell.get().and_then(Weak::upgrade) {
                    if hub.latest() != *snap {
                        stale.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        };
        let hub = Arc::new(SnapshotHub::new(Some(observer)));
        hub_cell.set(Arc::downgrade(&hub)).unwrap();

        let heartbeat = {
            let hub = Arc::clone(&hub);
            thread::spawn(move || {
                for _ in 0..2000 {
                    hub.emit();
                }
            })
        };
        for i in 0..2000 {
            hub.update(|snap| snap.pedestrian_request = i % 2 == 0);
        }
        heartbeat.join().unwrap();

        assert_eq!(stale.load(Ordering::SeqCst), 0);
    }
}
