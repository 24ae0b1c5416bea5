use crate::control_system::snapshot_hub::StateObserver;
use crate::global_variables::MIN_PHASE_DURATION;
use crate::models::phase::Phase;
use crate::models::snapshot::IntersectionSnapshot;
use log::warn;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    ConflictingGreens(IntersectionSnapshot),
    VehicleGreenDuringCrossing(IntersectionSnapshot),
    PhaseTooShort {
        from: Phase,
        to: Phase,
        held: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub phase: Phase,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct MonitorState {
    pushes: usize,
    last: Option<IntersectionSnapshot>,
    changes: Vec<IntersectionSnapshot>,
    transitions: Vec<PhaseChange>,
    violations: Vec<Violation>,
}

/// Observer that keeps the distinct snapshots it has seen and checks each
/// against the intersection safety rules.
#[derive(Debug, Default)]
pub struct SnapshotMonitor {
    state: Mutex<MonitorState>,
}

impl SnapshotMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn observer(self: &Arc<Self>) -> StateObserver {
        let monitor = Arc::clone(self);
        Arc::new(move |snap: &IntersectionSnapshot| monitor.observe(snap))
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn observe(&self, snap: &IntersectionSnapshot) {
        let mut state = self.state();
        state.pushes += 1;
        if state.last.as_ref() == Some(snap) {
            return;
        }

        if snap.has_conflicting_greens() {
            warn!("Potential conflict detected: both roads green");
            state.violations.push(Violation::ConflictingGreens(snap.clone()));
        }
        if snap.vehicle_green_during_crossing() {
            warn!("Potential conflict detected: vehicle green during crossing");
            state
                .violations
                .push(Violation::VehicleGreenDuringCrossing(snap.clone()));
        }

        let previous_phase = state.last.as_ref().map(|last| last.current_phase);
        if let Some(from) = previous_phase {
            if from != snap.current_phase {
                let now = Instant::now();
                if let Some(prev) = state.transitions.last().copied() {
                    let held = now.duration_since(prev.at);
                    if held < MIN_PHASE_DURATION {
                        warn!("Phase {from:?} held only {held:?}");
                        state.violations.push(Violation::PhaseTooShort {
                            from,
                            to: snap.current_phase,
                            held,
                        });
                    }
                }
                state.transitions.push(PhaseChange {
                    phase: snap.current_phase,
                    at: now,
                });
            }
        }

        state.changes.push(snap.clone());
        state.last = Some(snap.clone());
    }

    /// Number of pushes received, including unchanged heartbeats.
    pub fn pushes(&self) -> usize {
        self.state().pushes
    }

    pub fn latest(&self) -> Option<IntersectionSnapshot> {
        self.state().last.clone()
    }

    /// Distinct consecutive snapshots, oldest first.
    pub fn changes(&self) -> Vec<IntersectionSnapshot> {
        self.state().changes.clone()
    }

    pub fn transitions(&self) -> Vec<PhaseChange> {
        self.state().transitions.clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.state().transitions.iter().map(|t| t.phase).collect()
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.state().violations.clone()
    }
}
