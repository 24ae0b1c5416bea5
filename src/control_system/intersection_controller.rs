//! Phase state machine for a two-road intersection with a pedestrian crossing.
//!
//! One task drives the cycle at a time, suspending only inside
//! [`Scheduler::wait`]. Boundary calls (`stop`, `dispose`,
//! `request_pedestrian`) only touch the running flag, the epoch, the
//! pedestrian latch and the scheduler; every cycle step re-checks those
//! under the state lock before it writes a light.

use crate::config::timing::{TimingConfiguration, TimingSpec};
use crate::control_system::interlock::{self, Heads};
use crate::control_system::scheduler::Scheduler;
use crate::control_system::snapshot_hub::{SnapshotHub, StateObserver};
use crate::error::ControllerError;
use crate::global_variables::{MIN_PHASE_DURATION, STATE_UPDATE_INTERVAL};
use crate::lights::pedestrian::{
    PedestrianLightController, PedestrianLightState, PedestrianStatus, PedestrianUpdate,
};
use crate::lights::vehicle::{Road, VehicleLightController, VehicleLightState};
use crate::lights::{LightController, LightId, LightListener, LightView};
use crate::models::phase::Phase;
use crate::models::snapshot::IntersectionSnapshot;
use log::{debug, error, info, warn};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

struct Core {
    main: VehicleLightController,
    side: VehicleLightController,
    pedestrian: PedestrianLightController,
    hub: Arc<SnapshotHub>,
    phase: Phase,
    running: bool,
    disposed: bool,
    // Bumped by start/stop/dispose; a cycle or blink loop only acts on its own epoch.
    epoch: u64,
    last_phase_change: Option<Instant>,
    blink_on: bool,
}

impl Core {
    fn heads(&self) -> Heads {
        Heads {
            main: self.main.get_state(),
            side: self.side.get_state(),
            pedestrian: self.pedestrian.get_state().state,
        }
    }

    fn set_vehicle(&mut self, road: Road, state: VehicleLightState) -> Result<(), ControllerError> {
        interlock::check_vehicle_write(&self.heads(), road, state)?;
        match road {
            Road::Main => self.main.set_state(state),
            Road::Side => self.side.set_state(state),
        }
        Ok(())
    }

    fn set_pedestrian(&mut self, update: PedestrianUpdate) -> Result<(), ControllerError> {
        if let Some(state) = update.state {
            interlock::check_pedestrian_write(&self.heads(), state)?;
        }
        self.pedestrian.set_state(update);
        Ok(())
    }

    fn floor_remaining(&self, next: Phase, now: Instant) -> Duration {
        if next == self.phase {
            return Duration::ZERO;
        }
        match self.last_phase_change {
            Some(changed) => MIN_PHASE_DURATION.saturating_sub(now.saturating_duration_since(changed)),
            None => Duration::ZERO,
        }
    }

    fn record_phase(&mut self, phase: Phase) {
        if phase != self.phase {
            info!("Phase {:?} -> {:?}: {}", self.phase, phase, phase.description());
            self.phase = phase;
            self.last_phase_change = Some(Instant::now());
        }
        self.hub.update(|snap| snap.set_phase(phase));
    }

    fn set_phase(&mut self, phase: Phase) -> Result<(), ControllerError> {
        interlock::check_phase(&self.heads(), phase)?;
        self.record_phase(phase);
        Ok(())
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
        self.hub.update(|snap| snap.is_running = running);
    }

    /// All red, latch cleared, phase stopped.
    fn reset_to_safe_state(&mut self) {
        self.main.set_state(VehicleLightState::Red);
        self.side.set_state(VehicleLightState::Red);
        self.pedestrian
            .set_state(PedestrianUpdate::state_clearing_request(PedestrianLightState::Red));
        self.record_phase(Phase::Stopped);
    }

    fn show_warning(&mut self, on: bool) {
        let (vehicle, pedestrian) = if on {
            (VehicleLightState::Yellow, PedestrianLightState::Red)
        } else {
            (VehicleLightState::Off, PedestrianLightState::Off)
        };
        self.blink_on = on;
        self.main.set_state(vehicle);
        self.side.set_state(vehicle);
        self.pedestrian
            .set_state(PedestrianUpdate::state_clearing_request(pedestrian));
    }

    fn enter_idle(&mut self) {
        self.show_warning(true);
        self.record_phase(Phase::Stopped);
    }

    fn open_main_road(&mut self) -> Result<(), ControllerError> {
        self.set_vehicle(Road::Side, VehicleLightState::Red)?;
        self.set_pedestrian(PedestrianUpdate::state(PedestrianLightState::Red))?;
        self.set_vehicle(Road::Main, VehicleLightState::Green)
    }
}

struct Shared {
    core: Mutex<Core>,
    hub: Arc<SnapshotHub>,
    scheduler: Scheduler,
    timing: TimingConfiguration,
    runtime: Handle,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn stop_heartbeat(&self) {
        let handle = self
            .heartbeat
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.stop_heartbeat();
    }
}

/// Why a cycle step gave up.
enum Interrupt {
    /// Stopped, disposed or superseded by a newer start.
    Halted,
    Fault(ControllerError),
}

impl From<ControllerError> for Interrupt {
    fn from(err: ControllerError) -> Self {
        Interrupt::Fault(err)
    }
}

/// Handle to an intersection controller. Clones share the same intersection.
#[derive(Clone)]
pub struct IntersectionController {
    shared: Arc<Shared>,
}

impl IntersectionController {
    /// Validate `timing` and build a stopped controller showing the warning lights.
    /// Must be called inside a tokio runtime.
    pub fn new(
        on_state_change: Option<StateObserver>,
        timing: TimingSpec,
    ) -> Result<Self, ControllerError> {
        let timing = TimingConfiguration::try_from(timing)?;
        Self::with_config(on_state_change, timing)
    }

    pub fn with_config(
        on_state_change: Option<StateObserver>,
        timing: TimingConfiguration,
    ) -> Result<Self, ControllerError> {
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;

        let hub = Arc::new(SnapshotHub::new(on_state_change));
        let listener: LightListener = {
            let hub = Arc::clone(&hub);
            Arc::new(move |event| hub.apply(event))
        };

        let mut core = Core {
            main: VehicleLightController::new(
                Road::Main,
                VehicleLightState::Yellow,
                Arc::clone(&listener),
            ),
            side: VehicleLightController::new(
                Road::Side,
                VehicleLightState::Yellow,
                Arc::clone(&listener),
            ),
            pedestrian: PedestrianLightController::new(PedestrianLightState::Red, listener),
            hub: Arc::clone(&hub),
            phase: Phase::Stopped,
            running: false,
            disposed: false,
            epoch: 0,
            last_phase_change: None,
            blink_on: true,
        };
        core.enter_idle();

        let controller = Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                hub,
                scheduler: Scheduler::new(),
                timing,
                runtime,
                heartbeat: Mutex::new(None),
            }),
        };
        controller.spawn_heartbeat();
        controller.spawn_blink(0);
        Ok(controller)
    }

    pub fn with_defaults(on_state_change: Option<StateObserver>) -> Result<Self, ControllerError> {
        Self::with_config(on_state_change, TimingConfiguration::default())
    }

    fn core(&self) -> Result<MutexGuard<'_, Core>, ControllerError> {
        self.shared.core.lock().map_err(|_| ControllerError::Poisoned)
    }

    fn core_recovering(&self) -> MutexGuard<'_, Core> {
        self.shared
            .core
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run the cycle until stopped. Returns `Err` after a fault, by which
    /// point all lights are already red and the controller is stopped.
    pub async fn start(&self) -> Result<(), ControllerError> {
        let epoch = {
            let mut core = self.core()?;
            if core.disposed {
                return Err(ControllerError::Disposed);
            }
            if core.running {
                return Ok(());
            }
            self.shared.scheduler.cancel_all();
            core.epoch += 1;
            core.set_running(true);
            core.epoch
        };
        info!("Starting traffic light system");

        match self.run(epoch).await {
            Interrupt::Halted => {
                debug!("Traffic light cycle {epoch} halted");
                Ok(())
            }
            Interrupt::Fault(err) => {
                error!("Error in traffic light cycle: {err}");
                let mut core = self.core_recovering();
                if core.epoch == epoch && !core.disposed {
                    core.reset_to_safe_state();
                    core.set_running(false);
                }
                Err(err)
            }
        }
    }

    /// Halt the cycle and show the warning lights. The `Stopped` phase still
    /// waits out the minimum phase duration.
    pub async fn stop(&self) -> Result<(), ControllerError> {
        let (epoch, floor) = {
            let mut core = self.core()?;
            if core.disposed {
                return Err(ControllerError::Disposed);
            }
            self.shared.scheduler.cancel_all();
            core.epoch += 1;
            if core.running {
                info!("Stopping traffic light system");
            }
            core.set_running(false);
            (core.epoch, core.floor_remaining(Phase::Stopped, Instant::now()))
        };

        if !floor.is_zero() && self.shared.scheduler.wait(floor).await.is_cancelled() {
            debug!("Stop {epoch} superseded while waiting out phase floor");
            return Ok(());
        }

        {
            let mut core = self.core()?;
            if core.disposed || core.epoch != epoch {
                return Ok(());
            }
            core.enter_idle();
        }
        self.spawn_blink(epoch);
        Ok(())
    }

    /// Terminal: cancel everything, force all red, stop pushing heartbeats.
    pub fn dispose(&self) -> Result<(), ControllerError> {
        {
            let mut core = self.core()?;
            if core.disposed {
                return Ok(());
            }
            self.shared.scheduler.cancel_all();
            core.epoch += 1;
            core.disposed = true;
            core.reset_to_safe_state();
            core.set_running(false);
        }
        self.shared.stop_heartbeat();
        info!("Traffic light system disposed");
        Ok(())
    }

    /// Latch a crossing request. Ignored while stopped or while a crossing
    /// is already running or scheduled. Never fails.
    pub fn request_pedestrian(&self) {
        let mut core = match self.core() {
            Ok(core) => core,
            Err(err) => {
                warn!("Failed to process pedestrian request: {err}");
                return;
            }
        };
        if !core.running || core.disposed {
            debug!("Pedestrian request ignored: system not running");
            return;
        }
        if core.phase.crossing_in_progress() {
            debug!("Pedestrian request ignored during {:?}", core.phase);
            return;
        }
        core.pedestrian.set_request(true);
    }

    pub fn get_state(&self) -> IntersectionSnapshot {
        self.shared.hub.latest()
    }

    /// Read from the published snapshot, so observers may call it too.
    pub fn light(&self, id: LightId) -> LightView {
        let snap = self.shared.hub.latest();
        match id {
            LightId::MainRoad => LightView::Vehicle {
                road: Road::Main,
                state: snap.main_road,
            },
            LightId::SideRoad => LightView::Vehicle {
                road: Road::Side,
                state: snap.side_road,
            },
            LightId::Pedestrian => LightView::Pedestrian(PedestrianStatus {
                state: snap.pedestrian,
                has_request: snap.pedestrian_request,
            }),
        }
    }

    // --- background tasks -------------------------------------------------

    fn spawn_heartbeat(&self) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let handle = self.shared.runtime.spawn(async move {
            let mut ticker = interval(STATE_UPDATE_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(shared) => shared.hub.emit(),
                    None => break,
                }
            }
        });
        *self
            .shared
            .heartbeat
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
    }

    fn spawn_blink(&self, epoch: u64) {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let scheduler = self.shared.scheduler.clone();
        let period = self.shared.timing.blink_interval();
        self.shared.runtime.spawn(async move {
            loop {
                if scheduler.wait(period).await.is_cancelled() {
                    break;
                }
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let Ok(mut core) = shared.core.lock() else {
                    break;
                };
                if core.running || core.disposed || core.epoch != epoch {
                    break;
                }
                let on = !core.blink_on;
                core.show_warning(on);
            }
        });
    }

    // --- cycle --------------------------------------------------------------

    /// Lock the state and run `f` only if cycle `epoch` still owns the lights.
    fn act<T>(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut Core) -> Result<T, ControllerError>,
    ) -> Result<T, Interrupt> {
        let mut core = self.core()?;
        if !core.running || core.disposed || core.epoch != epoch {
            return Err(Interrupt::Halted);
        }
        Ok(f(&mut core)?)
    }

    async fn hold(&self, duration: Duration) -> Result<(), Interrupt> {
        if self.shared.scheduler.wait(duration).await.is_cancelled() {
            return Err(Interrupt::Halted);
        }
        Ok(())
    }

    /// Wait out the phase floor, apply `lights`, enter `phase`, then hold.
    async fn enter_phase(
        &self,
        epoch: u64,
        phase: Phase,
        lights: impl FnOnce(&mut Core) -> Result<(), ControllerError>,
        hold: Duration,
    ) -> Result<(), Interrupt> {
        let floor = self.act(epoch, |core| Ok(core.floor_remaining(phase, Instant::now())))?;
        if !floor.is_zero() {
            debug!("Holding {floor:?} before {phase:?} to respect minimum phase duration");
            self.hold(floor).await?;
        }
        self.act(epoch, |core| {
            lights(core)?;
            core.set_phase(phase)
        })?;
        if !hold.is_zero() {
            self.hold(hold).await?;
        }
        Ok(())
    }

    /// Reset to the safe state if `fut` faults, then pass the outcome on.
    async fn step(
        &self,
        name: &'static str,
        fut: impl Future<Output = Result<(), Interrupt>>,
    ) -> Result<(), Interrupt> {
        let outcome = fut.await;
        if let Err(Interrupt::Fault(err)) = &outcome {
            error!("Error {name}: {err}");
            self.core_recovering().reset_to_safe_state();
        }
        outcome
    }

    async fn run(&self, epoch: u64) -> Interrupt {
        let opened = self
            .step(
                "starting traffic light system",
                self.enter_phase(epoch, Phase::MainOnly, Core::open_main_road, Duration::ZERO),
            )
            .await;
        if let Err(interrupt) = opened {
            return interrupt;
        }
        loop {
            if let Err(interrupt) = self.cycle_once(epoch).await {
                return interrupt;
            }
        }
    }

    fn crossing_requested(&self, epoch: u64) -> Result<bool, Interrupt> {
        self.act(epoch, |core| Ok(core.pedestrian.has_request()))
    }

    async fn cycle_once(&self, epoch: u64) -> Result<(), Interrupt> {
        self.step("handling main road phase", self.main_road_phase(epoch))
            .await?;

        let crossing = self.crossing_requested(epoch)?;
        self.step("closing main road", self.close_main_road(epoch))
            .await?;
        if crossing {
            self.step("handling pedestrian phase", self.pedestrian_phase(epoch))
                .await?;
        }
        self.step("transitioning to side road", self.transition_to_side_road(epoch))
            .await?;

        let crossing = self.crossing_requested(epoch)?;
        self.step("closing side road", self.close_side_road(epoch, crossing))
            .await?;
        if crossing {
            self.step("handling pedestrian phase", self.pedestrian_phase(epoch))
                .await?;
        }
        self.step("transitioning to main road", self.transition_to_main_road(epoch))
            .await
    }

    async fn main_road_phase(&self, epoch: u64) -> Result<(), Interrupt> {
        let green = self.shared.timing.main_road().green;
        self.enter_phase(epoch, Phase::MainOnly, Core::open_main_road, green)
            .await
    }

    async fn close_main_road(&self, epoch: u64) -> Result<(), Interrupt> {
        let main = self.shared.timing.main_road();
        self.act(epoch, |core| {
            core.set_vehicle(Road::Main, VehicleLightState::Yellow)
        })?;
        self.hold(main.yellow).await?;
        self.enter_phase(
            epoch,
            Phase::MainToSide,
            |core| core.set_vehicle(Road::Main, VehicleLightState::Red),
            main.red,
        )
        .await
    }

    async fn pedestrian_phase(&self, epoch: u64) -> Result<(), Interrupt> {
        let pedestrian = self.shared.timing.pedestrian();
        self.enter_phase(
            epoch,
            Phase::PedOnly,
            |core| {
                core.set_pedestrian(PedestrianUpdate::state_clearing_request(
                    PedestrianLightState::Green,
                ))
            },
            pedestrian.green,
        )
        .await?;
        self.enter_phase(
            epoch,
            Phase::PedToSide,
            |core| core.set_pedestrian(PedestrianUpdate::state(PedestrianLightState::Red)),
            pedestrian.transition,
        )
        .await
    }

    async fn transition_to_side_road(&self, epoch: u64) -> Result<(), Interrupt> {
        let side = self.shared.timing.default_road();
        self.act(epoch, |core| {
            core.set_vehicle(Road::Side, VehicleLightState::RedYellow)
        })?;
        self.hold(side.red_yellow).await?;
        self.enter_phase(
            epoch,
            Phase::SideOnly,
            |core| core.set_vehicle(Road::Side, VehicleLightState::Green),
            side.green,
        )
        .await
    }

    async fn close_side_road(&self, epoch: u64, crossing: bool) -> Result<(), Interrupt> {
        let side = self.shared.timing.default_road();
        let next = if crossing {
            Phase::SideToPed
        } else {
            Phase::SideToMain
        };
        self.act(epoch, |core| {
            core.set_vehicle(Road::Side, VehicleLightState::Yellow)
        })?;
        self.hold(side.yellow).await?;
        self.enter_phase(
            epoch,
            next,
            |core| core.set_vehicle(Road::Side, VehicleLightState::Red),
            side.red,
        )
        .await
    }

    /// Ends with the main road at red-yellow; the next main phase grants green.
    async fn transition_to_main_road(&self, epoch: u64) -> Result<(), Interrupt> {
        let main = self.shared.timing.main_road();
        self.act(epoch, |core| {
            core.set_vehicle(Road::Main, VehicleLightState::RedYellow)
        })?;
        self.hold(main.red_yellow).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use tokio::time::sleep;

    fn recording() -> (Arc<Mutex<Vec<IntersectionSnapshot>>>, StateObserver) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (
            seen,
            Arc::new(move |snap: &IntersectionSnapshot| sink.lock().unwrap().push(snap.clone())),
        )
    }

    #[test]
    fn construction_outside_runtime_is_rejected() {
        assert!(matches!(
            IntersectionController::with_defaults(None),
            Err(ControllerError::NoRuntime)
        ));
    }

    #[test]
    fn invalid_timing_fails_before_runtime_is_needed() {
        let mut spec = TimingSpec::default();
        spec.pedestrian.green = Some(1000);
        assert!(matches!(
            IntersectionController::new(None, spec),
            Err(ControllerError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn floor_remaining_counts_from_last_change() {
        let controller = IntersectionController::with_defaults(None).unwrap();
        let mut core = controller.core().unwrap();
        let now = Instant::now();
        assert_eq!(core.floor_remaining(Phase::MainOnly, now), Duration::ZERO);

        core.last_phase_change = Some(now);
        assert_eq!(
            core.floor_remaining(Phase::MainOnly, now + Duration::from_millis(300)),
            Duration::from_millis(700)
        );
        assert_eq!(
            core.floor_remaining(Phase::MainOnly, now + Duration::from_secs(3)),
            Duration::ZERO
        );
        assert_eq!(core.floor_remaining(Phase::Stopped, now), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn blink_loop_alternates_while_stopped() {
        let controller = IntersectionController::with_defaults(None).unwrap();
        assert_eq!(controller.get_state().main_road, VehicleLightState::Yellow);

        sleep(Duration::from_millis(550)).await;
        let off = controller.get_state();
        assert_eq!(off.main_road, VehicleLightState::Off);
        assert_eq!(off.side_road, VehicleLightState::Off);
        assert_eq!(off.pedestrian, PedestrianLightState::Off);

        sleep(Duration::from_millis(500)).await;
        let on = controller.get_state();
        assert_eq!(on.main_road, VehicleLightState::Yellow);
        assert_eq!(on.pedestrian, PedestrianLightState::Red);
        assert_eq!(on.current_phase, Phase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_pushes_without_changes() {
        let (seen, observer) = recording();
        let controller = IntersectionController::with_defaults(Some(observer)).unwrap();
        let before = seen.lock().unwrap().len();
        sleep(Duration::from_millis(350)).await;
        let after = seen.lock().unwrap().len();
        // Three heartbeats plus at most one blink toggle per head.
        assert!(after - before >= 3, "only {} pushes", after - before);
        controller.dispose().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn fault_resets_to_all_red_and_surfaces_error() {
        let (seen, observer) = recording();
        let controller = IntersectionController::with_defaults(Some(observer)).unwrap();
        let runner = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start().await })
        };

        sleep(Duration::from_millis(100)).await;
        // Stuck side head: bypasses the interlock like a failed relay would.
        controller
            .core()
            .unwrap()
            .side
            .set_state(VehicleLightState::Green);

        let result = runner.await.unwrap();
        assert!(matches!(
            result,
            Err(ControllerError::PhaseMismatch {
                phase: Phase::MainToSide,
                ..
            })
        ));

        let state = controller.get_state();
        assert!(state.all_stop());
        assert!(!state.pedestrian_request);
        assert_eq!(state.current_phase, Phase::Stopped);
        assert!(!state.is_running);
        assert_eq!(seen.lock().unwrap().last(), Some(&state));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_fault() {
        let controller = IntersectionController::with_defaults(None).unwrap();
        let runner = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start().await })
        };
        sleep(Duration::from_millis(100)).await;
        controller
            .core()
            .unwrap()
            .pedestrian
            .set_state(PedestrianUpdate::state(PedestrianLightState::Green));
        assert!(runner.await.unwrap().is_err());

        let runner = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start().await })
        };
        sleep(Duration::from_millis(1500)).await;
        let state = controller.get_state();
        assert!(state.is_running);
        assert_eq!(state.current_phase, Phase::MainOnly);
        assert_eq!(state.main_road, VehicleLightState::Green);

        controller.stop().await.unwrap();
        assert!(runner.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn light_views_are_read_only_copies() {
        let controller = IntersectionController::with_defaults(None).unwrap();
        let main = controller.light(LightId::MainRoad);
        assert!(main.has_request().is_err());
        assert_eq!(main.id(), LightId::MainRoad);
        let pedestrian = controller.light(LightId::Pedestrian);
        assert_eq!(pedestrian.has_request(), Ok(false));
    }

    #[tokio::test(start_paused = true)]
    async fn observer_can_read_single_lights() {
        let handle: Arc<OnceLock<IntersectionController>> = Arc::new(OnceLock::new());
        let views = Arc::new(Mutex::new(Vec::new()));
        let observer: StateObserver = {
            let handle = Arc::clone(&handle);
            let views = Arc::clone(&views);
            Arc::new(move |snap: &IntersectionSnapshot| {
                if let Some(controller) = handle.get() {
                    let main = controller.light(LightId::MainRoad);
                    views.lock().unwrap().push((main, snap.main_road));
                }
            })
        };
        let controller = IntersectionController::with_defaults(Some(observer)).unwrap();
        assert!(handle.set(controller.clone()).is_ok());

        let runner = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start().await })
        };
        sleep(Duration::from_millis(300)).await;
        controller.stop().await.unwrap();
        assert!(runner.await.unwrap().is_ok());

        let views = views.lock().unwrap();
        assert!(!views.is_empty());
        for (view, shown) in views.iter() {
            assert_eq!(
                *view,
                LightView::Vehicle {
                    road: Road::Main,
                    state: *shown
                }
            );
        }
        assert!(views
            .iter()
            .any(|(_, shown)| *shown == VehicleLightState::Green));
        drop(views);
        controller.dispose().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_keeps_pushing_while_running() {
        let (seen, observer) = recording();
        let controller = IntersectionController::with_defaults(Some(observer)).unwrap();
        let runner = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start().await })
        };

        // Main green holds until 5000 ms here, so every push is a heartbeat.
        sleep(Duration::from_millis(1000)).await;
        let before = seen.lock().unwrap().len();
        sleep(Duration::from_millis(1000)).await;
        let pushed: Vec<IntersectionSnapshot> = seen.lock().unwrap()[before..].to_vec();

        assert!(pushed.len() >= 9, "only {} pushes", pushed.len());
        for snap in &pushed {
            assert!(snap.is_running);
            assert_eq!(snap.current_phase, Phase::MainOnly);
            assert_eq!(snap.main_road, VehicleLightState::Green);
        }

        controller.stop().await.unwrap();
        assert!(runner.await.unwrap().is_ok());
        controller.dispose().unwrap();
    }
}
