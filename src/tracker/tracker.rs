use chrono::Utc;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::error::TrackerError;
use super::oracle;
use super::types::{Fix, Position, TrackingState};
use crate::ephemeris::{Ephemeris, Observer, SatelliteTarget};
use crate::motor::{Axis, MotorController, MountLimits};
use crate::predict::{LocalZone, PassPredictor};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct WorkerHandle {
    name: &'static str,
    join: JoinHandle<()>,
}

/// Follows one satellite: a position loop publishes where it is, a tracking
/// loop points the mount at it.
///
/// Both loops run until [`Tracker::stop`] (or until the tracker is dropped).
pub struct Tracker {
    observer: Observer,
    target: SatelliteTarget,
    ephemeris: Arc<dyn Ephemeris>,
    state_tx: Arc<watch::Sender<TrackingState>>,
    stop_tx: watch::Sender<bool>,
    controller: Option<Arc<StdMutex<MotorController>>>,
    limits: Option<MountLimits>,
    require_observable: bool,
    interval: Duration,
    workers: Vec<WorkerHandle>,
}

impl Tracker {
    pub fn new(observer: Observer, target: SatelliteTarget, ephemeris: Arc<dyn Ephemeris>) -> Self {
        let (state_tx, _) = watch::channel(TrackingState::default());
        let (stop_tx, _) = watch::channel(false);
        Self {
            observer,
            target,
            ephemeris,
            state_tx: Arc::new(state_tx),
            stop_tx,
            controller: None,
            limits: None,
            require_observable: true,
            interval: DEFAULT_INTERVAL,
            workers: Vec::new(),
        }
    }

    /// Whether the mount holds still while the target is below the horizon.
    pub fn require_observable(mut self, require: bool) -> Self {
        self.require_observable = require;
        self
    }

    pub fn target(&self) -> &SatelliteTarget {
        &self.target
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Homes both motors and keeps the controller for the tracking loop.
    pub fn connect_servos(&mut self, mut controller: MotorController) -> Result<(), TrackerError> {
        if self.is_running("tracking") {
            return Err(TrackerError::AlreadyRunning("tracking"));
        }
        controller.initialize()?;
        self.limits = Some(controller.limits());
        self.controller = Some(Arc::new(StdMutex::new(controller)));
        log::info!("Servos connected and homed");
        Ok(())
    }

    /// Starts recomputing the target position every `interval`.
    pub fn begin_computing(&mut self, interval: Duration) -> Result<(), TrackerError> {
        if self.is_running("position") {
            return Err(TrackerError::AlreadyRunning("position"));
        }
        self.interval = interval;

        let join = tokio::spawn(run_position_loop(
            self.ephemeris.clone(),
            self.target.clone(),
            self.observer,
            self.state_tx.clone(),
            interval,
            self.stop_tx.subscribe(),
        ));
        self.workers.push(WorkerHandle {
            name: "position",
            join,
        });

        log::info!("Computing position of {} every {:?}", self.target.id(), interval);
        Ok(())
    }

    /// Starts commanding the servos. `interval` defaults to the computing interval.
    pub fn begin_tracking(&mut self, interval: Option<Duration>) -> Result<(), TrackerError> {
        if self.is_running("tracking") {
            return Err(TrackerError::AlreadyRunning("tracking"));
        }
        let controller = self.controller.clone().ok_or(TrackerError::NotConnected)?;
        let interval = interval.unwrap_or(self.interval);

        let join = tokio::spawn(run_tracking_loop(
            controller,
            self.state_tx.subscribe(),
            self.observer,
            self.require_observable,
            interval,
            self.stop_tx.subscribe(),
        ));
        self.workers.push(WorkerHandle {
            name: "tracking",
            join,
        });

        log::info!("Tracking {} every {:?}", self.target.id(), interval);
        Ok(())
    }

    /// Signals both loops and waits for them. No motor command is sent once this returns.
    pub async fn stop(&mut self) {
        self.stop_tx.send_replace(true);
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.join.await {
                log::error!("{} loop ended abnormally: {}", worker.name, e);
            }
        }
        self.stop_tx.send_replace(false);

        if let Some(controller) = &self.controller {
            let controller = controller.lock().unwrap();
            log::info!(
                "Tracker stopped, mount at azimuth {} altitude {}",
                controller.motor(Axis::Azimuth).current_pos(),
                controller.motor(Axis::Altitude).current_pos()
            );
        } else {
            log::info!("Tracker stopped");
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackingState> {
        self.state_tx.subscribe()
    }

    pub fn is_observable(&self) -> bool {
        oracle::is_observable(&self.state(), &self.observer)
    }

    pub fn is_trackable(&self) -> Result<bool, TrackerError> {
        let limits = self.limits.ok_or(TrackerError::NotConnected)?;
        Ok(oracle::is_trackable(&self.state(), &limits))
    }

    /// A predictor over copies of this tracker's observer and element set.
    pub fn predictor(&self, zone: LocalZone) -> PassPredictor {
        PassPredictor::new(
            self.observer,
            self.target.clone(),
            self.ephemeris.clone(),
            zone,
        )
    }

    fn is_running(&self, name: &str) -> bool {
        self.workers
            .iter()
            .any(|w| w.name == name && !w.join.is_finished())
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

async fn run_position_loop(
    ephemeris: Arc<dyn Ephemeris>,
    target: SatelliteTarget,
    mut observer: Observer,
    state_tx: Arc<watch::Sender<TrackingState>>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut cycle = 0;
    let mut was_active = false;

    while !stop_requested(&stop_rx) {
        cycle += 1;
        observer.date = Utc::now();
        let state = compute_position(ephemeris.as_ref(), &target, &observer, cycle);

        match (&state.fix, was_active) {
            (Fix::Active(_), false) => log::info!("{} position available", target.id()),
            (Fix::Inactive(reason), true) => {
                log::warn!("{} position unavailable: {}", target.id(), reason)
            }
            _ => {}
        }
        was_active = state.is_active();
        state_tx.send_replace(state);

        if wait_or_stop(interval, &mut stop_rx).await {
            break;
        }
    }
}

/// One position update. Failures become an inactive fix rather than an error.
fn compute_position(
    ephemeris: &dyn Ephemeris,
    target: &SatelliteTarget,
    observer: &Observer,
    cycle: u64,
) -> TrackingState {
    let fix = match ephemeris.look_at(target, observer) {
        Ok(angles) => Fix::Active(Position::from(angles)),
        Err(e) => {
            log::debug!("Position update {} failed: {}", cycle, e);
            Fix::Inactive(e.to_string())
        }
    };
    TrackingState {
        cycle,
        updated: Some(observer.date),
        fix,
    }
}

async fn run_tracking_loop(
    controller: Arc<StdMutex<MotorController>>,
    state_rx: watch::Receiver<TrackingState>,
    observer: Observer,
    require_observable: bool,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    while !stop_requested(&stop_rx) {
        let snapshot = state_rx.borrow().clone();

        let controller = controller.clone();
        let stop = stop_rx.clone();
        let cycle = tokio::task::spawn_blocking(move || {
            track_cycle(&controller, &snapshot, &observer, require_observable, &stop)
        });
        if let Err(e) = cycle.await {
            log::error!("Tracking cycle panicked: {}", e);
            break;
        }

        if wait_or_stop(interval, &mut stop_rx).await {
            break;
        }
    }
}

/// Points both axes at one snapshot. Returns the commands that were sent.
fn track_cycle(
    controller: &StdMutex<MotorController>,
    state: &TrackingState,
    observer: &Observer,
    require_observable: bool,
    stop_rx: &watch::Receiver<bool>,
) -> Vec<(Axis, i32)> {
    let Some(position) = state.position() else {
        return Vec::new();
    };
    if require_observable && !oracle::is_observable(state, observer) {
        return Vec::new();
    }

    let mut controller = controller.lock().unwrap();
    let mut issued = Vec::new();

    for (axis, target) in [
        (Axis::Azimuth, position.azimuth_deg),
        (Axis::Altitude, position.altitude_deg),
    ] {
        if stop_requested(stop_rx) {
            break;
        }
        match controller.track(axis, target) {
            Ok(Some(angle)) => issued.push((axis, angle)),
            Ok(None) => {}
            Err(e) => log::error!("Failed to move {} motor to {:.2}: {}", axis, target, e),
        }
    }

    issued
}

fn stop_requested(stop_rx: &watch::Receiver<bool>) -> bool {
    *stop_rx.borrow() || stop_rx.has_changed().is_err()
}

/// Sleeps for `interval`, waking early on stop. Returns whether to stop.
async fn wait_or_stop(interval: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;
        changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
        _ = sleep(interval) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::mock::{degrees, CountingEphemeris, ScriptedEphemeris, ISS_TLE};
    use crate::motor::mock::MemoryTransport;
    use crate::motor::MotorConfig;
    use std::collections::HashSet;

    fn observer() -> Observer {
        Observer::new(36.1486, -86.8050, 182.0)
    }

    fn target() -> SatelliteTarget {
        SatelliteTarget::parse(ISS_TLE).unwrap()
    }

    fn controller() -> (StdMutex<MotorController>, MemoryTransport) {
        let link = MemoryTransport::default();
        let limits = MountLimits {
            azimuth: MotorConfig::default(),
            altitude: MotorConfig::default(),
        };
        let ctl = MotorController::new(Box::new(link.clone()), limits);
        (StdMutex::new(ctl), link)
    }

    fn running() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        std::mem::forget(tx);
        rx
    }

    #[test]
    fn test_two_tick_scenario() {
        let eph = ScriptedEphemeris::new([Some(degrees(10.0, 5.0)), Some(degrees(9.4, 5.0))]);
        let (ctl, link) = controller();
        let stop = running();

        let tick1 = compute_position(&eph, &target(), &observer(), 1);
        let issued = track_cycle(&ctl, &tick1, &observer(), true, &stop);
        assert!(issued.contains(&(Axis::Azimuth, 10)));
        assert_eq!(link.angles_for(0), vec![10]);

        let tick2 = compute_position(&eph, &target(), &observer(), 2);
        let issued = track_cycle(&ctl, &tick2, &observer(), true, &stop);
        assert!(issued.is_empty());
        assert_eq!(link.angles_for(0), vec![10]);
    }

    #[test]
    fn test_deadband_uses_unrounded_angle() {
        let eph = ScriptedEphemeris::new([Some(degrees(10.996, 20.3))]);
        let (ctl, link) = controller();
        ctl.lock().unwrap().move_axis(Axis::Azimuth, 10).unwrap();
        ctl.lock().unwrap().move_axis(Axis::Altitude, 20).unwrap();
        link.clear();

        let state = compute_position(&eph, &target(), &observer(), 1);
        let issued = track_cycle(&ctl, &state, &observer(), true, &running());

        assert!(issued.is_empty());
        assert!(link.frames().is_empty());
    }

    #[test]
    fn test_just_below_horizon_is_held() {
        let eph = ScriptedEphemeris::new([Some(degrees(100.0, -0.004))]);
        let (ctl, link) = controller();

        let state = compute_position(&eph, &target(), &observer(), 1);
        assert!(!oracle::is_observable(&state, &observer()));
        assert!(track_cycle(&ctl, &state, &observer(), true, &running()).is_empty());
        assert!(link.frames().is_empty());
    }

    #[test]
    fn test_inactive_state_issues_nothing() {
        let (ctl, link) = controller();
        let issued = track_cycle(&ctl, &TrackingState::default(), &observer(), false, &running());
        assert!(issued.is_empty());
        assert!(link.frames().is_empty());
    }

    #[test]
    fn test_below_horizon_held_unless_allowed() {
        let eph = ScriptedEphemeris::new([Some(degrees(120.5, -3.0))]);
        let state = compute_position(&eph, &target(), &observer(), 1);
        let (ctl, link) = controller();

        assert!(track_cycle(&ctl, &state, &observer(), true, &running()).is_empty());
        assert!(link.frames().is_empty());

        // Altitude -3 truncates to -3, out of the altitude range; azimuth still moves.
        let issued = track_cycle(&ctl, &state, &observer(), false, &running());
        assert_eq!(issued, vec![(Axis::Azimuth, 120)]);
        assert_eq!(ctl.lock().unwrap().motor(Axis::Altitude).current_pos(), 0);
    }

    #[test]
    fn test_stop_requested_before_commands() {
        let eph = ScriptedEphemeris::new([Some(degrees(50.0, 50.0))]);
        let state = compute_position(&eph, &target(), &observer(), 1);
        let (ctl, link) = controller();
        let (stop_tx, stop_rx) = watch::channel(false);
        stop_tx.send_replace(true);

        assert!(track_cycle(&ctl, &state, &observer(), true, &stop_rx).is_empty());
        assert!(link.frames().is_empty());
    }

    #[test]
    fn test_failures_degrade_and_heal() {
        let eph = ScriptedEphemeris::new([Some(degrees(10.0, 20.0)), None, Some(degrees(11.0, 21.0))]);
        let states: Vec<_> = (1..=3)
            .map(|cycle| compute_position(&eph, &target(), &observer(), cycle))
            .collect();

        assert!(states[0].is_active());
        assert!(matches!(&states[1].fix, Fix::Inactive(reason) if reason.contains("scripted")));
        assert!(states[2].is_active());
        assert_eq!(states[2].cycle, 3);
    }

    #[tokio::test]
    async fn test_connect_homes_and_predicates() {
        let eph = Arc::new(ScriptedEphemeris::new([Some(degrees(10.0, 5.0))]));
        let mut tracker = Tracker::new(observer(), target(), eph);
        assert!(matches!(tracker.is_trackable(), Err(TrackerError::NotConnected)));
        assert!(matches!(tracker.begin_tracking(None), Err(TrackerError::NotConnected)));

        let link = MemoryTransport::default();
        let limits = MountLimits {
            azimuth: MotorConfig::default(),
            altitude: MotorConfig::default(),
        };
        tracker
            .connect_servos(MotorController::new(Box::new(link.clone()), limits))
            .unwrap();
        assert_eq!(link.frames(), vec![vec![0xFF, 0, 0], vec![0xFF, 1, 0]]);
        assert!(!tracker.is_observable());
        assert!(!tracker.is_trackable().unwrap());

        let mut rx = tracker.subscribe();
        tracker.begin_computing(Duration::from_millis(5)).unwrap();
        rx.changed().await.unwrap();
        assert!(tracker.is_observable());
        assert!(tracker.is_trackable().unwrap());

        tracker.stop().await;
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let eph = Arc::new(ScriptedEphemeris::new([Some(degrees(10.0, 5.0))]));
        let mut tracker = Tracker::new(observer(), target(), eph);
        tracker.begin_computing(Duration::from_millis(5)).unwrap();
        assert!(matches!(
            tracker.begin_computing(Duration::from_millis(5)),
            Err(TrackerError::AlreadyRunning("position"))
        ));

        tracker.stop().await;
        tracker.begin_computing(Duration::from_millis(5)).unwrap();
        tracker.stop().await;
    }

    #[tokio::test]
    async fn test_no_commands_after_stop() {
        let eph = Arc::new(CountingEphemeris::default());
        let mut tracker = Tracker::new(observer(), target(), eph);
        let link = MemoryTransport::default();
        let limits = MountLimits {
            azimuth: MotorConfig::default(),
            altitude: MotorConfig::default(),
        };
        tracker
            .connect_servos(MotorController::new(Box::new(link.clone()), limits))
            .unwrap();

        tracker.begin_computing(Duration::from_millis(2)).unwrap();
        tracker.begin_tracking(None).unwrap();
        sleep(Duration::from_millis(100)).await;
        tracker.stop().await;

        let sent = link.frames().len();
        assert!(sent > 2, "expected commands beyond homing, got {}", sent);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(link.frames().len(), sent);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_snapshots_are_never_torn() {
        let eph = Arc::new(CountingEphemeris::default());
        let mut tracker = Tracker::new(observer(), target(), eph);
        let rx = tracker.subscribe();
        tracker.begin_computing(Duration::from_micros(1)).unwrap();

        let reader = tokio::spawn(async move {
            let mut cycles = HashSet::new();
            while cycles.len() < 1000 {
                let state = rx.borrow().clone();
                if let Some(p) = state.position() {
                    assert_eq!(p.azimuth_deg, p.altitude_deg, "cycle {}", state.cycle);
                    cycles.insert(state.cycle);
                }
                tokio::task::yield_now().await;
            }
        });

        tokio::time::timeout(Duration::from_secs(30), reader)
            .await
            .expect("reader timed out")
            .unwrap();
        tracker.stop().await;
    }

    #[tokio::test]
    async fn test_predictor_does_not_touch_tracker() {
        let eph = Arc::new(ScriptedEphemeris::default());
        let tracker = Tracker::new(observer(), target(), eph);
        let before = *tracker.observer();

        let passes = tracker
            .predictor(LocalZone::System)
            .next_passes(3, None)
            .unwrap();

        assert_eq!(passes.len(), 3);
        assert_eq!(*tracker.observer(), before);
        assert_eq!(tracker.state(), TrackingState::default());
    }
}
