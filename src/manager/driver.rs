//! Per-device driver: resources, teardown and the polling loop.

use super::slots::{lock, Registry};
use crate::controller::calibration::CalibrationProfile;
use crate::controller::state::{stick_direction, ControllerState};
use crate::session::Session;
use crate::uinput::{GrabbedNode, VirtualGamepad};
use crate::usb::DeviceIdentity;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Stick movement (normalized units) worth a trace line
const STICK_LOG_THRESHOLD: f32 = 0.1;

/// Manager-side bookkeeping for one running driver.
#[derive(Debug)]
pub(crate) struct ActiveDriver {
    pub(crate) identity: DeviceIdentity,
    pub(crate) slot: usize,
    pub(crate) stop: Option<oneshot::Sender<()>>,
    pub(crate) handle: Option<JoinHandle<()>>,
}

impl ActiveDriver {
    /// Entry without a task attached.
    #[cfg(test)]
    pub(crate) fn detached(identity: DeviceIdentity, slot: usize) -> Self {
        Self {
            identity,
            slot,
            stop: None,
            handle: None,
        }
    }
}

/// Polling parameters shared by every driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub tick: Duration,
    pub read_timeout: Duration,
    /// Consecutive failures tolerated; one more ends the driver
    pub max_failures: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(2),
            read_timeout: Duration::from_millis(100),
            max_failures: 20,
        }
    }
}

/// Everything a running driver owns exclusively.
///
/// Teardown runs exactly once, on [`DriverResources::teardown`] or drop:
/// release the grab, destroy the virtual gamepad, close the session, then
/// free the slot.
pub(crate) struct DriverResources {
    identity: DeviceIdentity,
    slot: usize,
    pub(crate) session: Session,
    pub(crate) gamepad: VirtualGamepad,
    grab: Option<Box<dyn GrabbedNode>>,
    registry: Arc<Mutex<Registry>>,
    torn_down: bool,
}

impl DriverResources {
    pub(crate) fn new(
        slot: usize,
        session: Session,
        gamepad: VirtualGamepad,
        grab: Option<Box<dyn GrabbedNode>>,
        registry: Arc<Mutex<Registry>>,
    ) -> Self {
        Self {
            identity: session.identity(),
            slot,
            session,
            gamepad,
            grab,
            registry,
            torn_down: false,
        }
    }

    pub(crate) fn player(&self) -> usize {
        self.slot + 1
    }

    pub(crate) fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(mut grab) = self.grab.take() {
            if let Err(e) = grab.release() {
                warn!(device = %self.identity, "Failed to release grab: {}", e);
            }
        }
        self.gamepad.destroy();
        self.session.close();

        let freed = lock(&self.registry).unregister(self.identity, self.slot);
        if freed {
            debug!(device = %self.identity, "Slot {} freed", self.slot);
        }
    }
}

impl Drop for DriverResources {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Polls one controller until it disconnects or `stop` fires.
///
/// The stop signal is only checked between ticks; a read in flight always
/// finishes (bounded by the read timeout).
pub(crate) async fn poll_device(
    mut resources: DriverResources,
    mut stop: oneshot::Receiver<()>,
    settings: PollSettings,
    calibration: CalibrationProfile,
) {
    let player = resources.player();
    let identity = resources.identity;
    info!(player, device = %identity, "Player {} connected and running", player);

    let mut ticker = tokio::time::interval(settings.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut failures: u32 = 0;
    let mut previous = ControllerState::default();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => {
                debug!(player, "Stop requested");
                break;
            }
            _ = ticker.tick() => {}
        }

        match resources
            .session
            .read_state(&calibration, settings.read_timeout)
            .await
        {
            Ok(state) => {
                failures = 0;
                log_changes(player, &previous, &state);
                if let Err(e) = resources.gamepad.update(&state) {
                    warn!(player, "Failed to emit input: {}", e);
                }
                previous = state;
            }
            Err(e) => {
                failures += 1;
                if failures > settings.max_failures {
                    info!(player, device = %identity, "Player {} disconnected ({})", player, e);
                    break;
                }
                trace!(player, "Read failed ({}/{}): {}", failures, settings.max_failures, e);
            }
        }
    }

    resources.teardown();
}

fn log_changes(player: usize, previous: &ControllerState, state: &ControllerState) {
    if !state.buttons_equal(previous) {
        debug!(player, "Buttons: {:?}", state.pressed_buttons());
    }
    if state.sticks_changed(previous, STICK_LOG_THRESHOLD) {
        let sticks = &state.joysticks;
        trace!(
            player,
            "Left stick {} ({:.2}, {:.2}), right stick {} ({:.2}, {:.2})",
            stick_direction(sticks.lx, sticks.ly, STICK_LOG_THRESHOLD),
            sticks.lx,
            sticks.ly,
            stick_direction(sticks.rx, sticks.ry, STICK_LOG_THRESHOLD),
            sticks.rx,
            sticks.ry
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::calibration::DEFAULT_CALIBRATION;
    use crate::hid::mocks::{MockHid, MockRead};
    use crate::platform::mocks::{hidraw_path_for, resolving_everything, MockPlatform};
    use crate::uinput::{GamepadSpec, DEFAULT_OUTPUT_DEADZONE};
    use crate::usb::mocks::procon_descriptor;

    struct Fixture {
        mock: MockPlatform,
        hid: MockHid,
        registry: Arc<Mutex<Registry>>,
    }

    impl Fixture {
        fn new(hid: MockHid) -> Self {
            let mock = MockPlatform::new(resolving_everything());
            mock.hid.register(hidraw_path_for(1, 5), hid.clone());
            Self {
                mock,
                hid,
                registry: Arc::new(Mutex::new(Registry::default())),
            }
        }

        /// Builds resources for device 1-5 registered in `slot`.
        async fn resources(&self, slot: usize) -> DriverResources {
            let device = procon_descriptor(1, 5);
            let session = Session::establish(&device, &self.mock.platform).await.unwrap();
            let grab = self
                .mock
                .platform
                .input
                .grab(session.event_path().unwrap())
                .unwrap();
            let spec = GamepadSpec::for_player("Pad", slot + 1);
            let gamepad = VirtualGamepad::create(
                self.mock.platform.input.as_ref(),
                &spec,
                DEFAULT_OUTPUT_DEADZONE,
            )
            .unwrap();

            {
                let mut registry = lock(&self.registry);
                while registry.slots.occupied_count() <= slot {
                    registry.slots.reserve();
                }
                registry
                    .drivers
                    .insert(device.identity(), ActiveDriver::detached(device.identity(), slot));
            }

            DriverResources::new(slot, session, gamepad, Some(grab), Arc::clone(&self.registry))
        }
    }

    fn fast_settings() -> PollSettings {
        PollSettings {
            tick: Duration::from_millis(2),
            read_timeout: Duration::from_millis(10),
            max_failures: 20,
        }
    }

    // ==================== Teardown Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_teardown_is_idempotent() {
        let fixture = Fixture::new(MockHid::failing());
        let mut resources = fixture.resources(0).await;

        resources.teardown();
        resources.teardown();
        drop(resources);

        assert_eq!(fixture.mock.input.destroyed_names().len(), 1);
        assert_eq!(fixture.mock.input.released_paths().len(), 1);
        assert_eq!(fixture.mock.usb.released_count(), 1);

        let registry = lock(&fixture.registry);
        assert!(registry.drivers.is_empty());
        assert_eq!(registry.slots.occupied_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_order_on_drop() {
        let fixture = Fixture::new(MockHid::failing());
        let resources = fixture.resources(0).await;
        assert!(fixture.mock.input.released_paths().is_empty());

        drop(resources);

        assert_eq!(fixture.mock.input.released_paths().len(), 1);
        assert_eq!(fixture.mock.input.destroyed_names(), vec!["Pad (Player 1)".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_keeps_foreign_slot() {
        let fixture = Fixture::new(MockHid::failing());
        let mut resources = fixture.resources(1).await;

        // Map now records the identity under another slot
        {
            let mut registry = lock(&fixture.registry);
            let identity = DeviceIdentity::new(1, 5);
            registry
                .drivers
                .insert(identity, ActiveDriver::detached(identity, 0));
        }

        resources.teardown();

        let registry = lock(&fixture.registry);
        assert_eq!(registry.drivers.len(), 1);
        assert!(registry.slots.is_occupied(0));
        assert!(registry.slots.is_occupied(1));
    }

    // ==================== Polling Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_after_failure_threshold() {
        let fixture = Fixture::new(MockHid::failing());
        let resources = fixture.resources(0).await;
        let (_stop_tx, stop_rx) = oneshot::channel();

        poll_device(resources, stop_rx, fast_settings(), DEFAULT_CALIBRATION).await;

        assert_eq!(fixture.hid.reads_performed(), 21);
        let registry = lock(&fixture.registry);
        assert!(registry.drivers.is_empty());
        assert!(!registry.slots.is_occupied(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_success_resets_failures() {
        let fixture = Fixture::new(MockHid::failing());
        for _ in 0..15 {
            fixture.hid.push_read(MockRead::Error(std::io::ErrorKind::TimedOut));
        }
        fixture.hid.push_read(MockRead::Report(vec![0x30, 0x00, 0x00, 0x02]));
        let resources = fixture.resources(0).await;
        let (_stop_tx, stop_rx) = oneshot::channel();

        poll_device(resources, stop_rx, fast_settings(), DEFAULT_CALIBRATION).await;

        // 15 failures, 1 success, then 21 failures
        assert_eq!(fixture.hid.reads_performed(), 37);
        let frames = fixture.mock.input.frames_for("Pad (Player 1)");
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeouts_count_as_failures() {
        let fixture = Fixture::new(MockHid::new(MockRead::Pending));
        let resources = fixture.resources(0).await;
        let (_stop_tx, stop_rx) = oneshot::channel();

        let start = tokio::time::Instant::now();
        poll_device(resources, stop_rx, fast_settings(), DEFAULT_CALIBRATION).await;

        assert_eq!(fixture.hid.reads_performed(), 21);
        assert!(start.elapsed() >= Duration::from_millis(21 * 10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_emits_frames_until_stopped() {
        let fixture = Fixture::new(MockHid::streaming(vec![0x30, 0x00, 0x00, 0x01]));
        let resources = fixture.resources(0).await;
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(poll_device(
            resources,
            stop_rx,
            fast_settings(),
            DEFAULT_CALIBRATION,
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        stop_tx.send(()).unwrap();
        task.await.unwrap();

        let frames = fixture.mock.input.frames_for("Pad (Player 1)");
        assert!(frames.len() >= 5);
        assert_eq!(fixture.mock.input.destroyed_names().len(), 1);
        assert_eq!(fixture.mock.usb.released_count(), 1);
        assert!(lock(&fixture.registry).drivers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_stop_sender_ends_poll() {
        let fixture = Fixture::new(MockHid::streaming(vec![0x30]));
        let resources = fixture.resources(0).await;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        drop(stop_tx);

        poll_device(resources, stop_rx, fast_settings(), DEFAULT_CALIBRATION).await;

        assert_eq!(fixture.hid.reads_performed(), 0);
        assert!(lock(&fixture.registry).drivers.is_empty());
    }
}
