//! # Device Manager
//!
//! Discovers controllers, assigns player slots and runs one polling task per
//! device.
//!
//! This module handles:
//! - Periodic USB scans for new Pro Controller 2 units
//! - Player slot assignment (lowest free slot, at most four players)
//! - Driver startup: session, exclusive grab, player LEDs, virtual gamepad
//! - Disconnect detection and teardown
//! - Orderly shutdown of every driver
//!
//! ## Concurrency
//!
//! The slot table and identity map live in one registry behind a
//! `std::sync::Mutex` that is never held across an await. Scans are
//! serialized by an async lock. Each driver task owns its session and
//! gamepad outright and is stopped through a oneshot channel.

mod driver;
mod slots;

pub use driver::PollSettings;
pub use slots::SlotTable;

use crate::config::Config;
use crate::controller::calibration::CalibrationProfile;
use crate::error::{BridgeError, Result};
use crate::platform::Platform;
use crate::protocol::constants::MAX_PLAYERS;
use crate::protocol::handshake::PLAYER_LIGHTS_DELAY;
use crate::session::Session;
use crate::uinput::{GamepadSpec, GrabbedNode, VirtualGamepad};
use crate::usb::{DeviceDescriptor, DeviceIdentity};
use driver::{poll_device, ActiveDriver, DriverResources};
use slots::{lock, Registry, Reservation};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};
use tokio::time::{sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome of one scan pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Drivers started this pass, with their slots
    pub started: Vec<(DeviceIdentity, usize)>,
    /// Supported devices that already had a driver
    pub already_tracked: usize,
    /// Devices left without a driver because every slot was taken
    pub rejected: Vec<DeviceIdentity>,
    /// Devices whose driver failed to start
    pub failed: Vec<DeviceIdentity>,
}

/// Owns every controller driver.
pub struct DeviceManager {
    platform: Platform,
    registry: Arc<Mutex<Registry>>,
    scan_lock: tokio::sync::Mutex<()>,
    closed: watch::Sender<bool>,
    scan_interval: std::time::Duration,
    poll: PollSettings,
    calibration: CalibrationProfile,
    device_name: String,
    output_deadzone: f32,
}

impl std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field("scan_interval", &self.scan_interval)
            .field("poll", &self.poll)
            .field("device_name", &self.device_name)
            .finish_non_exhaustive()
    }
}

impl DeviceManager {
    /// Creates a manager with no drivers running.
    pub fn new(platform: Platform, config: &Config) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            platform,
            registry: Arc::new(Mutex::new(Registry::default())),
            scan_lock: tokio::sync::Mutex::new(()),
            closed,
            scan_interval: config.scan.interval(),
            poll: PollSettings {
                tick: config.poll.tick(),
                read_timeout: config.poll.read_timeout(),
                max_failures: config.poll.max_read_failures,
            },
            calibration: config.calibration_profile(),
            device_name: config.virtual_device.name.clone(),
            output_deadzone: config.virtual_device.output_deadzone,
        }
    }

    /// Scans on the configured interval until [`DeviceManager::shutdown`].
    pub async fn run(&self) {
        let mut closed = self.closed.subscribe();
        let mut interval = tokio::time::interval(self.scan_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Scanning for controllers every {:?}", self.scan_interval);

        loop {
            if *closed.borrow_and_update() {
                break;
            }
            tokio::select! {
                _ = closed.changed() => {}
                _ = interval.tick() => {
                    let report = self.scan().await;
                    if !report.started.is_empty() {
                        info!("Active players: {}", format_players(&self.active_players()));
                    }
                }
            }
        }

        debug!("Scan loop stopped");
    }

    /// Looks for new controllers once and starts a driver for each.
    ///
    /// Devices already driven are skipped. When every slot is taken the
    /// device is left alone and tried again on the next scan. A failing
    /// device never affects the others.
    pub async fn scan(&self) -> ScanReport {
        let _scan = self.scan_lock.lock().await;
        let mut report = ScanReport::default();

        let devices = match self.platform.usb.enumerate() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Device scan failed: {}", e);
                return report;
            }
        };

        for device in devices.into_iter().filter(DeviceDescriptor::is_supported) {
            let identity = device.identity();

            let slot = match lock(&self.registry).reserve(identity) {
                Reservation::Slot(slot) => slot,
                Reservation::AlreadyTracked => {
                    report.already_tracked += 1;
                    continue;
                }
                Reservation::Exhausted => {
                    warn!(
                        device = %identity,
                        "Controller found but not started: {}",
                        BridgeError::SlotExhaustion(MAX_PLAYERS)
                    );
                    report.rejected.push(identity);
                    continue;
                }
                Reservation::Closed => break,
            };

            info!(
                device = %identity,
                "New controller found, assigning player {}",
                slot + 1
            );

            match self.start_driver(&device, slot).await {
                Ok(true) => report.started.push((identity, slot)),
                Ok(false) => break,
                Err(e) => {
                    error!(device = %identity, "Failed to start player {}: {}", slot + 1, e);
                    lock(&self.registry).slots.release(slot);
                    report.failed.push(identity);
                }
            }
        }

        report
    }

    /// Brings up one controller in `slot`.
    ///
    /// Returns `Ok(false)` if the manager shut down in the meantime; the slot
    /// has then already been released.
    async fn start_driver(&self, device: &DeviceDescriptor, slot: usize) -> Result<bool> {
        let player = slot + 1;
        let mut session = Session::establish(device, &self.platform).await?;

        let grab = match session.event_path() {
            Some(path) => match self.platform.input.grab(path) {
                Ok(grab) => Some(grab),
                Err(e) => {
                    warn!(device = %device.identity(), "Could not grab {}: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        sleep(PLAYER_LIGHTS_DELAY).await;
        if let Err(e) = session.set_player_indicator(player as u8).await {
            warn!(device = %device.identity(), "Failed to set player LEDs: {}", e);
        }

        if !session.has_hid() {
            return Err(BridgeError::Discovery(format!(
                "no hidraw node for {}",
                device.identity()
            )));
        }

        let spec = GamepadSpec::for_player(&self.device_name, player);
        let gamepad = VirtualGamepad::create(self.platform.input.as_ref(), &spec, self.output_deadzone)?;

        Ok(self.register(slot, session, gamepad, grab))
    }

    /// Records the driver and spawns its polling task, atomically with
    /// respect to shutdown.
    fn register(
        &self,
        slot: usize,
        session: Session,
        gamepad: VirtualGamepad,
        grab: Option<Box<dyn GrabbedNode>>,
    ) -> bool {
        let identity = session.identity();
        let mut registry = lock(&self.registry);

        if registry.closed {
            registry.slots.release(slot);
            return false;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let resources = DriverResources::new(slot, session, gamepad, grab, Arc::clone(&self.registry));
        let handle = tokio::spawn(poll_device(resources, stop_rx, self.poll, self.calibration));

        registry.drivers.insert(
            identity,
            ActiveDriver {
                identity,
                slot,
                stop: Some(stop_tx),
                handle: Some(handle),
            },
        );
        true
    }

    /// Stops every driver and waits for each to finish tearing down.
    ///
    /// No scan starts a driver afterwards. Calling it twice is harmless.
    pub async fn shutdown(&self) {
        lock(&self.registry).closed = true;
        self.closed.send_replace(true);

        // Let an in-flight scan finish registering
        let _scan = self.scan_lock.lock().await;

        let handles = self.signal_stop();
        info!("Stopping {} driver(s)", handles.len());

        for (identity, handle) in handles {
            if let Err(e) = handle.await {
                error!(device = %identity, "Driver task failed: {}", e);
            }
        }

        info!("All drivers stopped");
    }

    fn signal_stop(&self) -> Vec<(DeviceIdentity, tokio::task::JoinHandle<()>)> {
        let mut registry = lock(&self.registry);
        let mut handles = Vec::new();
        for driver in registry.drivers.values_mut() {
            if let Some(stop) = driver.stop.take() {
                let _ = stop.send(());
            }
            if let Some(handle) = driver.handle.take() {
                handles.push((driver.identity, handle));
            }
        }
        handles
    }

    /// `(identity, slot)` of every running driver, in slot order.
    pub fn active_players(&self) -> Vec<(DeviceIdentity, usize)> {
        lock(&self.registry).active_players()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Renders players as `P1=1-4, P2=1-7` for status lines.
pub fn format_players(players: &[(DeviceIdentity, usize)]) -> String {
    if players.is_empty() {
        return "none".to_string();
    }
    players
        .iter()
        .map(|(identity, slot)| format!("P{}={}", slot + 1, identity))
        .collect::<Vec<_>>()
        .join(", ")
}
