//! # Controller Session
//!
//! Live USB + raw-HID resources for one physical controller.
//!
//! ## Establishment
//!
//! 1. Claim configuration 1 / interface 1 and pick the endpoints
//! 2. Resolve the hidraw node (and the kernel's own event node)
//! 3. Send the vendor configuration frames over bulk-OUT
//! 4. Switch the controller to full input reports through hidraw
//!
//! A controller without a hidraw node still yields a session, but one that
//! cannot stream input. The device manager refuses to drive such sessions.
//!
//! ## Lifetime
//!
//! A session is owned by exactly one polling task. [`Session::close`] (or
//! drop) releases the hidraw handle first and then the USB interface.

use crate::controller::calibration::CalibrationProfile;
use crate::controller::decoder::decode;
use crate::controller::report::RawReport;
use crate::controller::state::ControllerState;
use crate::error::{BridgeError, Result};
use crate::hid::RawHid;
use crate::platform::Platform;
use crate::protocol::constants::{REPORT_SIZE, USB_CONFIGURATION, USB_INTERFACE};
use crate::protocol::handshake::{
    HID_SETTLE_DELAY, INIT_DRAIN_TIMEOUT, INIT_PACKET_DELAY, INIT_SEQUENCE, REPORT_MODE_FREQUENCY,
    REPORT_MODE_FULL, SUBCMD_SET_REPORT_MODE, USB_WRITE_TIMEOUT,
};
use crate::protocol::subcommand::{
    encode_subcommand, encode_subcommand_report, player_light_pattern, PacketCounter,
    SUBCMD_SET_PLAYER_LIGHTS,
};
use crate::usb::{select_endpoints, DeviceDescriptor, DeviceIdentity, EndpointPair, UsbInterface};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

/// An established controller session.
pub struct Session {
    identity: DeviceIdentity,
    interface: Option<Box<dyn UsbInterface>>,
    endpoints: EndpointPair,
    hid: Option<Box<dyn RawHid>>,
    hidraw_path: Option<PathBuf>,
    event_path: Option<PathBuf>,
    report: RawReport,
    counter: PacketCounter,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("endpoints", &self.endpoints)
            .field("hidraw_path", &self.hidraw_path)
            .field("event_path", &self.event_path)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Claims and initializes the controller described by `device`.
    ///
    /// # Arguments
    ///
    /// * `device` - Descriptor from USB enumeration
    /// * `platform` - USB, path-resolution and hidraw collaborators
    ///
    /// # Returns
    ///
    /// * `Result<Session>` - Initialized session (possibly without hidraw)
    ///
    /// # Errors
    ///
    /// * [`BridgeError::Claim`] - interface could not be claimed or has no bulk-OUT endpoint
    /// * [`BridgeError::Handshake`] - a configuration or mode frame could not be written
    /// * [`BridgeError::Discovery`] - the hidraw node exists but cannot be opened
    ///
    /// Everything acquired before a failure is released.
    pub async fn establish(device: &DeviceDescriptor, platform: &Platform) -> Result<Session> {
        let identity = device.identity();

        let interface = platform
            .usb
            .claim(device, USB_CONFIGURATION, USB_INTERFACE)?;
        let endpoints = select_endpoints(&interface.endpoints())?;
        debug!(
            device = %identity,
            "Endpoints: OUT 0x{:02x}, IN {:?}",
            endpoints.out,
            endpoints.input
        );

        let hidraw_path = platform.resolver.hidraw_path(identity.bus, identity.address);
        let event_path = platform.resolver.event_path(identity.bus, identity.address);
        if hidraw_path.is_none() {
            warn!(device = %identity, "No hidraw node found; input cannot be read");
        }

        let mut session = Session {
            identity,
            interface: Some(interface),
            endpoints,
            hid: None,
            hidraw_path,
            event_path,
            report: RawReport::new(),
            counter: PacketCounter::default(),
            closed: false,
        };

        session.send_init_sequence().await?;

        if let Some(path) = session.hidraw_path.clone() {
            let hid = platform.hid.open(&path).map_err(|e| {
                BridgeError::Discovery(format!("open {}: {}", path.display(), e))
            })?;
            session.hid = Some(hid);
            session.enable_full_reports().await?;
        }

        info!(device = %identity, "Session established");
        Ok(session)
    }

    /// Writes the vendor configuration frames, draining IN after each.
    async fn send_init_sequence(&mut self) -> Result<()> {
        debug!(device = %self.identity, "Sending {} configuration frames", INIT_SEQUENCE.len());

        let mut drain = [0u8; REPORT_SIZE];
        for (index, frame) in INIT_SEQUENCE.iter().enumerate() {
            self.write_out(frame).await.map_err(|e| {
                BridgeError::Handshake(format!(
                    "frame {} of {}: {}",
                    index + 1,
                    INIT_SEQUENCE.len(),
                    e
                ))
            })?;

            sleep(INIT_PACKET_DELAY).await;

            if let (Some(input), Some(interface)) = (self.endpoints.input, self.interface.as_mut()) {
                if let Err(e) = interface.read(input, &mut drain, INIT_DRAIN_TIMEOUT).await {
                    trace!(device = %self.identity, "Drain after frame {}: {}", index + 1, e);
                }
            }
        }
        Ok(())
    }

    /// Selects full input reports and the high polling rate over hidraw.
    async fn enable_full_reports(&mut self) -> Result<()> {
        let commands = [REPORT_MODE_FULL, REPORT_MODE_FREQUENCY];
        for (counter, mode) in commands.into_iter().enumerate() {
            let frame = encode_subcommand(counter as u8, SUBCMD_SET_REPORT_MODE, &[mode]);
            let hid = self
                .hid
                .as_mut()
                .ok_or_else(|| BridgeError::Discovery("hidraw handle closed".to_string()))?;
            hid.write(&frame).await.map_err(|e| {
                BridgeError::Handshake(format!("report mode 0x{:02x}: {}", mode, e))
            })?;
            sleep(HID_SETTLE_DELAY).await;
        }
        debug!(device = %self.identity, "Full input reports enabled");
        Ok(())
    }

    async fn write_out(&mut self, data: &[u8]) -> Result<usize> {
        let out = self.endpoints.out;
        let interface = self
            .interface
            .as_mut()
            .ok_or_else(|| BridgeError::Usb("session closed".to_string()))?;
        interface.write(out, data, USB_WRITE_TIMEOUT).await
    }

    /// Lights the indicator LED for `player` (1-based).
    ///
    /// Out-of-range players light LED 1.
    pub async fn set_player_indicator(&mut self, player: u8) -> Result<()> {
        let seq = self.counter.advance();
        let report = encode_subcommand_report(
            seq,
            SUBCMD_SET_PLAYER_LIGHTS,
            &[player_light_pattern(player)],
        );
        self.write_out(&report).await?;
        debug!(device = %self.identity, player, "Player indicator set");
        Ok(())
    }

    /// Reads one report and decodes it.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::ReadTimeout`] - nothing arrived within `timeout`
    /// * [`BridgeError::Io`] - the read failed or returned no bytes
    /// * [`BridgeError::Discovery`] - the session has no hidraw handle
    pub async fn read_state(
        &mut self,
        calibration: &CalibrationProfile,
        timeout: Duration,
    ) -> Result<ControllerState> {
        let hid = self.hid.as_mut().ok_or_else(|| {
            BridgeError::Discovery(format!("{} has no hidraw handle", self.identity))
        })?;

        let len = match tokio::time::timeout(timeout, hid.read(self.report.buffer_mut())).await {
            Err(_) => return Err(BridgeError::ReadTimeout(timeout)),
            Ok(Err(e)) => return Err(BridgeError::Io(e)),
            Ok(Ok(0)) => {
                return Err(BridgeError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "empty report",
                )))
            }
            Ok(Ok(len)) => len,
        };

        self.report.set_len(len);
        Ok(decode(&self.report, calibration))
    }

    /// Releases the hidraw handle, then the USB interface. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.hid = None;
        self.interface = None;
        debug!(device = %self.identity, "Session closed");
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    /// True if input can be streamed from this session.
    pub fn has_hid(&self) -> bool {
        self.hid.is_some()
    }

    pub fn hidraw_path(&self) -> Option<&Path> {
        self.hidraw_path.as_deref()
    }

    /// Kernel event node of the controller, for exclusive grab.
    pub fn event_path(&self) -> Option<&Path> {
        self.event_path.as_deref()
    }

    /// Most recent raw report.
    pub fn last_report(&self) -> &RawReport {
        &self.report
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
