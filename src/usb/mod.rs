//! # USB Transport Module
//!
//! Device discovery and bulk/interrupt transfers on the controller's vendor
//! interface.
//!
//! This module handles:
//! - Enumerating attached Pro Controller 2 units
//! - Claiming the vendor configuration and interface
//! - Selecting the bulk-OUT and IN endpoints
//! - Bounded reads and writes
//!
//! The session only talks to the [`UsbBackend`] and [`UsbInterface`] traits;
//! [`NusbBackend`] is the Linux implementation.

mod nusb_backend;

pub use nusb_backend::NusbBackend;

use crate::error::{BridgeError, Result};
use crate::protocol::constants::is_supported;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Identifies one attached unit by its position on the USB topology.
///
/// Unique while the unit stays plugged in. Displayed as `bus-address`.
///
/// # Examples
///
/// ```
/// use procon_bridge::usb::DeviceIdentity;
///
/// let id = DeviceIdentity::new(3, 17);
/// assert_eq!(id.to_string(), "3-17");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIdentity {
    pub bus: u8,
    pub address: u8,
}

impl DeviceIdentity {
    pub const fn new(bus: u8, address: u8) -> Self {
        Self { bus, address }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.bus, self.address)
    }
}

/// A discovered USB device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus: u8,
    pub address: u8,
}

impl DeviceDescriptor {
    /// Topology identity of this device
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.bus, self.address)
    }

    /// True for Pro Controller 2 family units
    pub fn is_supported(&self) -> bool {
        is_supported(self.vendor_id, self.product_id)
    }
}

/// Endpoint direction, from the host's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointDirection {
    In,
    Out,
}

/// USB transfer type of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// Descriptor of one endpoint on the claimed interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDesc {
    pub address: u8,
    pub direction: EndpointDirection,
    pub kind: TransferKind,
}

/// Endpoints used by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointPair {
    /// Bulk-OUT endpoint carrying handshake frames and subcommands
    pub out: u8,
    /// Interrupt or bulk IN endpoint, drained during the handshake
    pub input: Option<u8>,
}

/// Picks the first bulk-OUT endpoint and the first interrupt-or-bulk IN endpoint.
///
/// # Errors
///
/// Returns [`BridgeError::Claim`] if the interface has no bulk-OUT endpoint.
/// A missing IN endpoint is tolerated.
///
/// # Examples
///
/// ```
/// use procon_bridge::usb::{select_endpoints, EndpointDesc, EndpointDirection, TransferKind};
///
/// let endpoints = [
///     EndpointDesc { address: 0x81, direction: EndpointDirection::In, kind: TransferKind::Interrupt },
///     EndpointDesc { address: 0x02, direction: EndpointDirection::Out, kind: TransferKind::Bulk },
/// ];
/// let pair = select_endpoints(&endpoints).unwrap();
/// assert_eq!(pair.out, 0x02);
/// assert_eq!(pair.input, Some(0x81));
/// ```
pub fn select_endpoints(endpoints: &[EndpointDesc]) -> Result<EndpointPair> {
    let out = endpoints
        .iter()
        .find(|ep| ep.direction == EndpointDirection::Out && ep.kind == TransferKind::Bulk)
        .map(|ep| ep.address)
        .ok_or_else(|| BridgeError::Claim("interface has no bulk OUT endpoint".to_string()))?;

    let input = endpoints
        .iter()
        .find(|ep| {
            ep.direction == EndpointDirection::In
                && matches!(ep.kind, TransferKind::Interrupt | TransferKind::Bulk)
        })
        .map(|ep| ep.address);

    Ok(EndpointPair { out, input })
}

/// Discovery and claiming of USB devices.
pub trait UsbBackend: Send + Sync {
    /// Lists every attached USB device.
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Selects `configuration` and claims `interface` on `device`,
    /// detaching any kernel driver bound to it.
    ///
    /// Dropping the returned handle releases the interface.
    fn claim(
        &self,
        device: &DeviceDescriptor,
        configuration: u8,
        interface: u8,
    ) -> Result<Box<dyn UsbInterface>>;
}

/// A claimed USB interface.
#[async_trait]
pub trait UsbInterface: Send {
    /// Endpoints of the active alternate setting
    fn endpoints(&self) -> Vec<EndpointDesc>;

    /// Writes `data` to an OUT endpoint, returning the bytes transferred.
    async fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Reads one transfer from an IN endpoint into `buf`.
    ///
    /// Returns [`BridgeError::ReadTimeout`] when nothing arrives in time.
    async fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Endpoints of a real Pro Controller 2 vendor interface
    pub fn procon_endpoints() -> Vec<EndpointDesc> {
        vec![
            EndpointDesc {
                address: 0x81,
                direction: EndpointDirection::In,
                kind: TransferKind::Interrupt,
            },
            EndpointDesc {
                address: 0x02,
                direction: EndpointDirection::Out,
                kind: TransferKind::Bulk,
            },
        ]
    }

    pub fn procon_descriptor(bus: u8, address: u8) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id: 0x057e,
            product_id: 0x2069,
            bus,
            address,
        }
    }

    /// Records every transfer made on interfaces it hands out.
    #[derive(Clone)]
    pub struct MockUsbBackend {
        pub devices: Arc<Mutex<Vec<DeviceDescriptor>>>,
        pub endpoints: Arc<Mutex<Vec<EndpointDesc>>>,
        pub claims: Arc<Mutex<Vec<(DeviceIdentity, u8, u8)>>>,
        pub claim_error: Arc<Mutex<Option<String>>>,
        pub enumerate_error: Arc<Mutex<Option<String>>>,
        pub written: Arc<Mutex<Vec<(DeviceIdentity, u8, Vec<u8>)>>>,
        pub write_error: Arc<Mutex<Option<String>>>,
        pub released: Arc<AtomicUsize>,
    }

    impl MockUsbBackend {
        pub fn new() -> Self {
            Self {
                devices: Arc::new(Mutex::new(Vec::new())),
                endpoints: Arc::new(Mutex::new(procon_endpoints())),
                claims: Arc::new(Mutex::new(Vec::new())),
                claim_error: Arc::new(Mutex::new(None)),
                enumerate_error: Arc::new(Mutex::new(None)),
                written: Arc::new(Mutex::new(Vec::new())),
                write_error: Arc::new(Mutex::new(None)),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn with_devices(devices: Vec<DeviceDescriptor>) -> Self {
            let backend = Self::new();
            *backend.devices.lock().unwrap() = devices;
            backend
        }

        pub fn set_devices(&self, devices: Vec<DeviceDescriptor>) {
            *self.devices.lock().unwrap() = devices;
        }

        pub fn set_claim_error(&self, error: &str) {
            *self.claim_error.lock().unwrap() = Some(error.to_string());
        }

        pub fn set_write_error(&self, error: &str) {
            *self.write_error.lock().unwrap() = Some(error.to_string());
        }

        pub fn written_frames(&self) -> Vec<Vec<u8>> {
            self.written
                .lock()
                .unwrap()
                .iter()
                .map(|(_, _, data)| data.clone())
                .collect()
        }

        pub fn written_to(&self, identity: DeviceIdentity) -> Vec<Vec<u8>> {
            self.written
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _, _)| *id == identity)
                .map(|(_, _, data)| data.clone())
                .collect()
        }

        pub fn claim_count(&self) -> usize {
            self.claims.lock().unwrap().len()
        }

        pub fn released_count(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }
    }

    impl UsbBackend for MockUsbBackend {
        fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
            if let Some(error) = self.enumerate_error.lock().unwrap().clone() {
                return Err(BridgeError::Usb(error));
            }
            Ok(self.devices.lock().unwrap().clone())
        }

        fn claim(
            &self,
            device: &DeviceDescriptor,
            configuration: u8,
            interface: u8,
        ) -> Result<Box<dyn UsbInterface>> {
            if let Some(error) = self.claim_error.lock().unwrap().clone() {
                return Err(BridgeError::Claim(error));
            }
            self.claims
                .lock()
                .unwrap()
                .push((device.identity(), configuration, interface));
            Ok(Box::new(MockUsbInterface {
                identity: device.identity(),
                endpoints: self.endpoints.lock().unwrap().clone(),
                written: Arc::clone(&self.written),
                write_error: Arc::clone(&self.write_error),
                released: Arc::clone(&self.released),
            }))
        }
    }

    /// Interface handed out by [`MockUsbBackend`].
    ///
    /// IN reads always time out; dropping it counts as a release.
    pub struct MockUsbInterface {
        identity: DeviceIdentity,
        endpoints: Vec<EndpointDesc>,
        written: Arc<Mutex<Vec<(DeviceIdentity, u8, Vec<u8>)>>>,
        write_error: Arc<Mutex<Option<String>>>,
        released: Arc<AtomicUsize>,
    }

    impl Drop for MockUsbInterface {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl UsbInterface for MockUsbInterface {
        fn endpoints(&self) -> Vec<EndpointDesc> {
            self.endpoints.clone()
        }

        async fn write(&mut self, endpoint: u8, data: &[u8], _timeout: Duration) -> Result<usize> {
            if let Some(error) = self.write_error.lock().unwrap().clone() {
                return Err(BridgeError::Usb(error));
            }
            self.written
                .lock()
                .unwrap()
                .push((self.identity, endpoint, data.to_vec()));
            Ok(data.len())
        }

        async fn read(&mut self, _endpoint: u8, _buf: &mut [u8], timeout: Duration) -> Result<usize> {
            tokio::time::sleep(timeout).await;
            Err(BridgeError::ReadTimeout(timeout))
        }
    }
}
