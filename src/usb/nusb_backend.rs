//! Linux USB access through `nusb` (usbfs).

use super::{
    DeviceDescriptor, EndpointDesc, EndpointDirection, TransferKind, UsbBackend, UsbInterface,
};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use nusb::transfer::{Direction, EndpointType, RequestBuffer};
use std::time::Duration;
use tracing::debug;

/// [`UsbBackend`] over usbfs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NusbBackend;

impl NusbBackend {
    /// Creates the backend after checking that USB enumeration works at all.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Usb`] when the USB subsystem cannot be listed
    /// (no usbfs, missing permissions).
    pub fn new() -> Result<Self> {
        let count = nusb::list_devices()
            .map_err(|e| BridgeError::Usb(format!("USB enumeration unavailable: {}", e)))?
            .count();
        debug!("USB enumeration available ({} devices attached)", count);
        Ok(Self)
    }

    fn find(&self, device: &DeviceDescriptor) -> Result<nusb::DeviceInfo> {
        nusb::list_devices()
            .map_err(|e| BridgeError::Usb(format!("USB enumeration: {}", e)))?
            .find(|info| {
                info.bus_number() == device.bus && info.device_address() == device.address
            })
            .ok_or_else(|| {
                BridgeError::Claim(format!("device {} is gone", device.identity()))
            })
    }
}

impl UsbBackend for NusbBackend {
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>> {
        let devices = nusb::list_devices()
            .map_err(|e| BridgeError::Usb(format!("USB enumeration: {}", e)))?
            .map(|info| DeviceDescriptor {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                bus: info.bus_number(),
                address: info.device_address(),
            })
            .collect();
        Ok(devices)
    }

    fn claim(
        &self,
        device: &DeviceDescriptor,
        configuration: u8,
        interface: u8,
    ) -> Result<Box<dyn UsbInterface>> {
        let identity = device.identity();
        let info = self.find(device)?;

        let handle = info
            .open()
            .map_err(|e| BridgeError::Claim(format!("open {}: {}", identity, e)))?;

        let active = handle
            .active_configuration()
            .ok()
            .map(|config| config.configuration_value());
        if active != Some(configuration) {
            handle.set_configuration(configuration).map_err(|e| {
                BridgeError::Claim(format!(
                    "set configuration {} on {}: {}",
                    configuration, identity, e
                ))
            })?;
        }

        let endpoints = handle
            .active_configuration()
            .map_err(|e| BridgeError::Claim(format!("read configuration of {}: {}", identity, e)))?
            .interface_alt_settings()
            .find(|alt| alt.interface_number() == interface && alt.alternate_setting() == 0)
            .map(|alt| alt.endpoints().map(endpoint_desc).collect::<Vec<_>>())
            .ok_or_else(|| {
                BridgeError::Claim(format!("{} has no interface {}", identity, interface))
            })?;

        let claimed = handle.detach_and_claim_interface(interface).map_err(|e| {
            BridgeError::Claim(format!("claim interface {} on {}: {}", interface, identity, e))
        })?;

        debug!(
            device = %identity,
            "Claimed configuration {} interface {} ({} endpoints)",
            configuration,
            interface,
            endpoints.len()
        );

        Ok(Box::new(NusbInterface {
            interface: claimed,
            endpoints,
        }))
    }
}

fn endpoint_desc(info: nusb::descriptors::Endpoint<'_>) -> EndpointDesc {
    EndpointDesc {
        address: info.address(),
        direction: match info.direction() {
            Direction::In => EndpointDirection::In,
            Direction::Out => EndpointDirection::Out,
        },
        kind: match info.transfer_type() {
            EndpointType::Control => TransferKind::Control,
            EndpointType::Isochronous => TransferKind::Isochronous,
            EndpointType::Bulk => TransferKind::Bulk,
            EndpointType::Interrupt => TransferKind::Interrupt,
        },
    }
}

/// Claimed interface. Dropping it releases the claim.
struct NusbInterface {
    interface: nusb::Interface,
    endpoints: Vec<EndpointDesc>,
}

impl NusbInterface {
    fn kind_of(&self, endpoint: u8) -> Option<TransferKind> {
        self.endpoints
            .iter()
            .find(|ep| ep.address == endpoint)
            .map(|ep| ep.kind)
    }
}

#[async_trait]
impl UsbInterface for NusbInterface {
    fn endpoints(&self) -> Vec<EndpointDesc> {
        self.endpoints.clone()
    }

    async fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize> {
        let transfer = match self.kind_of(endpoint) {
            Some(TransferKind::Interrupt) => self.interface.interrupt_out(endpoint, data.to_vec()),
            _ => self.interface.bulk_out(endpoint, data.to_vec()),
        };

        let completion = tokio::time::timeout(timeout, transfer)
            .await
            .map_err(|_| BridgeError::Usb(format!("write to 0x{:02x} timed out", endpoint)))?;

        let written = completion
            .into_result()
            .map_err(|e| BridgeError::Usb(format!("write to 0x{:02x}: {}", endpoint, e)))?;
        Ok(written.actual_length())
    }

    async fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let request = RequestBuffer::new(buf.len());
        let transfer = match self.kind_of(endpoint) {
            Some(TransferKind::Bulk) => self.interface.bulk_in(endpoint, request),
            _ => self.interface.interrupt_in(endpoint, request),
        };

        let completion = tokio::time::timeout(timeout, transfer)
            .await
            .map_err(|_| BridgeError::ReadTimeout(timeout))?;

        let data = completion
            .into_result()
            .map_err(|e| BridgeError::Usb(format!("read from 0x{:02x}: {}", endpoint, e)))?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }
}
