// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{bounded, ControlError, MAX_DEVICES, PCI_ADDR_LEN, SERIAL_MAX};
use serde::Serialize;
use std::str::FromStr;

/// One simulated accelerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub pci_address: String,
    pub device_id: u32,
    pub vendor_id: u32,
    pub serial: String,
    pub index: u32,
}

/// Reference to a registry slot. Handles issued before a `clear()` carry an
/// older generation and no longer resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceHandle {
    slot: usize,
    generation: u64,
}

impl DeviceHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PciLookup {
    #[default]
    Exact,
    /// Returns the first device whose address does *not* equal the query.
    LegacyInverted,
}

impl FromStr for PciLookup {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "exact" => Ok(Self::Exact),
            "legacy_inverted" | "legacy" | "inverted" => Ok(Self::LegacyInverted),
            _ => Err(format!(
                "unsupported PCI lookup mode '{}'; supported: exact, legacy_inverted",
                value
            )),
        }
    }
}

impl From<fakehlml_config::PciLookupMode> for PciLookup {
    fn from(mode: fakehlml_config::PciLookupMode) -> Self {
        match mode {
            fakehlml_config::PciLookupMode::Exact => Self::Exact,
            fakehlml_config::PciLookupMode::LegacyInverted => Self::LegacyInverted,
        }
    }
}

fn parse_hex_id(field: &'static str, value: &str) -> Result<u32, ControlError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).map_err(|_| ControlError::InvalidHexId {
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    generation: u64,
    pci_lookup: PciLookup,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pci_lookup(pci_lookup: PciLookup) -> Self {
        Self {
            pci_lookup,
            ..Self::default()
        }
    }

    pub fn pci_lookup(&self) -> PciLookup {
        self.pci_lookup
    }

    pub fn set_pci_lookup(&mut self, pci_lookup: PciLookup) {
        self.pci_lookup = pci_lookup;
    }

    /// Registers a device in the next free slot.
    ///
    /// Identifiers are hexadecimal with an optional `0x` prefix. Addresses and
    /// serials longer than the vendor buffers are truncated; a missing value
    /// is stored as an empty string.
    pub fn add(
        &mut self,
        pci_address: Option<&str>,
        device_id_hex: &str,
        vendor_id_hex: &str,
        serial: Option<&str>,
        index: u32,
    ) -> Result<DeviceHandle, ControlError> {
        if self.devices.len() >= MAX_DEVICES {
            return Err(ControlError::RegistryFull { max: MAX_DEVICES });
        }

        let device = Device {
            pci_address: bounded(pci_address.unwrap_or_default(), PCI_ADDR_LEN),
            device_id: parse_hex_id("device id", device_id_hex)?,
            vendor_id: parse_hex_id("vendor id", vendor_id_hex)?,
            serial: bounded(serial.unwrap_or_default(), SERIAL_MAX),
            index,
        };

        let slot = self.devices.len();
        self.devices.push(device);
        Ok(self.handle(slot))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, handle: DeviceHandle) -> Option<&Device> {
        if handle.generation != self.generation {
            return None;
        }
        self.devices.get(handle.slot)
    }

    pub fn handles(&self) -> impl Iterator<Item = DeviceHandle> + '_ {
        (0..self.devices.len()).map(|slot| self.handle(slot))
    }

    pub fn find_by_pci_address(&self, pci_address: &str) -> Option<DeviceHandle> {
        let slot = match self.pci_lookup {
            PciLookup::Exact => self
                .devices
                .iter()
                .position(|d| d.pci_address == pci_address),
            PciLookup::LegacyInverted => self
                .devices
                .iter()
                .position(|d| d.pci_address != pci_address),
        }?;
        Some(self.handle(slot))
    }

    /// First device, in registration order, carrying `index`.
    pub fn find_by_index(&self, index: u32) -> Option<DeviceHandle> {
        let slot = self.devices.iter().position(|d| d.index == index)?;
        Some(self.handle(slot))
    }

    pub fn find_by_serial(&self, serial: &str) -> Option<DeviceHandle> {
        let slot = self.devices.iter().position(|d| d.serial == serial)?;
        Some(self.handle(slot))
    }

    /// Drops every device and invalidates outstanding handles.
    pub fn clear(&mut self) {
        self.devices.clear();
        self.generation += 1;
    }

    fn handle(&self, slot: usize) -> DeviceHandle {
        DeviceHandle {
            slot,
            generation: self.generation,
        }
    }
}
