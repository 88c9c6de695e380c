// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::device::{Device, DeviceHandle, DeviceRegistry, PciLookup};
use crate::events::{EventQueue, EventRecord, EventSetHandle, EventSets, EventTypes};
use crate::injection::ErrorInjection;
use crate::{
    bounded, write_c_string, Call, ControlError, HlmlError, HlmlResult, ReturnCode, PCI_ADDR_LEN,
    SERIAL_MAX,
};
use serde::Serialize;

/// PCI metadata as reported by `device_get_pci_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PciInfo {
    pub bus_id: String,
    /// Device id in the low half, vendor id in the high half.
    pub pci_device_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectedError {
    pub call: Call,
    pub status: HlmlError,
    pub code: u32,
}

/// Serializable view of an instance, for reports and debugging.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub initialized: bool,
    pub pci_lookup: PciLookup,
    pub devices: Vec<Device>,
    pub injected_errors: Vec<InjectedError>,
    pub pending_events: Vec<String>,
    pub event_sets: usize,
}

/// One isolated fake library instance.
#[derive(Debug, Default)]
pub struct FakeHlml {
    initialized: bool,
    registry: DeviceRegistry,
    injection: ErrorInjection,
    events: EventQueue,
    event_sets: EventSets,
}

pub(crate) fn trace_call(symbol: &str) {
    tracing::debug!("{} called", symbol);
}

impl FakeHlml {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pci_lookup(pci_lookup: PciLookup) -> Self {
        Self {
            registry: DeviceRegistry::with_pci_lookup(pci_lookup),
            ..Self::default()
        }
    }

    // Control plane

    pub fn add_device(
        &mut self,
        pci_address: Option<&str>,
        device_id_hex: &str,
        vendor_id_hex: &str,
        serial: Option<&str>,
        index: u32,
    ) -> Result<DeviceHandle, ControlError> {
        let handle = self
            .registry
            .add(pci_address, device_id_hex, vendor_id_hex, serial, index)?;
        tracing::info!(
            "fake device {} added: pci={:?} serial={:?}",
            index,
            pci_address.unwrap_or_default(),
            serial.unwrap_or_default()
        );
        Ok(handle)
    }

    /// Clears devices, the initialized flag, injected errors and pending
    /// events. Event sets stay allocated; they belong to the caller.
    pub fn reset(&mut self) {
        self.initialized = false;
        self.registry.clear();
        self.injection.clear();
        self.events.clear();
        tracing::info!("fake HLML state reset");
    }

    pub fn set_error(&mut self, call: Call, status: ReturnCode) {
        tracing::info!("forcing {} to return {}", call, status);
        self.injection.set(call, status);
    }

    /// Raw form of [`set_error`](Self::set_error) using vendor numbering.
    ///
    /// # Panics
    ///
    /// Panics if `call_id` does not name an injectable call.
    pub fn set_error_raw(&mut self, call_id: u32, status_code: u32) -> Result<(), ControlError> {
        assert!(
            (call_id as usize) < Call::COUNT,
            "call id {} out of range (max {})",
            call_id,
            Call::COUNT - 1
        );
        let call = Call::try_from(call_id)?;
        let status = ReturnCode::try_from(status_code)?;
        self.set_error(call, status);
        Ok(())
    }

    pub fn add_critical_event(&mut self, serial: &str) {
        if self.events.push(serial) {
            tracing::info!("critical event queued for '{}'", serial);
        }
    }

    pub fn reset_events(&mut self) {
        self.events.clear();
    }

    // Harness inspection

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn device(&self, handle: DeviceHandle) -> Option<&Device> {
        self.registry.get(handle)
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceHandle, &Device)> + '_ {
        self.registry
            .handles()
            .filter_map(|h| self.registry.get(h).map(|d| (h, d)))
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    pub fn injected_error(&self, call: Call) -> ReturnCode {
        self.injection.get(call)
    }

    pub fn injection(&self) -> &ErrorInjection {
        &self.injection
    }

    pub fn pending_events(&self) -> &[String] {
        self.events.pending()
    }

    pub fn event_queue(&self) -> &EventQueue {
        &self.events
    }

    pub fn event_set_count(&self) -> usize {
        self.event_sets.len()
    }

    pub fn event_set_devices(&self, set: EventSetHandle) -> Option<&[DeviceHandle]> {
        self.event_sets.get(set).map(|s| s.devices())
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            initialized: self.initialized,
            pci_lookup: self.registry.pci_lookup(),
            devices: self.devices().map(|(_, d)| d.clone()).collect(),
            injected_errors: self
                .injection
                .overrides()
                .map(|(call, status)| InjectedError {
                    call,
                    status,
                    code: status.code(),
                })
                .collect(),
            pending_events: self.events.pending().to_vec(),
            event_sets: self.event_sets.len(),
        }
    }

    fn ensure_initialized(&self) -> HlmlResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(HlmlError::Uninitialized)
        }
    }

    fn resolve(&self, device: DeviceHandle) -> HlmlResult<&Device> {
        self.registry.get(device).ok_or_else(|| {
            tracing::warn!("stale or unknown device handle {:?}", device);
            HlmlError::InvalidArgument
        })
    }

    // Library entry points

    pub fn init(&mut self) -> HlmlResult<()> {
        trace_call(Call::Init.symbol());
        self.injection.check(Call::Init)?;
        self.init_with_flags(0)
    }

    pub fn init_with_flags(&mut self, _flags: u32) -> HlmlResult<()> {
        trace_call(Call::InitWithFlags.symbol());
        self.injection.check(Call::InitWithFlags)?;
        self.initialized = true;
        Ok(())
    }

    pub fn shutdown(&mut self) -> HlmlResult<()> {
        trace_call(Call::Shutdown.symbol());
        self.injection.check(Call::Shutdown)?;
        self.initialized = false;
        Ok(())
    }

    /// Number of registered devices. Does not require initialization.
    pub fn device_get_count(&self) -> HlmlResult<u32> {
        trace_call(Call::DeviceGetCount.symbol());
        self.injection.check(Call::DeviceGetCount)?;
        Ok(self.registry.len() as u32)
    }

    pub fn device_get_handle_by_pci_bus_id(&self, pci_address: &str) -> HlmlResult<DeviceHandle> {
        trace_call(Call::DeviceGetHandleByPciBusId.symbol());
        self.injection.check(Call::DeviceGetHandleByPciBusId)?;
        self.ensure_initialized()?;
        self.registry
            .find_by_pci_address(pci_address)
            .ok_or(HlmlError::NotFound)
    }

    pub fn device_get_handle_by_index(&self, index: u32) -> HlmlResult<DeviceHandle> {
        trace_call(Call::DeviceGetHandleByIndex.symbol());
        self.injection.check(Call::DeviceGetHandleByIndex)?;
        self.ensure_initialized()?;
        if index as usize >= self.registry.len() {
            return Err(HlmlError::InvalidArgument);
        }
        self.registry
            .find_by_index(index)
            .ok_or(HlmlError::NotFound)
    }

    pub fn device_get_pci_info(&self, device: DeviceHandle) -> HlmlResult<PciInfo> {
        trace_call(Call::DeviceGetPciInfo.symbol());
        self.injection.check(Call::DeviceGetPciInfo)?;
        self.ensure_initialized()?;
        let device = self.resolve(device)?;
        Ok(PciInfo {
            bus_id: bounded(&device.pci_address, PCI_ADDR_LEN),
            pci_device_id: device.device_id | (device.vendor_id << 16),
        })
    }

    /// Writes the NUL-terminated serial of `device` into `serial`.
    ///
    /// An injected status blanks the buffer. A missing device yields an empty
    /// string. Otherwise the buffer must hold at least [`SERIAL_MAX`] bytes.
    ///
    /// # Panics
    ///
    /// Panics if `serial` is empty.
    pub fn device_get_serial(
        &self,
        device: Option<DeviceHandle>,
        serial: &mut [u8],
    ) -> HlmlResult<()> {
        trace_call(Call::DeviceGetSerial.symbol());
        assert!(!serial.is_empty(), "serial buffer must not be empty");

        if let Err(err) = self.injection.check(Call::DeviceGetSerial) {
            serial[0] = 0;
            return Err(err);
        }

        let Some(device) = device else {
            serial[0] = 0;
            return Ok(());
        };

        if serial.len() < SERIAL_MAX {
            return Err(HlmlError::InsufficientSize);
        }

        let device = self.resolve(device)?;
        write_c_string(serial, &device.serial);
        Ok(())
    }

    pub fn device_register_events(
        &mut self,
        device: DeviceHandle,
        event_types: EventTypes,
        set: EventSetHandle,
    ) -> HlmlResult<()> {
        trace_call(Call::DeviceRegisterEvents.symbol());
        self.injection.check(Call::DeviceRegisterEvents)?;
        self.resolve(device)?;

        let event_set = self.event_sets.get_mut(set).ok_or_else(|| {
            tracing::warn!("register_events on unknown event set {:?}", set);
            HlmlError::InvalidArgument
        })?;
        // Handles from before a reset never match again.
        let registry = &self.registry;
        event_set.retain_live(|handle| registry.get(handle).is_some());
        if !event_set.register(device) {
            tracing::warn!("event set {:?} has no free device slot", set);
            return Err(HlmlError::InvalidArgument);
        }
        tracing::debug!(
            "device slot {} registered for {:?} on event set {}",
            device.slot(),
            event_types,
            set.id()
        );
        Ok(())
    }

    pub fn event_set_create(&mut self) -> HlmlResult<EventSetHandle> {
        trace_call(Call::EventSetCreate.symbol());
        self.injection.check(Call::EventSetCreate)?;
        self.ensure_initialized()?;
        Ok(self.event_sets.create())
    }

    pub fn event_set_free(&mut self, set: EventSetHandle) -> HlmlResult<()> {
        trace_call(Call::EventSetFree.symbol());
        self.injection.check(Call::EventSetFree)?;
        self.ensure_initialized()?;
        if self.event_sets.free(set) {
            Ok(())
        } else {
            Err(HlmlError::InvalidArgument)
        }
    }

    /// Delivers the newest pending event if it belongs to a device in `set`.
    ///
    /// Returns immediately; `_timeout_ms` is accepted for signature parity only.
    pub fn event_set_wait(
        &mut self,
        set: EventSetHandle,
        _timeout_ms: u32,
    ) -> HlmlResult<EventRecord> {
        trace_call(Call::EventSetWait.symbol());
        self.injection.check(Call::EventSetWait)?;
        self.ensure_initialized()?;

        let event_set = self
            .event_sets
            .get(set)
            .ok_or(HlmlError::InvalidArgument)?;
        let Some(tail) = self.events.tail() else {
            return Err(HlmlError::Timeout);
        };

        let matched = event_set.devices().iter().copied().find(|&handle| {
            self.registry
                .get(handle)
                .is_some_and(|device| device.serial == tail)
        });

        match matched {
            Some(device) => {
                tracing::info!("fake HLML: event for device {} found", tail);
                self.events.pop();
                Ok(EventRecord {
                    device,
                    event_type: EventTypes::CRITICAL_ERR,
                })
            }
            None => Err(HlmlError::Timeout),
        }
    }
}
