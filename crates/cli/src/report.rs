// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use fakehlml_core::{
    c_string_from, Call, DeviceHandle, EventTypes, FakeHlml, HlmlError, HlmlResult, SERIAL_MAX,
};
use serde::Serialize;
use std::fmt;

pub const RESULT_SCHEMA_VERSION: &str = "1.0";

/// The first vendor call that failed during a pass.
#[derive(Debug, Clone, Serialize)]
pub struct CallFailure {
    pub call: Call,
    pub status: HlmlError,
    pub code: u32,
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {} ({})", self.call, self.status, self.code)
    }
}

fn step<T>(call: Call, result: HlmlResult<T>) -> Result<T, CallFailure> {
    result.map_err(|status| CallFailure {
        call,
        status,
        code: status.code(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub index: u32,
    pub pci_address: String,
    pub pci_device_id: String,
    pub serial: String,
}

#[derive(Debug, Serialize)]
pub struct DiscoverReport {
    pub result_schema_version: String,
    pub scenario: String,
    pub status: String,
    pub devices: Vec<DeviceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<CallFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub serial: String,
    pub pci_address: String,
    pub event_type: u64,
}

#[derive(Debug, Serialize)]
pub struct WatchReport {
    pub result_schema_version: String,
    pub scenario: String,
    pub status: String,
    pub armed_devices: usize,
    pub events: Vec<EventReport>,
    pub remaining_events: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<CallFailure>,
}

fn status_of(failure: &Option<CallFailure>) -> String {
    if failure.is_some() {
        "error".to_string()
    } else {
        "ok".to_string()
    }
}

fn describe(hlml: &FakeHlml, handle: DeviceHandle) -> Result<DeviceReport, CallFailure> {
    let pci = step(Call::DeviceGetPciInfo, hlml.device_get_pci_info(handle))?;
    let mut serial = [0u8; SERIAL_MAX];
    step(
        Call::DeviceGetSerial,
        hlml.device_get_serial(Some(handle), &mut serial),
    )?;
    let index = hlml.device(handle).map(|d| d.index).unwrap_or_default();
    Ok(DeviceReport {
        index,
        pci_address: pci.bus_id,
        pci_device_id: format!("{:#010x}", pci.pci_device_id),
        serial: c_string_from(&serial),
    })
}

fn ensure_initialized(hlml: &mut FakeHlml) -> Result<(), CallFailure> {
    if hlml.is_initialized() {
        return Ok(());
    }
    step(Call::Init, hlml.init())
}

fn discover_devices(
    hlml: &mut FakeHlml,
    devices: &mut Vec<DeviceReport>,
) -> Result<(), CallFailure> {
    ensure_initialized(hlml)?;
    let count = step(Call::DeviceGetCount, hlml.device_get_count())?;
    for index in 0..count {
        let handle = step(
            Call::DeviceGetHandleByIndex,
            hlml.device_get_handle_by_index(index),
        )?;
        devices.push(describe(hlml, handle)?);
    }
    Ok(())
}

/// Enumerates devices the way a discovery agent does.
pub fn discover(hlml: &mut FakeHlml, scenario: &str) -> DiscoverReport {
    let mut devices = Vec::new();
    let failure = discover_devices(hlml, &mut devices).err();
    if let Some(failure) = &failure {
        tracing::error!("discovery stopped: {}", failure);
    }

    DiscoverReport {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        scenario: scenario.to_string(),
        status: status_of(&failure),
        devices,
        failure,
    }
}

fn drain_events(
    hlml: &mut FakeHlml,
    timeout_ms: u32,
    armed: &mut usize,
    events: &mut Vec<EventReport>,
) -> Result<(), CallFailure> {
    ensure_initialized(hlml)?;
    let set = step(Call::EventSetCreate, hlml.event_set_create())?;

    let count = step(Call::DeviceGetCount, hlml.device_get_count())?;
    for index in 0..count {
        let handle = step(
            Call::DeviceGetHandleByIndex,
            hlml.device_get_handle_by_index(index),
        )?;
        step(
            Call::DeviceRegisterEvents,
            hlml.device_register_events(handle, EventTypes::CRITICAL_ERR, set),
        )?;
        *armed += 1;
    }

    loop {
        match hlml.event_set_wait(set, timeout_ms) {
            Ok(record) => {
                let device = describe(hlml, record.device)?;
                tracing::warn!(
                    "critical event on {} ({})",
                    device.serial,
                    device.pci_address
                );
                events.push(EventReport {
                    serial: device.serial,
                    pci_address: device.pci_address,
                    event_type: record.event_type.bits(),
                });
            }
            Err(HlmlError::Timeout) => break,
            Err(err) => return step(Call::EventSetWait, Err(err)),
        }
    }

    step(Call::EventSetFree, hlml.event_set_free(set))
}

/// Arms every device and drains pending critical events until a wait times out.
pub fn watch(hlml: &mut FakeHlml, scenario: &str, timeout_ms: u32) -> WatchReport {
    let mut armed = 0;
    let mut events = Vec::new();
    let failure = drain_events(hlml, timeout_ms, &mut armed, &mut events).err();
    if let Some(failure) = &failure {
        tracing::error!("watch stopped: {}", failure);
    }

    WatchReport {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        scenario: scenario.to_string(),
        status: status_of(&failure),
        armed_devices: armed,
        events,
        remaining_events: hlml.pending_events().to_vec(),
        failure,
    }
}

impl fmt::Display for DiscoverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario: {}", self.scenario)?;
        for device in &self.devices {
            writeln!(
                f,
                "  [{}] {} id={} serial={}",
                device.index, device.pci_address, device.pci_device_id, device.serial
            )?;
        }
        writeln!(f, "devices: {}", self.devices.len())?;
        match &self.failure {
            Some(failure) => writeln!(f, "status: error ({})", failure),
            None => writeln!(f, "status: ok"),
        }
    }
}

impl fmt::Display for WatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario: {}", self.scenario)?;
        writeln!(f, "armed devices: {}", self.armed_devices)?;
        for event in &self.events {
            writeln!(
                f,
                "  critical event: serial={} pci={}",
                event.serial, event.pci_address
            )?;
        }
        if !self.remaining_events.is_empty() {
            writeln!(f, "undelivered: {}", self.remaining_events.join(", "))?;
        }
        match &self.failure {
            Some(failure) => writeln!(f, "status: error ({})", failure),
            None => writeln!(f, "status: ok"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fakehlml_core::ReturnCode;

    fn fleet() -> FakeHlml {
        let mut hlml = FakeHlml::new();
        hlml.add_device(Some("0000:0f:00.0"), "0x1020", "0x1da3", Some("AM1000"), 0)
            .unwrap();
        hlml.add_device(Some("0000:10:00.0"), "0x1020", "0x1da3", Some("AM1001"), 1)
            .unwrap();
        hlml
    }

    #[test]
    fn test_discover_lists_devices() {
        let mut hlml = fleet();
        let report = discover(&mut hlml, "fleet");
        assert_eq!(report.status, "ok");
        assert_eq!(report.devices.len(), 2);
        assert_eq!(report.devices[0].pci_device_id, "0x1da31020");
        assert_eq!(report.devices[1].serial, "AM1001");
    }

    #[test]
    fn test_discover_reports_failing_call() {
        let mut hlml = fleet();
        hlml.set_error(Call::DeviceGetSerial, ReturnCode::Error(HlmlError::Unknown));
        let report = discover(&mut hlml, "fleet");
        assert_eq!(report.status, "error");
        assert!(report.devices.is_empty());
        let failure = report.failure.unwrap();
        assert_eq!(failure.call, Call::DeviceGetSerial);
        assert_eq!(failure.code, 49);
    }

    #[test]
    fn test_watch_drains_events() {
        let mut hlml = fleet();
        hlml.add_critical_event("AM1000");
        hlml.add_critical_event("AM1001");
        let report = watch(&mut hlml, "fleet", 100);
        assert_eq!(report.status, "ok");
        assert_eq!(report.armed_devices, 2);
        let serials: Vec<_> = report.events.iter().map(|e| e.serial.as_str()).collect();
        assert_eq!(serials, vec!["AM1001", "AM1000"]);
        assert!(report.remaining_events.is_empty());
        assert_eq!(hlml.event_set_count(), 0);
    }

    #[test]
    fn test_watch_leaves_foreign_events() {
        let mut hlml = fleet();
        hlml.add_critical_event("AM1000");
        hlml.add_critical_event("UNKNOWN");
        let report = watch(&mut hlml, "fleet", 100);
        assert!(report.events.is_empty());
        assert_eq!(report.remaining_events, vec!["AM1000", "UNKNOWN"]);
        assert!(report.to_string().contains("undelivered: AM1000, UNKNOWN"));
    }

    #[test]
    fn test_watch_reports_wait_failure() {
        let mut hlml = fleet();
        hlml.set_error(Call::EventSetWait, ReturnCode::Error(HlmlError::AipIsLost));
        let report = watch(&mut hlml, "fleet", 100);
        let failure = report.failure.unwrap();
        assert_eq!(failure.call, Call::EventSetWait);
        assert_eq!(failure.status, HlmlError::AipIsLost);
    }
}
