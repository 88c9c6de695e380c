// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! In-process stand-in for the HLML device management library.
//!
//! A [`FakeHlml`] instance owns a small device registry, a per-call error
//! injection table and a queue of pending critical events. Harnesses populate
//! it through the control-plane methods (`add_device`, `set_error`,
//! `add_critical_event`, `reset`) and hand it to the code under test, which
//! calls the vendor-shaped entry points exactly as it would the real library.

pub mod device;
pub mod events;
pub mod hlml;
pub mod injection;
pub mod scenario;
pub mod stubs;


use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use device::{Device, DeviceHandle, DeviceRegistry, PciLookup};
pub use events::{EventQueue, EventRecord, EventSetHandle, EventTypes};
pub use hlml::{FakeHlml, InjectedError, PciInfo, StateSnapshot};
pub use injection::ErrorInjection;
pub use stubs::UnsupportedCall;

/// Length of the vendor's PCI address buffer, terminator included.
pub const PCI_ADDR_LEN: usize = 15;
/// Length of the vendor's serial buffer, terminator included.
pub const SERIAL_MAX: usize = 64;
pub const MAX_DEVICES: usize = 8;
pub const MAX_EVENTS: usize = 8;

/// Non-success statuses of the vendor library, numbered as in `hlml_return_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum HlmlError {
    #[error("HLML is not initialized")]
    Uninitialized,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("operation not supported")]
    NotSupported,
    #[error("HLML is already initialized")]
    AlreadyInitialized,
    #[error("not found")]
    NotFound,
    #[error("insufficient buffer size")]
    InsufficientSize,
    #[error("driver not loaded")]
    DriverNotLoaded,
    #[error("timed out")]
    Timeout,
    #[error("AIP is lost")]
    AipIsLost,
    #[error("out of memory")]
    Memory,
    #[error("no data")]
    NoData,
    #[error("unknown error")]
    Unknown,
}

pub type HlmlResult<T> = Result<T, HlmlError>;

impl HlmlError {
    pub const ALL: [HlmlError; 12] = [
        HlmlError::Uninitialized,
        HlmlError::InvalidArgument,
        HlmlError::NotSupported,
        HlmlError::AlreadyInitialized,
        HlmlError::NotFound,
        HlmlError::InsufficientSize,
        HlmlError::DriverNotLoaded,
        HlmlError::Timeout,
        HlmlError::AipIsLost,
        HlmlError::Memory,
        HlmlError::NoData,
        HlmlError::Unknown,
    ];

    pub fn code(self) -> u32 {
        match self {
            HlmlError::Uninitialized => 1,
            HlmlError::InvalidArgument => 2,
            HlmlError::NotSupported => 3,
            HlmlError::AlreadyInitialized => 5,
            HlmlError::NotFound => 6,
            HlmlError::InsufficientSize => 7,
            HlmlError::DriverNotLoaded => 9,
            HlmlError::Timeout => 10,
            HlmlError::AipIsLost => 15,
            HlmlError::Memory => 20,
            HlmlError::NoData => 21,
            HlmlError::Unknown => 49,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|err| err.code() == code)
    }

    fn name(self) -> &'static str {
        match self {
            HlmlError::Uninitialized => "uninitialized",
            HlmlError::InvalidArgument => "invalid_argument",
            HlmlError::NotSupported => "not_supported",
            HlmlError::AlreadyInitialized => "already_initialized",
            HlmlError::NotFound => "not_found",
            HlmlError::InsufficientSize => "insufficient_size",
            HlmlError::DriverNotLoaded => "driver_not_loaded",
            HlmlError::Timeout => "timeout",
            HlmlError::AipIsLost => "aip_is_lost",
            HlmlError::Memory => "memory",
            HlmlError::NoData => "no_data",
            HlmlError::Unknown => "unknown",
        }
    }
}

/// A status an entry point can be forced to return, `Success` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCode {
    #[default]
    Success,
    Error(HlmlError),
}

impl ReturnCode {
    pub fn code(self) -> u32 {
        match self {
            ReturnCode::Success => 0,
            ReturnCode::Error(err) => err.code(),
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ReturnCode::Success)
    }

    pub fn into_result(self) -> HlmlResult<()> {
        match self {
            ReturnCode::Success => Ok(()),
            ReturnCode::Error(err) => Err(err),
        }
    }
}

impl From<HlmlError> for ReturnCode {
    fn from(err: HlmlError) -> Self {
        ReturnCode::Error(err)
    }
}

impl<T> From<HlmlResult<T>> for ReturnCode {
    fn from(result: HlmlResult<T>) -> Self {
        match result {
            Ok(_) => ReturnCode::Success,
            Err(err) => ReturnCode::Error(err),
        }
    }
}

impl TryFrom<u32> for ReturnCode {
    type Error = ControlError;

    fn try_from(code: u32) -> Result<Self, ControlError> {
        if code == 0 {
            return Ok(ReturnCode::Success);
        }
        HlmlError::from_code(code)
            .map(ReturnCode::Error)
            .ok_or(ControlError::UnknownStatusCode(code))
    }
}

impl FromStr for ReturnCode {
    type Err = ControlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        if v == "success" {
            return Ok(ReturnCode::Success);
        }
        if let Ok(code) = v.parse::<u32>() {
            return ReturnCode::try_from(code);
        }
        let v = match v.as_str() {
            "out_of_memory" => "memory",
            "invalid_arg" => "invalid_argument",
            other => other,
        };
        HlmlError::ALL
            .into_iter()
            .find(|err| err.name() == v)
            .map(ReturnCode::Error)
            .ok_or_else(|| ControlError::UnknownStatus(value.to_string()))
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnCode::Success => write!(f, "success (0)"),
            ReturnCode::Error(err) => write!(f, "{} ({})", err, err.code()),
        }
    }
}

/// Entry points whose status can be injected. The numbering is part of the
/// harness contract and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum Call {
    Init = 0,
    InitWithFlags,
    Shutdown,
    DeviceGetCount,
    DeviceGetHandleByPciBusId,
    DeviceGetHandleByIndex,
    DeviceGetHandleByUuid,
    DeviceGetName,
    DeviceGetPciInfo,
    DeviceGetSerial,
    DeviceRegisterEvents,
    EventSetCreate,
    EventSetFree,
    EventSetWait,
}

impl Call {
    pub const COUNT: usize = 14;

    pub const ALL: [Call; Call::COUNT] = [
        Call::Init,
        Call::InitWithFlags,
        Call::Shutdown,
        Call::DeviceGetCount,
        Call::DeviceGetHandleByPciBusId,
        Call::DeviceGetHandleByIndex,
        Call::DeviceGetHandleByUuid,
        Call::DeviceGetName,
        Call::DeviceGetPciInfo,
        Call::DeviceGetSerial,
        Call::DeviceRegisterEvents,
        Call::EventSetCreate,
        Call::EventSetFree,
        Call::EventSetWait,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    /// Name of the vendor symbol this call mirrors.
    pub fn symbol(self) -> &'static str {
        match self {
            Call::Init => "hlml_init",
            Call::InitWithFlags => "hlml_init_with_flags",
            Call::Shutdown => "hlml_shutdown",
            Call::DeviceGetCount => "hlml_device_get_count",
            Call::DeviceGetHandleByPciBusId => "hlml_device_get_handle_by_pci_bus_id",
            Call::DeviceGetHandleByIndex => "hlml_device_get_handle_by_index",
            Call::DeviceGetHandleByUuid => "hlml_device_get_handle_by_UUID",
            Call::DeviceGetName => "hlml_device_get_name",
            Call::DeviceGetPciInfo => "hlml_device_get_pci_info",
            Call::DeviceGetSerial => "hlml_device_get_serial",
            Call::DeviceRegisterEvents => "hlml_device_register_events",
            Call::EventSetCreate => "hlml_event_set_create",
            Call::EventSetFree => "hlml_event_set_free",
            Call::EventSetWait => "hlml_event_set_wait",
        }
    }
}

impl TryFrom<u32> for Call {
    type Error = ControlError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or(ControlError::UnknownCallId(id))
    }
}

impl FromStr for Call {
    type Err = ControlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let v = lowered.strip_prefix("hlml_").unwrap_or(&lowered);
        let v = v.strip_prefix("fake_").unwrap_or(v);
        let call = match v {
            "init" => Call::Init,
            "init_with_flags" => Call::InitWithFlags,
            "shutdown" => Call::Shutdown,
            "device_get_count" => Call::DeviceGetCount,
            "device_get_handle_by_pci_bus_id" => Call::DeviceGetHandleByPciBusId,
            "device_get_handle_by_index" => Call::DeviceGetHandleByIndex,
            "device_get_handle_by_uuid" => Call::DeviceGetHandleByUuid,
            "device_get_name" => Call::DeviceGetName,
            "device_get_pci_info" => Call::DeviceGetPciInfo,
            "device_get_serial" => Call::DeviceGetSerial,
            "device_register_events" => Call::DeviceRegisterEvents,
            "event_set_create" => Call::EventSetCreate,
            "event_set_free" => Call::EventSetFree,
            "event_set_wait" => Call::EventSetWait,
            _ => return Err(ControlError::UnknownCall(value.to_string())),
        };
        Ok(call)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Failures of the harness-facing control plane. These never reach the code
/// under test; they report a misconfigured harness.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("device registry is full ({max} devices)")]
    RegistryFull { max: usize },
    #[error("invalid hexadecimal {field} '{value}'")]
    InvalidHexId { field: &'static str, value: String },
    #[error("unknown call '{0}'")]
    UnknownCall(String),
    #[error("unknown call id {0}")]
    UnknownCallId(u32),
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    #[error("unknown status code {0}")]
    UnknownStatusCode(u32),
}

/// Copy of `value` that fits a NUL-terminated buffer of `capacity` bytes.
pub(crate) fn bounded(value: &str, capacity: usize) -> String {
    let max = capacity.saturating_sub(1);
    if value.len() <= max {
        return value.to_string();
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Writes `value` plus a terminator into `buf`, truncating to fit.
pub(crate) fn write_c_string(buf: &mut [u8], value: &str) {
    if buf.is_empty() {
        return;
    }
    let len = value.len().min(buf.len() - 1);
    buf[..len].copy_from_slice(&value.as_bytes()[..len]);
    buf[len] = 0;
}

/// Reads a NUL-terminated string back out of a caller buffer.
pub fn c_string_from(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
