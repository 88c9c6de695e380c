// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Vendor entry points the fake does not model.

use crate::hlml::{trace_call, FakeHlml};
use crate::{Call, DeviceHandle, HlmlError, HlmlResult};

/// Telemetry and management calls that always report `NotSupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedCall {
    GetClockInfo,
    GetMaxClockInfo,
    GetClockLimitInfo,
    GetUtilizationRates,
    GetMemoryInfo,
    GetTemperature,
    GetTemperatureThreshold,
    GetPersistenceMode,
    GetPerformanceState,
    GetSupportedPerformanceStates,
    GetPowerUsage,
    GetPowerManagementMode,
    GetPowerManagementLimit,
    SetPowerManagementLimit,
    GetPowerManagementDefaultLimit,
    GetEccMode,
    GetTotalEccErrors,
    GetMemoryErrorCounter,
    GetUuid,
    GetMinorNumber,
    GetMacInfo,
    GetHlRevision,
    GetPcbInfo,
    GetModuleId,
    GetBoardId,
    GetPcieThroughput,
    GetPcieReplayCounter,
    GetCurrPcieLinkGeneration,
    GetCurrPcieLinkWidth,
    GetCurrentClocksThrottleReasons,
    GetTotalEnergyConsumption,
    GetMacAddrInfo,
    NicGetLink,
    NicGetStatistics,
    ClearCpuAffinity,
    GetCpuAffinity,
    GetCpuAffinityWithinScope,
    GetMemoryAffinity,
    SetCpuAffinity,
    GetViolationStatus,
    GetReplacedRows,
    GetReplacedRowsPendingStatus,
    GetHlmlVersion,
    GetDriverVersion,
    GetNicDriverVersion,
    GetModelNumber,
    GetFirmwareFitVersion,
    GetFirmwareSpiVersion,
    GetFwBootVersion,
    GetFwOsVersion,
    GetCpldVersion,
    GetOperStatus,
}

impl UnsupportedCall {
    pub const ALL: [UnsupportedCall; 52] = [
        UnsupportedCall::GetClockInfo,
        UnsupportedCall::GetMaxClockInfo,
        UnsupportedCall::GetClockLimitInfo,
        UnsupportedCall::GetUtilizationRates,
        UnsupportedCall::GetMemoryInfo,
        UnsupportedCall::GetTemperature,
        UnsupportedCall::GetTemperatureThreshold,
        UnsupportedCall::GetPersistenceMode,
        UnsupportedCall::GetPerformanceState,
        UnsupportedCall::GetSupportedPerformanceStates,
        UnsupportedCall::GetPowerUsage,
        UnsupportedCall::GetPowerManagementMode,
        UnsupportedCall::GetPowerManagementLimit,
        UnsupportedCall::SetPowerManagementLimit,
        UnsupportedCall::GetPowerManagementDefaultLimit,
        UnsupportedCall::GetEccMode,
        UnsupportedCall::GetTotalEccErrors,
        UnsupportedCall::GetMemoryErrorCounter,
        UnsupportedCall::GetUuid,
        UnsupportedCall::GetMinorNumber,
        UnsupportedCall::GetMacInfo,
        UnsupportedCall::GetHlRevision,
        UnsupportedCall::GetPcbInfo,
        UnsupportedCall::GetModuleId,
        UnsupportedCall::GetBoardId,
        UnsupportedCall::GetPcieThroughput,
        UnsupportedCall::GetPcieReplayCounter,
        UnsupportedCall::GetCurrPcieLinkGeneration,
        UnsupportedCall::GetCurrPcieLinkWidth,
        UnsupportedCall::GetCurrentClocksThrottleReasons,
        UnsupportedCall::GetTotalEnergyConsumption,
        UnsupportedCall::GetMacAddrInfo,
        UnsupportedCall::NicGetLink,
        UnsupportedCall::NicGetStatistics,
        UnsupportedCall::ClearCpuAffinity,
        UnsupportedCall::GetCpuAffinity,
        UnsupportedCall::GetCpuAffinityWithinScope,
        UnsupportedCall::GetMemoryAffinity,
        UnsupportedCall::SetCpuAffinity,
        UnsupportedCall::GetViolationStatus,
        UnsupportedCall::GetReplacedRows,
        UnsupportedCall::GetReplacedRowsPendingStatus,
        UnsupportedCall::GetHlmlVersion,
        UnsupportedCall::GetDriverVersion,
        UnsupportedCall::GetNicDriverVersion,
        UnsupportedCall::GetModelNumber,
        UnsupportedCall::GetFirmwareFitVersion,
        UnsupportedCall::GetFirmwareSpiVersion,
        UnsupportedCall::GetFwBootVersion,
        UnsupportedCall::GetFwOsVersion,
        UnsupportedCall::GetCpldVersion,
        UnsupportedCall::GetOperStatus,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            UnsupportedCall::GetClockInfo => "hlml_device_get_clock_info",
            UnsupportedCall::GetMaxClockInfo => "hlml_device_get_max_clock_info",
            UnsupportedCall::GetClockLimitInfo => "hlml_device_get_clock_limit_info",
            UnsupportedCall::GetUtilizationRates => "hlml_device_get_utilization_rates",
            UnsupportedCall::GetMemoryInfo => "hlml_device_get_memory_info",
            UnsupportedCall::GetTemperature => "hlml_device_get_temperature",
            UnsupportedCall::GetTemperatureThreshold => "hlml_device_get_temperature_threshold",
            UnsupportedCall::GetPersistenceMode => "hlml_device_get_persistence_mode",
            UnsupportedCall::GetPerformanceState => "hlml_device_get_performance_state",
            UnsupportedCall::GetSupportedPerformanceStates => {
                "hlml_device_get_supported_performance_states"
            }
            UnsupportedCall::GetPowerUsage => "hlml_device_get_power_usage",
            UnsupportedCall::GetPowerManagementMode => "hlml_device_get_power_management_mode",
            UnsupportedCall::GetPowerManagementLimit => "hlml_device_get_power_management_limit",
            UnsupportedCall::SetPowerManagementLimit => "hlml_device_set_power_management_limit",
            UnsupportedCall::GetPowerManagementDefaultLimit => {
                "hlml_device_get_power_management_default_limit"
            }
            UnsupportedCall::GetEccMode => "hlml_device_get_ecc_mode",
            UnsupportedCall::GetTotalEccErrors => "hlml_device_get_total_ecc_errors",
            UnsupportedCall::GetMemoryErrorCounter => "hlml_device_get_memory_error_counter",
            UnsupportedCall::GetUuid => "hlml_device_get_uuid",
            UnsupportedCall::GetMinorNumber => "hlml_device_get_minor_number",
            UnsupportedCall::GetMacInfo => "hlml_device_get_mac_info",
            UnsupportedCall::GetHlRevision => "hlml_device_get_hl_revision",
            UnsupportedCall::GetPcbInfo => "hlml_device_get_pcb_info",
            UnsupportedCall::GetModuleId => "hlml_device_get_module_id",
            UnsupportedCall::GetBoardId => "hlml_device_get_board_id",
            UnsupportedCall::GetPcieThroughput => "hlml_device_get_pcie_throughput",
            UnsupportedCall::GetPcieReplayCounter => "hlml_device_get_pcie_replay_counter",
            UnsupportedCall::GetCurrPcieLinkGeneration => {
                "hlml_device_get_curr_pcie_link_generation"
            }
            UnsupportedCall::GetCurrPcieLinkWidth => "hlml_device_get_curr_pcie_link_width",
            UnsupportedCall::GetCurrentClocksThrottleReasons => {
                "hlml_device_get_current_clocks_throttle_reasons"
            }
            UnsupportedCall::GetTotalEnergyConsumption => {
                "hlml_device_get_total_energy_consumption"
            }
            UnsupportedCall::GetMacAddrInfo => "hlml_get_mac_addr_info",
            UnsupportedCall::NicGetLink => "hlml_nic_get_link",
            UnsupportedCall::NicGetStatistics => "hlml_nic_get_statistics",
            UnsupportedCall::ClearCpuAffinity => "hlml_device_clear_cpu_affinity",
            UnsupportedCall::GetCpuAffinity => "hlml_device_get_cpu_affinity",
            UnsupportedCall::GetCpuAffinityWithinScope => {
                "hlml_device_get_cpu_affinity_within_scope"
            }
            UnsupportedCall::GetMemoryAffinity => "hlml_device_get_memory_affinity",
            UnsupportedCall::SetCpuAffinity => "hlml_device_set_cpu_affinity",
            UnsupportedCall::GetViolationStatus => "hlml_device_get_violation_status",
            UnsupportedCall::GetReplacedRows => "hlml_device_get_replaced_rows",
            UnsupportedCall::GetReplacedRowsPendingStatus => {
                "hlml_device_get_replaced_rows_pending_status"
            }
            UnsupportedCall::GetHlmlVersion => "hlml_get_hlml_version",
            UnsupportedCall::GetDriverVersion => "hlml_get_driver_version",
            UnsupportedCall::GetNicDriverVersion => "hlml_get_nic_driver_version",
            UnsupportedCall::GetModelNumber => "hlml_get_model_number",
            UnsupportedCall::GetFirmwareFitVersion => "hlml_get_firmware_fit_version",
            UnsupportedCall::GetFirmwareSpiVersion => "hlml_get_firmware_spi_version",
            UnsupportedCall::GetFwBootVersion => "hlml_get_fw_boot_version",
            UnsupportedCall::GetFwOsVersion => "hlml_get_fw_os_version",
            UnsupportedCall::GetCpldVersion => "hlml_get_cpld_version",
            UnsupportedCall::GetOperStatus => "hlml_device_get_oper_status",
        }
    }
}

impl FakeHlml {
    /// Entry point for every call in [`UnsupportedCall`]. Arguments are not
    /// inspected and no state changes.
    pub fn unsupported(&self, call: UnsupportedCall) -> HlmlResult<()> {
        trace_call(call.symbol());
        Err(HlmlError::NotSupported)
    }

    /// Accepted for callers that only probe for the symbol. No handle is
    /// produced and forced statuses do not apply.
    pub fn device_get_handle_by_uuid(&self, _uuid: &str) -> HlmlResult<Option<DeviceHandle>> {
        trace_call(Call::DeviceGetHandleByUuid.symbol());
        Ok(None)
    }

    /// Succeeds without touching `name`. Forced statuses do not apply.
    pub fn device_get_name(
        &self,
        _device: Option<DeviceHandle>,
        _name: &mut [u8],
    ) -> HlmlResult<()> {
        trace_call(Call::DeviceGetName.symbol());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReturnCode;
    use std::collections::HashSet;

    #[test]
    fn test_every_stub_is_not_supported() {
        let mut hlml = FakeHlml::new();
        hlml.add_device(None, "0x1", "0x0", Some("S1"), 0).unwrap();
        hlml.init().unwrap();
        for call in UnsupportedCall::ALL {
            assert_eq!(hlml.unsupported(call), Err(HlmlError::NotSupported));
        }
    }

    #[test]
    fn test_stub_symbols_are_unique() {
        let symbols: HashSet<_> = UnsupportedCall::ALL.iter().map(|c| c.symbol()).collect();
        assert_eq!(symbols.len(), UnsupportedCall::ALL.len());
        assert!(symbols.iter().all(|s| s.starts_with("hlml_")));
    }

    #[test]
    fn test_legacy_entries_succeed_without_side_effects() {
        let hlml = FakeHlml::new();
        assert_eq!(hlml.device_get_handle_by_uuid("any"), Ok(None));

        let mut name = [b'x'; 8];
        assert!(hlml.device_get_name(None, &mut name).is_ok());
        assert_eq!(name, [b'x'; 8]);
    }

    #[test]
    fn test_legacy_entries_ignore_forced_status() {
        let mut hlml = FakeHlml::new();
        hlml.set_error(Call::DeviceGetHandleByUuid, HlmlError::NotFound.into());
        hlml.set_error(Call::DeviceGetName, HlmlError::Unknown.into());
        assert_eq!(hlml.device_get_handle_by_uuid("any"), Ok(None));

        let mut name = [b'x'; 8];
        assert_eq!(hlml.device_get_name(None, &mut name), Ok(()));
        assert_eq!(name, [b'x'; 8]);
        assert_eq!(
            hlml.injected_error(Call::DeviceGetName),
            ReturnCode::Error(HlmlError::Unknown)
        );
    }
}
