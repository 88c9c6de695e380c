// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const SUPPORTED_SCHEMA_VERSION: &str = "1.0";

/// Upper bound on devices a scenario may declare; matches the fake's registry size.
pub const MAX_SCENARIO_DEVICES: usize = 8;

/// Queue depth of the fake. Scenarios may list more events to exercise overflow.
pub const MAX_SCENARIO_EVENTS: usize = 8;

/// Default schema version for YAML scenarios
fn default_schema_version() -> String {
    SUPPORTED_SCHEMA_VERSION.to_string()
}

fn default_vendor_id() -> String {
    "0x0".to_string()
}

/// How PCI bus id lookups match registered devices.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PciLookupMode {
    #[default]
    Exact,
    /// First device whose address differs from the query. Only for suites
    /// that depend on the historical behavior.
    #[serde(alias = "legacy")]
    LegacyInverted,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    #[serde(default)]
    pub pci_address: Option<String>,
    pub device_id: String, // hex, e.g. "0x1020"
    #[serde(default = "default_vendor_id")]
    pub vendor_id: String,
    #[serde(default)]
    pub serial: Option<String>,
    pub index: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct InjectedErrorConfig {
    pub call: String,   // "device_get_count", "event_set_wait", ...
    pub status: String, // "unknown", "not_found", "success", ...
}

/// A complete harness setup for one fake instance.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    /// Run `init()` once devices, errors and events are in place.
    #[serde(default)]
    pub initialize: bool,
    #[serde(default)]
    pub pci_lookup: PciLookupMode,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub errors: Vec<InjectedErrorConfig>,
    /// Serials queued as critical events, oldest first.
    #[serde(default)]
    pub events: Vec<String>,
}

impl Scenario {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario at {:?}", path))?;

        let scenario: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse scenario JSON from {:?}", path))?
        } else {
            serde_yaml::from_str(&content).context("Failed to parse Scenario YAML")?
        };

        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(yaml).context("Failed to parse Scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SUPPORTED_SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SUPPORTED_SCHEMA_VERSION
            );
        }

        if self.name.trim().is_empty() {
            anyhow::bail!("Scenario 'name' cannot be empty");
        }

        if self.devices.len() > MAX_SCENARIO_DEVICES {
            anyhow::bail!(
                "Scenario '{}' declares {} devices; at most {} are supported",
                self.name,
                self.devices.len(),
                MAX_SCENARIO_DEVICES
            );
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.device_id.trim().is_empty() {
                anyhow::bail!("Device with index {} has an empty 'device_id'", device.index);
            }
            if !seen.insert(device.index) {
                // Lookups resolve to the first registration; keep going.
                tracing::warn!(
                    "Scenario '{}' registers index {} more than once",
                    self.name,
                    device.index
                );
            }
        }

        for error in &self.errors {
            if error.call.trim().is_empty() {
                anyhow::bail!("Injected error entry has an empty 'call'");
            }
            if error.status.trim().is_empty() {
                anyhow::bail!("Injected error for '{}' has an empty 'status'", error.call);
            }
        }

        if self.events.len() > MAX_SCENARIO_EVENTS {
            tracing::warn!(
                "Scenario '{}' queues {} events; only the first {} will be kept",
                self.name,
                self.events.len(),
                MAX_SCENARIO_EVENTS
            );
        }

        Ok(())
    }
}
