// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Call, FakeHlml, ReturnCode};
use anyhow::Context;
use fakehlml_config::Scenario;

impl FakeHlml {
    /// Builds a fresh instance from a validated scenario.
    pub fn from_scenario(scenario: &Scenario) -> anyhow::Result<Self> {
        let mut hlml = Self::with_pci_lookup(scenario.pci_lookup.into());
        hlml.apply_scenario(scenario)?;
        Ok(hlml)
    }

    /// Registers devices, injected errors and events, then initializes when
    /// the scenario asks for it. Errors are applied after devices so an
    /// injected `init` failure surfaces here.
    pub fn apply_scenario(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        tracing::info!("applying scenario '{}'", scenario.name);
        self.registry_mut().set_pci_lookup(scenario.pci_lookup.into());

        for device in &scenario.devices {
            self.add_device(
                device.pci_address.as_deref(),
                &device.device_id,
                &device.vendor_id,
                device.serial.as_deref(),
                device.index,
            )
            .with_context(|| format!("Failed to add device with index {}", device.index))?;
        }

        for error in &scenario.errors {
            let call: Call = error
                .call
                .parse()
                .with_context(|| format!("Invalid injected error in '{}'", scenario.name))?;
            let status: ReturnCode = error
                .status
                .parse()
                .with_context(|| format!("Invalid status for injected error on {}", call))?;
            self.set_error(call, status);
        }

        for serial in &scenario.events {
            self.add_critical_event(serial);
        }

        if scenario.initialize {
            self.init()
                .with_context(|| format!("Scenario '{}' failed to initialize", scenario.name))?;
        }

        Ok(())
    }
}
