// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{Call, HlmlError, HlmlResult, ReturnCode};

/// Forced return status per injectable call; `Success` means no override.
#[derive(Debug, Clone, Default)]
pub struct ErrorInjection {
    forced: [ReturnCode; Call::COUNT],
}

impl ErrorInjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, call: Call, status: ReturnCode) {
        self.forced[call as usize] = status;
    }

    pub fn get(&self, call: Call) -> ReturnCode {
        self.forced[call as usize]
    }

    /// `Err` with the forced status when `call` has an override.
    pub fn check(&self, call: Call) -> HlmlResult<()> {
        let forced = self.get(call);
        if !forced.is_success() {
            tracing::debug!("{}: returning injected status {}", call, forced);
        }
        forced.into_result()
    }

    pub fn clear(&mut self) {
        self.forced = Default::default();
    }

    pub fn overrides(&self) -> impl Iterator<Item = (Call, HlmlError)> + '_ {
        Call::ALL.into_iter().filter_map(|call| match self.get(call) {
            ReturnCode::Success => None,
            ReturnCode::Error(err) => Some((call, err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_success() {
        let table = ErrorInjection::new();
        for call in Call::ALL {
            assert_eq!(table.get(call), ReturnCode::Success);
            assert!(table.check(call).is_ok());
        }
        assert_eq!(table.overrides().count(), 0);
    }

    #[test]
    fn test_set_only_affects_one_call() {
        let mut table = ErrorInjection::new();
        table.set(Call::DeviceGetCount, HlmlError::Unknown.into());

        assert_eq!(table.check(Call::DeviceGetCount), Err(HlmlError::Unknown));
        assert!(table.check(Call::DeviceGetSerial).is_ok());
        assert_eq!(
            table.overrides().collect::<Vec<_>>(),
            vec![(Call::DeviceGetCount, HlmlError::Unknown)]
        );
    }

    #[test]
    fn test_overwrite_and_clear() {
        let mut table = ErrorInjection::new();
        table.set(Call::EventSetWait, HlmlError::Unknown.into());
        table.set(Call::EventSetWait, HlmlError::NoData.into());
        assert_eq!(table.check(Call::EventSetWait), Err(HlmlError::NoData));

        table.set(Call::EventSetWait, ReturnCode::Success);
        assert!(table.check(Call::EventSetWait).is_ok());

        table.set(Call::Init, HlmlError::DriverNotLoaded.into());
        table.clear();
        assert!(table.check(Call::Init).is_ok());
    }
}
