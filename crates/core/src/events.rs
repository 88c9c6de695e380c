// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Simulated asynchronous notifications.
//!
//! Pending critical events live in a single bounded queue keyed by device
//! serial. Waiting on an event set only ever looks at the newest pending
//! event, so each `add_critical_event` yields at most one delivery.

use crate::{bounded, DeviceHandle, MAX_DEVICES, MAX_EVENTS, SERIAL_MAX};
use bitflags::bitflags;
use serde::Serialize;
use std::collections::BTreeMap;

bitflags! {
    /// Event classes a device can be registered for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventTypes: u64 {
        const ECC_ERR = 1 << 0;
        const CRITICAL_ERR = 1 << 1;
        const CLOCK_RATE = 1 << 2;
    }
}

/// Delivered by a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub device: DeviceHandle,
    pub event_type: EventTypes,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventQueue {
    pending: Vec<String>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a serial. Returns `false` and drops it when the queue is full.
    pub fn push(&mut self, serial: &str) -> bool {
        if self.pending.len() >= MAX_EVENTS {
            tracing::warn!(
                "maximum number of fake events ({}) reached; dropping event for '{}'",
                MAX_EVENTS,
                serial
            );
            return false;
        }
        self.pending.push(bounded(serial, SERIAL_MAX));
        true
    }

    /// Newest pending serial.
    pub fn tail(&self) -> Option<&str> {
        self.pending.last().map(String::as_str)
    }

    pub fn pop(&mut self) -> Option<String> {
        self.pending.pop()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending serials, oldest first.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EventSetHandle(u64);

impl EventSetHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Device slots of one subscription, in registration order.
#[derive(Debug, Clone, Default)]
pub struct EventSet {
    devices: Vec<DeviceHandle>,
}

impl EventSet {
    /// Claims a slot for `device`. Registering a bound device again is a no-op.
    /// Returns `false` when every slot belongs to another device.
    pub fn register(&mut self, device: DeviceHandle) -> bool {
        if self.devices.contains(&device) {
            return true;
        }
        if self.devices.len() >= MAX_DEVICES {
            return false;
        }
        self.devices.push(device);
        true
    }

    pub fn devices(&self) -> &[DeviceHandle] {
        &self.devices
    }

    /// Releases the slots of devices for which `live` returns `false`.
    pub fn retain_live(&mut self, live: impl Fn(DeviceHandle) -> bool) {
        self.devices.retain(|&device| live(device));
    }
}

/// Live event sets. Ids are never reused, so a freed handle stays invalid.
#[derive(Debug, Default)]
pub struct EventSets {
    sets: BTreeMap<EventSetHandle, EventSet>,
    next_id: u64,
}

impl EventSets {
    pub fn create(&mut self) -> EventSetHandle {
        self.next_id += 1;
        let handle = EventSetHandle(self.next_id);
        self.sets.insert(handle, EventSet::default());
        handle
    }

    pub fn get(&self, handle: EventSetHandle) -> Option<&EventSet> {
        self.sets.get(&handle)
    }

    pub fn get_mut(&mut self, handle: EventSetHandle) -> Option<&mut EventSet> {
        self.sets.get_mut(&handle)
    }

    pub fn free(&mut self, handle: EventSetHandle) -> bool {
        self.sets.remove(&handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceRegistry;

    #[test]
    fn test_queue_is_lifo() {
        let mut queue = EventQueue::new();
        assert!(queue.tail().is_none());
        queue.push("S1");
        queue.push("S2");
        assert_eq!(queue.tail(), Some("S2"));
        assert_eq!(queue.pop().as_deref(), Some("S2"));
        assert_eq!(queue.tail(), Some("S1"));
    }

    #[test]
    fn test_queue_drops_overflow() {
        let mut queue = EventQueue::new();
        for i in 0..MAX_EVENTS {
            assert!(queue.push(&format!("S{}", i)));
        }
        let before = queue.pending().to_vec();
        assert!(!queue.push("S-overflow"));
        assert_eq!(queue.pending(), before.as_slice());
        assert_eq!(queue.tail(), Some("S7"));
    }

    #[test]
    fn test_event_set_registration_is_idempotent() {
        let mut registry = DeviceRegistry::new();
        let a = registry.add(None, "0x1", "0x0", Some("A"), 0).unwrap();
        let b = registry.add(None, "0x1", "0x0", Some("B"), 1).unwrap();

        let mut set = EventSet::default();
        assert!(set.register(a));
        assert!(set.register(a));
        assert!(set.register(b));
        assert_eq!(set.devices(), &[a, b]);
    }

    #[test]
    fn test_event_set_capacity() {
        let mut registry = DeviceRegistry::new();
        let handles: Vec<_> = (0..MAX_DEVICES as u32)
            .map(|i| registry.add(None, "0x1", "0x0", None, i).unwrap())
            .collect();

        let mut set = EventSet::default();
        for handle in &handles {
            assert!(set.register(*handle));
        }
        assert!(set.register(handles[0]));

        registry.clear();
        let newcomer = registry.add(None, "0x1", "0x0", None, 0).unwrap();
        assert!(!set.register(newcomer));
    }

    #[test]
    fn test_retain_live_releases_stale_slots() {
        let mut registry = DeviceRegistry::new();
        let mut set = EventSet::default();
        for i in 0..MAX_DEVICES as u32 {
            let handle = registry.add(None, "0x1", "0x0", None, i).unwrap();
            assert!(set.register(handle));
        }

        registry.clear();
        let newcomer = registry.add(None, "0x1", "0x0", None, 0).unwrap();
        set.retain_live(|handle| registry.get(handle).is_some());
        assert!(set.devices().is_empty());
        assert!(set.register(newcomer));
        assert_eq!(set.devices(), &[newcomer]);
    }

    #[test]
    fn test_freed_ids_are_not_reused() {
        let mut sets = EventSets::default();
        let first = sets.create();
        assert!(sets.free(first));
        assert!(!sets.free(first));
        let second = sets.create();
        assert_ne!(first, second);
        assert!(sets.get(first).is_none());
        assert!(sets.get(second).is_some());
        assert_eq!(sets.len(), 1);
    }
}
