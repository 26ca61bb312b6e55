//! Connection registry: the tick thread's record of every connected viewer.
//!
//! The registry is pure bookkeeping.  It performs no I/O and is mutated only
//! on the tick thread.  Viewers are kept in insertion order, which is the
//! order the control arbiter rotates through and the order the viewer list
//! is displayed in.
//!
//! Removing a viewer that holds control must also move the control lease.
//! That coordination lives in
//! [`TickContext::unregister_viewer`](crate::application::tick::TickContext::unregister_viewer),
//! which asks the arbiter to rotate *before* the viewer leaves the registry
//! so its position is still known.
//!
//! The viewer count is mirrored into a [`ViewerCount`] handle that other
//! threads can read without touching the registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::domain::viewer::{Viewer, ViewerId, ViewerIdAllocator};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("viewer {0} is already registered")]
    DuplicateId(ViewerId),
}

/// Read-only, cross-thread view of the number of registered viewers.
#[derive(Debug, Clone, Default)]
pub struct ViewerCount(Arc<AtomicUsize>);

impl ViewerCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, count: usize) {
        self.0.store(count, Ordering::Release);
    }
}

/// Ordered set of registered viewers.
#[derive(Debug)]
pub struct ConnectionRegistry {
    viewers: Vec<Viewer>,
    ids: Arc<ViewerIdAllocator>,
    count: ViewerCount,
}

impl ConnectionRegistry {
    /// Creates an empty registry with its own id allocator.
    pub fn new() -> Self {
        Self::with_allocator(Arc::new(ViewerIdAllocator::new()))
    }

    /// Creates an empty registry sharing `ids` with the I/O workers.
    pub fn with_allocator(ids: Arc<ViewerIdAllocator>) -> Self {
        Self {
            viewers: Vec::new(),
            ids,
            count: ViewerCount::default(),
        }
    }

    /// Registers a viewer under a fresh id.  Does not grant control.
    pub fn register(&mut self, address: impl Into<String>, now: Instant) -> ViewerId {
        let id = self.ids.allocate();
        self.viewers.push(Viewer::new(id, address, now));
        self.count.set(self.viewers.len());
        id
    }

    /// Registers a viewer under an id an I/O worker already allocated.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if a viewer with `id` is
    /// already registered.
    pub fn register_with_id(
        &mut self,
        id: ViewerId,
        address: impl Into<String>,
        now: Instant,
    ) -> Result<(), RegistryError> {
        if self.contains(id) {
            return Err(RegistryError::DuplicateId(id));
        }
        self.viewers.push(Viewer::new(id, address, now));
        self.count.set(self.viewers.len());
        Ok(())
    }

    /// Removes a viewer.  Removing an unknown id is a no-op.
    pub fn unregister(&mut self, id: ViewerId) -> Option<Viewer> {
        let index = self.position(id)?;
        let removed = self.viewers.remove(index);
        self.count.set(self.viewers.len());
        Some(removed)
    }

    /// All viewers in registration order.
    pub fn list(&self) -> &[Viewer] {
        &self.viewers
    }

    pub fn count(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }

    /// A handle other threads can poll for the current count.
    pub fn count_handle(&self) -> ViewerCount {
        self.count.clone()
    }

    /// The allocator shared with the accept workers.
    pub fn allocator(&self) -> Arc<ViewerIdAllocator> {
        Arc::clone(&self.ids)
    }

    pub fn get(&self, id: ViewerId) -> Option<&Viewer> {
        self.viewers.iter().find(|v| v.id == id)
    }

    pub fn contains(&self, id: ViewerId) -> bool {
        self.position(id).is_some()
    }

    /// Sets the `has_control` flag of one viewer.  Only the arbiter calls
    /// this.
    pub(crate) fn set_control(&mut self, id: ViewerId, has_control: bool) {
        if let Some(viewer) = self.viewers.iter_mut().find(|v| v.id == id) {
            viewer.has_control = has_control;
        }
    }

    /// The first viewer after `id` in registration order, wrapping around,
    /// that is not `id` itself and satisfies `eligible`.
    ///
    /// If `id` is not registered the search starts at the front.
    pub fn successor_of<F>(&self, id: ViewerId, eligible: F) -> Option<ViewerId>
    where
        F: Fn(ViewerId) -> bool,
    {
        let len = self.viewers.len();
        if len == 0 {
            return None;
        }
        let start = self.position(id).map_or(0, |i| i + 1);
        (0..len)
            .map(|offset| &self.viewers[(start + offset) % len])
            .map(|v| v.id)
            .find(|&candidate| candidate != id && eligible(candidate))
    }

    fn position(&self, id: ViewerId) -> Option<usize> {
        self.viewers.iter().position(|v| v.id == id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(addresses: &[&str]) -> (ConnectionRegistry, Vec<ViewerId>) {
        let mut registry = ConnectionRegistry::new();
        let now = Instant::now();
        let ids = addresses.iter().map(|a| registry.register(*a, now)).collect();
        (registry, ids)
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.count(), 0);
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_register_assigns_fresh_ids_without_control() {
        // Arrange / Act
        let (registry, ids) = registry_with(&["a:1", "b:2"]);

        // Assert
        assert_eq!(ids, vec![ViewerId(1), ViewerId(2)]);
        assert!(registry.list().iter().all(|v| !v.has_control));
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let (registry, ids) = registry_with(&["a", "b", "c"]);
        let listed: Vec<ViewerId> = registry.list().iter().map(|v| v.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let (mut registry, ids) = registry_with(&["a", "b"]);

        assert!(registry.unregister(ids[0]).is_some());
        assert!(registry.unregister(ids[0]).is_none());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_ids_are_not_reused_after_unregister() {
        let (mut registry, ids) = registry_with(&["a"]);
        registry.unregister(ids[0]);

        let next = registry.register("b", Instant::now());

        assert_ne!(next, ids[0]);
    }

    #[test]
    fn test_register_with_id_rejects_duplicates() {
        let mut registry = ConnectionRegistry::new();
        let now = Instant::now();

        registry.register_with_id(ViewerId(10), "a", now).unwrap();
        let result = registry.register_with_id(ViewerId(10), "b", now);

        assert_eq!(result, Err(RegistryError::DuplicateId(ViewerId(10))));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_count_handle_tracks_changes() {
        let (mut registry, ids) = registry_with(&["a", "b"]);
        let handle = registry.count_handle();
        assert_eq!(handle.get(), 2);

        registry.unregister(ids[1]);

        assert_eq!(handle.get(), 1);
    }

    #[test]
    fn test_successor_wraps_around() {
        let (registry, ids) = registry_with(&["a", "b", "c"]);

        assert_eq!(registry.successor_of(ids[0], |_| true), Some(ids[1]));
        assert_eq!(registry.successor_of(ids[2], |_| true), Some(ids[0]));
    }

    #[test]
    fn test_successor_skips_ineligible_and_self() {
        let (registry, ids) = registry_with(&["a", "b", "c"]);
        let only_a = ids[0];

        assert_eq!(registry.successor_of(ids[0], |id| id != ids[1]), Some(ids[2]));
        assert_eq!(registry.successor_of(only_a, |id| id == only_a), None);
    }

    #[test]
    fn test_successor_of_unknown_id_starts_at_front() {
        let (registry, ids) = registry_with(&["a", "b"]);
        assert_eq!(registry.successor_of(ViewerId(99), |_| true), Some(ids[0]));
    }

    #[test]
    fn test_set_control_updates_flag() {
        let (mut registry, ids) = registry_with(&["a"]);
        registry.set_control(ids[0], true);
        assert!(registry.get(ids[0]).unwrap().has_control);
    }
}
