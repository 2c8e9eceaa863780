//! # Resource registry with idle bitmap.
//!
//! Registry is an arena of registered resources plus a parallel idle bitmap; it is the
//! single source of truth for "who is currently known-idle".
//!
//! ## Architecture
//! ```text
//! index:     0          1          2
//! resources: [network]  [db-pool]  [animations]     (append-only, never shrinks)
//! idle:      [ false ]  [ true  ]  [ false     ]    (last-known status)
//! ```
//!
//! ## Rules
//! - Indices are dense, assigned in registration order, never reused.
//! - Owned by the coordinator task; no interior locking.
//! - Bits flip to `true` on a processed transition or on a live poll that finds the
//!   resource idle; only the registration poll may seed a `false`.

use crate::resources::ResourceRef;

/// Outcome of scanning busy bits against live status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// Every busy bit is confirmed busy; names in registration order.
    Busy(Vec<String>),
    /// Some busy bits report idle live; result indeterminate until re-checked.
    Racy(Vec<usize>),
}

/// Arena of registered resources and their last-known idle status.
#[derive(Default)]
pub struct Registry {
    resources: Vec<ResourceRef>,
    idle: Vec<bool>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `resource` with its initial status and returns its index.
    pub fn push(&mut self, resource: ResourceRef, idle: bool) -> usize {
        self.resources.push(resource);
        self.idle.push(idle);
        self.resources.len() - 1
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Name of the resource at `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.resources.get(index).map(|r| r.name())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.name().to_string()).collect()
    }

    /// Last-known status of the resource at `index` (`false` when out of range).
    pub fn is_marked_idle(&self, index: usize) -> bool {
        self.idle.get(index).copied().unwrap_or(false)
    }

    /// Records a busy -> idle transition.
    ///
    /// Returns `false` for an unknown index.
    pub fn mark_idle(&mut self, index: usize) -> bool {
        match self.idle.get_mut(index) {
            Some(bit) => {
                *bit = true;
                true
            }
            None => false,
        }
    }

    /// Returns `true` when every bit is set (no re-poll).
    pub fn all_marked_idle(&self) -> bool {
        self.idle.iter().all(|&bit| bit)
    }

    /// Re-polls every busy bit, catching up resources that idled without a
    /// transition message, and returns whether all bits are now set.
    pub fn all_idle(&mut self) -> bool {
        for (bit, resource) in self.idle.iter_mut().zip(&self.resources) {
            if !*bit {
                *bit = resource.is_idle_now();
            }
        }
        self.all_marked_idle()
    }

    /// Names of resources whose bit is busy, in registration order (no re-poll).
    pub fn busy_names(&self) -> Vec<String> {
        self.idle
            .iter()
            .zip(&self.resources)
            .filter(|(bit, _)| !**bit)
            .map(|(_, r)| r.name().to_string())
            .collect()
    }

    /// Polls every busy bit without updating it.
    ///
    /// A resource that reports idle while its bit is busy has either a transition
    /// message in flight or never sends one; it is returned as racy instead of busy.
    pub fn scan(&self) -> Scan {
        let mut busy = Vec::new();
        let mut racy = Vec::new();

        for (index, (bit, resource)) in self.idle.iter().zip(&self.resources).enumerate() {
            if *bit {
                continue;
            }
            if resource.is_idle_now() {
                racy.push(index);
            } else {
                busy.push(resource.name().to_string());
            }
        }

        if racy.is_empty() {
            Scan::Busy(busy)
        } else {
            Scan::Racy(racy)
        }
    }
}
