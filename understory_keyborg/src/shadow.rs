// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The set of shadow roots carrying routing listeners.
//!
//! Native `focusin`/`focusout` do not reach outer trees when focus moves
//! inside a shadow tree, so every shadow root on the focus path gets its own
//! capture listeners. This set is the frontier of those roots: a root is in it
//! while it lies between the focused leaf and the document, or belongs to the
//! focused element itself.
//!
//! Each focus transition recomputes the shadow ancestors of the new leaf and
//! evicts the difference, in the same way a focus path update yields
//! leave transitions for the old tail.

use alloc::vec::Vec;

use smallvec::SmallVec;
use understory_dom::{ListenerId, Node, WeakNode};

/// Shadow roots between `leaf` and the document, outside-in.
pub(crate) fn shadow_ancestors(leaf: &Node) -> SmallVec<[Node; 4]> {
    let mut roots = SmallVec::new();
    let mut cursor = leaf.parent_or_host();
    while let Some(node) = cursor {
        if node.is_shadow_root() {
            roots.push(node.clone());
        }
        cursor = node.parent_or_host();
    }
    roots.reverse();
    roots
}

/// One instrumented shadow root and the listeners attached to it.
#[derive(Debug)]
pub(crate) struct ShadowTarget {
    root: WeakNode,
    focus_in: ListenerId,
    focus_out: ListenerId,
}

impl ShadowTarget {
    pub(crate) fn new(root: &Node, focus_in: ListenerId, focus_out: ListenerId) -> Self {
        Self {
            root: root.downgrade(),
            focus_in,
            focus_out,
        }
    }

    /// Removes the listeners, if the root is still around.
    pub(crate) fn detach(self) {
        if let Some(root) = self.root.resolve() {
            log::debug!("keyborg: releasing shadow root {root:?}");
            root.remove_event_listener(self.focus_in);
            root.remove_event_listener(self.focus_out);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ShadowTargets {
    entries: Vec<ShadowTarget>,
}

impl ShadowTargets {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, root: &Node) -> bool {
        self.entries.iter().any(|e| e.root.points_to(root))
    }

    pub(crate) fn insert(&mut self, target: ShadowTarget) {
        debug_assert!(
            target.root.resolve().is_some_and(|r| !self.contains(&r)),
            "shadow root instrumented twice"
        );
        self.entries.push(target);
    }

    pub(crate) fn remove(&mut self, root: &Node) -> Option<ShadowTarget> {
        let pos = self.entries.iter().position(|e| e.root.points_to(root))?;
        Some(self.entries.remove(pos))
    }

    /// Removes and returns the entries that are reclaimed or not in `on_path`.
    pub(crate) fn evict_off_path(&mut self, on_path: &[Node]) -> Vec<ShadowTarget> {
        let mut evicted = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            let keep = entry
                .root
                .resolve()
                .is_some_and(|root| on_path.contains(&root));
            if keep {
                kept.push(entry);
            } else {
                evicted.push(entry);
            }
        }
        self.entries = kept;
        evicted
    }

    /// Removes and returns every entry.
    pub(crate) fn take_all(&mut self) -> Vec<ShadowTarget> {
        core::mem::take(&mut self.entries)
    }
}
