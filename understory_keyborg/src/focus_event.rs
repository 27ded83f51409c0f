// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus interception and shadow-boundary focus routing.
//!
//! ## Interception
//!
//! [`setup_focus_event`] decorates the window's element-focus operation so
//! that every direct focus call records the element it was called on. A
//! routed focus-in at that element is then reported as programmatic. The
//! decorator carries the operation it wraps (see
//! [`FocusOperation::original`]); that marker makes setup idempotent and lets
//! [`native_focus`] bypass the decorator.
//!
//! Whether a replaced focus operation is actually observed is probed once per
//! process. Until a probe succeeds, routed focus-ins without a recorded
//! focus call report `is_focused_programmatically: None`.
//!
//! ## Routing
//!
//! Native `focusin` does not reach the document when focus moves inside a
//! shadow tree. The router therefore listens in capture phase at the document
//! and at every shadow root on the focus path:
//!
//! ```text
//! document            capture listener (event seen with target = host 1)
//!   shadow root 1     listener attached while the event is still in flight
//!     shadow root 2   ... and so on, outside-in
//!       leaf          the listener that sees the leaf dispatches keyborg:focusin
//! ```
//!
//! A focused shadow host is itself a leaf; its own shadow root is instrumented
//! as well, since focus moving from a host into its shadow tree is not seen by
//! the trees outside it. Roots that are no longer on the focus path are
//! released on the next `focusin`, or as soon as a `focusout` shows focus
//! leaving them.
//! `keyborg:focusout` is dispatched once per native `focusout`, at the leaf.

use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use understory_dom::{
    Event, EventInit, EventTarget, FOCUSIN, FOCUSOUT, FocusOperation, ListenerId, Node, WeakNode,
    Window,
};

use crate::shadow::{ShadowTarget, ShadowTargets, shadow_ancestors};
use crate::types::{
    KEYBORG_FOCUSIN, KEYBORG_FOCUSOUT, KeyborgFocusInEventDetails, KeyborgFocusOutEventDetails,
};

/// Set once a probe has shown that a replaced focus operation is observed.
static CAN_OVERRIDE_NATIVE_FOCUS: AtomicBool = AtomicBool::new(false);

fn can_override_native_focus(win: &Window) -> bool {
    struct Probe(Rc<Cell<bool>>);

    impl FocusOperation for Probe {
        fn focus(&self, _: &Node) {
            self.0.set(true);
        }
    }

    let original = win.focus_operation();
    let called = Rc::new(Cell::new(false));
    win.set_focus_operation(Rc::new(Probe(called.clone())));
    win.create_element("button").focus();
    win.set_focus_operation(original);
    called.get()
}

/// What is known about the last element focused by a direct focus call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LastProgrammaticFocus {
    /// Focus interception is not set up for this window; nothing can be said.
    Untracked,
    /// No pending record, or the recorded element has been reclaimed.
    Empty,
    /// The element passed to the last direct focus call.
    Element(Node),
}

/// Per-window routing record.
#[derive(Debug)]
struct FocusEventData {
    focus_in: Cell<Option<ListenerId>>,
    focus_out: Cell<Option<ListenerId>>,
    last_focused_programmatically: RefCell<Option<WeakNode>>,
    shadow_targets: RefCell<ShadowTargets>,
}

impl FocusEventData {
    fn listen(self: &Rc<Self>, node: &Node) -> (ListenerId, ListenerId) {
        let weak = Rc::downgrade(self);
        let focus_in = node.add_event_listener(FOCUSIN, true, move |e| {
            if let Some(data) = weak.upgrade() {
                data.on_focus_in(e);
            }
        });
        let weak = Rc::downgrade(self);
        let focus_out = node.add_event_listener(FOCUSOUT, true, move |e| {
            if let Some(data) = weak.upgrade() {
                data.on_focus_out(e);
            }
        });
        (focus_in, focus_out)
    }

    fn instrument(self: &Rc<Self>, root: &Node) {
        if self.shadow_targets.borrow().contains(root) {
            return;
        }
        let (focus_in, focus_out) = self.listen(root);
        log::debug!("keyborg: following focus into shadow root {root:?}");
        self.shadow_targets
            .borrow_mut()
            .insert(ShadowTarget::new(root, focus_in, focus_out));
    }

    fn release(&self, root: &Node) {
        let target = self.shadow_targets.borrow_mut().remove(root);
        if let Some(target) = target {
            target.detach();
        }
    }

    fn release_off_path(&self, leaf: &Node) {
        let mut on_path = shadow_ancestors(leaf);
        on_path.extend(leaf.shadow_root());
        let evicted = self.shadow_targets.borrow_mut().evict_off_path(&on_path);
        for target in evicted {
            target.detach();
        }
    }

    /// Follows focus that already sits inside shadow DOM.
    fn bootstrap(self: &Rc<Self>, win: &Window) {
        if let Some(active) = win.focused_element() {
            for root in shadow_ancestors(&active) {
                self.instrument(&root);
            }
            if let Some(root) = active.shadow_root() {
                self.instrument(&root);
            }
        }
    }

    fn on_focus_in(self: &Rc<Self>, event: &Event) {
        let (Some(target), Some(leaf)) = (event.target_node(), true_target(event)) else {
            return;
        };
        self.release_off_path(&leaf);

        // A host may pass focus into its own shadow tree without the outer
        // trees seeing it, so its root is followed even when the host is the leaf.
        if let Some(root) = target.shadow_root() {
            self.instrument(&root);
        }
        if target != leaf {
            return;
        }

        let last = self.last_focused_programmatically.borrow_mut().take();
        let is_focused_programmatically =
            if CAN_OVERRIDE_NATIVE_FOCUS.load(Ordering::Relaxed) || last.is_some() {
                Some(last.and_then(|l| l.resolve()).is_some_and(|l| l == target))
            } else {
                None
            };
        let details = KeyborgFocusInEventDetails {
            related_target: event.related_target(),
            is_focused_programmatically,
        };
        target.dispatch_event(&Event::custom(KEYBORG_FOCUSIN, EventInit::COMPOSED, details));
    }

    fn on_focus_out(&self, event: &Event) {
        let Some(target) = event.target_node() else {
            return;
        };
        if true_target(event).is_some_and(|leaf| leaf == target) {
            target.dispatch_event(&Event::custom(
                KEYBORG_FOCUSOUT,
                EventInit::COMPOSED,
                KeyborgFocusOutEventDetails {
                    original_event: event.clone(),
                },
            ));
        }

        let current = event.current_target();
        if let Some(root) = current.as_ref().and_then(EventTarget::as_node) {
            let stays = event
                .related_target()
                .is_some_and(|r| root.contains(&r) || root.host() == Some(r));
            if root.is_shadow_root() && !stays {
                self.release(root);
            }
        }
    }
}

/// The innermost target of an event in flight, before retargeting.
fn true_target(event: &Event) -> Option<Node> {
    event.composed_path().first().and_then(EventTarget::as_node).cloned()
}

/// The decorated focus operation.
struct KeyborgFocus {
    original: Rc<dyn FocusOperation>,
    data: Weak<FocusEventData>,
}

impl FocusOperation for KeyborgFocus {
    fn focus(&self, element: &Node) {
        if let Some(data) = self.data.upgrade() {
            data.last_focused_programmatically
                .replace(Some(element.downgrade()));
        }
        self.original.focus(element);
    }

    fn original(&self) -> Option<Rc<dyn FocusOperation>> {
        Some(self.original.clone())
    }
}

/// Focuses `element` with the undecorated focus operation.
///
/// The focus is not recorded as programmatic.
pub fn native_focus(element: &Node) {
    let Some(win) = element.window() else {
        return;
    };
    let operation = win.focus_operation();
    match operation.original() {
        Some(original) => original.focus(element),
        None => operation.focus(element),
    }
}

/// Decorates the focus operation and installs routing listeners on `win`.
///
/// Idempotent. If focus is already inside shadow DOM, the shadow roots on its
/// path are instrumented right away.
pub fn setup_focus_event(win: &Window) {
    if !CAN_OVERRIDE_NATIVE_FOCUS.load(Ordering::Relaxed) {
        if can_override_native_focus(win) {
            CAN_OVERRIDE_NATIVE_FOCUS.store(true, Ordering::Relaxed);
        } else {
            log::warn!("keyborg: focus calls cannot be intercepted; programmatic focus is unknown");
        }
    }

    let original = win.focus_operation();
    if original.original().is_some() || win.extension::<FocusEventData>().is_some() {
        return;
    }

    let data = Rc::new(FocusEventData {
        focus_in: Cell::new(None),
        focus_out: Cell::new(None),
        last_focused_programmatically: RefCell::new(None),
        shadow_targets: RefCell::new(ShadowTargets::default()),
    });
    let (focus_in, focus_out) = data.listen(&win.document());
    data.focus_in.set(Some(focus_in));
    data.focus_out.set(Some(focus_out));
    win.insert_extension(data.clone());
    win.set_focus_operation(Rc::new(KeyborgFocus {
        original,
        data: Rc::downgrade(&data),
    }));
    data.bootstrap(win);
}

/// Restores the focus operation and removes every routing listener from `win`.
pub fn dispose_focus_event(win: &Window) {
    if let Some(data) = win.remove_extension::<FocusEventData>() {
        let doc = win.document();
        for id in [data.focus_in.take(), data.focus_out.take()].into_iter().flatten() {
            doc.remove_event_listener(id);
        }
        let targets = data.shadow_targets.borrow_mut().take_all();
        for target in targets {
            target.detach();
        }
        data.last_focused_programmatically.replace(None);
    }

    if let Some(original) = win.focus_operation().original() {
        win.set_focus_operation(original);
    }
}

/// The last element focused by a direct focus call on `win`.
///
/// The record is consumed by the next routed focus-in.
pub fn get_last_focused_programmatically(win: &Window) -> LastProgrammaticFocus {
    let Some(data) = win.extension::<FocusEventData>() else {
        return LastProgrammaticFocus::Untracked;
    };
    let last = data
        .last_focused_programmatically
        .borrow()
        .as_ref()
        .and_then(WeakNode::resolve);
    match last {
        Some(node) => LastProgrammaticFocus::Element(node),
        None => LastProgrammaticFocus::Empty,
    }
}

/// Number of shadow roots currently carrying routing listeners on `win`.
pub fn instrumented_shadow_root_count(win: &Window) -> usize {
    win.extension::<FocusEventData>()
        .map_or(0, |data| data.shadow_targets.borrow().len())
}
