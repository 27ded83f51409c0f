// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The window: document owner, focus, timers, and per-window extension records.
//!
//! ## Focus
//!
//! The window tracks one deep focused element. Moving focus runs the focus
//! update steps: `focusout` at the old element (related target: the new one),
//! then `focusin` at the new element (related target: the old one). Both are
//! composed and bubbling.
//!
//! Script-visible focus ([`Node::focus`]) goes through a replaceable
//! [`FocusOperation`]. User-agent focus (clicks, Tab) runs the focus update
//! steps directly and never goes through that operation.
//!
//! ## Timers
//!
//! Time is virtual. [`Window::set_timeout`] schedules a callback and
//! [`Window::advance`] moves the clock forward, running due callbacks in
//! due-time order.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use kurbo::Point;

use crate::event::{
    EventData, EventInit, FOCUSIN, FOCUSOUT, KEYDOWN, KeyboardInit, ListenerId, Listeners,
    MOUSEDOWN, MouseInit, TOUCHCANCEL, TOUCHEND, TOUCHSTART,
};
use crate::event::{Event, EventTarget};
use crate::node::{Node, NodeKind};

/// The element-focus operation that [`Node::focus`] invokes.
///
/// A wrapper installed with [`Window::set_focus_operation`] reports the
/// operation it wraps through [`FocusOperation::original`], which is how a
/// wrapper is recognized as already installed.
pub trait FocusOperation {
    /// Focuses `element`.
    fn focus(&self, element: &Node);

    /// The wrapped operation, for decorators.
    fn original(&self) -> Option<Rc<dyn FocusOperation>> {
        None
    }
}

/// The built-in focus operation: runs the focus update steps.
///
/// Elements that are not focusable are ignored.
#[derive(Copy, Clone, Debug, Default)]
pub struct NativeFocus;

impl FocusOperation for NativeFocus {
    fn focus(&self, element: &Node) {
        if !element.is_focusable() {
            return;
        }
        if let Some(window) = element.window() {
            window.update_focus(Some(element.clone()));
        }
    }
}

/// Host environment options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WindowOptions {
    /// Whether [`Window::set_focus_operation`] takes effect.
    ///
    /// Some environments freeze the focus operation; replacing it is then
    /// silently ignored.
    pub focus_overridable: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            focus_overridable: true,
        }
    }
}

/// Identifies a scheduled timer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct Timer {
    id: TimerId,
    due: u64,
    callback: Box<dyn FnOnce()>,
}

pub(crate) struct WindowInner {
    document: Node,
    options: WindowOptions,
    pub(crate) listeners: Listeners,
    focused: RefCell<Option<Node>>,
    focus_operation: RefCell<Rc<dyn FocusOperation>>,
    now: Cell<u64>,
    next_timer: Cell<u64>,
    timers: RefCell<Vec<Timer>>,
    extensions: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

/// A strong handle to a window.
#[derive(Clone)]
pub struct Window(pub(crate) Rc<WindowInner>);

/// A non-owning handle to a [`Window`].
#[derive(Clone, Default)]
pub struct WeakWindow(Weak<WindowInner>);

impl WeakWindow {
    /// Returns the window if it is still alive.
    pub fn upgrade(&self) -> Option<Window> {
        self.0.upgrade().map(Window)
    }
}

impl fmt::Debug for WeakWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakWindow")
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Window {}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("options", &self.0.options)
            .field("now", &self.0.now.get())
            .field("focused", &*self.0.focused.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

impl Window {
    /// Creates a window with an empty document.
    pub fn new() -> Self {
        Self::with_options(WindowOptions::default())
    }

    /// Creates a window with an empty document and the given options.
    pub fn with_options(options: WindowOptions) -> Self {
        Self(Rc::new_cyclic(|weak| WindowInner {
            document: Node::new(
                NodeKind::Document,
                String::from("#document"),
                weak.clone(),
                Weak::new(),
            ),
            options,
            listeners: Listeners::default(),
            focused: RefCell::new(None),
            focus_operation: RefCell::new(Rc::new(NativeFocus)),
            now: Cell::new(0),
            next_timer: Cell::new(1),
            timers: RefCell::new(Vec::new()),
            extensions: RefCell::new(HashMap::new()),
        }))
    }

    /// Returns a non-owning handle.
    pub fn downgrade(&self) -> WeakWindow {
        WeakWindow(Rc::downgrade(&self.0))
    }

    /// The options this window was created with.
    pub fn options(&self) -> WindowOptions {
        self.0.options
    }

    /// The document node.
    pub fn document(&self) -> Node {
        self.0.document.clone()
    }

    /// Creates a detached element; the tag name is lower-cased.
    pub fn create_element(&self, tag: &str) -> Node {
        Node::new(
            NodeKind::Element,
            tag.to_ascii_lowercase(),
            Rc::downgrade(&self.0),
            Weak::new(),
        )
    }

    // --- Focus ----------------------------------------------------------

    /// The current element-focus operation.
    pub fn focus_operation(&self) -> Rc<dyn FocusOperation> {
        self.0.focus_operation.borrow().clone()
    }

    /// Replaces the element-focus operation.
    ///
    /// Returns `false`, changing nothing, if the window was created with
    /// [`WindowOptions::focus_overridable`] unset.
    pub fn set_focus_operation(&self, operation: Rc<dyn FocusOperation>) -> bool {
        if !self.0.options.focus_overridable {
            return false;
        }
        *self.0.focus_operation.borrow_mut() = operation;
        true
    }

    /// The deep focused element, looking through shadow roots.
    pub fn focused_element(&self) -> Option<Node> {
        self.0.focused.borrow().clone()
    }

    /// Runs the focus update steps towards `new`.
    ///
    /// Fires `focusout` at the previously focused element and `focusin` at
    /// `new`. Does nothing if `new` is already focused.
    pub fn update_focus(&self, new: Option<Node>) {
        let old = self.focused_element();
        if old == new {
            return;
        }
        let init = EventInit {
            bubbles: true,
            cancelable: false,
            composed: true,
        };
        if let Some(old) = old.as_ref().filter(|o| o.is_connected()) {
            old.dispatch_event(&Event::new(
                FOCUSOUT,
                init,
                EventData::Focus {
                    related_target: new.clone(),
                },
            ));
        }
        self.0.focused.replace(new.clone());
        if let Some(new) = &new {
            new.dispatch_event(&Event::new(
                FOCUSIN,
                init,
                EventData::Focus {
                    related_target: old,
                },
            ));
        }
    }

    pub(crate) fn focus_fixup(&self) {
        let stale = self
            .0
            .focused
            .borrow()
            .as_ref()
            .is_some_and(|f| !f.is_connected());
        if stale {
            self.0.focused.replace(None);
        }
    }

    /// Focusable elements in sequential navigation order.
    ///
    /// Flat-tree pre-order: a host's shadow contents stand in for its light
    /// children.
    pub fn sequential_focus_order(&self) -> Vec<Node> {
        fn walk(node: &Node, out: &mut Vec<Node>) {
            for child in node.children() {
                if child.is_sequentially_focusable() {
                    out.push(child.clone());
                }
                match child.shadow_root() {
                    Some(root) => walk(&root, out),
                    None => walk(&child, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.0.document, &mut out);
        out
    }

    /// Moves focus to the next (or previous) element in sequential order, wrapping.
    pub fn focus_sequential(&self, backwards: bool) {
        let order = self.sequential_focus_order();
        let len = order.len();
        if len == 0 {
            return;
        }
        let current = self
            .focused_element()
            .and_then(|f| order.iter().position(|n| *n == f));
        let next = match (current, backwards) {
            (None, false) => 0,
            (None, true) => len - 1,
            (Some(i), false) => (i + 1) % len,
            (Some(i), true) => (i + len - 1) % len,
        };
        self.update_focus(Some(order[next].clone()));
    }

    // --- User input -----------------------------------------------------

    /// Simulates a key press at the focused element (or the document).
    ///
    /// An uncanceled Tab moves focus sequentially; Shift reverses it.
    /// Returns `false` if the `keydown` was canceled.
    pub fn key_down(&self, init: KeyboardInit) -> bool {
        let target = self.focused_element().unwrap_or_else(|| self.document());
        let is_tab = init.key == "Tab";
        let backwards = init.shift;
        let proceed = target.dispatch_event(&Event::new(
            KEYDOWN,
            EventInit::COMPOSED,
            EventData::Keyboard(init),
        ));
        if proceed && is_tab {
            self.focus_sequential(backwards);
        }
        proceed
    }

    /// Simulates a pointer press on `target`.
    ///
    /// An uncanceled press focuses the nearest focusable shadow-including
    /// ancestor of `target`, or clears focus if there is none.
    pub fn pointer_down(&self, target: &Node, init: MouseInit) -> bool {
        let proceed =
            target.dispatch_event(&Event::new(MOUSEDOWN, EventInit::COMPOSED, EventData::Mouse(init)));
        if proceed {
            self.update_focus(focusable_ancestor(target));
        }
        proceed
    }

    /// A real primary-button press on `target`.
    pub fn click(&self, target: &Node) -> bool {
        self.pointer_down(target, MouseInit::primary(Point::new(10.0, 10.0)))
    }

    /// Fires `touchstart` at `target`.
    pub fn touch_start(&self, target: &Node) -> bool {
        target.dispatch_event(&Event::new(TOUCHSTART, EventInit::COMPOSED, EventData::Touch))
    }

    /// Fires `touchend` at `target`.
    pub fn touch_end(&self, target: &Node) -> bool {
        target.dispatch_event(&Event::new(TOUCHEND, EventInit::COMPOSED, EventData::Touch))
    }

    /// Fires `touchcancel` at `target`.
    pub fn touch_cancel(&self, target: &Node) -> bool {
        target.dispatch_event(&Event::new(TOUCHCANCEL, EventInit::COMPOSED, EventData::Touch))
    }

    /// A tap: `touchstart`, `touchend`, then focus as for a pointer press.
    pub fn tap(&self, target: &Node) {
        let started = self.touch_start(target);
        let ended = self.touch_end(target);
        if started && ended {
            self.update_focus(focusable_ancestor(target));
        }
    }

    // --- Timers ---------------------------------------------------------

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.0.now.get()
    }

    /// Schedules `callback` to run `delay_ms` from now.
    pub fn set_timeout(&self, delay_ms: u64, callback: impl FnOnce() + 'static) -> TimerId {
        let id = TimerId(self.0.next_timer.get());
        self.0.next_timer.set(id.0 + 1);
        self.0.timers.borrow_mut().push(Timer {
            id,
            due: self.now() + delay_ms,
            callback: Box::new(callback),
        });
        id
    }

    /// Cancels a pending timer; returns `false` if it already ran or was canceled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut timers = self.0.timers.borrow_mut();
        let before = timers.len();
        timers.retain(|t| t.id != id);
        timers.len() != before
    }

    /// Number of timers not yet run.
    pub fn pending_timers(&self) -> usize {
        self.0.timers.borrow().len()
    }

    /// Advances the clock by `ms`, running every timer that falls due.
    ///
    /// Timers scheduled by callbacks run too if they fall due within the window.
    pub fn advance(&self, ms: u64) {
        let deadline = self.now() + ms;
        loop {
            let next = {
                let timers = self.0.timers.borrow();
                timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= deadline)
                    .min_by_key(|(_, t)| (t.due, t.id.0))
                    .map(|(i, _)| i)
            };
            let Some(index) = next else {
                break;
            };
            let timer = self.0.timers.borrow_mut().swap_remove(index);
            self.0.now.set(timer.due.max(self.now()));
            (timer.callback)();
        }
        self.0.now.set(deadline);
    }

    // --- Extensions -----------------------------------------------------

    /// The per-window record of type `T`, if one was inserted.
    pub fn extension<T: Any>(&self) -> Option<Rc<T>> {
        let value = self.0.extensions.borrow().get(&TypeId::of::<T>())?.clone();
        value.downcast::<T>().ok()
    }

    /// Stores a per-window record, replacing any record of the same type.
    pub fn insert_extension<T: Any>(&self, value: Rc<T>) {
        self.0
            .extensions
            .borrow_mut()
            .insert(TypeId::of::<T>(), value);
    }

    /// Removes and returns the per-window record of type `T`.
    pub fn remove_extension<T: Any>(&self) -> Option<Rc<T>> {
        let value = self.0.extensions.borrow_mut().remove(&TypeId::of::<T>())?;
        value.downcast::<T>().ok()
    }

    // --- Event target ---------------------------------------------------

    /// Adds a listener on the window.
    pub fn add_event_listener(
        &self,
        ty: &'static str,
        capture: bool,
        callback: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        self.0.listeners.add(ty, capture, callback)
    }

    /// Removes a listener previously added to the window.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.0.listeners.remove(id)
    }

    /// Number of window listeners for `ty`.
    pub fn listener_count(&self, ty: &str) -> usize {
        self.0.listeners.count(ty)
    }

    /// Dispatches `event` at the window.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        crate::dispatch::dispatch(&EventTarget::Window(self.clone()), event)
    }
}

fn focusable_ancestor(node: &Node) -> Option<Node> {
    let mut cursor = Some(node.clone());
    while let Some(n) = cursor {
        if n.is_focusable() {
            return Some(n);
        }
        cursor = n.parent_or_host();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn buttons(win: &Window, parent: &Node, labels: &[&str]) -> Vec<Node> {
        labels
            .iter()
            .map(|label| {
                let b = win.create_element("button");
                b.set_text(label);
                parent.append_child(&b).unwrap();
                b
            })
            .collect()
    }

    #[test]
    fn focus_fires_focusout_then_focusin() {
        let win = Window::new();
        let bs = buttons(&win, &win.document(), &["A", "B"]);
        let log: Rc<RefCell<Vec<(&'static str, String, Option<String>)>>> = Rc::default();
        for ty in [FOCUSIN, FOCUSOUT] {
            let log = log.clone();
            win.document().add_event_listener(ty, true, move |e| {
                log.borrow_mut().push((
                    e.ty(),
                    e.target_node().unwrap().text(),
                    e.related_target().map(|r| r.text()),
                ));
            });
        }

        bs[0].focus();
        bs[1].focus();
        bs[1].focus();
        assert_eq!(
            *log.borrow(),
            vec![
                ("focusin", String::from("A"), None),
                ("focusout", String::from("A"), Some(String::from("B"))),
                ("focusin", String::from("B"), Some(String::from("A"))),
            ]
        );
        assert_eq!(win.focused_element(), Some(bs[1].clone()));

        bs[1].blur();
        assert_eq!(win.focused_element(), None);
    }

    #[test]
    fn unfocusable_elements_are_ignored() {
        let win = Window::new();
        let div = win.create_element("div");
        win.document().append_child(&div).unwrap();
        div.focus();
        assert_eq!(win.focused_element(), None);
    }

    #[test]
    fn removing_focused_element_clears_focus_silently() {
        let win = Window::new();
        let bs = buttons(&win, &win.document(), &["A"]);
        bs[0].focus();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        win.add_event_listener(FOCUSOUT, true, move |_| f.set(true));
        bs[0].remove();
        assert_eq!(win.focused_element(), None);
        assert!(!fired.get());
    }

    #[test]
    fn tab_walks_flat_tree_and_wraps() {
        let win = Window::new();
        let doc = win.document();
        let light = buttons(&win, &doc, &["L1"]);
        let host = win.create_element("div");
        doc.append_child(&host).unwrap();
        let root = host.attach_shadow().unwrap();
        let shadow = buttons(&win, &root, &["S1", "S2"]);
        let tail = buttons(&win, &doc, &["L2"]);

        let order: Vec<String> = win.sequential_focus_order().iter().map(Node::text).collect();
        assert_eq!(order, vec!["L1", "S1", "S2", "L2"]);

        win.key_down(KeyboardInit::tab());
        assert_eq!(win.focused_element(), Some(light[0].clone()));
        win.key_down(KeyboardInit::tab());
        assert_eq!(win.focused_element(), Some(shadow[0].clone()));
        assert_eq!(doc.active_element(), Some(host.clone()));
        assert_eq!(root.active_element(), Some(shadow[0].clone()));
        win.key_down(KeyboardInit::tab().with_shift(true));
        assert_eq!(win.focused_element(), Some(light[0].clone()));
        win.key_down(KeyboardInit::tab().with_shift(true));
        assert_eq!(win.focused_element(), Some(tail[0].clone()));
    }

    #[test]
    fn pointer_down_focuses_nearest_focusable_ancestor() {
        let win = Window::new();
        let bs = buttons(&win, &win.document(), &["A"]);
        let label = win.create_element("span");
        bs[0].append_child(&label).unwrap();
        win.click(&label);
        assert_eq!(win.focused_element(), Some(bs[0].clone()));

        let plain = win.create_element("div");
        win.document().append_child(&plain).unwrap();
        win.click(&plain);
        assert_eq!(win.focused_element(), None);
    }

    #[test]
    fn timers_run_in_due_order_and_can_be_cleared() {
        let win = Window::new();
        let log: Rc<RefCell<Vec<u64>>> = Rc::default();
        for delay in [30, 10, 20] {
            let log = log.clone();
            let w = win.clone();
            win.set_timeout(delay, move || log.borrow_mut().push(w.now()));
        }
        let canceled = win.set_timeout(15, || unreachable!("timer was cleared"));
        assert!(win.clear_timeout(canceled));
        assert!(!win.clear_timeout(canceled));

        win.advance(25);
        assert_eq!(*log.borrow(), vec![10, 20]);
        assert_eq!(win.now(), 25);
        assert_eq!(win.pending_timers(), 1);
        win.advance(5);
        assert_eq!(*log.borrow(), vec![10, 20, 30]);
    }

    #[test]
    fn frozen_focus_operation_cannot_be_replaced() {
        struct Nop;
        impl FocusOperation for Nop {
            fn focus(&self, _: &Node) {}
        }
        let win = Window::with_options(WindowOptions {
            focus_overridable: false,
        });
        assert!(!win.set_focus_operation(Rc::new(Nop)));
        let bs = buttons(&win, &win.document(), &["A"]);
        bs[0].focus();
        assert_eq!(win.focused_element(), Some(bs[0].clone()));
    }

    #[test]
    fn extensions_are_keyed_by_type() {
        struct Record(u32);
        let win = Window::new();
        assert!(win.extension::<Record>().is_none());
        win.insert_extension(Rc::new(Record(7)));
        assert_eq!(win.extension::<Record>().map(|r| r.0), Some(7));
        assert_eq!(win.remove_extension::<Record>().map(|r| r.0), Some(7));
        assert!(win.extension::<Record>().is_none());
    }
}
