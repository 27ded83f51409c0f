// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Events, event targets, and listener storage.
//!
//! An [`Event`] is a cheaply clonable handle, so a listener can keep the event
//! it received (for example inside the detail of another event). While an
//! event is being dispatched its [`target`](Event::target),
//! [`related_target`](Event::related_target),
//! [`current_target`](Event::current_target) and [`phase`](Event::phase)
//! reflect the listener currently running.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;

use bitflags::bitflags;
use kurbo::Point;
use smallvec::SmallVec;

use crate::node::Node;
use crate::window::Window;

/// Fired at the element losing focus. Composed and bubbling.
pub const FOCUSOUT: &str = "focusout";
/// Fired at the element gaining focus. Composed and bubbling.
pub const FOCUSIN: &str = "focusin";
/// A pointer button was pressed.
pub const MOUSEDOWN: &str = "mousedown";
/// A key was pressed.
pub const KEYDOWN: &str = "keydown";
/// A touch point was placed.
pub const TOUCHSTART: &str = "touchstart";
/// A touch point was lifted.
pub const TOUCHEND: &str = "touchend";
/// A touch point was interrupted.
pub const TOUCHCANCEL: &str = "touchcancel";

/// Propagation phase of an event, from the point of view of the running listener.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// The event is not being dispatched.
    #[default]
    None,
    /// Outer → inner, before reaching the target.
    Capture,
    /// At the (retargeted) target itself.
    Target,
    /// Inner → outer, after the target.
    Bubble,
}

/// Flags an event is created with.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EventInit {
    /// Whether the event runs the bubble phase.
    pub bubbles: bool,
    /// Whether [`Event::prevent_default`] has an effect.
    pub cancelable: bool,
    /// Whether the event propagates from shadow roots to their hosts.
    pub composed: bool,
}

impl EventInit {
    /// Bubbling, cancelable, and composed.
    pub const COMPOSED: Self = Self {
        bubbles: true,
        cancelable: true,
        composed: true,
    };
}

bitflags! {
    /// Pressed pointer buttons.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MouseButtons: u8 {
        /// Usually the left button.
        const PRIMARY = 1;
        /// Usually the right button.
        const SECONDARY = 1 << 1;
        /// Usually the wheel button.
        const AUXILIARY = 1 << 2;
        /// Browser back.
        const BACK = 1 << 3;
        /// Browser forward.
        const FORWARD = 1 << 4;
    }
}

/// Pointer payload.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MouseInit {
    /// Buttons held while the event fired.
    pub buttons: MouseButtons,
    /// Position in viewport coordinates.
    pub client: Point,
    /// Position in screen coordinates.
    pub screen: Point,
}

impl MouseInit {
    /// A primary-button press at `client`, with a matching screen position.
    pub fn primary(client: Point) -> Self {
        Self {
            buttons: MouseButtons::PRIMARY,
            client,
            screen: client,
        }
    }
}

/// Keyboard payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyboardInit {
    /// Key value, such as `"Tab"` or `"a"`.
    pub key: String,
    /// Legacy virtual key code.
    pub key_code: u32,
    /// Whether Shift was held.
    pub shift: bool,
}

impl KeyboardInit {
    /// Key code of the Tab key.
    pub const TAB_KEY_CODE: u32 = 9;

    /// Creates a key press without modifiers.
    pub fn new(key: &str, key_code: u32) -> Self {
        Self {
            key: String::from(key),
            key_code,
            shift: false,
        }
    }

    /// The Tab key.
    pub fn tab() -> Self {
        Self::new("Tab", Self::TAB_KEY_CODE)
    }

    /// Sets the Shift modifier.
    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }
}

/// Type-specific payload of an [`Event`].
#[derive(Clone, Default)]
pub enum EventData {
    /// No payload.
    #[default]
    Plain,
    /// Focus transition; `related_target` is the other side of the transition.
    Focus {
        /// Element losing focus (for `focusin`) or gaining it (for `focusout`).
        related_target: Option<Node>,
    },
    /// Pointer event.
    Mouse(MouseInit),
    /// Keyboard event.
    Keyboard(KeyboardInit),
    /// Touch event.
    Touch,
    /// Application-defined detail.
    Custom(Rc<dyn Any>),
}

impl fmt::Debug for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("Plain"),
            Self::Focus { related_target } => f
                .debug_struct("Focus")
                .field("related_target", related_target)
                .finish(),
            Self::Mouse(m) => f.debug_tuple("Mouse").field(m).finish(),
            Self::Keyboard(k) => f.debug_tuple("Keyboard").field(k).finish(),
            Self::Touch => f.write_str("Touch"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Something listeners can be attached to: the window or a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventTarget {
    /// The window, last stop of events that reach the document.
    Window(Window),
    /// A document, element, or shadow root.
    Node(Node),
}

impl EventTarget {
    /// The node, unless this is the window.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Window(_) => None,
        }
    }

    pub(crate) fn listeners(&self) -> &Listeners {
        match self {
            Self::Window(window) => &window.0.listeners,
            Self::Node(node) => &node.0.listeners,
        }
    }

    /// Adds a listener for events of type `ty`.
    pub fn add_event_listener(
        &self,
        ty: &'static str,
        capture: bool,
        callback: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        self.listeners().add(ty, capture, callback)
    }

    /// Removes a listener previously added to this target.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.listeners().remove(id)
    }

    /// Dispatches `event` at this target.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        crate::dispatch::dispatch(self, event)
    }
}

impl From<Node> for EventTarget {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Window> for EventTarget {
    fn from(window: Window) -> Self {
        Self::Window(window)
    }
}

/// Identifies a listener on one event target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) struct ListenerEntry {
    id: ListenerId,
    ty: &'static str,
    capture: bool,
    removed: Cell<bool>,
    callback: Box<dyn Fn(&Event)>,
}

impl ListenerEntry {
    pub(crate) fn is_removed(&self) -> bool {
        self.removed.get()
    }

    pub(crate) fn call(&self, event: &Event) {
        (self.callback)(event);
    }
}

/// Listener list of one event target.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<Rc<ListenerEntry>>>,
}

impl Listeners {
    pub(crate) fn add(
        &self,
        ty: &'static str,
        capture: bool,
        callback: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push(Rc::new(ListenerEntry {
            id,
            ty,
            capture,
            removed: Cell::new(false),
            callback: Box::new(callback),
        }));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        // A dispatch may hold a snapshot containing this entry.
        entries.remove(pos).removed.set(true);
        true
    }

    pub(crate) fn count(&self, ty: &str) -> usize {
        self.entries.borrow().iter().filter(|e| e.ty == ty).count()
    }

    pub(crate) fn snapshot(&self, ty: &str, capture: bool) -> SmallVec<[Rc<ListenerEntry>; 4]> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.ty == ty && e.capture == capture)
            .cloned()
            .collect()
    }
}

struct EventInner {
    ty: &'static str,
    init: EventInit,
    data: EventData,
    target: RefCell<Option<EventTarget>>,
    related_target: RefCell<Option<Node>>,
    current_target: RefCell<Option<EventTarget>>,
    phase: Cell<Phase>,
    path: RefCell<Vec<EventTarget>>,
    dispatching: Cell<bool>,
    default_prevented: Cell<bool>,
    stop_propagation: Cell<bool>,
    stop_immediate_propagation: Cell<bool>,
}

/// An event, dispatched with [`Node::dispatch_event`] or [`Window::dispatch_event`].
#[derive(Clone)]
pub struct Event(Rc<EventInner>);

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("ty", &self.0.ty)
            .field("init", &self.0.init)
            .field("data", &self.0.data)
            .field("phase", &self.0.phase.get())
            .finish_non_exhaustive()
    }
}

impl Event {
    /// Creates an event with a payload.
    pub fn new(ty: &'static str, init: EventInit, data: EventData) -> Self {
        Self(Rc::new(EventInner {
            ty,
            init,
            data,
            target: RefCell::new(None),
            related_target: RefCell::new(None),
            current_target: RefCell::new(None),
            phase: Cell::new(Phase::None),
            path: RefCell::new(Vec::new()),
            dispatching: Cell::new(false),
            default_prevented: Cell::new(false),
            stop_propagation: Cell::new(false),
            stop_immediate_propagation: Cell::new(false),
        }))
    }

    /// Creates an event carrying an application-defined `detail`.
    pub fn custom<T: Any>(ty: &'static str, init: EventInit, detail: T) -> Self {
        Self::new(ty, init, EventData::Custom(Rc::new(detail)))
    }

    /// The event type.
    pub fn ty(&self) -> &'static str {
        self.0.ty
    }

    /// Whether the event bubbles.
    pub fn bubbles(&self) -> bool {
        self.0.init.bubbles
    }

    /// Whether the event can be canceled.
    pub fn cancelable(&self) -> bool {
        self.0.init.cancelable
    }

    /// Whether the event crosses shadow boundaries.
    pub fn composed(&self) -> bool {
        self.0.init.composed
    }

    /// The payload.
    pub fn data(&self) -> &EventData {
        &self.0.data
    }

    /// The custom detail, if this event carries one of type `T`.
    pub fn detail<T: Any>(&self) -> Option<&T> {
        match &self.0.data {
            EventData::Custom(detail) => detail.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The pointer payload of mouse events.
    pub fn mouse(&self) -> Option<&MouseInit> {
        match &self.0.data {
            EventData::Mouse(m) => Some(m),
            _ => None,
        }
    }

    /// The keyboard payload of key events.
    pub fn keyboard(&self) -> Option<&KeyboardInit> {
        match &self.0.data {
            EventData::Keyboard(k) => Some(k),
            _ => None,
        }
    }

    /// The target, retargeted for the running listener.
    pub fn target(&self) -> Option<EventTarget> {
        self.0.target.borrow().clone()
    }

    /// The target as a node.
    pub fn target_node(&self) -> Option<Node> {
        self.0.target.borrow().as_ref().and_then(EventTarget::as_node).cloned()
    }

    /// The related target of focus events, retargeted for the running listener.
    pub fn related_target(&self) -> Option<Node> {
        if self.0.dispatching.get() {
            return self.0.related_target.borrow().clone();
        }
        self.original_related_target()
    }

    pub(crate) fn original_related_target(&self) -> Option<Node> {
        match &self.0.data {
            EventData::Focus { related_target } => related_target.clone(),
            _ => None,
        }
    }

    /// The target whose listener is running.
    pub fn current_target(&self) -> Option<EventTarget> {
        self.0.current_target.borrow().clone()
    }

    /// The phase of the running listener.
    pub fn phase(&self) -> Phase {
        self.0.phase.get()
    }

    /// Targets the event propagates through, innermost first.
    ///
    /// Empty outside of dispatch.
    pub fn composed_path(&self) -> Vec<EventTarget> {
        self.0.path.borrow().clone()
    }

    /// Cancels the default action of a cancelable event.
    pub fn prevent_default(&self) {
        if self.0.init.cancelable {
            self.0.default_prevented.set(true);
        }
    }

    /// Whether [`Event::prevent_default`] took effect.
    pub fn default_prevented(&self) -> bool {
        self.0.default_prevented.get()
    }

    /// Stops propagation after the listeners of the current target.
    pub fn stop_propagation(&self) {
        self.0.stop_propagation.set(true);
    }

    /// Stops propagation immediately, skipping remaining listeners.
    pub fn stop_immediate_propagation(&self) {
        self.0.stop_propagation.set(true);
        self.0.stop_immediate_propagation.set(true);
    }

    pub(crate) fn is_dispatching(&self) -> bool {
        self.0.dispatching.get()
    }

    pub(crate) fn propagation_stopped(&self) -> bool {
        self.0.stop_propagation.get()
    }

    pub(crate) fn immediate_propagation_stopped(&self) -> bool {
        self.0.stop_immediate_propagation.get()
    }

    pub(crate) fn begin_dispatch(&self, path: Vec<EventTarget>) {
        self.0.dispatching.set(true);
        *self.0.path.borrow_mut() = path;
    }

    pub(crate) fn set_cursor(
        &self,
        current: &EventTarget,
        target: &EventTarget,
        related: Option<&Node>,
        phase: Phase,
    ) {
        *self.0.current_target.borrow_mut() = Some(current.clone());
        *self.0.target.borrow_mut() = Some(target.clone());
        *self.0.related_target.borrow_mut() = related.cloned();
        self.0.phase.set(phase);
    }

    pub(crate) fn end_dispatch(&self) {
        self.0.dispatching.set(false);
        self.0.path.borrow_mut().clear();
        *self.0.current_target.borrow_mut() = None;
        self.0.phase.set(Phase::None);
        self.0.stop_propagation.set(false);
        self.0.stop_immediate_propagation.set(false);
    }
}
