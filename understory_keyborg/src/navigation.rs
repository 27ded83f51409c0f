// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The keyboard-navigation state machine.
//!
//! One [`KeyborgCore`] exists per window while at least one handle is alive.
//! It owns the navigation flag and reacts to:
//!
//! - routed `keyborg:focusin`: turns the flag on for focus moves that are not
//!   programmatic and have a previous focus, unless pointer or touch input was
//!   seen within [`MOUSE_USED_TIMEOUT_MS`];
//! - `mousedown` and touch events: turn the flag off and start that
//!   suppression window. Presses without buttons or with all-zero coordinates
//!   are treated as synthesized by assistive technology and ignored;
//! - `keydown`: Tab or a trigger key turns the flag on; a dismiss key turns it
//!   off after [`DISMISS_TIMEOUT_MS`] if focus has not moved by then.
//!
//! Every change is announced as a [`KEYBORG_KEYBOARDNAVIGATION`] event at the
//! window, which is how handles deliver it to their subscribers.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use hashbrown::HashSet;
use kurbo::Point;
use understory_dom::{
    Event, EventInit, KEYDOWN, ListenerId, MOUSEDOWN, TOUCHCANCEL, TOUCHEND, TOUCHSTART, TimerId,
    WeakWindow, Window,
};

use crate::focus_event::{dispose_focus_event, setup_focus_event};
use crate::types::{
    DISMISS_TIMEOUT_MS, KEYBORG_FOCUSIN, KEYBORG_KEYBOARDNAVIGATION, KeyboardNavigationEventData,
    KeyborgFocusInEventDetails, KeyborgProps, MOUSE_USED_TIMEOUT_MS,
};

#[derive(Debug)]
pub(crate) struct KeyborgCore {
    id: u64,
    window: WeakWindow,
    disposed: Cell<bool>,
    is_navigating: Cell<bool>,
    mouse_used_timer: Cell<Option<TimerId>>,
    dismiss_timer: Cell<Option<TimerId>>,
    /// `None` means any key triggers.
    trigger_keys: Option<HashSet<u32>>,
    dismiss_keys: Option<HashSet<u32>>,
    document_listeners: RefCell<Vec<ListenerId>>,
    window_listeners: RefCell<Vec<ListenerId>>,
}

fn key_set(keys: Vec<u32>) -> Option<HashSet<u32>> {
    (!keys.is_empty()).then(|| keys.into_iter().collect())
}

impl KeyborgCore {
    pub(crate) fn new(win: &Window, props: Option<KeyborgProps>, id: u64) -> Rc<Self> {
        let props = props.unwrap_or_default();
        let core = Rc::new(Self {
            id,
            window: win.downgrade(),
            disposed: Cell::new(false),
            is_navigating: Cell::new(false),
            mouse_used_timer: Cell::new(None),
            dismiss_timer: Cell::new(None),
            trigger_keys: key_set(props.trigger_keys),
            dismiss_keys: key_set(props.dismiss_keys),
            document_listeners: RefCell::new(Vec::new()),
            window_listeners: RefCell::new(Vec::new()),
        });

        setup_focus_event(win);

        let doc = win.document();
        let document_listeners = [
            doc.add_event_listener(KEYBORG_FOCUSIN, true, core.handler(Self::on_focus_in)),
            doc.add_event_listener(MOUSEDOWN, true, core.handler(Self::on_mouse_down)),
            doc.add_event_listener(TOUCHSTART, true, core.handler(Self::on_touch)),
            doc.add_event_listener(TOUCHEND, true, core.handler(Self::on_touch)),
            doc.add_event_listener(TOUCHCANCEL, true, core.handler(Self::on_touch)),
        ];
        core.document_listeners
            .borrow_mut()
            .extend(document_listeners);
        core.window_listeners
            .borrow_mut()
            .push(win.add_event_listener(KEYDOWN, true, core.handler(Self::on_key_down)));

        log::debug!("keyborg: core {id} created");
        core
    }

    /// Wraps `f` in a listener that holds the core weakly.
    fn handler(self: &Rc<Self>, f: fn(&Rc<Self>, &Event)) -> impl Fn(&Event) + 'static {
        let weak = Rc::downgrade(self);
        move |event| {
            if let Some(core) = weak.upgrade() {
                f(&core, event);
            }
        }
    }

    pub(crate) fn is_navigating_with_keyboard(&self) -> bool {
        self.is_navigating.get()
    }

    /// Sets the flag, announcing the change at the window.
    pub(crate) fn set_navigating(&self, value: bool) {
        if self.disposed.get() || self.is_navigating.get() == value {
            return;
        }
        self.is_navigating.set(value);
        if let Some(win) = self.window.upgrade() {
            win.dispatch_event(&Event::custom(
                KEYBORG_KEYBOARDNAVIGATION,
                EventInit::default(),
                KeyboardNavigationEventData {
                    is_navigating_with_keyboard: value,
                },
            ));
        }
    }

    fn on_focus_in(self: &Rc<Self>, event: &Event) {
        if self.mouse_used_timer.get().is_some() || self.is_navigating.get() {
            return;
        }
        let Some(details) = event.detail::<KeyborgFocusInEventDetails>() else {
            return;
        };
        // Unknown is treated like programmatic.
        if details.related_target.is_none() || details.is_focused_programmatically != Some(false) {
            return;
        }
        self.set_navigating(true);
    }

    fn on_mouse_down(self: &Rc<Self>, event: &Event) {
        let Some(mouse) = event.mouse() else {
            return;
        };
        if mouse.buttons.is_empty() || (mouse.client == Point::ZERO && mouse.screen == Point::ZERO)
        {
            return;
        }
        self.pointer_used();
    }

    fn on_touch(self: &Rc<Self>, _: &Event) {
        self.pointer_used();
    }

    fn pointer_used(self: &Rc<Self>) {
        let Some(win) = self.window.upgrade() else {
            return;
        };
        if let Some(timer) = self.mouse_used_timer.take() {
            win.clear_timeout(timer);
        }
        let weak = Rc::downgrade(self);
        let timer = win.set_timeout(MOUSE_USED_TIMEOUT_MS, move || {
            if let Some(core) = weak.upgrade() {
                core.mouse_used_timer.set(None);
            }
        });
        self.mouse_used_timer.set(Some(timer));
        self.set_navigating(false);
    }

    fn on_key_down(self: &Rc<Self>, event: &Event) {
        let (Some(key), Some(win)) = (event.keyboard(), self.window.upgrade()) else {
            return;
        };
        if self.is_navigating.get() {
            if self
                .dismiss_keys
                .as_ref()
                .is_some_and(|keys| keys.contains(&key.key_code))
            {
                self.schedule_dismiss(&win);
            }
            return;
        }

        let is_trigger = self
            .trigger_keys
            .as_ref()
            .is_none_or(|keys| keys.contains(&key.key_code));
        if key.key == "Tab" || (is_trigger && !focus_is_editable(&win)) {
            self.set_navigating(true);
        }
    }

    fn schedule_dismiss(self: &Rc<Self>, win: &Window) {
        if let Some(timer) = self.dismiss_timer.take() {
            win.clear_timeout(timer);
        }
        let was = win.focused_element().map(|node| node.downgrade());
        let weak = Rc::downgrade(self);
        let timer = win.set_timeout(DISMISS_TIMEOUT_MS, move || {
            let Some(core) = weak.upgrade() else {
                return;
            };
            core.dismiss_timer.set(None);
            let Some(win) = core.window.upgrade() else {
                return;
            };
            let unchanged = match (&was, win.focused_element()) {
                (None, None) => true,
                (Some(was), Some(now)) => was.points_to(&now),
                _ => false,
            };
            if unchanged {
                core.set_navigating(false);
            }
        });
        self.dismiss_timer.set(Some(timer));
    }

    /// Cancels timers and removes every listener. Idempotent.
    pub(crate) fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some(win) = self.window.upgrade() {
            for timer in [self.mouse_used_timer.take(), self.dismiss_timer.take()]
                .into_iter()
                .flatten()
            {
                win.clear_timeout(timer);
            }
            dispose_focus_event(&win);
            let doc = win.document();
            for id in self.document_listeners.take() {
                doc.remove_event_listener(id);
            }
            for id in self.window_listeners.take() {
                win.remove_event_listener(id);
            }
        }
        log::debug!("keyborg: core {} disposed", self.id);
    }
}

/// Whether the focused element takes text input.
fn focus_is_editable(win: &Window) -> bool {
    win.focused_element().is_some_and(|el| {
        matches!(el.tag_name(), "input" | "textarea") || el.is_content_editable()
    })
}
