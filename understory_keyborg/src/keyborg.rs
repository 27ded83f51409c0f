// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Client handles and the per-window registry.
//!
//! Every [`Keyborg`] handle on a window shares one state machine. The machine
//! and its listeners exist while at least one handle is registered and are
//! torn down when the last one is released.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashSet;
use understory_dom::{ListenerId, Window};

use crate::navigation::KeyborgCore;
use crate::types::{
    KEYBORG_KEYBOARDNAVIGATION, KeyboardNavigationEventData, KeyborgCallback, KeyborgProps,
};

/// Source of handle and core identifiers; never reset.
static LAST_ID: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    LAST_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// Per-window registry record.
struct KeyborgRecord {
    core: Rc<KeyborgCore>,
    refs: RefCell<HashSet<u64>>,
}

/// A handle onto the keyboard-navigation state of one window.
///
/// Handles are cheap. Create one per component with [`create_keyborg`] and
/// release it with [`Keyborg::dispose`] (or by dropping it).
pub struct Keyborg {
    id: u64,
    window: RefCell<Option<Window>>,
    callbacks: RefCell<Vec<(KeyborgCallback, ListenerId)>>,
}

impl fmt::Debug for Keyborg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyborg")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .field("subscribers", &self.callbacks.borrow().len())
            .finish()
    }
}

/// Creates a handle for `win`.
///
/// The first handle on a window creates the shared state machine with
/// `props`. While it exists, `props` passed for later handles are ignored.
pub fn create_keyborg(win: &Window, props: Option<KeyborgProps>) -> Keyborg {
    let record = match win.extension::<KeyborgRecord>() {
        Some(record) => record,
        None => {
            let record = Rc::new(KeyborgRecord {
                core: KeyborgCore::new(win, props, next_id()),
                refs: RefCell::new(HashSet::new()),
            });
            win.insert_extension(record.clone());
            record
        }
    };
    let id = next_id();
    record.refs.borrow_mut().insert(id);
    Keyborg {
        id,
        window: RefCell::new(Some(win.clone())),
        callbacks: RefCell::new(Vec::new()),
    }
}

/// Releases `keyborg`; same as [`Keyborg::dispose`].
pub fn dispose_keyborg(keyborg: &Keyborg) {
    keyborg.dispose();
}

impl Keyborg {
    /// Identifier, unique within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this handle has been released.
    pub fn is_disposed(&self) -> bool {
        self.window.borrow().is_none()
    }

    fn core(&self) -> Option<Rc<KeyborgCore>> {
        let win = self.window.borrow().clone()?;
        win.extension::<KeyborgRecord>().map(|r| r.core.clone())
    }

    /// Whether the user is currently navigating with the keyboard.
    ///
    /// Always `false` once the handle is released.
    pub fn is_navigating_with_keyboard(&self) -> bool {
        self.core()
            .is_some_and(|core| core.is_navigating_with_keyboard())
    }

    /// Forces the navigation mode for every handle on the window.
    ///
    /// Subscribers are notified if the mode changes.
    pub fn set_val(&self, is_navigating_with_keyboard: bool) {
        if let Some(core) = self.core() {
            core.set_navigating(is_navigating_with_keyboard);
        }
    }

    /// Calls `callback` with the new mode on every change.
    ///
    /// Subscribing the same callback twice has no effect.
    pub fn subscribe(&self, callback: &KeyborgCallback) {
        let Some(win) = self.window.borrow().clone() else {
            return;
        };
        if self
            .callbacks
            .borrow()
            .iter()
            .any(|(c, _)| Rc::ptr_eq(c, callback))
        {
            return;
        }
        let cb = callback.clone();
        let listener = win.add_event_listener(KEYBORG_KEYBOARDNAVIGATION, false, move |e| {
            if let Some(data) = e.detail::<KeyboardNavigationEventData>() {
                cb(data.is_navigating_with_keyboard);
            }
        });
        self.callbacks
            .borrow_mut()
            .push((callback.clone(), listener));
    }

    /// Stops calling `callback`.
    pub fn unsubscribe(&self, callback: &KeyborgCallback) {
        let removed = {
            let mut callbacks = self.callbacks.borrow_mut();
            callbacks
                .iter()
                .position(|(c, _)| Rc::ptr_eq(c, callback))
                .map(|pos| callbacks.remove(pos))
        };
        if let (Some((_, listener)), Some(win)) = (removed, self.window.borrow().clone()) {
            win.remove_event_listener(listener);
        }
    }

    /// Releases this handle.
    ///
    /// The last handle on a window tears down the shared state machine and
    /// restores the window's focus operation. Releasing twice is a misuse that
    /// is reported in debug builds and otherwise ignored.
    pub fn dispose(&self) {
        self.release(true);
    }

    fn release(&self, diagnose: bool) {
        let win = self.window.borrow_mut().take();
        let Some(win) = win else {
            if diagnose {
                #[cfg(debug_assertions)]
                log::error!("keyborg: handle {} disposed twice", self.id);
            }
            return;
        };

        for (_, listener) in self.callbacks.take() {
            win.remove_event_listener(listener);
        }

        let record = win.extension::<KeyborgRecord>();
        let registered = record
            .as_ref()
            .is_some_and(|r| r.refs.borrow_mut().remove(&self.id));
        if !registered {
            if diagnose {
                #[cfg(debug_assertions)]
                log::error!("keyborg: handle {} is not registered", self.id);
            }
            return;
        }

        if let Some(record) = record.filter(|r| r.refs.borrow().is_empty()) {
            win.remove_extension::<KeyborgRecord>();
            record.core.dispose();
        }
    }
}

impl Drop for Keyborg {
    fn drop(&mut self) {
        self.release(false);
    }
}
