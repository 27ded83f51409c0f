// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event names, timing constants, configuration, and event details.

use alloc::rc::Rc;
use alloc::vec::Vec;

use understory_dom::{Event, Node};

/// Routed focus-in event, dispatched at the leaf element that received focus.
///
/// Bubbling, cancelable, composed; detail: [`KeyborgFocusInEventDetails`].
pub const KEYBORG_FOCUSIN: &str = "keyborg:focusin";

/// Routed focus-out event, dispatched at the leaf element that lost focus.
///
/// Bubbling, cancelable, composed; detail: [`KeyborgFocusOutEventDetails`].
pub const KEYBORG_FOCUSOUT: &str = "keyborg:focusout";

/// Fired at the window when the navigation mode changes.
///
/// Detail: [`KeyboardNavigationEventData`].
pub const KEYBORG_KEYBOARDNAVIGATION: &str = "keyborg:keyboardnavigation";

/// When a dismiss key is pressed and focus stays put for this long,
/// keyboard navigation mode is dismissed.
pub const DISMISS_TIMEOUT_MS: u64 = 500;

/// How long routed focus-ins are ignored after pointer or touch activity.
pub const MOUSE_USED_TIMEOUT_MS: u64 = 1000;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration of the shared navigation-mode engine.
///
/// Only the first handle created for a window configures the engine; later
/// handles share it and their props are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct KeyborgProps {
    /// Key codes that turn keyboard navigation mode on.
    ///
    /// Empty means any key does, except while a text-editable element has focus.
    /// Tab always does.
    pub trigger_keys: Vec<u32>,
    /// Key codes that dismiss keyboard navigation mode (for example Escape).
    ///
    /// Empty means only pointer and touch activity dismiss it.
    pub dismiss_keys: Vec<u32>,
}

impl KeyborgProps {
    /// Props with no trigger or dismiss keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the keys that turn keyboard navigation mode on.
    pub fn with_trigger_keys(mut self, keys: impl IntoIterator<Item = u32>) -> Self {
        self.trigger_keys = keys.into_iter().collect();
        self
    }

    /// Sets the keys that dismiss keyboard navigation mode.
    pub fn with_dismiss_keys(mut self, keys: impl IntoIterator<Item = u32>) -> Self {
        self.dismiss_keys = keys.into_iter().collect();
        self
    }
}

/// Subscriber callback; receives the new navigation mode.
pub type KeyborgCallback = Rc<dyn Fn(bool)>;

/// Detail of [`KEYBORG_FOCUSIN`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyborgFocusInEventDetails {
    /// The element that lost focus, as seen from the leaf's tree.
    pub related_target: Option<Node>,
    /// Whether focus came from a direct focus call.
    ///
    /// `None` when that cannot be determined in this environment.
    pub is_focused_programmatically: Option<bool>,
}

/// Detail of [`KEYBORG_FOCUSOUT`].
#[derive(Clone, Debug)]
pub struct KeyborgFocusOutEventDetails {
    /// The native `focusout` this event mirrors.
    pub original_event: Event,
}

/// Detail of [`KEYBORG_KEYBOARDNAVIGATION`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyboardNavigationEventData {
    /// The new navigation mode.
    pub is_navigating_with_keyboard: bool,
}
