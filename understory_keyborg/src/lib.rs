// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_keyborg --heading-base-level=0

//! Understory Keyborg: tells keyboard navigation apart from pointer use.
//!
//! ## Overview
//!
//! Focus rings should show while the user navigates with the keyboard and hide
//! while they click or tap. This crate keeps one boolean per window, "is the
//! user navigating with the keyboard", and notifies subscribers when it flips.
//!
//! - [`create_keyborg`] returns a [`Keyborg`] handle. All handles on a window
//!   share one state machine, created with the first handle and torn down
//!   with the last.
//! - Tab (or a configured trigger key) and focus moves that are neither
//!   programmatic nor close after pointer input turn the mode on. Real pointer
//!   presses and touch turn it off, as can configured dismiss keys.
//! - Focus changes are routed across open shadow roots and re-dispatched as
//!   composed [`KEYBORG_FOCUSIN`] and [`KEYBORG_FOCUSOUT`] events at the
//!   focused leaf, so listeners outside a component see focus moving inside
//!   it.
//! - The window's focus operation is decorated so direct focus calls can be
//!   reported as programmatic; see [`setup_focus_event`] and
//!   [`native_focus`].
//!
//! The host model comes from `understory_dom`.
//!
//! ## Minimal example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use understory_dom::{KeyboardInit, Window};
//! use understory_keyborg::{KeyborgCallback, create_keyborg};
//!
//! let win = Window::new();
//! let a = win.create_element("button");
//! let b = win.create_element("button");
//! win.document().append_child(&a).unwrap();
//! win.document().append_child(&b).unwrap();
//!
//! let keyborg = create_keyborg(&win, None);
//! let seen = Rc::new(Cell::new(None));
//! let s = seen.clone();
//! let callback: KeyborgCallback = Rc::new(move |navigating| s.set(Some(navigating)));
//! keyborg.subscribe(&callback);
//!
//! win.click(&a);
//! assert!(!keyborg.is_navigating_with_keyboard());
//!
//! win.key_down(KeyboardInit::tab());
//! assert_eq!(win.focused_element(), Some(b.clone()));
//! assert!(keyborg.is_navigating_with_keyboard());
//! assert_eq!(seen.get(), Some(true));
//!
//! win.click(&b);
//! assert_eq!(seen.get(), Some(false));
//! keyborg.dispose();
//! ```
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`KeyborgProps`].
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod focus_event;
mod keyborg;
mod navigation;
mod shadow;
mod types;

pub use focus_event::{
    LastProgrammaticFocus, dispose_focus_event, get_last_focused_programmatically,
    instrumented_shadow_root_count, native_focus, setup_focus_event,
};
pub use keyborg::{Keyborg, create_keyborg, dispose_keyborg};
pub use types::{
    DISMISS_TIMEOUT_MS, KEYBORG_FOCUSIN, KEYBORG_FOCUSOUT, KEYBORG_KEYBOARDNAVIGATION,
    KeyboardNavigationEventData, KeyborgCallback, KeyborgFocusInEventDetails,
    KeyborgFocusOutEventDetails, KeyborgProps, MOUSE_USED_TIMEOUT_MS, VERSION,
};
