// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_dom --heading-base-level=0

//! Understory DOM: a small, in-memory DOM host model.
//!
//! ## Overview
//!
//! This crate models the parts of a browser document that focus-tracking code
//! depends on, so that such code can run and be tested without a browser:
//!
//! - [`Node`]: documents, elements, and open shadow roots, with light-tree and
//!   shadow-including traversal. [`WeakNode`] observes a node without keeping
//!   it alive.
//! - [`Event`] and [`EventTarget`]: listeners with a capture flag, and a
//!   dispatcher that runs capture → target → bubble over a path that crosses
//!   shadow boundaries for composed events, retargeting as it goes. See the
//!   [`dispatch`] module docs for the exact rules.
//! - [`Window`]: owns the document, tracks the deep focused element, runs the
//!   focus update steps, provides virtual-time timers and typed per-window
//!   extension records, and simulates user input (keys, pointer, touch).
//! - [`FocusOperation`]: the replaceable element-focus operation behind
//!   [`Node::focus`], so libraries can decorate it.
//!
//! ## Minimal example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use understory_dom::{FOCUSIN, KeyboardInit, Window};
//!
//! let win = Window::new();
//! let host = win.create_element("div");
//! win.document().append_child(&host).unwrap();
//! let root = host.attach_shadow().unwrap();
//! let button = win.create_element("button");
//! root.append_child(&button).unwrap();
//!
//! // Listeners outside the shadow tree see the host as the target.
//! let saw_host = Rc::new(Cell::new(false));
//! let flag = saw_host.clone();
//! let expected = host.clone();
//! win.document().add_event_listener(FOCUSIN, true, move |e| {
//!     flag.set(e.target_node() == Some(expected.clone()));
//! });
//!
//! win.key_down(KeyboardInit::tab());
//! assert_eq!(win.focused_element(), Some(button));
//! assert!(saw_host.get());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod dispatch;
mod error;
mod event;
mod node;
mod window;

pub use error::DomError;
pub use event::{
    Event, EventData, EventInit, EventTarget, FOCUSIN, FOCUSOUT, KEYDOWN, KeyboardInit,
    ListenerId, MOUSEDOWN, MouseButtons, MouseInit, Phase, TOUCHCANCEL, TOUCHEND, TOUCHSTART,
};
pub use node::{Node, NodeKind, WeakNode, retarget};
pub use window::{FocusOperation, NativeFocus, TimerId, WeakWindow, Window, WindowOptions};
