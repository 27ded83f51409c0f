// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for keyboard-navigation mode in light DOM.
//!
//! These drive a window the way a user would (clicks, taps, key presses) and
//! check when the shared mode flips.

use std::cell::RefCell;
use std::rc::Rc;

use understory_dom::{KeyboardInit, Node, Window};
use understory_keyborg::{
    DISMISS_TIMEOUT_MS, KeyborgCallback, KeyborgProps, MOUSE_USED_TIMEOUT_MS, create_keyborg,
    native_focus,
};

const ESCAPE: u32 = 27;
const ARROW_DOWN: u32 = 40;

fn buttons(win: &Window, labels: &[&str]) -> Vec<Node> {
    labels
        .iter()
        .map(|label| {
            let b = win.create_element("button");
            b.set_text(label);
            win.document().append_child(&b).unwrap();
            b
        })
        .collect()
}

fn letter() -> KeyboardInit {
    KeyboardInit::new("a", 65)
}

#[test]
fn click_tab_tab_click() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B", "C"]);
    let keyborg = create_keyborg(&win, None);
    let log: Rc<RefCell<Vec<bool>>> = Rc::default();
    let l = log.clone();
    let callback: KeyborgCallback = Rc::new(move |v| l.borrow_mut().push(v));
    keyborg.subscribe(&callback);

    win.click(&bs[0]);
    assert!(!keyborg.is_navigating_with_keyboard());

    win.key_down(KeyboardInit::tab());
    assert_eq!(win.focused_element(), Some(bs[1].clone()));
    assert!(keyborg.is_navigating_with_keyboard());

    win.key_down(KeyboardInit::tab());
    assert_eq!(win.focused_element(), Some(bs[2].clone()));
    assert!(keyborg.is_navigating_with_keyboard());

    win.click(&bs[1]);
    assert!(!keyborg.is_navigating_with_keyboard());

    // One notification per actual transition.
    assert_eq!(*log.borrow(), vec![true, false]);
    keyborg.dispose();
}

#[test]
fn focus_moves_after_pointer_input_are_suppressed() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B", "C"]);
    let keyborg = create_keyborg(&win, None);

    win.click(&bs[0]);
    win.advance(MOUSE_USED_TIMEOUT_MS - 1);
    native_focus(&bs[1]);
    assert!(!keyborg.is_navigating_with_keyboard());

    win.advance(1);
    native_focus(&bs[2]);
    assert!(keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn another_click_restarts_the_suppression_window() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B"]);
    let keyborg = create_keyborg(&win, None);

    win.click(&bs[0]);
    win.advance(600);
    win.click(&bs[1]);
    win.advance(600);
    native_focus(&bs[0]);
    assert!(!keyborg.is_navigating_with_keyboard());
    assert_eq!(win.pending_timers(), 1);
    keyborg.dispose();
}

#[test]
fn focus_without_previous_focus_does_not_trigger() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B"]);
    let keyborg = create_keyborg(&win, None);

    native_focus(&bs[0]);
    assert!(!keyborg.is_navigating_with_keyboard());
    native_focus(&bs[1]);
    assert!(keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn programmatic_focus_does_not_trigger() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B"]);
    let keyborg = create_keyborg(&win, None);

    bs[0].focus();
    bs[1].focus();
    assert!(!keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn editable_focus_ignores_letters_but_not_tab() {
    let win = Window::new();
    let input = win.create_element("input");
    win.document().append_child(&input).unwrap();
    let keyborg = create_keyborg(&win, None);

    win.click(&input);
    win.key_down(letter());
    assert!(!keyborg.is_navigating_with_keyboard());

    win.key_down(KeyboardInit::tab());
    assert!(keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn content_editable_is_inherited() {
    let win = Window::new();
    let editor = win.create_element("div");
    editor.set_content_editable(true);
    win.document().append_child(&editor).unwrap();
    let paragraph = win.create_element("p");
    paragraph.set_tab_index(Some(0));
    editor.append_child(&paragraph).unwrap();
    let keyborg = create_keyborg(&win, None);

    win.click(&paragraph);
    assert_eq!(win.focused_element(), Some(paragraph));
    win.key_down(letter());
    assert!(!keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn any_key_triggers_without_trigger_set() {
    let win = Window::new();
    let bs = buttons(&win, &["A"]);
    let keyborg = create_keyborg(&win, None);

    win.click(&bs[0]);
    win.key_down(letter());
    assert!(keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn trigger_set_restricts_keys() {
    let win = Window::new();
    let bs = buttons(&win, &["A"]);
    let keyborg = create_keyborg(
        &win,
        Some(KeyborgProps::new().with_trigger_keys([ARROW_DOWN])),
    );

    win.click(&bs[0]);
    win.key_down(letter());
    assert!(!keyborg.is_navigating_with_keyboard());
    win.key_down(KeyboardInit::new("ArrowDown", ARROW_DOWN));
    assert!(keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn dismiss_key_turns_mode_off_when_focus_stays() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B"]);
    let keyborg = create_keyborg(&win, Some(KeyborgProps::new().with_dismiss_keys([ESCAPE])));

    win.key_down(KeyboardInit::tab());
    assert!(keyborg.is_navigating_with_keyboard());
    win.key_down(KeyboardInit::new("Escape", ESCAPE));
    win.advance(DISMISS_TIMEOUT_MS - 1);
    assert!(keyborg.is_navigating_with_keyboard());
    win.advance(1);
    assert!(!keyborg.is_navigating_with_keyboard());
    assert_eq!(win.focused_element(), Some(bs[0].clone()));
    keyborg.dispose();
}

#[test]
fn dismiss_requires_focus_stability() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B"]);
    let keyborg = create_keyborg(&win, Some(KeyborgProps::new().with_dismiss_keys([ESCAPE])));

    win.key_down(KeyboardInit::tab());
    win.key_down(KeyboardInit::new("Escape", ESCAPE));
    native_focus(&bs[1]);
    win.advance(DISMISS_TIMEOUT_MS);
    assert!(keyborg.is_navigating_with_keyboard());
    assert_eq!(win.pending_timers(), 0);
    keyborg.dispose();
}

#[test]
fn repeated_dismiss_key_restarts_the_timer() {
    let win = Window::new();
    buttons(&win, &["A"]);
    let keyborg = create_keyborg(&win, Some(KeyborgProps::new().with_dismiss_keys([ESCAPE])));

    win.key_down(KeyboardInit::tab());
    win.key_down(KeyboardInit::new("Escape", ESCAPE));
    win.advance(300);
    win.key_down(KeyboardInit::new("Escape", ESCAPE));
    assert_eq!(win.pending_timers(), 1);
    win.advance(300);
    assert!(keyborg.is_navigating_with_keyboard());
    win.advance(DISMISS_TIMEOUT_MS - 300);
    assert!(!keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn keys_do_not_dismiss_without_dismiss_set() {
    let win = Window::new();
    buttons(&win, &["A"]);
    let keyborg = create_keyborg(&win, None);

    win.key_down(KeyboardInit::tab());
    win.key_down(KeyboardInit::new("Escape", ESCAPE));
    assert_eq!(win.pending_timers(), 0);
    win.advance(DISMISS_TIMEOUT_MS);
    assert!(keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn touch_turns_mode_off_and_suppresses() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B", "C"]);
    let keyborg = create_keyborg(&win, None);

    win.key_down(KeyboardInit::tab());
    assert!(keyborg.is_navigating_with_keyboard());
    win.tap(&bs[1]);
    assert!(!keyborg.is_navigating_with_keyboard());
    native_focus(&bs[2]);
    assert!(!keyborg.is_navigating_with_keyboard());

    keyborg.set_val(true);
    win.touch_cancel(&bs[2]);
    assert!(!keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}

#[test]
fn canceled_tab_still_triggers() {
    let win = Window::new();
    let bs = buttons(&win, &["A", "B"]);
    let keyborg = create_keyborg(&win, None);
    win.click(&bs[0]);
    bs[0].add_event_listener(understory_dom::KEYDOWN, false, |e| e.prevent_default());

    assert!(!win.key_down(KeyboardInit::tab()));
    assert_eq!(win.focused_element(), Some(bs[0].clone()));
    assert!(keyborg.is_navigating_with_keyboard());
    keyborg.dispose();
}
