// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus ring visibility.
//!
//! Drive a small page with a shadow-DOM widget through clicks, Tab presses,
//! and Escape, and print when a focus ring would be shown or hidden.
//!
//! Run:
//! - `cargo run -p understory_demos --example focus_ring`

use std::rc::Rc;

use kurbo::Point;
use understory_dom::{KeyboardInit, MouseInit, Node, Window};
use understory_keyborg::{
    KEYBORG_FOCUSIN, KeyborgCallback, KeyborgFocusInEventDetails, KeyborgProps, create_keyborg,
};

fn button(win: &Window, parent: &Node, label: &str) -> Node {
    let b = win.create_element("button");
    b.set_text(label);
    parent.append_child(&b).expect("buttons can be appended");
    b
}

fn main() {
    let win = Window::new();
    let doc = win.document();
    let save = button(&win, &doc, "Save");
    let picker = win.create_element("color-picker");
    doc.append_child(&picker).expect("hosts can be appended");
    let shadow = picker.attach_shadow().expect("elements can host a shadow root");
    button(&win, &shadow, "Red");
    button(&win, &shadow, "Blue");

    let props: KeyborgProps =
        serde_json::from_str(r#"{ "dismissKeys": [27] }"#).expect("valid props");
    let keyborg = create_keyborg(&win, Some(props));

    let on_change: KeyborgCallback = Rc::new(|navigating| {
        println!("  focus ring {}", if navigating { "shown" } else { "hidden" });
    });
    keyborg.subscribe(&on_change);

    doc.add_event_listener(KEYBORG_FOCUSIN, false, |e| {
        let leaf = e.composed_path()[0].as_node().cloned();
        let programmatic = e
            .detail::<KeyborgFocusInEventDetails>()
            .and_then(|d| d.is_focused_programmatically);
        println!(
            "  focus -> {:?} (seen from the document as <{}>, programmatic: {programmatic:?})",
            leaf.map(|n| n.text()).unwrap_or_default(),
            e.target_node().map(|n| n.tag_name().to_owned()).unwrap_or_default(),
        );
    });

    println!("click Save");
    win.pointer_down(&save, MouseInit::primary(Point::new(12.0, 8.0)));

    println!("Tab");
    win.key_down(KeyboardInit::tab());
    println!("Tab");
    win.key_down(KeyboardInit::tab());

    println!("Escape, then wait");
    win.key_down(KeyboardInit::new("Escape", 27));
    win.advance(1000);

    println!("script focuses Save");
    save.focus();

    keyborg.dispose();
}
