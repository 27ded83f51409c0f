// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event dispatch: build the propagation path and run capture → target → bubble.
//!
//! ## Path
//!
//! The path starts at the target and walks parents. A shadow root continues to
//! its host only for composed events; the document continues to the window.
//!
//! Every path entry sees the target (and the related target of focus events)
//! retargeted against itself, so listeners outside a shadow tree observe the
//! host rather than the element inside it. Entries where the retargeted
//! related target equals the retargeted target are dropped, along with all
//! entries outside them: a focus move between two elements of one shadow tree
//! is invisible to the trees enclosing it.
//!
//! ## Phases
//!
//! - Capture pass, outer → inner: capture listeners. Entries whose retargeted
//!   target is the entry itself run in [`Phase::Target`], others in
//!   [`Phase::Capture`].
//! - Bubble pass, inner → outer: non-capture listeners. At-target entries
//!   always run; other entries only if the event bubbles.
//!
//! [`Event::stop_propagation`] ends dispatch after the current entry;
//! [`Event::stop_immediate_propagation`] also skips its remaining listeners.
//! Listener lists are snapshotted when an entry is reached, so listeners added
//! to entries further along the path during dispatch still run, and listeners
//! removed during dispatch do not.

use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::event::{Event, EventTarget, Phase};
use crate::node::{Node, retarget};

struct PathEntry {
    item: EventTarget,
    target: EventTarget,
    related: Option<Node>,
}

impl PathEntry {
    fn at_target(&self) -> bool {
        self.item == self.target
    }
}

fn build_path(target: &EventTarget, event: &Event) -> SmallVec<[PathEntry; 8]> {
    let mut path = SmallVec::new();
    let node = match target {
        EventTarget::Window(_) => {
            path.push(PathEntry {
                item: target.clone(),
                target: target.clone(),
                related: None,
            });
            return path;
        }
        EventTarget::Node(node) => node,
    };
    let related = event.original_related_target();

    let mut cursor = Some(target.clone());
    while let Some(item) = cursor {
        let anchor = match &item {
            EventTarget::Node(n) => n.clone(),
            EventTarget::Window(w) => w.document(),
        };
        let retargeted = retarget(node, &anchor);
        let related = related.as_ref().map(|r| retarget(r, &anchor));
        if related.as_ref() == Some(&retargeted) {
            break;
        }
        cursor = match &item {
            EventTarget::Node(n) if n.is_shadow_root() => {
                if event.composed() {
                    n.host().map(EventTarget::Node)
                } else {
                    None
                }
            }
            EventTarget::Node(n) if n.is_document() => n.window().map(EventTarget::Window),
            EventTarget::Node(n) => n.parent().map(EventTarget::Node),
            EventTarget::Window(_) => None,
        };
        path.push(PathEntry {
            item,
            target: EventTarget::Node(retargeted),
            related,
        });
    }
    path
}

fn invoke(entry: &PathEntry, event: &Event, phase: Phase, capture: bool) {
    event.set_cursor(&entry.item, &entry.target, entry.related.as_ref(), phase);
    for listener in entry.item.listeners().snapshot(event.ty(), capture) {
        if listener.is_removed() {
            continue;
        }
        listener.call(event);
        if event.immediate_propagation_stopped() {
            break;
        }
    }
}

/// Dispatches `event` at `target`; returns `false` if it was canceled.
///
/// An event that is already being dispatched is not dispatched again.
pub(crate) fn dispatch(target: &EventTarget, event: &Event) -> bool {
    if event.is_dispatching() {
        return false;
    }
    let path = build_path(target, event);
    event.begin_dispatch(path.iter().map(|e| e.item.clone()).collect::<Vec<_>>());

    for entry in path.iter().rev() {
        let phase = if entry.at_target() {
            Phase::Target
        } else {
            Phase::Capture
        };
        invoke(entry, event, phase, true);
        if event.propagation_stopped() {
            break;
        }
    }
    if !event.propagation_stopped() {
        for entry in path.iter() {
            if entry.at_target() {
                invoke(entry, event, Phase::Target, false);
            } else if event.bubbles() {
                invoke(entry, event, Phase::Bubble, false);
            }
            if event.propagation_stopped() {
                break;
            }
        }
    }

    if let Some(first) = path.first() {
        event.set_cursor(&first.item, &first.target, first.related.as_ref(), Phase::None);
    }
    event.end_dispatch();
    !event.default_prevented()
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use crate::event::{Event, EventData, EventInit, EventTarget, FOCUSIN, Phase};
    use crate::node::Node;
    use crate::window::Window;

    type Log = Rc<RefCell<Vec<(&'static str, Phase)>>>;

    fn record(target: &EventTarget, name: &'static str, log: &Log) {
        for capture in [true, false] {
            let log = log.clone();
            target.add_event_listener("ping", capture, move |e| {
                log.borrow_mut().push((name, e.phase()));
            });
        }
    }

    fn ping(init: EventInit) -> Event {
        Event::new("ping", init, EventData::Plain)
    }

    #[test]
    fn capture_target_bubble_order() {
        let win = Window::new();
        let outer = win.create_element("div");
        let inner = win.create_element("button");
        win.document().append_child(&outer).unwrap();
        outer.append_child(&inner).unwrap();

        let log = Log::default();
        record(&win.clone().into(), "window", &log);
        record(&outer.clone().into(), "outer", &log);
        record(&inner.clone().into(), "inner", &log);

        assert!(inner.dispatch_event(&ping(EventInit::COMPOSED)));
        assert_eq!(
            *log.borrow(),
            vec![
                ("window", Phase::Capture),
                ("outer", Phase::Capture),
                ("inner", Phase::Target),
                ("inner", Phase::Target),
                ("outer", Phase::Bubble),
                ("window", Phase::Bubble),
            ]
        );
    }

    #[test]
    fn non_bubbling_event_skips_bubble_pass() {
        let win = Window::new();
        let el = win.create_element("button");
        win.document().append_child(&el).unwrap();

        let log = Log::default();
        record(&win.document().into(), "doc", &log);
        record(&el.clone().into(), "el", &log);

        el.dispatch_event(&ping(EventInit::default()));
        assert_eq!(
            *log.borrow(),
            vec![
                ("doc", Phase::Capture),
                ("el", Phase::Target),
                ("el", Phase::Target)
            ]
        );
    }

    fn shadow_fixture(win: &Window) -> (Node, Node, Node) {
        let host = win.create_element("div");
        win.document().append_child(&host).unwrap();
        let root = host.attach_shadow().unwrap();
        let inner = win.create_element("button");
        root.append_child(&inner).unwrap();
        (host, root, inner)
    }

    #[test]
    fn composed_event_is_retargeted_to_host() {
        let win = Window::new();
        let (host, root, inner) = shadow_fixture(&win);

        let seen: Rc<RefCell<Vec<Node>>> = Rc::default();
        let s = seen.clone();
        win.document().add_event_listener("ping", true, move |e| {
            s.borrow_mut().push(e.target_node().unwrap());
        });
        let s = seen.clone();
        root.add_event_listener("ping", true, move |e| {
            s.borrow_mut().push(e.target_node().unwrap());
        });

        inner.dispatch_event(&ping(EventInit::COMPOSED));
        assert_eq!(*seen.borrow(), vec![host, inner]);
    }

    #[test]
    fn uncomposed_event_stays_inside_shadow_root() {
        let win = Window::new();
        let (_host, root, inner) = shadow_fixture(&win);

        let log = Log::default();
        record(&win.document().into(), "doc", &log);
        record(&root.into(), "root", &log);

        inner.dispatch_event(&ping(EventInit {
            bubbles: true,
            cancelable: false,
            composed: false,
        }));
        assert_eq!(
            *log.borrow(),
            vec![("root", Phase::Capture), ("root", Phase::Bubble)]
        );
    }

    #[test]
    fn focus_move_inside_shadow_tree_is_trimmed_for_outer_trees() {
        let win = Window::new();
        let (_host, root, inner) = shadow_fixture(&win);
        let sibling = win.create_element("button");
        root.append_child(&sibling).unwrap();

        let hits: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let h = hits.clone();
        win.document()
            .add_event_listener(FOCUSIN, true, move |_| h.borrow_mut().push("doc"));
        let h = hits.clone();
        root.add_event_listener(FOCUSIN, true, move |e| {
            assert_eq!(e.related_target().map(|r| r.tag_name() == "button"), Some(true));
            h.borrow_mut().push("root");
        });

        let event = Event::new(
            FOCUSIN,
            EventInit {
                bubbles: true,
                cancelable: false,
                composed: true,
            },
            EventData::Focus {
                related_target: Some(inner),
            },
        );
        sibling.dispatch_event(&event);
        assert_eq!(*hits.borrow(), vec!["root"]);
    }

    #[test]
    fn listener_added_to_inner_entry_during_dispatch_runs() {
        let win = Window::new();
        let (_host, root, inner) = shadow_fixture(&win);

        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        win.document().add_event_listener("ping", true, move |_| {
            let h = h.clone();
            root.add_event_listener("ping", true, move |_| *h.borrow_mut() += 1);
        });
        inner.dispatch_event(&ping(EventInit::COMPOSED));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn removed_listener_does_not_run_later_in_same_dispatch() {
        let win = Window::new();
        let el = win.create_element("button");
        win.document().append_child(&el).unwrap();

        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let late = el.add_event_listener("ping", false, move |_| *h.borrow_mut() += 1);
        let target = el.clone();
        win.document().add_event_listener("ping", true, move |_| {
            target.remove_event_listener(late);
        });
        el.dispatch_event(&ping(EventInit::COMPOSED));
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn stop_propagation_and_prevent_default() {
        let win = Window::new();
        let el = win.create_element("button");
        win.document().append_child(&el).unwrap();

        let log = Log::default();
        win.document().add_event_listener("ping", true, |e| {
            e.prevent_default();
            e.stop_propagation();
        });
        record(&el.clone().into(), "el", &log);

        assert!(!el.dispatch_event(&ping(EventInit::COMPOSED)));
        assert!(log.borrow().is_empty());
    }
}
