// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nodes: the document, elements, and open shadow roots.
//!
//! A [`Node`] is a strong, cheaply clonable handle compared by identity.
//! A [`WeakNode`] never keeps its node alive; use it for anything that merely
//! observes a node (last focused element, instrumented roots, and so on).
//!
//! Two parent relations exist:
//!
//! - [`Node::parent`] walks the light tree and stops at a root (document,
//!   shadow root, or a detached subtree).
//! - [`Node::parent_or_host`] additionally crosses from a shadow root to its
//!   host, which is the "shadow-including" walk used by composed events.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::error::DomError;
use crate::event::{Event, EventTarget, ListenerId, Listeners};
use crate::window::{Window, WindowInner};

/// Tags that are focusable without an explicit tab index.
const FOCUSABLE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea"];

/// The kind of a [`Node`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The root of a window's light tree.
    Document,
    /// An element with a tag name.
    Element,
    /// An open shadow root attached to a host element.
    ShadowRoot,
}

pub(crate) struct NodeInner {
    kind: NodeKind,
    tag: String,
    window: Weak<WindowInner>,
    parent: RefCell<Weak<NodeInner>>,
    children: RefCell<Vec<Node>>,
    host: Weak<NodeInner>,
    shadow_root: RefCell<Option<Node>>,
    content_editable: Cell<bool>,
    tab_index: Cell<Option<i32>>,
    text: RefCell<String>,
    pub(crate) listeners: Listeners,
}

/// A strong handle to a node in a [`Window`]'s tree.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeInner>);

/// A non-owning handle to a [`Node`].
///
/// [`WeakNode::resolve`] yields the node while something else keeps it alive,
/// and nothing afterwards.
#[derive(Clone, Default)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    /// Returns the node, or `None` if it has been reclaimed.
    pub fn resolve(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }

    /// Returns `true` if this reference was taken from `node`.
    ///
    /// Does not need to resolve the reference.
    pub fn points_to(&self, node: &Node) -> bool {
        core::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&node.0))
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolve() {
            Some(node) => f.debug_tuple("WeakNode").field(&node).finish(),
            None => f.write_str("WeakNode(<reclaimed>)"),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("kind", &self.0.kind);
        if self.is_element() {
            s.field("tag", &self.0.tag);
        }
        let text = self.0.text.borrow();
        if !text.is_empty() {
            s.field("text", &*text);
        }
        s.finish()
    }
}

impl Node {
    pub(crate) fn new(
        kind: NodeKind,
        tag: String,
        window: Weak<WindowInner>,
        host: Weak<NodeInner>,
    ) -> Self {
        Self(Rc::new(NodeInner {
            kind,
            tag,
            window,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            host,
            shadow_root: RefCell::new(None),
            content_editable: Cell::new(false),
            tab_index: Cell::new(None),
            text: RefCell::new(String::new()),
            listeners: Listeners::default(),
        }))
    }

    /// Returns a non-owning reference to this node.
    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    /// The kind of this node.
    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    /// Returns `true` for elements.
    pub fn is_element(&self) -> bool {
        self.0.kind == NodeKind::Element
    }

    /// Returns `true` for the document node.
    pub fn is_document(&self) -> bool {
        self.0.kind == NodeKind::Document
    }

    /// Returns `true` for shadow roots.
    pub fn is_shadow_root(&self) -> bool {
        self.0.kind == NodeKind::ShadowRoot
    }

    /// Lower-case tag name for elements; `#document` or `#shadow-root` otherwise.
    pub fn tag_name(&self) -> &str {
        &self.0.tag
    }

    /// The window owning this node, if it is still alive.
    pub fn window(&self) -> Option<Window> {
        self.0.window.upgrade().map(Window)
    }

    /// The light-tree parent.
    pub fn parent(&self) -> Option<Self> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    /// A snapshot of the light-tree children.
    pub fn children(&self) -> Vec<Self> {
        self.0.children.borrow().clone()
    }

    /// The host element, for shadow roots.
    pub fn host(&self) -> Option<Self> {
        self.0.host.upgrade().map(Node)
    }

    /// The shadow root attached to this element, if any.
    pub fn shadow_root(&self) -> Option<Self> {
        self.0.shadow_root.borrow().clone()
    }

    /// The parent, or the host when this node is a shadow root.
    pub fn parent_or_host(&self) -> Option<Self> {
        if self.is_shadow_root() {
            self.host()
        } else {
            self.parent()
        }
    }

    /// The root of this node's tree: the document, a shadow root, or the top
    /// of a detached subtree.
    pub fn root(&self) -> Self {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// Returns `true` if the shadow-including root of this node is a document.
    pub fn is_connected(&self) -> bool {
        let mut node = self.clone();
        while let Some(next) = node.parent_or_host() {
            node = next;
        }
        node.is_document()
    }

    /// Returns `true` if `other` is this node or a light-tree descendant of it.
    ///
    /// Never crosses into or out of shadow trees.
    pub fn contains(&self, other: &Self) -> bool {
        let mut node = Some(other.clone());
        while let Some(n) = node {
            if n == *self {
                return true;
            }
            node = n.parent();
        }
        false
    }

    /// Returns `true` if this node is `other` or an ancestor of it, crossing
    /// shadow boundaries from roots to hosts.
    pub fn is_shadow_including_inclusive_ancestor_of(&self, other: &Self) -> bool {
        let mut node = Some(other.clone());
        while let Some(n) = node {
            if n == *self {
                return true;
            }
            node = n.parent_or_host();
        }
        false
    }

    /// Appends `child` as the last child, detaching it from its old parent.
    pub fn append_child(&self, child: &Self) -> Result<(), DomError> {
        if !child.is_element() {
            return Err(DomError::HierarchyRequest);
        }
        if !Weak::ptr_eq(&self.0.window, &child.0.window) {
            return Err(DomError::WrongDocument);
        }
        if child.is_shadow_including_inclusive_ancestor_of(self) {
            return Err(DomError::HierarchyRequest);
        }
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
        Ok(())
    }

    /// Removes this node from its parent.
    ///
    /// If the focused element is no longer connected afterwards, focus is
    /// cleared without firing events.
    pub fn remove(&self) {
        self.detach();
        if let Some(window) = self.window() {
            window.focus_fixup();
        }
    }

    fn detach(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        parent.0.children.borrow_mut().retain(|c| c != self);
        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// Attaches an open shadow root to this element and returns it.
    pub fn attach_shadow(&self) -> Result<Self, DomError> {
        if !self.is_element() || self.0.shadow_root.borrow().is_some() {
            return Err(DomError::NotSupported);
        }
        let root = Self::new(
            NodeKind::ShadowRoot,
            String::from("#shadow-root"),
            self.0.window.clone(),
            Rc::downgrade(&self.0),
        );
        *self.0.shadow_root.borrow_mut() = Some(root.clone());
        Ok(root)
    }

    /// Sets the `contenteditable` state of this element.
    pub fn set_content_editable(&self, editable: bool) {
        self.0.content_editable.set(editable);
    }

    /// Returns `true` if this element or a light-tree ancestor is content-editable.
    pub fn is_content_editable(&self) -> bool {
        let mut node = Some(self.clone());
        while let Some(n) = node {
            if !n.is_element() {
                return false;
            }
            if n.0.content_editable.get() {
                return true;
            }
            node = n.parent();
        }
        false
    }

    /// Sets or clears the explicit tab index.
    pub fn set_tab_index(&self, tab_index: Option<i32>) {
        self.0.tab_index.set(tab_index);
    }

    /// The explicit tab index, if any.
    pub fn tab_index(&self) -> Option<i32> {
        self.0.tab_index.get()
    }

    /// Sets the text label of this node.
    pub fn set_text(&self, text: &str) {
        let mut t = self.0.text.borrow_mut();
        t.clear();
        t.push_str(text);
    }

    /// The text label of this node.
    pub fn text(&self) -> String {
        self.0.text.borrow().clone()
    }

    /// Returns `true` if this element can receive focus.
    pub fn is_focusable(&self) -> bool {
        self.is_element()
            && self.is_connected()
            && (self.0.tab_index.get().is_some()
                || self.0.content_editable.get()
                || FOCUSABLE_TAGS.contains(&self.tag_name()))
    }

    /// Returns `true` if sequential (Tab) navigation may stop on this element.
    pub fn is_sequentially_focusable(&self) -> bool {
        self.is_focusable() && self.0.tab_index.get().is_none_or(|t| t >= 0)
    }

    /// Focuses this element through the window's current focus operation.
    ///
    /// See [`Window::set_focus_operation`].
    pub fn focus(&self) {
        if let Some(window) = self.window() {
            window.focus_operation().focus(self);
        }
    }

    /// Clears focus if this element is focused.
    pub fn blur(&self) {
        if let Some(window) = self.window()
            && window.focused_element().as_ref() == Some(self)
        {
            window.update_focus(None);
        }
    }

    /// The focused element as seen from this document or shadow root.
    ///
    /// The deep focused element is retargeted into this node's tree. Returns
    /// `None` for elements, or when focus is outside this tree.
    pub fn active_element(&self) -> Option<Self> {
        if self.is_element() {
            return None;
        }
        let focused = self.window()?.focused_element()?;
        let candidate = retarget(&focused, self);
        (candidate.root() == *self).then_some(candidate)
    }

    /// Adds a listener for events of type `ty`.
    pub fn add_event_listener(
        &self,
        ty: &'static str,
        capture: bool,
        callback: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        self.0.listeners.add(ty, capture, callback)
    }

    /// Removes a listener previously added to this node.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.0.listeners.remove(id)
    }

    /// Number of listeners for `ty` currently registered on this node.
    pub fn listener_count(&self, ty: &str) -> usize {
        self.0.listeners.count(ty)
    }

    /// Dispatches `event` with this node as its target.
    ///
    /// Returns `false` if a listener canceled the event.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        crate::dispatch::dispatch(&EventTarget::Node(self.clone()), event)
    }
}

/// Retargets `node` against `against`.
///
/// Walks `node` out through shadow hosts until its tree is one that
/// `against` can see: either the document tree or a shadow tree that contains
/// `against`.
pub fn retarget(node: &Node, against: &Node) -> Node {
    let mut node = node.clone();
    loop {
        let root = node.root();
        if !root.is_shadow_root() || root.is_shadow_including_inclusive_ancestor_of(against) {
            return node;
        }
        match root.host() {
            Some(host) => node = host,
            None => return node,
        }
    }
}
