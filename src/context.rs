//! Tree of rendering contexts: the top-level surface plus nested embeds.

use slab::Slab;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Both dimensions zero; such rects carry no position information.
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Geometry of a collapsed native selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionGeometry {
    pub client_rects: Vec<Rect>,
    pub bounding: Option<Rect>,
}

/// An element that looks like a rendered cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorMarker {
    pub rect: Rect,
    pub displayed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeMarkerId(pub u64);

/// Visual state of a context's caret overlay element.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
    pub color: String,
    pub visible: bool,
    pub opaque: bool,
}

/// Host capability for one rendering surface.
///
/// Element creation and style injection are the host's business; the engine
/// only reads geometry through this trait and hands over styles to apply.
pub trait RenderSurface {
    /// False for placeholder embeds that have no usable document root.
    fn has_root(&self) -> bool;
    fn url(&self) -> Option<String> {
        None
    }
    /// Structural fingerprint check for the target editor's markup.
    fn looks_like_editor(&self) -> bool;
    /// The native selection, only when it is collapsed.
    fn collapsed_selection(&self) -> Option<SelectionGeometry>;
    /// Insert a zero-width marker at the collapsed selection point.
    fn insert_probe_marker(&mut self) -> Option<ProbeMarkerId>;
    fn measure_probe_marker(&self, id: ProbeMarkerId) -> Option<Rect>;
    fn remove_probe_marker(&mut self, id: ProbeMarkerId);
    /// Elements matching the "rendered cursor" markers, in document order.
    fn cursor_markers(&self) -> Vec<CursorMarker>;

    fn create_overlay(&mut self);
    fn render_overlay(&mut self, style: &OverlayStyle);
    fn set_caret_tint(&mut self, css: &str);
    fn set_pointer_style(&mut self, css: &str);
    fn set_debug_badge(&mut self, visible: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRole {
    /// Source of the persisted caret-enabled flag and home of the panel.
    Canonical,
    Embedded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextState {
    pub caret_enabled: bool,
    /// `None` until the overlay is first needed.
    pub overlay: Option<OverlayStyle>,
    pub last_shown: Option<Instant>,
}

impl ContextState {
    fn new(caret_enabled: bool) -> Self {
        Self {
            caret_enabled,
            overlay: None,
            last_shown: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.overlay.as_ref().map_or(false, |o| o.visible)
    }
}

pub struct ContextNode {
    parent: Option<ContextId>,
    children: Vec<ContextId>,
    role: ContextRole,
    pub surface: Box<dyn RenderSurface>,
    pub state: ContextState,
}

impl ContextNode {
    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    pub fn children(&self) -> &[ContextId] {
        &self.children
    }

    pub fn role(&self) -> ContextRole {
        self.role
    }
}

#[derive(Default)]
pub struct ContextTree {
    nodes: Slab<ContextNode>,
    root: Option<ContextId>,
}

impl ContextTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<ContextId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Install the top-level context, dropping any previous tree.
    pub fn set_root(&mut self, surface: Box<dyn RenderSurface>, caret_enabled: bool) -> ContextId {
        if let Some(old) = self.root {
            self.remove(old);
        }
        let id = ContextId(self.nodes.insert(ContextNode {
            parent: None,
            children: Vec::new(),
            role: ContextRole::Canonical,
            surface,
            state: ContextState::new(caret_enabled),
        }));
        self.root = Some(id);
        id
    }

    /// Attach an embed under `parent`. `None` if the parent is gone.
    pub fn insert_child(
        &mut self,
        parent: ContextId,
        surface: Box<dyn RenderSurface>,
        caret_enabled: bool,
    ) -> Option<ContextId> {
        if !self.nodes.contains(parent.0) {
            return None;
        }
        let id = ContextId(self.nodes.insert(ContextNode {
            parent: Some(parent),
            children: Vec::new(),
            role: ContextRole::Embedded,
            surface,
            state: ContextState::new(caret_enabled),
        }));
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    /// Remove `id` and everything embedded below it.
    pub fn remove(&mut self, id: ContextId) {
        let Some(node) = self.nodes.try_remove(id.0) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(p.0)) {
            parent.children.retain(|c| *c != id);
        }
        if self.root == Some(id) {
            self.root = None;
        }
        for child in node.children {
            self.remove(child);
        }
    }

    /// Move the canonical role to `id`.
    pub fn designate_canonical(&mut self, id: ContextId) -> bool {
        if !self.nodes.contains(id.0) {
            return false;
        }
        for (_, node) in self.nodes.iter_mut() {
            node.role = ContextRole::Embedded;
        }
        self.nodes[id.0].role = ContextRole::Canonical;
        true
    }

    pub fn canonical(&self) -> Option<ContextId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.role == ContextRole::Canonical)
            .map(|(i, _)| ContextId(i))
    }

    pub fn get(&self, id: ContextId) -> Option<&ContextNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut ContextNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn contains(&self, id: ContextId) -> bool {
        self.nodes.contains(id.0)
    }

    /// Depth-first, pre-order walk from the root (tree order).
    pub fn walk(&self) -> Vec<ContextId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<ContextId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Ids of contexts currently showing their overlay.
    pub fn visible(&self) -> Vec<ContextId> {
        self.walk()
            .into_iter()
            .filter(|id| self.nodes[id.0].state.is_visible())
            .collect()
    }
}
