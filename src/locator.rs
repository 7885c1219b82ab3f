//! Ranked search for the authoritative cursor rectangle across all contexts.
//!
//! Order is fixed: editor-like contexts before the rest (tree order within
//! each group), native selection before the cursor-marker heuristic, and the
//! first accepted candidate wins.

use crate::context::{ContextId, ContextTree, ProbeMarkerId, Rect, RenderSurface};

/// Rects shorter than this are placeholder noise.
pub const MIN_CARET_HEIGHT: f64 = 8.0;
/// Height of the default rect blank embeds report at the origin.
pub const BOGUS_DEFAULT_HEIGHT: f64 = 16.0;
/// Cursor-marker elements wider than this are not a caret.
pub const MAX_MARKER_WIDTH: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Selection,
    DomHeuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCandidate {
    pub context: ContextId,
    pub rect: Rect,
    pub source: CandidateSource,
}

pub fn is_zeroish(rect: &Rect) -> bool {
    let h = rect.height.max(0.0);
    h < MIN_CARET_HEIGHT || (rect.left == 0.0 && rect.top == 0.0 && h == BOGUS_DEFAULT_HEIGHT)
}

/// Removes the probe marker when measuring is done, whatever the outcome.
struct ProbeGuard<'a> {
    surface: &'a mut dyn RenderSurface,
    id: ProbeMarkerId,
}

impl ProbeGuard<'_> {
    fn measure(&self) -> Option<Rect> {
        self.surface.measure_probe_marker(self.id)
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        self.surface.remove_probe_marker(self.id);
    }
}

#[derive(Debug, Clone)]
pub struct CaretLocator {
    editor_url_prefix: String,
}

impl CaretLocator {
    pub fn new(editor_url_prefix: impl Into<String>) -> Self {
        Self {
            editor_url_prefix: editor_url_prefix.into(),
        }
    }

    pub fn is_primary(&self, surface: &dyn RenderSurface) -> bool {
        if surface.looks_like_editor() {
            return true;
        }
        !self.editor_url_prefix.is_empty()
            && surface
                .url()
                .map_or(false, |u| u.starts_with(&self.editor_url_prefix))
    }

    /// Contexts in search order: primary first, then secondary, tree order
    /// inside each group. Contexts without a root are left out.
    pub fn search_order(&self, tree: &ContextTree) -> Vec<ContextId> {
        let (primary, secondary): (Vec<_>, Vec<_>) = tree
            .walk()
            .into_iter()
            .filter(|id| tree.get(*id).map_or(false, |n| n.surface.has_root()))
            .partition(|id| {
                tree.get(*id)
                    .map_or(false, |n| self.is_primary(n.surface.as_ref()))
            });
        primary.into_iter().chain(secondary).collect()
    }

    pub fn locate(&self, tree: &mut ContextTree) -> Option<SelectionCandidate> {
        for id in self.search_order(tree) {
            let Some(node) = tree.get_mut(id) else {
                continue;
            };
            let surface = node.surface.as_mut();

            if let Some(rect) = selection_rect(surface).filter(|r| !is_zeroish(r)) {
                return Some(SelectionCandidate {
                    context: id,
                    rect,
                    source: CandidateSource::Selection,
                });
            }

            if let Some(rect) = marker_rect(surface) {
                return Some(SelectionCandidate {
                    context: id,
                    rect,
                    source: CandidateSource::DomHeuristic,
                });
            }
        }
        None
    }
}

fn selection_rect(surface: &mut dyn RenderSurface) -> Option<Rect> {
    let selection = surface.collapsed_selection()?;
    if let Some(r) = selection.client_rects.last().filter(|r| !r.is_empty()) {
        return Some(*r);
    }
    if let Some(r) = selection.bounding.filter(|r| !r.is_empty()) {
        return Some(r);
    }
    let id = surface.insert_probe_marker()?;
    let guard = ProbeGuard { surface, id };
    guard.measure().filter(|r| !r.is_empty())
}

fn marker_rect(surface: &dyn RenderSurface) -> Option<Rect> {
    surface
        .cursor_markers()
        .into_iter()
        .filter(|m| m.displayed)
        .map(|m| m.rect)
        .find(|r| r.height > MIN_CARET_HEIGHT && r.width <= MAX_MARKER_WIDTH && !is_zeroish(r))
}
