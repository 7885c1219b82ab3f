//! Per-context overlay state machine (`Hidden` <-> `Visible`).
//!
//! Only one context shows its overlay at a time. When a lookup misses, a
//! recently shown overlay is held for the hold window so one-frame gaps during
//! fast typing do not blink.

use crate::context::{ContextId, ContextNode, ContextTree, OverlayStyle};
use crate::locator::SelectionCandidate;
use std::time::{Duration, Instant};

/// Height used when the located rect reports none.
const FALLBACK_HEIGHT: f64 = 16.0;
const MIN_OVERLAY_HEIGHT: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Visible,
}

/// Caret overlay appearance shared by every context.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPaint {
    pub width: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecomputeOutcome {
    Shown(ContextId),
    /// Candidate found in a context whose overlay is disabled; nothing changed.
    Suppressed(ContextId),
    /// No candidate; these contexts stayed visible inside the hold window.
    Held(Vec<ContextId>),
    Hidden,
}

#[derive(Debug, Clone, Copy)]
pub struct VisibilityHoldPolicy {
    hold_window: Duration,
}

impl VisibilityHoldPolicy {
    pub fn new(hold_window: Duration) -> Self {
        Self { hold_window }
    }

    pub fn hold_window(&self) -> Duration {
        self.hold_window
    }

    pub fn should_hold(&self, node: &ContextNode, now: Instant) -> bool {
        node.state.caret_enabled
            && node
                .state
                .last_shown
                .map_or(false, |t| now.saturating_duration_since(t) < self.hold_window)
    }

    /// Apply one locate result to the tree.
    pub fn apply(
        &self,
        tree: &mut ContextTree,
        found: Option<&SelectionCandidate>,
        paint: &OverlayPaint,
        now: Instant,
    ) -> RecomputeOutcome {
        match found {
            Some(candidate) => self.show(tree, candidate, paint, now),
            None => self.miss(tree, now),
        }
    }

    fn show(
        &self,
        tree: &mut ContextTree,
        candidate: &SelectionCandidate,
        paint: &OverlayPaint,
        now: Instant,
    ) -> RecomputeOutcome {
        let target = candidate.context;
        let Some(node) = tree.get_mut(target) else {
            return RecomputeOutcome::Hidden;
        };
        ensure_overlay(node, paint);
        if !node.state.caret_enabled {
            return RecomputeOutcome::Suppressed(target);
        }

        let rect = candidate.rect;
        let height = if rect.height > 0.0 {
            rect.height
        } else {
            FALLBACK_HEIGHT
        };
        if let Some(overlay) = node.state.overlay.as_mut() {
            overlay.left = rect.left.round() as i64;
            overlay.top = rect.top.round() as i64;
            overlay.height = height.max(MIN_OVERLAY_HEIGHT).round() as u32;
            overlay.visible = true;
            node.surface.render_overlay(overlay);
        }
        node.state.last_shown = Some(now);

        hide_all_except(tree, Some(target));
        RecomputeOutcome::Shown(target)
    }

    fn miss(&self, tree: &mut ContextTree, now: Instant) -> RecomputeOutcome {
        let mut kept = Vec::new();
        for id in tree.walk() {
            let Some(node) = tree.get_mut(id) else {
                continue;
            };
            if !node.state.is_visible() {
                continue;
            }
            if self.should_hold(node, now) {
                kept.push(id);
            } else {
                hide(node);
            }
        }
        if kept.is_empty() {
            RecomputeOutcome::Hidden
        } else {
            RecomputeOutcome::Held(kept)
        }
    }
}

pub fn overlay_state(node: &ContextNode) -> OverlayState {
    if node.state.is_visible() {
        OverlayState::Visible
    } else {
        OverlayState::Hidden
    }
}

/// Create the overlay element on first use.
pub fn ensure_overlay(node: &mut ContextNode, paint: &OverlayPaint) {
    if node.state.overlay.is_some() {
        return;
    }
    node.surface.create_overlay();
    let overlay = OverlayStyle {
        left: 0,
        top: 0,
        width: paint.width,
        height: FALLBACK_HEIGHT as u32,
        color: paint.color.clone(),
        visible: false,
        opaque: true,
    };
    node.surface.render_overlay(&overlay);
    node.state.overlay = Some(overlay);
}

pub fn hide(node: &mut ContextNode) {
    if let Some(overlay) = node.state.overlay.as_mut() {
        if overlay.visible {
            overlay.visible = false;
            node.surface.render_overlay(overlay);
        }
    }
}

pub fn hide_all_except(tree: &mut ContextTree, keep: Option<ContextId>) {
    for id in tree.walk() {
        if Some(id) == keep {
            continue;
        }
        if let Some(node) = tree.get_mut(id) {
            hide(node);
        }
    }
}

/// Re-color every existing overlay.
pub fn repaint(tree: &mut ContextTree, paint: &OverlayPaint) {
    for id in tree.walk() {
        let Some(node) = tree.get_mut(id) else {
            continue;
        };
        if let Some(overlay) = node.state.overlay.as_mut() {
            overlay.color = paint.color.clone();
            overlay.width = paint.width;
            node.surface.render_overlay(overlay);
        }
    }
}

/// One blink step: visible and enabled overlays flip opacity, all others go
/// transparent. Cosmetic only; never touches visibility.
pub fn blink(tree: &mut ContextTree) {
    for id in tree.walk() {
        let Some(node) = tree.get_mut(id) else {
            continue;
        };
        let enabled = node.state.caret_enabled;
        let Some(overlay) = node.state.overlay.as_mut() else {
            continue;
        };
        let next = enabled && overlay.visible && !overlay.opaque;
        if overlay.opaque != next {
            overlay.opaque = next;
            node.surface.render_overlay(overlay);
        }
    }
}
