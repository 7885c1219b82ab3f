#[path = "fake_surface.rs"]
mod fake_surface;

use caret_overlay::context::{ContextId, ContextTree, Rect};
use caret_overlay::locator::{CandidateSource, SelectionCandidate};
use caret_overlay::visibility::{
    blink, overlay_state, OverlayPaint, OverlayState, RecomputeOutcome, VisibilityHoldPolicy,
};
use fake_surface::FakeSurface;
use std::time::{Duration, Instant};

fn paint() -> OverlayPaint {
    OverlayPaint {
        width: 1,
        color: "#ff0000".into(),
    }
}

fn policy() -> VisibilityHoldPolicy {
    VisibilityHoldPolicy::new(Duration::from_millis(650))
}

fn at(context: ContextId, left: f64, top: f64, height: f64) -> SelectionCandidate {
    SelectionCandidate {
        context,
        rect: Rect::new(left, top, 0.0, height),
        source: CandidateSource::Selection,
    }
}

fn two_contexts() -> (ContextTree, ContextId, ContextId, FakeSurface, FakeSurface) {
    let a = FakeSurface::editor();
    let b = FakeSurface::editor();
    let mut tree = ContextTree::new();
    let ra = tree.set_root(a.boxed(), true);
    let rb = tree.insert_child(ra, b.boxed(), true).unwrap();
    (tree, ra, rb, a, b)
}

#[test]
fn miss_inside_hold_window_keeps_overlay() {
    let (mut tree, ra, _, a, _) = two_contexts();
    let t0 = Instant::now();
    let p = policy();

    assert_eq!(
        p.apply(&mut tree, Some(&at(ra, 10.0, 20.0, 18.0)), &paint(), t0),
        RecomputeOutcome::Shown(ra)
    );
    assert!(a.overlay_visible());

    let held = p.apply(&mut tree, None, &paint(), t0 + Duration::from_millis(600));
    assert_eq!(held, RecomputeOutcome::Held(vec![ra]));
    assert!(a.overlay_visible());

    let gone = p.apply(&mut tree, None, &paint(), t0 + Duration::from_millis(700));
    assert_eq!(gone, RecomputeOutcome::Hidden);
    assert!(!a.overlay_visible());
    assert_eq!(overlay_state(tree.get(ra).unwrap()), OverlayState::Hidden);
}

#[test]
fn at_most_one_context_visible() {
    let (mut tree, ra, rb, a, b) = two_contexts();
    let t0 = Instant::now();
    let p = policy();
    let steps = [
        Some(at(ra, 1.0, 1.0, 20.0)),
        Some(at(rb, 2.0, 2.0, 20.0)),
        None,
        Some(at(ra, 3.0, 3.0, 20.0)),
        Some(at(ra, 4.0, 4.0, 20.0)),
        None,
        Some(at(rb, 5.0, 5.0, 20.0)),
    ];
    for (i, found) in steps.iter().enumerate() {
        let now = t0 + Duration::from_millis(100 * i as u64);
        p.apply(&mut tree, found.as_ref(), &paint(), now);
        assert!(tree.visible().len() <= 1, "step {i}: {:?}", tree.visible());
        let fakes_visible = [a.overlay_visible(), b.overlay_visible()];
        assert!(fakes_visible.iter().filter(|v| **v).count() <= 1);
    }
    assert_eq!(tree.visible(), vec![rb]);
}

#[test]
fn overlay_geometry_follows_the_rect() {
    let (mut tree, ra, _, a, _) = two_contexts();
    let now = Instant::now();
    let p = policy();

    p.apply(&mut tree, Some(&at(ra, 10.4, 20.6, 18.2)), &paint(), now);
    let o = a.overlay().unwrap();
    assert_eq!((o.left, o.top, o.height), (10, 21, 18));

    p.apply(&mut tree, Some(&at(ra, 10.0, 20.0, 9.0)), &paint(), now);
    assert_eq!(a.overlay().unwrap().height, 12);

    p.apply(&mut tree, Some(&at(ra, 10.0, 20.0, 0.0)), &paint(), now);
    assert_eq!(a.overlay().unwrap().height, 16);
    assert_eq!(a.state.borrow().overlays_created, 1);
}

#[test]
fn disabled_context_is_a_no_op() {
    let (mut tree, ra, rb, a, b) = two_contexts();
    let t0 = Instant::now();
    let p = policy();
    p.apply(&mut tree, Some(&at(ra, 1.0, 1.0, 20.0)), &paint(), t0);
    tree.get_mut(rb).unwrap().state.caret_enabled = false;

    let outcome = p.apply(&mut tree, Some(&at(rb, 5.0, 5.0, 20.0)), &paint(), t0);
    assert_eq!(outcome, RecomputeOutcome::Suppressed(rb));
    assert!(a.overlay_visible(), "other context untouched");
    assert!(!b.overlay_visible());
}

#[test]
fn disabled_overlay_is_not_held() {
    let (mut tree, ra, _, a, _) = two_contexts();
    let t0 = Instant::now();
    let p = policy();
    p.apply(&mut tree, Some(&at(ra, 1.0, 1.0, 20.0)), &paint(), t0);
    tree.get_mut(ra).unwrap().state.caret_enabled = false;

    let outcome = p.apply(&mut tree, None, &paint(), t0 + Duration::from_millis(10));
    assert_eq!(outcome, RecomputeOutcome::Hidden);
    assert!(!a.overlay_visible());
}

#[test]
fn blink_toggles_only_visible_enabled_overlays() {
    let (mut tree, ra, rb, a, b) = two_contexts();
    let now = Instant::now();
    let p = policy();
    p.apply(&mut tree, Some(&at(rb, 1.0, 1.0, 20.0)), &paint(), now);
    p.apply(&mut tree, Some(&at(ra, 1.0, 1.0, 20.0)), &paint(), now);

    blink(&mut tree);
    assert!(!a.overlay().unwrap().opaque);
    blink(&mut tree);
    assert!(a.overlay().unwrap().opaque);
    // hidden overlay goes transparent and stays that way
    assert!(!b.overlay().unwrap().opaque);
    assert!(!b.overlay_visible());
}
