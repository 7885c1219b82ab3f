use caret_overlay::context::{
    CursorMarker, OverlayStyle, ProbeMarkerId, Rect, RenderSurface, SelectionGeometry,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct FakeState {
    pub has_root: bool,
    pub url: Option<String>,
    pub editor: bool,
    pub selection: Option<SelectionGeometry>,
    pub probe_rect: Option<Rect>,
    pub markers: Vec<CursorMarker>,
    pub probes_inserted: u32,
    pub probes_live: i32,
    pub overlays_created: u32,
    pub overlay: Option<OverlayStyle>,
    pub renders: u32,
    pub tint: String,
    pub pointer: String,
    pub pointer_applies: u32,
    pub badge: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            has_root: true,
            url: None,
            editor: true,
            selection: None,
            probe_rect: None,
            markers: Vec::new(),
            probes_inserted: 0,
            probes_live: 0,
            overlays_created: 0,
            overlay: None,
            renders: 0,
            tint: String::new(),
            pointer: String::new(),
            pointer_applies: 0,
            badge: false,
        }
    }
}

/// Surface double whose state stays inspectable after it is boxed into a tree.
#[derive(Clone, Default)]
pub struct FakeSurface {
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeSurface {
    pub fn editor() -> Self {
        Self::default()
    }

    pub fn plain() -> Self {
        let s = Self::default();
        s.state.borrow_mut().editor = false;
        s
    }

    pub fn boxed(&self) -> Box<dyn RenderSurface> {
        Box::new(self.clone())
    }

    pub fn set_caret_at(&self, left: f64, top: f64, height: f64) {
        self.state.borrow_mut().selection = Some(SelectionGeometry {
            client_rects: vec![Rect::new(left, top, 0.0, height)],
            bounding: None,
        });
    }

    pub fn clear_caret(&self) {
        let mut st = self.state.borrow_mut();
        st.selection = None;
        st.markers.clear();
    }

    pub fn add_marker(&self, rect: Rect, displayed: bool) {
        self.state
            .borrow_mut()
            .markers
            .push(CursorMarker { rect, displayed });
    }

    pub fn overlay(&self) -> Option<OverlayStyle> {
        self.state.borrow().overlay.clone()
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay().map_or(false, |o| o.visible)
    }
}

impl RenderSurface for FakeSurface {
    fn has_root(&self) -> bool {
        self.state.borrow().has_root
    }

    fn url(&self) -> Option<String> {
        self.state.borrow().url.clone()
    }

    fn looks_like_editor(&self) -> bool {
        self.state.borrow().editor
    }

    fn collapsed_selection(&self) -> Option<SelectionGeometry> {
        self.state.borrow().selection.clone()
    }

    fn insert_probe_marker(&mut self) -> Option<ProbeMarkerId> {
        let mut st = self.state.borrow_mut();
        st.probes_inserted += 1;
        st.probes_live += 1;
        Some(ProbeMarkerId(st.probes_inserted as u64))
    }

    fn measure_probe_marker(&self, _id: ProbeMarkerId) -> Option<Rect> {
        self.state.borrow().probe_rect
    }

    fn remove_probe_marker(&mut self, _id: ProbeMarkerId) {
        self.state.borrow_mut().probes_live -= 1;
    }

    fn cursor_markers(&self) -> Vec<CursorMarker> {
        self.state.borrow().markers.clone()
    }

    fn create_overlay(&mut self) {
        self.state.borrow_mut().overlays_created += 1;
    }

    fn render_overlay(&mut self, style: &OverlayStyle) {
        let mut st = self.state.borrow_mut();
        st.overlay = Some(style.clone());
        st.renders += 1;
    }

    fn set_caret_tint(&mut self, css: &str) {
        self.state.borrow_mut().tint = css.to_string();
    }

    fn set_pointer_style(&mut self, css: &str) {
        let mut st = self.state.borrow_mut();
        st.pointer = css.to_string();
        st.pointer_applies += 1;
    }

    fn set_debug_badge(&mut self, visible: bool) {
        self.state.borrow_mut().badge = visible;
    }
}
