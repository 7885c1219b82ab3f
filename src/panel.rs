//! View model behind the host's control panel widget.

use crate::prefs::PreferenceState;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelView {
    pub caret_color: String,
    pub caret_label: String,
    pub caret_label_color: String,
    pub pointer_color: String,
    pub pointer_label: String,
    pub pointer_label_color: String,
    pub pointer_size: u32,
    pub pointer_size_label: String,
}

impl PanelView {
    pub fn from_prefs(prefs: &PreferenceState) -> Self {
        Self {
            caret_color: prefs.caret_color.to_string(),
            caret_label: prefs.caret_color.label(),
            caret_label_color: prefs.caret_color.contrast().to_string(),
            pointer_color: prefs.pointer_color.to_string(),
            pointer_label: prefs.pointer_color.label(),
            pointer_label_color: prefs.pointer_color.contrast().to_string(),
            pointer_size: prefs.pointer_size,
            pointer_size_label: format!("{}px", prefs.pointer_size),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanelModel {
    open: bool,
    view: PanelView,
    flash_for: Duration,
    flash_until: Option<Instant>,
}

impl PanelModel {
    pub fn new(flash_for: Duration) -> Self {
        Self {
            open: false,
            view: PanelView::default(),
            flash_for,
            flash_until: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn view(&self) -> &PanelView {
        &self.view
    }

    pub fn open(&mut self, prefs: &PreferenceState) {
        self.open = true;
        self.view = PanelView::from_prefs(prefs);
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Refresh the mirrored fields; ignored while closed.
    pub fn sync(&mut self, prefs: &PreferenceState) {
        if self.open {
            self.view = PanelView::from_prefs(prefs);
        }
    }

    pub fn flash_saved(&mut self, now: Instant) {
        self.flash_until = Some(now + self.flash_for);
    }

    pub fn is_flashing(&self, now: Instant) -> bool {
        self.flash_until.map_or(false, |until| now < until)
    }

    pub fn tick(&mut self, now: Instant) {
        if self.flash_until.map_or(false, |until| now >= until) {
            self.flash_until = None;
        }
    }
}
