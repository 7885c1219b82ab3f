//! Wires preferences, storage, the change bus and the caret state machine
//! behind the command surface the host calls into.

use crate::adoption::{AdoptionOutcome, BackendAdoptionController};
use crate::change_bus::ChangeBus;
use crate::command::Command;
use crate::context::{ContextId, ContextTree, RenderSurface};
use crate::hotkey::{HotkeyBindings, Key, KeyPress};
use crate::locator::CaretLocator;
use crate::panel::PanelModel;
use crate::pointer::{caret_tint_rule, pointer_rule};
use crate::prefs::{PrefField, PrefObserver, PreferenceState, PreferenceStore};
use crate::scheduler::{FrameSource, PositionScheduler, RecomputeReason, TriggerEvent};
use crate::settings::Settings;
use crate::storage::{ActiveBackend, BackendKind, LocalBackend, RemoteSlot};
use crate::timer::{Interval, RetryPoll, RetryTask};
use crate::visibility::{
    blink, ensure_overlay, hide, repaint, OverlayPaint, RecomputeOutcome, VisibilityHoldPolicy,
};
use std::time::Instant;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything one running instance needs from its host.
pub struct EngineDeps {
    pub local: LocalBackend,
    pub remote_slot: RemoteSlot,
    pub bus: ChangeBus,
    /// `None` when the host has no frame callbacks; pending recomputes then
    /// run after `Settings::frame_fallback`.
    pub frames: Option<FrameSource>,
}

pub struct CaretEngine {
    settings: Settings,
    store: PreferenceStore,
    tree: ContextTree,
    locator: CaretLocator,
    scheduler: PositionScheduler,
    hold: VisibilityHoldPolicy,
    adoption: BackendAdoptionController,
    boot: RetryTask,
    blink: Interval,
    reassert: Interval,
    panel: PanelModel,
    hotkeys: HotkeyBindings,
}

impl CaretEngine {
    pub fn new(settings: Settings, deps: EngineDeps, now: Instant) -> Self {
        let mut store = PreferenceStore::new(ActiveBackend::new(deps.local), deps.bus);
        store.set(PrefField::DebugEnabled, settings.debug_logging);
        store.load();
        store.install_listeners();

        Self {
            locator: CaretLocator::new(settings.editor_url_prefix.clone()),
            scheduler: PositionScheduler::new(
                deps.frames
                    .unwrap_or(FrameSource::Timer(settings.frame_fallback())),
            ),
            hold: VisibilityHoldPolicy::new(settings.hold_window()),
            adoption: BackendAdoptionController::new(
                deps.remote_slot,
                settings.adoption_interval(),
                settings.adoption_max_attempts,
                now,
            ),
            boot: RetryTask::new(settings.boot_interval(), settings.boot_max_attempts, now),
            blink: Interval::new(settings.blink_interval(), now),
            reassert: Interval::new(settings.pointer_reassert(), now),
            panel: PanelModel::new(settings.saved_flash()),
            hotkeys: settings.hotkey_bindings(),
            tree: ContextTree::new(),
            store,
            settings,
        }
    }

    pub fn version(&self) -> &'static str {
        VERSION
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prefs(&self) -> &PreferenceState {
        self.store.state()
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn tree(&self) -> &ContextTree {
        &self.tree
    }

    pub fn panel(&self) -> &PanelModel {
        &self.panel
    }

    pub fn scheduler(&self) -> &PositionScheduler {
        &self.scheduler
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.store.backend().kind()
    }

    pub fn observe_prefs(&mut self, observer: PrefObserver) {
        self.store.observe(observer);
    }

    fn diag(&self) -> bool {
        self.store.state().debug_enabled
    }

    fn paint(&self) -> OverlayPaint {
        OverlayPaint {
            width: self.settings.caret_width_px,
            color: self.store.state().caret_color.to_string(),
        }
    }

    // ---- context lifecycle -------------------------------------------------

    /// Install the top-level surface and run the first recompute.
    pub fn attach_root(&mut self, surface: Box<dyn RenderSurface>, now: Instant) -> ContextId {
        let enabled = self.store.state().caret_enabled;
        let id = self.tree.set_root(surface, enabled);
        self.prepare_context(id);
        self.recompute(RecomputeReason::Init, now);
        id
    }

    /// Host discovered a new embedded surface under `parent`.
    pub fn attach_embed(
        &mut self,
        parent: ContextId,
        surface: Box<dyn RenderSurface>,
    ) -> Option<ContextId> {
        let enabled = self.store.state().caret_enabled;
        let id = self.tree.insert_child(parent, surface, enabled)?;
        self.prepare_context(id);
        if self.diag() {
            tracing::debug!(?id, ?parent, "embedded context attached");
        }
        Some(id)
    }

    /// Host tore a context down; its embeds go with it.
    pub fn detach_context(&mut self, id: ContextId) {
        self.tree.remove(id);
    }

    /// Move the canonical role (panel host, source of the persisted caret
    /// flag) to `id`.
    pub fn designate_canonical(&mut self, id: ContextId) -> bool {
        let moved = self.tree.designate_canonical(id);
        if moved && self.diag() {
            tracing::debug!(?id, "canonical context moved");
        }
        moved
    }

    fn prepare_context(&mut self, id: ContextId) {
        let paint = self.paint();
        let tint = caret_tint_rule(
            &self.store.state().caret_color,
            &self.settings.editor_root_selector,
        );
        let pointer = self.pointer_css();
        let debug = self.diag();
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        if !node.surface.has_root() {
            return;
        }
        ensure_overlay(node, &paint);
        node.surface.set_caret_tint(&tint);
        node.surface.set_pointer_style(&pointer);
        node.surface.set_debug_badge(debug);
    }

    // ---- position tracking -------------------------------------------------

    /// Forward a raw input event. Bursts coalesce into one pending recompute.
    pub fn on_trigger(&mut self, event: TriggerEvent, now: Instant) -> bool {
        if self.diag() {
            tracing::debug!(?event, "event -> update");
        }
        self.scheduler.schedule(RecomputeReason::Trigger(event), now)
    }

    /// A rendering opportunity from the host's frame callback.
    pub fn on_frame(&mut self, now: Instant) -> Option<RecomputeOutcome> {
        let reason = self.scheduler.take_for_frame()?;
        Some(self.recompute(reason, now))
    }

    pub fn recompute(&mut self, reason: RecomputeReason, now: Instant) -> RecomputeOutcome {
        let found = self.locator.locate(&mut self.tree);
        let paint = self.paint();
        let outcome = self.hold.apply(&mut self.tree, found.as_ref(), &paint, now);
        if self.diag() {
            match (&outcome, &found) {
                (RecomputeOutcome::Shown(id), Some(c)) => tracing::debug!(
                    ?reason,
                    context = ?id,
                    left = c.rect.left,
                    top = c.rect.top,
                    height = c.rect.height,
                    source = ?c.source,
                    "caret updated"
                ),
                (RecomputeOutcome::Held(kept), _) => {
                    tracing::debug!(?reason, kept = kept.len(), "caret held (no collapsed selection)")
                }
                _ => tracing::debug!(?reason, ?outcome, "caret hidden (no collapsed selection)"),
            }
        }
        outcome
    }

    /// Drive timers: adoption poll, peer sync, fallback frames, boot poll,
    /// blink and the pointer backstop.
    pub fn tick(&mut self, now: Instant) {
        match self.adoption.poll(&mut self.store, now) {
            AdoptionOutcome::Adopted { migrated, changed } => {
                if self.diag() {
                    tracing::debug!(migrated, changed, "storage backend adopted");
                }
                if changed {
                    self.refresh_all();
                }
            }
            AdoptionOutcome::Pending | AdoptionOutcome::AlreadyAdopted | AdoptionOutcome::GaveUp => {}
        }

        self.pump_sync();

        if let Some(reason) = self.scheduler.take_due(now) {
            self.recompute(reason, now);
        }

        if let RetryPoll::Attempt(n) = self.boot.poll(now) {
            self.recompute(RecomputeReason::Boot(n), now);
        }

        if self.blink.poll(now) {
            blink(&mut self.tree);
        }

        if self.reassert.poll(now) {
            self.apply_pointer_all();
        }

        self.panel.tick(now);
    }

    // ---- cross-instance sync -----------------------------------------------

    /// Apply everything peers sent through storage notifications and the bus.
    pub fn pump_sync(&mut self) -> Vec<PrefField> {
        let mut changed = Vec::new();
        for change in self.store.take_value_changes() {
            if let Some(field) = self.store.apply_value_change(&change) {
                if self.diag() {
                    tracing::debug!(?field, value = ?change.new_value, "pref <- storage");
                }
                changed.push(field);
            }
        }
        let messages = self.store.bus().drain();
        for msg in &messages {
            let fields = self.store.apply_message(msg);
            if self.diag() && !fields.is_empty() {
                tracing::debug!(?fields, "pref <- broadcast");
            }
            changed.extend(fields);
        }
        if !changed.is_empty() {
            self.refresh_fields(&changed);
        }
        changed
    }

    fn refresh_fields(&mut self, fields: &[PrefField]) {
        if fields.contains(&PrefField::CaretColor) {
            self.apply_caret_color_all();
        }
        if fields.iter().any(|f| {
            matches!(
                f,
                PrefField::PointerColor | PrefField::PointerSize | PrefField::PointerEnabled
            )
        }) {
            self.apply_pointer_all();
        }
        if fields.contains(&PrefField::CaretEnabled) {
            self.set_caret_enabled_all(self.store.state().caret_enabled);
        }
        self.panel.sync(self.store.state());
    }

    fn refresh_all(&mut self) {
        self.refresh_fields(&[
            PrefField::CaretColor,
            PrefField::PointerColor,
            PrefField::CaretEnabled,
        ]);
    }

    fn pointer_css(&self) -> String {
        pointer_rule(
            self.store.state(),
            self.settings.pointer_force_everywhere,
            &self.settings.editor_root_selector,
        )
    }

    fn apply_pointer_all(&mut self) {
        let css = self.pointer_css();
        for id in self.tree.walk() {
            if let Some(node) = self.tree.get_mut(id) {
                node.surface.set_pointer_style(&css);
            }
        }
    }

    fn apply_caret_color_all(&mut self) {
        let paint = self.paint();
        repaint(&mut self.tree, &paint);
        let tint = caret_tint_rule(
            &self.store.state().caret_color,
            &self.settings.editor_root_selector,
        );
        for id in self.tree.walk() {
            if let Some(node) = self.tree.get_mut(id) {
                node.surface.set_caret_tint(&tint);
            }
        }
    }

    fn set_caret_enabled_all(&mut self, enabled: bool) {
        for id in self.tree.walk() {
            let Some(node) = self.tree.get_mut(id) else {
                continue;
            };
            node.state.caret_enabled = enabled;
            if !enabled {
                hide(node);
            }
        }
    }

    /// Copy the canonical context's runtime flag into the persisted one.
    fn sync_canonical_flag(&mut self) {
        let canonical = self
            .tree
            .canonical()
            .and_then(|id| self.tree.get(id))
            .map(|node| node.state.caret_enabled);
        if let Some(enabled) = canonical {
            self.store.set(PrefField::CaretEnabled, enabled);
        }
    }

    fn persist(&mut self) {
        self.sync_canonical_flag();
        self.store.save();
    }

    // ---- command surface ---------------------------------------------------

    pub fn run(&mut self, command: Command, now: Instant) {
        match command {
            Command::OpenPanel => self.open_panel(),
            Command::ClosePanel => self.close_panel(),
            Command::TogglePanel => {
                if self.panel.is_open() {
                    self.close_panel()
                } else {
                    self.open_panel()
                }
            }
            Command::ToggleCaret => self.toggle_caret(),
            Command::TogglePointer => self.toggle_pointer(),
            Command::ResetDefaults => self.reset_defaults(),
            Command::ToggleDebug => self.toggle_debug(),
            Command::Save => self.save(now),
            Command::IncreasePointerSize => self.step_pointer_size(1),
            Command::DecreasePointerSize => self.step_pointer_size(-1),
        }
    }

    /// Route a key press through the hotkey table. Escape closes an open panel.
    pub fn on_key(&mut self, press: KeyPress, now: Instant) -> bool {
        if press.key == Key::Escape && self.panel.is_open() {
            self.close_panel();
            return true;
        }
        match self.hotkeys.resolve(&press) {
            Some(command) => {
                self.run(command, now);
                true
            }
            None => false,
        }
    }

    /// Opens only when a canonical (top-level) context hosts the panel.
    pub fn open_panel(&mut self) {
        if self.tree.canonical().is_none() {
            return;
        }
        self.panel.open(self.store.state());
    }

    pub fn close_panel(&mut self) {
        self.panel.close();
    }

    pub fn toggle_caret(&mut self) {
        let paint = self.paint();
        let debug = self.diag();
        for id in self.tree.walk() {
            let Some(node) = self.tree.get_mut(id) else {
                continue;
            };
            ensure_overlay(node, &paint);
            node.state.caret_enabled = !node.state.caret_enabled;
            if !node.state.caret_enabled {
                hide(node);
            }
            node.surface.set_debug_badge(debug);
        }
        self.persist();
        tracing::info!(enabled = self.store.state().caret_enabled, "caret overlay toggled");
    }

    pub fn toggle_pointer(&mut self) {
        let next = !self.store.state().pointer_enabled;
        self.store.set(PrefField::PointerEnabled, next);
        self.apply_pointer_all();
        self.persist();
        tracing::info!(enabled = next, "pointer toggled");
    }

    pub fn toggle_debug(&mut self) {
        let next = !self.diag();
        self.store.set(PrefField::DebugEnabled, next);
        for id in self.tree.walk() {
            if let Some(node) = self.tree.get_mut(id) {
                node.surface.set_debug_badge(next);
            }
        }
        tracing::info!(enabled = next, "debug toggled");
    }

    pub fn reset_defaults(&mut self) {
        self.store.reset_defaults();
        self.set_caret_enabled_all(true);
        self.apply_caret_color_all();
        self.apply_pointer_all();
        self.persist();
        self.panel.sync(self.store.state());
        let s = self.store.state();
        tracing::info!(
            caret = %s.caret_color,
            pointer = %s.pointer_color,
            size = s.pointer_size,
            "reset to defaults"
        );
    }

    /// Persist and broadcast the current preferences.
    pub fn save(&mut self, now: Instant) {
        self.persist();
        self.panel.flash_saved(now);
        tracing::info!("preferences saved");
    }

    fn step_pointer_size(&mut self, steps: i64) {
        self.store.step_pointer_size(steps);
        self.apply_pointer_all();
        self.persist();
        self.panel.sync(self.store.state());
    }

    // ---- live panel edits (persist immediately) ----------------------------

    pub fn edit_caret_color(&mut self, value: &str) -> bool {
        if !self.store.set(PrefField::CaretColor, value) {
            return false;
        }
        self.apply_caret_color_all();
        self.panel.sync(self.store.state());
        self.persist();
        true
    }

    pub fn edit_pointer_color(&mut self, value: &str) -> bool {
        if !self.store.set(PrefField::PointerColor, value) {
            return false;
        }
        self.apply_pointer_all();
        self.panel.sync(self.store.state());
        self.persist();
        true
    }

    pub fn edit_pointer_size(&mut self, value: i64) -> bool {
        if !self.store.set(PrefField::PointerSize, value) {
            return false;
        }
        self.apply_pointer_all();
        self.panel.sync(self.store.state());
        self.persist();
        true
    }
}
