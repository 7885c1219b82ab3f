use crate::hotkey::{default_hotkey_entries, HotkeyBindings, HotkeyEntry};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Engine tuning and host integration settings.
///
/// These are read once at startup from a JSON file. User preferences
/// (colors, pointer size, enabled flags) live in [`crate::prefs`] instead.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Grace period during which a shown caret survives a failed lookup.
    #[serde(default = "default_hold_window_ms")]
    pub hold_window_ms: u64,
    #[serde(default = "default_blink_interval_ms")]
    pub blink_interval_ms: u64,
    #[serde(default = "default_caret_width_px")]
    pub caret_width_px: u32,
    /// Delay used for a pending recompute when the host has no frame callbacks.
    #[serde(default = "default_frame_fallback_ms")]
    pub frame_fallback_ms: u64,
    #[serde(default = "default_adoption_interval_ms")]
    pub adoption_interval_ms: u64,
    #[serde(default = "default_adoption_max_attempts")]
    pub adoption_max_attempts: u32,
    #[serde(default = "default_boot_interval_ms")]
    pub boot_interval_ms: u64,
    #[serde(default = "default_boot_max_attempts")]
    pub boot_max_attempts: u32,
    /// Period of the pointer style backstop.
    #[serde(default = "default_pointer_reassert_ms")]
    pub pointer_reassert_ms: u64,
    #[serde(default = "default_saved_flash_ms")]
    pub saved_flash_ms: u64,
    #[serde(default = "default_true")]
    pub hotkeys_enabled: bool,
    /// Show the custom pointer over text too instead of keeping the I-beam.
    #[serde(default)]
    pub pointer_force_everywhere: bool,
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Contexts whose URL starts with this prefix are searched first.
    #[serde(default = "default_editor_url_prefix")]
    pub editor_url_prefix: String,
    /// Selector of the editor's root element, used in injected style rules.
    #[serde(default = "default_editor_root_selector")]
    pub editor_root_selector: String,
    #[serde(default = "default_hotkey_entries")]
    pub hotkeys: Vec<HotkeyEntry>,
}

fn default_hold_window_ms() -> u64 {
    650
}

fn default_blink_interval_ms() -> u64 {
    500
}

fn default_caret_width_px() -> u32 {
    1
}

fn default_frame_fallback_ms() -> u64 {
    16
}

fn default_adoption_interval_ms() -> u64 {
    50
}

fn default_adoption_max_attempts() -> u32 {
    200
}

fn default_boot_interval_ms() -> u64 {
    250
}

fn default_boot_max_attempts() -> u32 {
    60
}

fn default_pointer_reassert_ms() -> u64 {
    5000
}

fn default_saved_flash_ms() -> u64 {
    350
}

fn default_true() -> bool {
    true
}

fn default_editor_url_prefix() -> String {
    "https://docs.google.com/".into()
}

fn default_editor_root_selector() -> String {
    ".kix-appview-editor".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hold_window_ms: default_hold_window_ms(),
            blink_interval_ms: default_blink_interval_ms(),
            caret_width_px: default_caret_width_px(),
            frame_fallback_ms: default_frame_fallback_ms(),
            adoption_interval_ms: default_adoption_interval_ms(),
            adoption_max_attempts: default_adoption_max_attempts(),
            boot_interval_ms: default_boot_interval_ms(),
            boot_max_attempts: default_boot_max_attempts(),
            pointer_reassert_ms: default_pointer_reassert_ms(),
            saved_flash_ms: default_saved_flash_ms(),
            hotkeys_enabled: true,
            pointer_force_everywhere: false,
            debug_logging: false,
            log_file: None,
            editor_url_prefix: default_editor_url_prefix(),
            editor_root_selector: default_editor_root_selector(),
            hotkeys: default_hotkey_entries(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// `<config dir>/caret_overlay/settings.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("caret_overlay").join("settings.json"))
    }

    pub fn hold_window(&self) -> Duration {
        Duration::from_millis(self.hold_window_ms)
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms.max(1))
    }

    pub fn frame_fallback(&self) -> Duration {
        Duration::from_millis(self.frame_fallback_ms)
    }

    pub fn adoption_interval(&self) -> Duration {
        Duration::from_millis(self.adoption_interval_ms.max(1))
    }

    pub fn boot_interval(&self) -> Duration {
        Duration::from_millis(self.boot_interval_ms.max(1))
    }

    pub fn pointer_reassert(&self) -> Duration {
        Duration::from_millis(self.pointer_reassert_ms.max(1))
    }

    pub fn saved_flash(&self) -> Duration {
        Duration::from_millis(self.saved_flash_ms)
    }

    /// Parse the configured hotkeys. Invalid strings are logged and skipped.
    pub fn hotkey_bindings(&self) -> HotkeyBindings {
        HotkeyBindings::new(self.hotkeys_enabled, &self.hotkeys)
    }
}
