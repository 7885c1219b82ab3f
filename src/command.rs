use serde::{Deserialize, Serialize};

/// Commands exposed to the host's menu and hotkey layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    OpenPanel,
    ClosePanel,
    TogglePanel,
    ToggleCaret,
    TogglePointer,
    ResetDefaults,
    ToggleDebug,
    Save,
    IncreasePointerSize,
    DecreasePointerSize,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenPanel => "open_panel",
            Command::ClosePanel => "close_panel",
            Command::TogglePanel => "toggle_panel",
            Command::ToggleCaret => "toggle_caret",
            Command::TogglePointer => "toggle_pointer",
            Command::ResetDefaults => "reset_defaults",
            Command::ToggleDebug => "toggle_debug",
            Command::Save => "save",
            Command::IncreasePointerSize => "increase_pointer_size",
            Command::DecreasePointerSize => "decrease_pointer_size",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let cmd = match name.trim() {
            "open_panel" => Command::OpenPanel,
            "close_panel" => Command::ClosePanel,
            "toggle_panel" => Command::TogglePanel,
            "toggle_caret" => Command::ToggleCaret,
            "toggle_pointer" => Command::TogglePointer,
            "reset_defaults" => Command::ResetDefaults,
            "toggle_debug" => Command::ToggleDebug,
            "save" => Command::Save,
            "increase_pointer_size" => Command::IncreasePointerSize,
            "decrease_pointer_size" => Command::DecreasePointerSize,
            _ => return None,
        };
        Some(cmd)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
