//! Style rules injected into every context: the custom pointer and the native
//! caret tint.

use crate::color::HexColor;
use crate::prefs::{clamp_pointer_size, PreferenceState};

/// Hotspot of the arrow, in pixels from the top-left corner.
const HOTSPOT: (u32, u32) = (2, 2);

/// Arrow cursor as a percent-encoded SVG data URL.
pub fn cursor_data_url(size: u32, color: &HexColor) -> String {
    let w = clamp_pointer_size(size as i64);
    let h = (w as f64 * 1.5).round() as u32;
    let svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{w}' height='{h}' viewBox='0 0 32 48'>\
         <path d='M1,1 L1,35 L10,28 L14,46 L20,44 L16,26 L31,26 Z' fill='{color}' stroke='white' stroke-width='2'/>\
         </svg>"
    );
    format!("data:image/svg+xml;charset=utf-8,{}", urlencoding::encode(&svg))
}

/// Pointer rule for the current preferences. Empty when the pointer is off.
///
/// Unless `everywhere` is set, editable text keeps its native I-beam.
pub fn pointer_rule(prefs: &PreferenceState, everywhere: bool, editor_root: &str) -> String {
    if !prefs.pointer_enabled {
        return String::new();
    }
    let url = cursor_data_url(prefs.pointer_size, &prefs.pointer_color);
    let cursor = format!("cursor: url(\"{url}\") {} {}, auto !important;", HOTSPOT.0, HOTSPOT.1);
    if everywhere {
        return format!("* {{ {cursor} }}");
    }
    format!(
        "html, body, {root}, {root} *:not([contenteditable=\"true\"]) {{\n  {cursor}\n}}\n\
         [contenteditable=\"true\"], textarea, input[type=\"text\"], input:not([type]) {{\n  cursor: auto !important;\n}}",
        root = editor_root
    )
}

/// `caret-color` rule tinting the native caret of editable elements.
pub fn caret_tint_rule(color: &HexColor, editor_root: &str) -> String {
    format!(
        "textarea, input, [contenteditable=\"true\"], [role=\"textbox\"], {editor_root} * {{ caret-color: {color} !important; }}"
    )
}
