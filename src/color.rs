use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid hex color regex"));

/// A CSS hex color in `#rgb` or `#rrggbb` form.
///
/// The original spelling is kept so values read back exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(s: &str) -> Option<Self> {
        if HEX_COLOR_RE.is_match(s) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Red, green and blue channels. Short forms are expanded (`#f0a` -> `#ff00aa`).
    pub fn rgb(&self) -> (u8, u8, u8) {
        let digits = &self.0[1..];
        let expanded: String = if digits.len() == 3 {
            digits.chars().flat_map(|c| [c, c]).collect()
        } else {
            digits.to_string()
        };
        match hex::decode(expanded) {
            Ok(bytes) if bytes.len() == 3 => (bytes[0], bytes[1], bytes[2]),
            _ => (0, 0, 0),
        }
    }

    /// Black or white, whichever reads better on top of this color.
    pub fn contrast(&self) -> &'static str {
        let (r, g, b) = self.rgb();
        let luminance = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0;
        if luminance > 0.5 {
            "#000000"
        } else {
            "#ffffff"
        }
    }

    pub fn label(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self("#ff0000".into())
    }
}

impl std::fmt::Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HexColor {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value).ok_or_else(|| anyhow::anyhow!("invalid hex color '{value}'"))
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}
