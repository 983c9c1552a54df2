//! Browser signal model

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::GuardError;

/// Element an interaction originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Designated safe editing surface (the code editor)
    SafeEditor,
    /// Anything else, plain inputs included
    Other,
}

/// One keydown with its modifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyPress {
    /// Bare key, no modifiers
    pub fn plain(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        }
    }

    /// Canonical combo string, e.g. "Ctrl+Shift+I"
    pub fn combo(&self) -> String {
        let mut combo = String::new();
        if self.ctrl {
            combo.push_str("Ctrl+");
        }
        if self.alt {
            combo.push_str("Alt+");
        }
        if self.shift {
            combo.push_str("Shift+");
        }
        if self.meta {
            combo.push_str("Meta+");
        }
        combo.push_str(&self.key);
        combo
    }
}

impl FromStr for KeyPress {
    type Err = GuardError;

    /// Parse "Ctrl+Shift+I", "Alt+Tab", "F12"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = match parts.pop() {
            Some(k) if !k.is_empty() => k,
            _ => return Err(GuardError::EmptyKey),
        };

        let mut press = KeyPress::plain(key);
        for modifier in parts {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => press.ctrl = true,
                "alt" => press.alt = true,
                "shift" => press.shift = true,
                "meta" | "cmd" => press.meta = true,
                _ => return Err(GuardError::UnknownModifier(modifier.to_string())),
            }
        }
        Ok(press)
    }
}

/// Raw interaction signal delivered by the host page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserSignal {
    VisibilityChanged { hidden: bool },
    WindowBlur,
    WindowFocus,
    FullscreenChanged { is_fullscreen: bool },
    KeyDown(KeyPress),
    ContextMenu,
    /// Back/forward navigation (popstate)
    HistoryPop,
    BeforeUnload,
    Copy { target: Target },
    Cut { target: Target },
    Paste { target: Target, text_len: usize },
    DragStart { target: Target },
    Drop,
    DragOver,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_combo() {
        let press: KeyPress = "Ctrl+Shift+I".parse().unwrap();
        assert!(press.ctrl && press.shift && !press.alt);
        assert_eq!(press.key, "I");
        assert_eq!(press.combo(), "Ctrl+Shift+I");
    }

    #[test]
    fn test_parse_plain_and_errors() {
        assert_eq!("F12".parse::<KeyPress>().unwrap(), KeyPress::plain("F12"));
        assert_eq!("Ctrl+".parse::<KeyPress>(), Err(GuardError::EmptyKey));
        assert_eq!(
            "Hyper+X".parse::<KeyPress>(),
            Err(GuardError::UnknownModifier("Hyper".into()))
        );
    }

    #[test]
    fn test_signal_json_shape() {
        let signal: BrowserSignal =
            serde_json::from_str(r#"{"type":"paste","target":"safe_editor","text_len":250}"#)
                .unwrap();
        assert_eq!(
            signal,
            BrowserSignal::Paste {
                target: Target::SafeEditor,
                text_len: 250
            }
        );
    }
}
