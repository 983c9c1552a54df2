//! Synchronous blocking policy

use serde::{Deserialize, Serialize};

use crate::signal::{BrowserSignal, KeyPress, Target};
use crate::GuardConfig;

/// Confirmation text shown on an unload attempt
pub const UNLOAD_PROMPT: &str = "Leaving the exam will count as a violation. Are you sure?";

/// What the host must do with the native event, right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Let the event through
    Allow,
    /// Prevent default and stop propagation, no visible feedback
    Block,
    /// Prevent default; the guard will also record a violation
    BlockAndRecord,
    /// Ask the browser to show the leave-page confirmation
    Prompt,
}

/// Keys blocked regardless of modifiers
const BLOCKED_KEYS: &[&str] = &["F12", "F11", "PrintScreen", "Meta"];

/// Devtools, view-source, new tab/window, task switching
pub fn is_blocked_key(press: &KeyPress) -> bool {
    let key = press.key.as_str();
    let is = |k: &str| key.eq_ignore_ascii_case(k);

    if BLOCKED_KEYS.iter().any(|k| is(k)) {
        return true;
    }

    (press.ctrl && press.shift && (is("I") || is("J") || is("C")))
        || (press.ctrl && (is("u") || is("t") || is("n") || is("w")))
        || (press.alt && (is("Tab") || is("F4")))
}

/// Signals that move window state or can become a ledger candidate.
/// Everything else is either ignored or silently blocked.
pub fn is_tracked(signal: &BrowserSignal) -> bool {
    match signal {
        BrowserSignal::VisibilityChanged { .. }
        | BrowserSignal::WindowBlur
        | BrowserSignal::WindowFocus
        | BrowserSignal::FullscreenChanged { .. }
        | BrowserSignal::ContextMenu
        | BrowserSignal::HistoryPop
        | BrowserSignal::BeforeUnload => true,
        BrowserSignal::KeyDown(press) => is_blocked_key(press),
        _ => false,
    }
}

fn outside_editor(target: Target) -> bool {
    target != Target::SafeEditor
}

/// Pure blocking decision for one signal
pub fn verdict(signal: &BrowserSignal, config: &GuardConfig) -> Verdict {
    match signal {
        BrowserSignal::VisibilityChanged { .. }
        | BrowserSignal::WindowBlur
        | BrowserSignal::WindowFocus
        | BrowserSignal::FullscreenChanged { .. } => Verdict::Allow,

        BrowserSignal::KeyDown(press) if is_blocked_key(press) => Verdict::BlockAndRecord,
        BrowserSignal::KeyDown(_) => Verdict::Allow,

        BrowserSignal::ContextMenu | BrowserSignal::HistoryPop => Verdict::BlockAndRecord,
        BrowserSignal::BeforeUnload => Verdict::Prompt,

        BrowserSignal::Copy { target }
        | BrowserSignal::Cut { target }
        | BrowserSignal::DragStart { target } => {
            if outside_editor(*target) {
                Verdict::Block
            } else {
                Verdict::Allow
            }
        }

        // Size limit applies inside the editor too
        BrowserSignal::Paste { target, text_len } => {
            if outside_editor(*target) || *text_len > config.paste_limit_chars {
                Verdict::Block
            } else {
                Verdict::Allow
            }
        }

        BrowserSignal::Drop | BrowserSignal::DragOver => Verdict::Block,
    }
}
