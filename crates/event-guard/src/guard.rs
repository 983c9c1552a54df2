//! Stateful event guard

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use violation_ledger::{Candidate, ViolationKind};

use crate::policy::is_blocked_key;
use crate::signal::{BrowserSignal, Target};
use crate::GuardConfig;

/// Action prevented without a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedAction {
    Copy,
    Cut,
    Paste { text_len: usize },
    DragStart,
    Drop,
}

/// Result of observing one signal
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Submit to the ledger
    Record(Candidate),
    /// Submit to the ledger and re-request fullscreen after the retry delay
    RecordAndRestoreFullscreen(Candidate),
    /// Prevented silently, never recorded
    SilentBlock(BlockedAction),
    /// Nothing to do
    Nothing,
}

/// Per-kind running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardCounters {
    pub tab_switches: u32,
    pub window_blurs: u32,
    pub fullscreen_exits: u32,
    pub blocked_keys: u32,
    pub context_menus: u32,
    pub navigation_attempts: u32,
    pub unload_attempts: u32,
    pub copy_attempts: u32,
    pub cut_attempts: u32,
    pub paste_attempts: u32,
    pub drag_attempts: u32,
    pub drop_attempts: u32,
}

/// Last known window state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardFlags {
    pub is_document_visible: bool,
    pub is_window_focused: bool,
    pub is_fullscreen: bool,
}

impl Default for GuardFlags {
    fn default() -> Self {
        Self {
            is_document_visible: true,
            is_window_focused: true,
            is_fullscreen: false,
        }
    }
}

/// Converts signals into candidates and silent blocks
#[derive(Debug, Clone)]
pub struct EventGuard {
    config: GuardConfig,
    counters: GuardCounters,
    flags: GuardFlags,
}

impl EventGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            counters: GuardCounters::default(),
            flags: GuardFlags::default(),
        }
    }

    /// Record that the session itself entered or left fullscreen
    pub fn set_fullscreen(&mut self, is_fullscreen: bool) {
        self.flags.is_fullscreen = is_fullscreen;
    }

    /// Process one signal. Each qualifying signal yields exactly one candidate.
    pub fn observe(&mut self, signal: &BrowserSignal) -> GuardOutcome {
        match signal {
            BrowserSignal::VisibilityChanged { hidden: true } => {
                self.flags.is_document_visible = false;
                self.counters.tab_switches += 1;
                info!("Tab switch detected ({})", self.counters.tab_switches);
                GuardOutcome::Record(
                    Candidate::new(ViolationKind::TabSwitch)
                        .with("count", self.counters.tab_switches),
                )
            }
            BrowserSignal::VisibilityChanged { hidden: false } => {
                self.flags.is_document_visible = true;
                debug!("Returned to exam tab");
                GuardOutcome::Nothing
            }

            BrowserSignal::WindowBlur => {
                self.flags.is_window_focused = false;
                self.counters.window_blurs += 1;
                info!("Window focus lost ({})", self.counters.window_blurs);
                GuardOutcome::Record(
                    Candidate::new(ViolationKind::WindowBlur)
                        .with("count", self.counters.window_blurs),
                )
            }
            BrowserSignal::WindowFocus => {
                self.flags.is_window_focused = true;
                GuardOutcome::Nothing
            }

            BrowserSignal::FullscreenChanged { is_fullscreen } => {
                let was_fullscreen = self.flags.is_fullscreen;
                self.flags.is_fullscreen = *is_fullscreen;

                // Only a true -> false edge is an exit
                if was_fullscreen && !is_fullscreen {
                    self.counters.fullscreen_exits += 1;
                    info!("Exited fullscreen ({})", self.counters.fullscreen_exits);
                    GuardOutcome::RecordAndRestoreFullscreen(
                        Candidate::new(ViolationKind::FullscreenExit)
                            .with("count", self.counters.fullscreen_exits),
                    )
                } else {
                    GuardOutcome::Nothing
                }
            }

            BrowserSignal::KeyDown(press) => {
                if !is_blocked_key(press) {
                    return GuardOutcome::Nothing;
                }
                self.counters.blocked_keys += 1;
                info!("Blocked key combination: {}", press.combo());
                GuardOutcome::Record(
                    Candidate::new(ViolationKind::BlockedKeyAttempt)
                        .with("key", press.key.clone())
                        .with("combo", press.combo())
                        .with("ctrl", press.ctrl)
                        .with("alt", press.alt)
                        .with("shift", press.shift)
                        .with("count", self.counters.blocked_keys),
                )
            }

            BrowserSignal::ContextMenu => {
                self.counters.context_menus += 1;
                GuardOutcome::Record(
                    Candidate::new(ViolationKind::ContextMenuAttempt)
                        .with("count", self.counters.context_menus),
                )
            }

            BrowserSignal::HistoryPop => {
                self.counters.navigation_attempts += 1;
                GuardOutcome::Record(
                    Candidate::new(ViolationKind::NavigationAttempt)
                        .with("count", self.counters.navigation_attempts),
                )
            }

            BrowserSignal::BeforeUnload => {
                self.counters.unload_attempts += 1;
                GuardOutcome::Record(
                    Candidate::new(ViolationKind::PageUnloadAttempt)
                        .with("count", self.counters.unload_attempts),
                )
            }

            BrowserSignal::Copy { target } => {
                self.silent_unless_editor(*target, BlockedAction::Copy)
            }
            BrowserSignal::Cut { target } => {
                self.silent_unless_editor(*target, BlockedAction::Cut)
            }
            BrowserSignal::DragStart { target } => {
                self.silent_unless_editor(*target, BlockedAction::DragStart)
            }

            BrowserSignal::Paste { target, text_len } => {
                let action = BlockedAction::Paste {
                    text_len: *text_len,
                };
                if *text_len > self.config.paste_limit_chars {
                    self.silent_block(action)
                } else {
                    self.silent_unless_editor(*target, action)
                }
            }

            BrowserSignal::Drop => self.silent_block(BlockedAction::Drop),
            BrowserSignal::DragOver => GuardOutcome::Nothing,
        }
    }

    fn silent_unless_editor(&mut self, target: Target, action: BlockedAction) -> GuardOutcome {
        if target == Target::SafeEditor {
            GuardOutcome::Nothing
        } else {
            self.silent_block(action)
        }
    }

    fn silent_block(&mut self, action: BlockedAction) -> GuardOutcome {
        let attempts = match action {
            BlockedAction::Copy => &mut self.counters.copy_attempts,
            BlockedAction::Cut => &mut self.counters.cut_attempts,
            BlockedAction::Paste { .. } => &mut self.counters.paste_attempts,
            BlockedAction::DragStart => &mut self.counters.drag_attempts,
            BlockedAction::Drop => &mut self.counters.drop_attempts,
        };
        *attempts += 1;
        debug!("{:?} blocked silently (attempt #{})", action, attempts);
        GuardOutcome::SilentBlock(action)
    }

    pub fn counters(&self) -> GuardCounters {
        self.counters
    }

    pub fn flags(&self) -> GuardFlags {
        self.flags
    }

    pub fn retry_delay_ms(&self) -> u64 {
        self.config.fullscreen_retry_delay_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{verdict, Verdict};
    use crate::signal::KeyPress;
    use proptest::prelude::*;

    fn guard() -> EventGuard {
        EventGuard::new(GuardConfig::default())
    }

    fn candidate(outcome: GuardOutcome) -> Candidate {
        match outcome {
            GuardOutcome::Record(c) | GuardOutcome::RecordAndRestoreFullscreen(c) => c,
            other => panic!("expected a candidate, got {:?}", other),
        }
    }

    #[test]
    fn test_tab_switch_counts_and_records() {
        let mut guard = guard();
        let first = candidate(guard.observe(&BrowserSignal::VisibilityChanged { hidden: true }));
        assert_eq!(first.kind, ViolationKind::TabSwitch);
        assert_eq!(first.metadata["count"], 1);
        assert!(!guard.flags().is_document_visible);

        assert_eq!(
            guard.observe(&BrowserSignal::VisibilityChanged { hidden: false }),
            GuardOutcome::Nothing
        );
        let second = candidate(guard.observe(&BrowserSignal::VisibilityChanged { hidden: true }));
        assert_eq!(second.metadata["count"], 2);
        assert_eq!(guard.counters().tab_switches, 2);
    }

    #[test]
    fn test_fullscreen_exit_only_on_falling_edge() {
        let mut guard = guard();
        let left = BrowserSignal::FullscreenChanged {
            is_fullscreen: false,
        };
        // Not yet fullscreen: leaving is not an exit
        assert_eq!(guard.observe(&left), GuardOutcome::Nothing);

        guard.set_fullscreen(true);
        let outcome = guard.observe(&left);
        assert!(matches!(outcome, GuardOutcome::RecordAndRestoreFullscreen(_)));
        assert_eq!(guard.counters().fullscreen_exits, 1);

        // Repeated "not fullscreen" notifications do not double-count
        assert_eq!(guard.observe(&left), GuardOutcome::Nothing);
    }

    #[test]
    fn test_blocked_key_metadata() {
        let mut guard = guard();
        let press: KeyPress = "Ctrl+Shift+I".parse().unwrap();
        let c = candidate(guard.observe(&BrowserSignal::KeyDown(press)));
        assert_eq!(c.kind, ViolationKind::BlockedKeyAttempt);
        assert_eq!(c.metadata["combo"], "Ctrl+Shift+I");
        assert_eq!(c.metadata["shift"], true);

        assert_eq!(
            guard.observe(&BrowserSignal::KeyDown(KeyPress::plain("x"))),
            GuardOutcome::Nothing
        );
    }

    #[test]
    fn test_clipboard_blocks_are_silent() {
        let mut guard = guard();
        let copy_outside = BrowserSignal::Copy {
            target: Target::Other,
        };
        let copy_inside = BrowserSignal::Copy {
            target: Target::SafeEditor,
        };
        assert_eq!(
            guard.observe(&copy_outside),
            GuardOutcome::SilentBlock(BlockedAction::Copy)
        );
        assert_eq!(guard.observe(&copy_inside), GuardOutcome::Nothing);
        assert_eq!(
            guard.observe(&BrowserSignal::Paste {
                target: Target::SafeEditor,
                text_len: 500
            }),
            GuardOutcome::SilentBlock(BlockedAction::Paste { text_len: 500 })
        );
        assert_eq!(
            guard.observe(&BrowserSignal::Drop),
            GuardOutcome::SilentBlock(BlockedAction::Drop)
        );

        let counters = guard.counters();
        assert_eq!(counters.copy_attempts, 1);
        assert_eq!(counters.paste_attempts, 1);
        assert_eq!(counters.drop_attempts, 1);
        assert_eq!(counters.tab_switches, 0);
    }

    #[test]
    fn test_navigation_and_unload() {
        let mut guard = guard();
        assert_eq!(
            candidate(guard.observe(&BrowserSignal::HistoryPop)).kind,
            ViolationKind::NavigationAttempt
        );
        assert_eq!(
            candidate(guard.observe(&BrowserSignal::BeforeUnload)).kind,
            ViolationKind::PageUnloadAttempt
        );
        assert_eq!(
            candidate(guard.observe(&BrowserSignal::ContextMenu)).kind,
            ViolationKind::ContextMenuAttempt
        );
    }

    #[test]
    fn test_small_paste_only_allowed_in_editor() {
        let mut guard = guard();
        assert_eq!(
            guard.observe(&BrowserSignal::Paste {
                target: Target::SafeEditor,
                text_len: 20
            }),
            GuardOutcome::Nothing
        );
        assert_eq!(
            guard.observe(&BrowserSignal::Paste {
                target: Target::Other,
                text_len: 20
            }),
            GuardOutcome::SilentBlock(BlockedAction::Paste { text_len: 20 })
        );
        assert_eq!(guard.counters().paste_attempts, 1);
    }

    proptest! {
        #[test]
        fn prop_guard_agrees_with_policy_on_paste(len in 0usize..1000, in_editor: bool) {
            let mut guard = guard();
            let target = if in_editor { Target::SafeEditor } else { Target::Other };
            let signal = BrowserSignal::Paste { target, text_len: len };

            let blocked = verdict(&signal, &GuardConfig::default()) == Verdict::Block;
            let silent = matches!(guard.observe(&signal), GuardOutcome::SilentBlock(_));
            prop_assert_eq!(silent, blocked);
            prop_assert_eq!(blocked, !in_editor || len > 100);
        }
    }
}
