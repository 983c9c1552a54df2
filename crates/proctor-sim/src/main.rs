//! Proctoring Simulator - Main Entry Point
//!
//! Usage: `proctor-sim [config.toml]`. Set `PROCTOR_LOG_JSON=1` for JSON logs.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use event_guard::{BrowserSignal, KeyPress, Target};
use media_capture::synthetic::{FramePattern, SyntheticDevices};
use proctoring_session::host::SyntheticHost;
use proctoring_session::{ProctoringConfig, ProctoringSession, SessionCallbacks};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use violation_ledger::report::{
    terminate_path, violations_path, TerminationReport, ViolationReport,
};
use violation_ledger::{TerminationNotice, Violation, WarningNotice};

const ATTEMPT_ID: &str = "sim-attempt-1";

/// Initialize logging
fn init_logging(json: bool) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("Failed to set tracing subscriber")
}

/// One scripted test-taker action
enum Step {
    Signal(BrowserSignal),
    ExitFullscreen,
    Camera(FramePattern),
    Noise(f32),
}

fn script() -> Vec<Step> {
    vec![
        // Silently blocked, never recorded
        Step::Signal(BrowserSignal::Copy {
            target: Target::Other,
        }),
        Step::Signal(BrowserSignal::Paste {
            target: Target::SafeEditor,
            text_len: 2_000,
        }),
        Step::Signal(BrowserSignal::VisibilityChanged { hidden: true }),
        Step::Signal(BrowserSignal::VisibilityChanged { hidden: false }),
        Step::Signal(BrowserSignal::KeyDown(KeyPress {
            key: "I".into(),
            ctrl: true,
            alt: false,
            shift: true,
            meta: false,
        })),
        Step::ExitFullscreen,
        Step::Camera(FramePattern::Blank),
        Step::Noise(1.0),
    ]
}

/// Prints what a host page would send to the exam backend
struct ConsoleCallbacks {
    terminated: Notify,
    termination: Mutex<Option<TerminationNotice>>,
}

fn print_json<T: serde::Serialize>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}\n{}", label, json),
        Err(e) => warn!("Could not serialize {}: {}", label, e),
    }
}

impl SessionCallbacks for ConsoleCallbacks {
    fn on_violation(&self, violation: &Violation) {
        let session_id = violation
            .metadata
            .get("session_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let report = ViolationReport {
            attempt_id: ATTEMPT_ID.to_string(),
            session_id: session_id.to_string(),
            violation: violation.clone(),
        };
        print_json(&format!("POST {}", violations_path(ATTEMPT_ID)), &report);
    }

    fn on_warning(&self, notice: &WarningNotice) {
        print_json("WARNING", notice);
    }

    fn on_termination(&self, notice: &TerminationNotice) {
        if let Ok(mut slot) = self.termination.lock() {
            *slot = Some(notice.clone());
        }
        self.terminated.notify_one();
    }

    fn on_presence_missing(&self, consecutive: u32) {
        info!("No presence ({} consecutive)", consecutive);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(std::env::var("PROCTOR_LOG_JSON").is_ok_and(|v| v == "1"))?;

    info!("=== Proctoring Simulator v{} ===", env!("CARGO_PKG_VERSION"));

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = ProctoringConfig::load(path.as_deref()).context("Invalid configuration")?;
    let gap = Duration::from_millis(config.ledger.cooldown_ms + 500);

    let devices = SyntheticDevices::new();
    let host = Arc::new(SyntheticHost::new());
    let callbacks = Arc::new(ConsoleCallbacks {
        terminated: Notify::new(),
        termination: Mutex::new(None),
    });

    let mut session = ProctoringSession::new(config.clone(), host.clone(), callbacks.clone())
        .initialize(ATTEMPT_ID, &devices)
        .await
        .context("Failed to start proctoring session")?;
    info!("Session {} running", session.session_id());

    for step in script() {
        match step {
            Step::Signal(signal) => {
                let verdict = host.emit(signal);
                info!("Host verdict: {:?}", verdict);
            }
            Step::ExitFullscreen => {
                host.user_exits_fullscreen();
            }
            Step::Camera(pattern) => devices.camera().set_pattern(pattern),
            Step::Noise(amplitude) => devices.microphone().set_amplitude(amplitude),
        }

        if tokio::time::timeout(gap, callbacks.terminated.notified())
            .await
            .is_ok()
        {
            break;
        }
    }

    // Let the camera and microphone detectors finish the job if the script did not
    if session.status().is_active && callbacks.termination.lock().map_or(true, |t| t.is_none()) {
        let settle = Duration::from_millis(config.presence.interval_ms * 4);
        let _ = tokio::time::timeout(settle, callbacks.terminated.notified()).await;
    }

    let notice = callbacks
        .termination
        .lock()
        .ok()
        .and_then(|slot| slot.clone());
    match notice {
        Some(notice) => {
            let report = TerminationReport::from_notice(ATTEMPT_ID, session.session_id(), &notice);
            print_json(&format!("POST {}", terminate_path(ATTEMPT_ID)), &report);
        }
        None => warn!("Script finished without termination"),
    }

    session.cleanup().await;
    print_json("FINAL STATUS", &session.status());

    Ok(())
}
