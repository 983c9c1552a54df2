//! Proctoring Session Implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use audio_monitor::{AudioConfig, AudioLevelMonitor, AudioStep, LoudnessStreak};
use chrono::Utc;
use event_guard::{BrowserSignal, EventGuard, GuardOutcome};
use media_capture::{
    AudioStream, CaptureError, FrameSampler, MediaDevices, MediaKind, StreamGuard, VideoStream,
};
use presence::{classify, AbsenceStep, AbsenceTracker, PresenceConfig};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use violation_ledger::{Candidate, Ledger, LedgerDecision, ViolationKind};

use crate::callbacks::SessionCallbacks;
use crate::host::{ExamHost, SignalSink};
use crate::settings::ProctoringConfig;
use crate::status::{GuardState, MonitoringStatus, SessionStatus};
use crate::SessionError;

/// Depth of the detector -> consumer queue
const EVENT_QUEUE: usize = 256;

/// How long cleanup waits for a task before aborting it
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Everything producers push at the consumer
#[derive(Debug)]
pub(crate) enum SessionEvent {
    Signal(BrowserSignal),
    Presence { present: bool },
    /// `None` when the tick produced no reading
    Audio { level: Option<f32> },
}

fn media_access_error(device: MediaKind, err: CaptureError) -> SessionError {
    error!("Failed to acquire {}: {}", device, err);
    SessionError::MediaAccessError {
        device,
        reason: err.to_string(),
    }
}

/// Session factory: policy, host page, and callbacks for one exam attempt
pub struct ProctoringSession {
    config: ProctoringConfig,
    host: Arc<dyn ExamHost>,
    callbacks: Arc<dyn SessionCallbacks>,
}

impl ProctoringSession {
    pub fn new(
        config: ProctoringConfig,
        host: Arc<dyn ExamHost>,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> Self {
        Self {
            config,
            host,
            callbacks,
        }
    }

    /// Acquire media, attach listeners, enter fullscreen, and start monitoring.
    ///
    /// Camera and microphone are both required. If either is refused, whatever
    /// was already opened is released before the error is returned.
    pub async fn initialize(
        self,
        attempt_id: &str,
        devices: &dyn MediaDevices,
    ) -> Result<SessionHandle, SessionError> {
        let Self {
            config,
            host,
            callbacks,
        } = self;
        config.validate()?;

        let session_id = format!("coding-exam-{}-{}", attempt_id, Utc::now().timestamp_millis());
        info!("Initializing proctoring session {}", session_id);

        let camera_stream = devices
            .open_camera(&config.camera)
            .await
            .map_err(|e| media_access_error(MediaKind::Camera, e))?;
        let camera = StreamGuard::new(camera_stream.clone());

        // `camera` drops (and stops) on every early return below
        let mic_stream = devices
            .open_microphone(&config.microphone)
            .await
            .map_err(|e| media_access_error(MediaKind::Microphone, e))?;
        let microphone = StreamGuard::new(mic_stream.clone());

        let monitor = AudioLevelMonitor::new(mic_stream, &config.audio)?;
        let sampler = FrameSampler::new(
            camera_stream,
            Duration::from_millis(config.presence.sample_timeout_ms),
        );

        let active = Arc::new(AtomicBool::new(true));
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        host.set_selection_locked(true);
        host.trap_navigation();
        let sink = SignalSink::new(event_tx.clone(), config.guard.clone(), active.clone());
        host.attach_listeners(sink.clone());

        let mut guard = EventGuard::new(config.guard.clone());
        match host.request_fullscreen().await {
            Ok(()) => guard.set_fullscreen(host.is_fullscreen()),
            Err(e) => warn!("Fullscreen request failed, continuing: {}", e),
        }

        let ledger = Ledger::new(config.ledger.clone(), &session_id, attempt_id);
        let initial = SessionStatus {
            session_id: session_id.clone(),
            attempt_id: attempt_id.to_string(),
            is_active: true,
            ledger_state: ledger.state(),
            violation_count: 0,
            max_violations: ledger.max_violations(),
            remaining_warnings: ledger.remaining_warnings(),
            violations: Vec::new(),
            last_violation_timestamp: None,
            dropped_candidates: 0,
            monitoring: MonitoringStatus {
                camera: true,
                microphone: true,
                face_detection: true,
                audio_monitoring: true,
            },
            state: GuardState {
                flags: guard.flags(),
                ..Default::default()
            },
        };
        let status = Arc::new(watch::channel(initial).0);
        let status_rx = status.subscribe();

        let core = SessionCore {
            ledger,
            absence: AbsenceTracker::new(config.presence.max_no_face_count),
            loudness: LoudnessStreak::new(&config.audio),
            guard,
            presence_interval_ms: config.presence.interval_ms,
            fullscreen_retry: None,
            host: host.clone(),
            callbacks,
            status: status.clone(),
            active: active.clone(),
        };

        let tasks = vec![
            tokio::spawn(presence_loop(
                sampler,
                config.presence.clone(),
                event_tx.clone(),
                shutdown_rx.clone(),
            )),
            tokio::spawn(audio_loop(
                monitor,
                config.audio.clone(),
                event_tx,
                shutdown_rx.clone(),
            )),
            tokio::spawn(core.run(event_rx, shutdown_rx)),
        ];

        info!("Proctoring session {} active", session_id);
        Ok(SessionHandle {
            session_id,
            camera,
            microphone,
            host,
            sink,
            active,
            shutdown: shutdown_tx,
            status,
            status_rx,
            tasks,
            cleaned: false,
        })
    }
}

/// Live session. Dropping it without [`SessionHandle::cleanup`] still
/// stops the streams, timers, and listeners.
pub struct SessionHandle {
    session_id: String,
    camera: StreamGuard<dyn VideoStream>,
    microphone: StreamGuard<dyn AudioStream>,
    host: Arc<dyn ExamHost>,
    sink: SignalSink,
    active: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    status: Arc<watch::Sender<SessionStatus>>,
    status_rx: watch::Receiver<SessionStatus>,
    tasks: Vec<JoinHandle<()>>,
    cleaned: bool,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Latest snapshot; no side effects
    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// Signal entry point for host listeners
    pub fn sink(&self) -> SignalSink {
        self.sink.clone()
    }

    /// Stop timers and tasks, release both streams, detach listeners,
    /// exit fullscreen, and unlock selection. Safe to call repeatedly.
    pub async fn cleanup(&mut self) {
        if self.cleaned {
            debug!("Session {} already cleaned up", self.session_id);
            return;
        }
        self.cleaned = true;
        info!("Cleaning up proctoring session {}", self.session_id);

        self.active.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);

        for mut task in self.tasks.drain(..) {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("Session task did not stop in time, aborting");
                task.abort();
            }
        }

        self.release();
    }

    fn release(&mut self) {
        self.camera.release();
        self.microphone.release();
        self.host.detach_listeners();
        if self.host.is_fullscreen() {
            self.host.exit_fullscreen();
        }
        self.host.set_selection_locked(false);

        self.status.send_modify(|status| {
            status.is_active = false;
            status.monitoring = MonitoringStatus::default();
        });
        info!("Proctoring session {} stopped", self.session_id);
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        warn!("Session {} dropped without cleanup", self.session_id);
        self.cleaned = true;
        self.active.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
        for task in &self.tasks {
            task.abort();
        }
        self.release();
    }
}

/// Consumer-side session state. The only owner of the ledger.
struct SessionCore {
    ledger: Ledger,
    absence: AbsenceTracker,
    loudness: LoudnessStreak,
    guard: EventGuard,
    presence_interval_ms: u64,
    /// Pending fullscreen re-entry after an exit
    fullscreen_retry: Option<Instant>,
    host: Arc<dyn ExamHost>,
    callbacks: Arc<dyn SessionCallbacks>,
    status: Arc<watch::Sender<SessionStatus>>,
    active: Arc<AtomicBool>,
}

impl SessionCore {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        debug!("Session consumer started");

        loop {
            let retry_at = self.fullscreen_retry;
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)),
                    if retry_at.is_some() =>
                {
                    self.fullscreen_retry = None;
                    self.restore_fullscreen().await;
                }
            }
            self.publish();
        }

        self.ledger.deactivate();
        self.publish();
        debug!("Session consumer stopped");
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Signal(signal) => match self.guard.observe(&signal) {
                GuardOutcome::Record(candidate) => self.submit(candidate),
                GuardOutcome::RecordAndRestoreFullscreen(candidate) => {
                    self.submit(candidate);
                    let delay = Duration::from_millis(self.guard.retry_delay_ms());
                    self.fullscreen_retry = Some(Instant::now() + delay);
                }
                GuardOutcome::SilentBlock(_) | GuardOutcome::Nothing => {}
            },
            SessionEvent::Presence { present } => self.on_presence(present),
            SessionEvent::Audio { level } => self.on_audio(level),
        }
    }

    fn on_presence(&mut self, present: bool) {
        match self.absence.observe(present) {
            AbsenceStep::Present => self.callbacks.on_presence_detected(),
            AbsenceStep::Missing { consecutive } => {
                self.callbacks.on_presence_missing(consecutive)
            }
            AbsenceStep::Violation { consecutive } => {
                self.callbacks.on_presence_missing(consecutive);
                let duration_secs = consecutive as u64 * self.presence_interval_ms / 1000;
                self.submit(
                    Candidate::new(ViolationKind::NoFaceDetected)
                        .with("consecutive_failures", consecutive)
                        .with("duration_secs", duration_secs),
                );
            }
        }
    }

    fn on_audio(&mut self, level: Option<f32>) {
        // A failed read counts as a quiet tick
        let Some(level) = level else {
            self.loudness.observe(0.0);
            return;
        };

        self.callbacks.on_audio_level(level);
        if let AudioStep::Violation { level, streak } = self.loudness.observe(level) {
            self.submit(
                Candidate::new(ViolationKind::SuspiciousAudioDetected)
                    .with("audio_level", level)
                    .with("streak", streak),
            );
        }
    }

    fn submit(&mut self, candidate: Candidate) {
        match self.ledger.record(candidate) {
            Ok(LedgerDecision::Warning(notice)) => {
                self.callbacks.on_warning(&notice);
                self.callbacks.on_violation(&notice.violation);
            }
            Ok(LedgerDecision::Termination { violation, notice }) => {
                warn!("Terminating exam: {}", notice.reason);
                self.callbacks.on_termination(&notice);
                self.callbacks.on_violation(&violation);
            }
            Ok(LedgerDecision::Dropped { .. }) | Ok(LedgerDecision::Ignored) => {}
            Err(e) => error!("Ledger rejected candidate: {}", e),
        }
    }

    async fn restore_fullscreen(&mut self) {
        if !self.active.load(Ordering::SeqCst) || self.guard.flags().is_fullscreen {
            return;
        }
        debug!("Re-requesting fullscreen");
        match self.host.request_fullscreen().await {
            Ok(()) => self.guard.set_fullscreen(self.host.is_fullscreen()),
            Err(e) => warn!("Fullscreen re-entry failed: {}", e),
        }
    }

    fn publish(&self) {
        let ledger = &self.ledger;
        let guard = &self.guard;
        let consecutive_no_face = self.absence.consecutive_misses();
        let audio_streak = self.loudness.streak();
        let is_active = self.active.load(Ordering::SeqCst);

        self.status.send_modify(|status| {
            status.is_active = is_active;
            status.ledger_state = ledger.state();
            status.violation_count = ledger.violation_count();
            status.remaining_warnings = ledger.remaining_warnings();
            if status.violations.len() != ledger.violations().len() {
                status.violations = ledger.violations().to_vec();
            }
            status.last_violation_timestamp = ledger.last_violation_at();
            status.dropped_candidates = ledger.dropped_count();
            status.state = GuardState {
                flags: guard.flags(),
                counters: guard.counters(),
                consecutive_no_face,
                audio_streak,
            };
        });
    }
}

/// Presence producer: one frame per tick, classified off the consumer
async fn presence_loop(
    mut sampler: FrameSampler,
    config: PresenceConfig,
    events: mpsc::Sender<SessionEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = Duration::from_millis(config.interval_ms);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Presence detection started ({}ms)", config.interval_ms);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let present = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            present = check_presence(&mut sampler, &config) => present,
        };

        if events.send(SessionEvent::Presence { present }).await.is_err() {
            break;
        }
    }

    info!("Presence detection stopped after {} frames", sampler.grabbed());
}

/// Grab failures and unusable frames both count as absent
async fn check_presence(sampler: &mut FrameSampler, config: &PresenceConfig) -> bool {
    match sampler.sample().await {
        Ok(frame) => match classify(&frame, config) {
            Ok(verdict) => verdict.present,
            Err(e) => {
                warn!("Unusable frame: {}", e);
                false
            }
        },
        Err(e) => {
            warn!("Frame grab failed: {}", e);
            false
        }
    }
}

/// Audio producer: one loudness reading per tick
async fn audio_loop(
    mut monitor: AudioLevelMonitor,
    config: AudioConfig,
    events: mpsc::Sender<SessionEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = Duration::from_millis(config.interval_ms);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Audio monitoring started ({}ms)", config.interval_ms);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let reading = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            reading = tokio::time::timeout(period, monitor.sample()) => reading,
        };

        let level = match reading {
            Ok(Ok(level)) => Some(level),
            Ok(Err(e)) => {
                warn!("Audio read failed: {}", e);
                None
            }
            Err(_) => {
                warn!("Audio read timed out");
                None
            }
        };

        if events.send(SessionEvent::Audio { level }).await.is_err() {
            break;
        }
    }

    monitor.close();
    info!("Audio monitoring stopped after {} readings", monitor.readings());
}
