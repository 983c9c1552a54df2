//! Hosting page abstraction
//!
//! The exam page owns the DOM. It forwards raw interaction signals through a
//! [`SignalSink`], applies the returned [`Verdict`] to the native event on
//! the spot, and performs fullscreen and selection changes on request.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use event_guard::{is_tracked, verdict, BrowserSignal, GuardConfig, Verdict};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::session::SessionEvent;
use crate::SessionError;

/// Document-level capabilities the session needs from its host page
#[async_trait]
pub trait ExamHost: Send + Sync {
    /// Enter fullscreen. May be refused by the user agent.
    async fn request_fullscreen(&self) -> Result<(), SessionError>;

    /// Leave fullscreen, fire-and-forget
    fn exit_fullscreen(&self);

    fn is_fullscreen(&self) -> bool;

    /// Disable or restore text selection on the document body
    fn set_selection_locked(&self, locked: bool);

    /// Start forwarding signals to `sink`
    fn attach_listeners(&self, sink: SignalSink);

    /// Stop forwarding signals. Must be idempotent.
    fn detach_listeners(&self);

    /// Push a history entry so back/forward arrives as a signal
    fn trap_navigation(&self);
}

/// Entry point for host-delivered browser signals.
///
/// `dispatch` is synchronous: the verdict comes from a pure policy so the
/// host can call `preventDefault` before returning from its handler.
#[derive(Clone)]
pub struct SignalSink {
    events: mpsc::Sender<SessionEvent>,
    policy: GuardConfig,
    active: Arc<AtomicBool>,
}

impl SignalSink {
    pub(crate) fn new(
        events: mpsc::Sender<SessionEvent>,
        policy: GuardConfig,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            events,
            policy,
            active,
        }
    }

    /// Classify the signal for the host and queue it for the session.
    ///
    /// With the queue full, tracked signals wait for room on a spawned
    /// task; silent-block signals are dropped.
    pub fn dispatch(&self, signal: BrowserSignal) -> Verdict {
        if !self.active.load(Ordering::SeqCst) {
            return Verdict::Allow;
        }

        let decision = verdict(&signal, &self.policy);
        let tracked = is_tracked(&signal);
        match self.events.try_send(SessionEvent::Signal(signal)) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) if tracked => self.queue_overflow(event),
            Err(TrySendError::Full(event)) => warn!("Event queue full, dropping {:?}", event),
            Err(TrySendError::Closed(_)) => debug!("Signal after session shutdown"),
        }
        decision
    }

    fn queue_overflow(&self, event: SessionEvent) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("Event queue full outside a runtime, dropping {:?}", event);
            return;
        };

        let events = self.events.clone();
        runtime.spawn(async move {
            if events.send(event).await.is_err() {
                debug!("Session closed before overflow signal was queued");
            }
        });
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// In-process host for tests and simulation
#[derive(Default)]
pub struct SyntheticHost {
    fullscreen: AtomicBool,
    deny_fullscreen: AtomicBool,
    selection_locked: AtomicBool,
    navigation_trapped: AtomicBool,
    fullscreen_requests: AtomicU32,
    sink: Mutex<Option<SignalSink>>,
}

impl SyntheticHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every fullscreen request from now on
    pub fn deny_fullscreen(&self) {
        self.deny_fullscreen.store(true, Ordering::SeqCst);
    }

    /// Deliver a signal the way page listeners would.
    /// `None` when no listeners are attached.
    pub fn emit(&self, signal: BrowserSignal) -> Option<Verdict> {
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        sink.map(|sink| sink.dispatch(signal))
    }

    /// User presses Escape while in fullscreen
    pub fn user_exits_fullscreen(&self) -> Option<Verdict> {
        self.fullscreen.store(false, Ordering::SeqCst);
        self.emit(BrowserSignal::FullscreenChanged {
            is_fullscreen: false,
        })
    }

    pub fn listeners_attached(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn selection_locked(&self) -> bool {
        self.selection_locked.load(Ordering::SeqCst)
    }

    pub fn navigation_trapped(&self) -> bool {
        self.navigation_trapped.load(Ordering::SeqCst)
    }

    /// Fullscreen requests received, granted or not
    pub fn fullscreen_requests(&self) -> u32 {
        self.fullscreen_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExamHost for SyntheticHost {
    async fn request_fullscreen(&self) -> Result<(), SessionError> {
        self.fullscreen_requests.fetch_add(1, Ordering::SeqCst);
        if self.deny_fullscreen.load(Ordering::SeqCst) {
            return Err(SessionError::Host("fullscreen request denied".into()));
        }

        if !self.fullscreen.swap(true, Ordering::SeqCst) {
            self.emit(BrowserSignal::FullscreenChanged {
                is_fullscreen: true,
            });
        }
        Ok(())
    }

    fn exit_fullscreen(&self) {
        if self.fullscreen.swap(false, Ordering::SeqCst) {
            self.emit(BrowserSignal::FullscreenChanged {
                is_fullscreen: false,
            });
        }
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    fn set_selection_locked(&self, locked: bool) {
        self.selection_locked.store(locked, Ordering::SeqCst);
    }

    fn attach_listeners(&self, sink: SignalSink) {
        debug!("Synthetic host listeners attached");
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn detach_listeners(&self) {
        if self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!("Synthetic host listeners detached");
        }
    }

    fn trap_navigation(&self) {
        self.navigation_trapped.store(true, Ordering::SeqCst);
    }
}
