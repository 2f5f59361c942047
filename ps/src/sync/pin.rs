//! Pinned popout: refocus state machine and its driver task
//!
//! A pinned popout reclaims input focus when it loses it. Focus-loss signals
//! are debounced, attempts are throttled, and a periodic liveness check
//! catches losses that raised no signal. The controller only asks for a
//! refocus; it never holds or blocks input in any other window.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Refocus timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinTiming {
    /// Delay between a focus-loss signal and the attempt (at most 100ms)
    pub debounce: Duration,
    /// No new attempt while the previous one settles
    pub throttle: Duration,
    /// Minimum gap between two attempts
    pub min_gap: Duration,
    /// Period of the liveness check
    pub liveness: Duration,
}

impl Default for PinTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
            throttle: Duration::from_millis(100),
            min_gap: Duration::from_millis(50),
            liveness: Duration::from_millis(500),
        }
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    Idle,
    /// A focus-loss signal arrived; attempt at `due`
    Debouncing { due: Instant },
    /// An attempt was made; further attempts wait until `until`
    Reasserting { until: Instant },
}

/// What the host must do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinAction {
    Refocus,
}

/// Signals that the window may have lost focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinTrigger {
    Blur,
    Hidden,
    PointerLeft,
    OpenerActivity,
}

/// Focus state sampled by the liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFocusState {
    pub visible: bool,
    pub focused: bool,
}

impl WindowFocusState {
    pub fn is_active(&self) -> bool {
        self.visible && self.focused
    }
}

/// Explicit `Idle -> Debouncing -> Reasserting` machine driven by the host clock
#[derive(Debug, Clone)]
pub struct PinController {
    timing: PinTiming,
    pinned: bool,
    state: PinState,
    last_attempt: Option<Instant>,
    last_liveness: Option<Instant>,
}

impl PinController {
    pub fn new(timing: PinTiming, pinned: bool) -> Self {
        Self {
            timing,
            pinned,
            state: PinState::Idle,
            last_attempt: None,
            last_liveness: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn state(&self) -> PinState {
        self.state
    }

    pub fn timing(&self) -> PinTiming {
        self.timing
    }

    /// Pin or unpin; pinning refocuses right away
    pub fn set_pinned(&mut self, pinned: bool, now: Instant) -> Option<PinAction> {
        if pinned == self.pinned {
            return None;
        }
        info!(pinned, "PinController::set_pinned");
        self.pinned = pinned;
        self.state = PinState::Idle;
        self.last_liveness = None;
        if pinned { self.refocus_now(now) } else { None }
    }

    /// A focus-loss signal arrived
    pub fn trigger(&mut self, reason: PinTrigger, now: Instant) {
        if !self.pinned {
            return;
        }
        let settled = match self.state {
            PinState::Idle => true,
            PinState::Reasserting { until } => now >= until,
            PinState::Debouncing { .. } => false,
        };
        if settled {
            trace!(?reason, "PinController::trigger: debouncing");
            self.state = PinState::Debouncing {
                due: now + self.timing.debounce,
            };
        } else {
            trace!(?reason, state = ?self.state, "PinController::trigger: already pending");
        }
    }

    /// Attempt a refocus now, subject to the throttle and the minimum gap
    pub fn refocus_now(&mut self, now: Instant) -> Option<PinAction> {
        if !self.pinned {
            return None;
        }
        if let PinState::Reasserting { until } = self.state
            && now < until
        {
            trace!("PinController::refocus_now: throttled");
            return None;
        }
        if let Some(last) = self.last_attempt
            && now.duration_since(last) < self.timing.min_gap
        {
            trace!("PinController::refocus_now: too soon");
            return None;
        }
        debug!("PinController::refocus_now: refocus");
        self.last_attempt = Some(now);
        self.state = PinState::Reasserting {
            until: now + self.timing.throttle,
        };
        Some(PinAction::Refocus)
    }

    /// Advance timers; `focus` is the window state right now
    pub fn tick(&mut self, now: Instant, focus: WindowFocusState) -> Option<PinAction> {
        if !self.pinned {
            self.state = PinState::Idle;
            return None;
        }
        match self.state {
            PinState::Debouncing { due } if now >= due => {
                self.state = PinState::Idle;
                return self.refocus_now(now);
            }
            PinState::Debouncing { .. } => return None,
            PinState::Reasserting { until } if now >= until => self.state = PinState::Idle,
            PinState::Reasserting { .. } => return None,
            PinState::Idle => {}
        }

        let due = self.last_liveness.is_none_or(|at| now.duration_since(at) >= self.timing.liveness);
        if !due {
            return None;
        }
        self.last_liveness = Some(now);
        if focus.is_active() {
            None
        } else {
            debug!(?focus, "PinController::tick: liveness check found window inactive");
            self.refocus_now(now)
        }
    }

    /// When [`PinController::tick`] next has something to do
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if !self.pinned {
            return None;
        }
        let deadline = match self.state {
            PinState::Debouncing { due } => due,
            PinState::Reasserting { until } => until,
            PinState::Idle => match self.last_liveness {
                Some(at) => at + self.timing.liveness,
                None => now,
            },
        };
        Some(deadline.max(now))
    }
}

/// Window the driver refocuses
pub trait WindowFocus: Send + 'static {
    fn state(&self) -> WindowFocusState;

    fn refocus(&mut self);
}

/// Messages to a running [`PinDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCommand {
    SetPinned(bool),
    Trigger(PinTrigger),
    Shutdown,
}

/// Runs a [`PinController`] on a tokio task until shut down or dropped
pub struct PinDriver {
    tx: mpsc::UnboundedSender<PinCommand>,
    handle: Option<JoinHandle<()>>,
}

impl PinDriver {
    /// Spawn the driver task; must be called within a tokio runtime
    pub fn spawn<W: WindowFocus>(controller: PinController, window: W) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_driver(controller, window, rx));
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Queue a command; `false` when the task is gone
    pub fn send(&self, command: PinCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(mut self) {
        let _ = self.tx.send(PinCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "PinDriver::shutdown: driver task failed");
        }
    }
}

impl Drop for PinDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_driver<W: WindowFocus>(mut controller: PinController, mut window: W, mut rx: mpsc::UnboundedReceiver<PinCommand>) {
    debug!(pinned = controller.is_pinned(), "run_driver: starting");
    if controller.refocus_now(Instant::now()).is_some() {
        window.refocus();
    }

    loop {
        let deadline = controller.next_deadline(Instant::now());
        let sleep = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            command = rx.recv() => {
                let now = Instant::now();
                let action = match command {
                    Some(PinCommand::SetPinned(pinned)) => controller.set_pinned(pinned, now),
                    Some(PinCommand::Trigger(reason)) => {
                        controller.trigger(reason, now);
                        None
                    }
                    Some(PinCommand::Shutdown) | None => break,
                };
                if action.is_some() {
                    window.refocus();
                }
            }
            _ = sleep => {
                if controller.tick(Instant::now(), window.state()).is_some() {
                    window.refocus();
                }
            }
        }
    }
    debug!("run_driver: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    const ACTIVE: WindowFocusState = WindowFocusState {
        visible: true,
        focused: true,
    };
    const UNFOCUSED: WindowFocusState = WindowFocusState {
        visible: true,
        focused: false,
    };
    const HIDDEN: WindowFocusState = WindowFocusState {
        visible: false,
        focused: true,
    };

    #[test]
    fn test_unpinned_never_refocuses() {
        let now = Instant::now();
        let mut pin = PinController::new(PinTiming::default(), false);
        pin.trigger(PinTrigger::Blur, now);
        assert_eq!(pin.state(), PinState::Idle);
        assert_eq!(pin.tick(now + ms(1000), HIDDEN), None);
        assert_eq!(pin.next_deadline(now), None);
    }

    #[test]
    fn test_pinning_refocuses_immediately() {
        let now = Instant::now();
        let mut pin = PinController::new(PinTiming::default(), false);
        assert_eq!(pin.set_pinned(true, now), Some(PinAction::Refocus));
        assert_eq!(pin.state(), PinState::Reasserting { until: now + ms(100) });
        assert_eq!(pin.set_pinned(true, now), None);
    }

    #[test]
    fn test_trigger_debounces_then_refocuses() {
        let now = Instant::now();
        let mut pin = PinController::new(PinTiming::default(), true);
        pin.tick(now, ACTIVE);

        pin.trigger(PinTrigger::Blur, now);
        pin.trigger(PinTrigger::PointerLeft, now + ms(10));
        assert_eq!(pin.state(), PinState::Debouncing { due: now + ms(50) });
        assert_eq!(pin.next_deadline(now), Some(now + ms(50)));

        assert_eq!(pin.tick(now + ms(40), ACTIVE), None);
        assert_eq!(pin.tick(now + ms(50), ACTIVE), Some(PinAction::Refocus));
        assert!(matches!(pin.state(), PinState::Reasserting { .. }));
    }

    #[test]
    fn test_throttle_blocks_attempts() {
        let now = Instant::now();
        let mut pin = PinController::new(PinTiming::default(), true);
        assert_eq!(pin.refocus_now(now), Some(PinAction::Refocus));
        assert_eq!(pin.refocus_now(now + ms(60)), None);

        pin.trigger(PinTrigger::OpenerActivity, now + ms(60));
        assert!(matches!(pin.state(), PinState::Reasserting { .. }));

        assert_eq!(pin.tick(now + ms(100), ACTIVE), None);
        assert_eq!(pin.state(), PinState::Idle);
        assert_eq!(pin.refocus_now(now + ms(110)), Some(PinAction::Refocus));
    }

    #[test]
    fn test_min_gap_applies_without_throttle() {
        let now = Instant::now();
        let timing = PinTiming {
            throttle: Duration::ZERO,
            ..PinTiming::default()
        };
        let mut pin = PinController::new(timing, true);
        assert_eq!(pin.refocus_now(now), Some(PinAction::Refocus));
        assert_eq!(pin.refocus_now(now + ms(30)), None);
        assert_eq!(pin.refocus_now(now + ms(50)), Some(PinAction::Refocus));
    }

    #[test]
    fn test_liveness_check() {
        let now = Instant::now();
        let mut pin = PinController::new(PinTiming::default(), true);

        assert_eq!(pin.tick(now, ACTIVE), None);
        assert_eq!(pin.next_deadline(now), Some(now + ms(500)));
        assert_eq!(pin.tick(now + ms(200), HIDDEN), None);
        assert_eq!(pin.tick(now + ms(500), HIDDEN), Some(PinAction::Refocus));
        assert_eq!(pin.tick(now + ms(700), UNFOCUSED), None);
        assert_eq!(pin.tick(now + ms(1000), UNFOCUSED), Some(PinAction::Refocus));
        assert_eq!(pin.tick(now + ms(1500), ACTIVE), None);
    }

    #[test]
    fn test_unpin_resets_state() {
        let now = Instant::now();
        let mut pin = PinController::new(PinTiming::default(), true);
        pin.trigger(PinTrigger::Hidden, now);
        assert_eq!(pin.set_pinned(false, now), None);
        assert_eq!(pin.state(), PinState::Idle);
        assert!(!pin.is_pinned());
    }

    #[derive(Clone)]
    struct FakeWindow {
        focused: Arc<Mutex<bool>>,
        refocused: Arc<Mutex<u32>>,
    }

    impl WindowFocus for FakeWindow {
        fn state(&self) -> WindowFocusState {
            WindowFocusState {
                visible: true,
                focused: *self.focused.lock().unwrap(),
            }
        }

        fn refocus(&mut self) {
            *self.refocused.lock().unwrap() += 1;
        }
    }

    #[tokio::test]
    async fn test_driver_refocuses_until_unpinned() {
        let window = FakeWindow {
            focused: Arc::new(Mutex::new(false)),
            refocused: Arc::new(Mutex::new(0)),
        };
        let count = window.refocused.clone();
        let timing = PinTiming {
            debounce: ms(5),
            throttle: ms(5),
            min_gap: ms(5),
            liveness: ms(20),
        };

        let driver = PinDriver::spawn(PinController::new(timing, true), window);
        tokio::time::sleep(ms(150)).await;
        assert!(*count.lock().unwrap() >= 2);

        assert!(driver.send(PinCommand::SetPinned(false)));
        tokio::time::sleep(ms(30)).await;
        let settled = *count.lock().unwrap();
        tokio::time::sleep(ms(100)).await;
        assert_eq!(*count.lock().unwrap(), settled);

        driver.shutdown().await;
    }

    #[tokio::test]
    async fn test_driver_debounces_trigger() {
        let window = FakeWindow {
            focused: Arc::new(Mutex::new(true)),
            refocused: Arc::new(Mutex::new(0)),
        };
        let count = window.refocused.clone();
        let timing = PinTiming {
            liveness: Duration::from_secs(60),
            ..PinTiming::default()
        };

        let driver = PinDriver::spawn(PinController::new(timing, false), window);
        assert!(driver.send(PinCommand::SetPinned(true)));
        tokio::time::sleep(ms(20)).await;
        assert_eq!(*count.lock().unwrap(), 1);

        tokio::time::sleep(ms(150)).await;
        assert!(driver.send(PinCommand::Trigger(PinTrigger::Blur)));
        tokio::time::sleep(ms(200)).await;
        assert_eq!(*count.lock().unwrap(), 2);

        driver.shutdown().await;
    }
}
