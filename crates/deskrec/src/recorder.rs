//! Single-writer action recorder
//!
//! All session mutation happens on one consumer thread that drains a bounded
//! signal queue. Hooks and pollers only push; they never touch the log.

use crate::action::{DesktopAction, MouseButton};
use crate::correlate;
use crate::error::{Error, ErrorCode, Result};
use crate::hooks::{
    ClipboardProbe, ControlAction, Modifiers, RawKey, RawSignal, SignalSources, WindowProbe,
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_TEXT_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_LAUNCH_WINDOW_MS: u64 = 3000;
pub const DEFAULT_CLIPBOARD_POLL_MS: u64 = 500;
pub const DEFAULT_WINDOW_POLL_MS: u64 = 1000;

/// Applications whose foreground time is bracketed with browser-interaction
/// markers; in-browser actions are recorded by a separate collaborator.
pub const BROWSERS: &[&str] = &[
    "Arc",
    "Google Chrome",
    "Safari",
    "Firefox",
    "Brave Browser",
    "Microsoft Edge",
    "Opera",
    "Vivaldi",
];

/// A chord the host reserves for session control. Matching key-downs are
/// consumed and never appended to the log.
#[derive(Debug, Clone)]
pub struct ReservedChord {
    pub mods: Modifiers,
    pub key: RawKey,
    pub action: ControlAction,
}

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Quiet period that ends a typed-text run.
    pub text_debounce_ms: u64,
    /// How far back a click may precede an app launch and still be its trigger.
    pub launch_window_ms: u64,
    pub clipboard_poll_ms: u64,
    pub window_poll_ms: u64,
    /// Consecutive poll failures before an observer is disabled for the session.
    pub observer_failure_limit: u32,
    /// Press/release travel beyond this many pixels becomes a drag, not a click.
    pub drag_threshold_px: i32,
    /// Record sampled mouse moves. Off by default; they add little semantic value.
    pub record_mouse_moves: bool,
    pub queue_capacity: usize,
    /// Clicks while this app is frontmost are dropped (the recorder's own UI).
    pub host_app: Option<String>,
    pub browsers: Vec<String>,
    pub reserved_chords: Vec<ReservedChord>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            text_debounce_ms: DEFAULT_TEXT_DEBOUNCE_MS,
            launch_window_ms: DEFAULT_LAUNCH_WINDOW_MS,
            clipboard_poll_ms: DEFAULT_CLIPBOARD_POLL_MS,
            window_poll_ms: DEFAULT_WINDOW_POLL_MS,
            observer_failure_limit: 3,
            drag_threshold_px: 5,
            record_mouse_moves: false,
            queue_capacity: 4096,
            host_app: None,
            browsers: BROWSERS.iter().map(|s| s.to_string()).collect(),
            reserved_chords: Vec::new(),
        }
    }
}

/// The finished, correlated log handed back by `stop()`.
#[derive(Debug, Clone, Default)]
pub struct FinishedRecording {
    pub name: String,
    pub actions: Vec<DesktopAction>,
    pub duration_ms: u64,
}

impl FinishedRecording {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

struct ActiveSession {
    name: String,
    started: Instant,
    tx: Sender<RawSignal>,
    stop: Arc<AtomicBool>,
    consumer: thread::JoinHandle<SessionState>,
    workers: Vec<thread::JoinHandle<()>>,
}

/// Recording engine. One instance owns at most one active session; a second
/// `start` while active is rejected, not queued.
pub struct ActionRecorder {
    config: RecorderConfig,
    session: Option<ActiveSession>,
}

impl ActionRecorder {
    pub fn new() -> Self {
        Self::with_config(RecorderConfig::default())
    }

    pub fn with_config(config: RecorderConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Sender for raw signals, for embedding custom sources. All signals go
    /// through the same queue as the built-in observers, so the single-writer
    /// invariant holds.
    pub fn raw_sender(&self) -> Option<Sender<RawSignal>> {
        self.session.as_ref().map(|s| s.tx.clone())
    }

    /// Start a session. Permissions are checked before any listener is
    /// attached; a missing hook backend degrades to window + clipboard
    /// observation, a missing permission fails outright.
    pub fn start(&mut self, name: &str, sources: SignalSources) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::session_active());
        }

        if let Some(hook) = &sources.hook {
            let perms = hook.check_permissions();
            if !perms.all_granted() {
                return Err(Error::permission_denied(
                    "accessibility or input-monitoring permission not granted",
                ));
            }
        }

        let (tx, rx) = bounded::<RawSignal>(self.config.queue_capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let started = Instant::now();
        let mut workers = Vec::new();

        let SignalSources {
            hook,
            window,
            clipboard,
        } = sources;

        match hook {
            Some(hook) => match hook.attach(tx.clone(), stop.clone()) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    warn!(error = %e, "input hook unavailable, degrading to window and clipboard observation");
                }
            },
            None => {
                info!("no input hook supplied, recording window and clipboard changes only");
            }
        }

        if let Some(probe) = window {
            workers.push(spawn_window_observer(
                probe,
                tx.clone(),
                stop.clone(),
                Duration::from_millis(self.config.window_poll_ms),
                self.config.observer_failure_limit,
            ));
        }
        if let Some(probe) = clipboard {
            workers.push(spawn_clipboard_observer(
                probe,
                tx.clone(),
                stop.clone(),
                Duration::from_millis(self.config.clipboard_poll_ms),
                self.config.observer_failure_limit,
            ));
        }

        let consumer = {
            let stop = stop.clone();
            let config = self.config.clone();
            thread::spawn(move || run_consumer(rx, stop, started, config))
        };

        info!(name, "recording started");
        self.session = Some(ActiveSession {
            name: name.to_string(),
            started,
            tx,
            stop,
            consumer,
            workers,
        });
        Ok(())
    }

    pub fn pause(&self) {
        self.send_control(ControlAction::Pause);
    }

    pub fn resume(&self) {
        self.send_control(ControlAction::Resume);
    }

    fn send_control(&self, action: ControlAction) {
        if let Some(session) = &self.session {
            let _ = session.tx.try_send(RawSignal::Control(action));
        }
    }

    /// Stop and finalize: flush the pending text buffer, detach all
    /// listeners, run launch correlation, return the finished log.
    /// With no active session this returns an empty result, not an error.
    pub fn stop(&mut self) -> Result<FinishedRecording> {
        let Some(session) = self.session.take() else {
            return Ok(FinishedRecording::default());
        };

        session.stop.store(true, Ordering::SeqCst);
        // Wake the consumer if it is parked in recv_timeout.
        let _ = session.tx.try_send(RawSignal::Control(ControlAction::Stop));

        let state = session
            .consumer
            .join()
            .map_err(|_| Error::new(ErrorCode::Unknown, "recorder consumer thread panicked"))?;
        for worker in session.workers {
            let _ = worker.join();
        }

        let mut actions = state.actions;
        correlate::tag_launch_clicks(&mut actions, self.config.launch_window_ms);

        let duration_ms = session.started.elapsed().as_millis() as u64;
        info!(
            name = %session.name,
            actions = actions.len(),
            duration_ms,
            "recording stopped"
        );
        Ok(FinishedRecording {
            name: session.name,
            actions,
            duration_ms,
        })
    }
}

impl Default for ActionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Observer threads
// ============================================================================

fn sleep_with_stop(total: Duration, stop: &AtomicBool) {
    let step = Duration::from_millis(25);
    let deadline = Instant::now() + total;
    while Instant::now() < deadline && !stop.load(Ordering::Relaxed) {
        thread::sleep(step.min(deadline.saturating_duration_since(Instant::now())));
    }
}

fn spawn_window_observer(
    mut probe: Box<dyn WindowProbe>,
    tx: Sender<RawSignal>,
    stop: Arc<AtomicBool>,
    poll: Duration,
    failure_limit: u32,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut failures = 0u32;
        while !stop.load(Ordering::Relaxed) {
            match probe.foreground() {
                Ok(fg) => {
                    failures = 0;
                    let _ = tx.try_send(RawSignal::Foreground {
                        app: fg.app,
                        window: fg.window,
                    });
                }
                Err(e) => {
                    failures += 1;
                    if failures >= failure_limit {
                        warn!(cause = %e, failures, "{}", Error::observer_disabled("window"));
                        return;
                    }
                }
            }
            sleep_with_stop(poll, &stop);
        }
    })
}

fn spawn_clipboard_observer(
    mut probe: Box<dyn ClipboardProbe>,
    tx: Sender<RawSignal>,
    stop: Arc<AtomicBool>,
    poll: Duration,
    failure_limit: u32,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut failures = 0u32;
        while !stop.load(Ordering::Relaxed) {
            match probe.read_text() {
                Ok(Some(text)) => {
                    failures = 0;
                    let _ = tx.try_send(RawSignal::Clipboard { text });
                }
                Ok(None) => failures = 0,
                Err(e) => {
                    failures += 1;
                    if failures >= failure_limit {
                        warn!(cause = %e, failures, "{}", Error::observer_disabled("clipboard"));
                        return;
                    }
                }
            }
            sleep_with_stop(poll, &stop);
        }
    })
}

// ============================================================================
// Consumer: the single writer
// ============================================================================

#[derive(Default)]
struct SessionState {
    actions: Vec<DesktopAction>,
    paused: bool,
    text: String,
    text_started_ms: u64,
    text_deadline: Option<Instant>,
    seen_apps: HashSet<String>,
    last_app: Option<String>,
    last_clipboard: Option<String>,
    clipboard_primed: bool,
    pending_down: Option<PendingClick>,
}

struct PendingClick {
    x: i32,
    y: i32,
    button: MouseButton,
    clicks: u8,
}

impl SessionState {
    /// Append one action. Any pending text run is flushed first so timestamps
    /// stay non-decreasing.
    fn push(&mut self, action: DesktopAction) {
        self.flush_text();
        debug_assert!(
            self.actions
                .last()
                .map(|a| a.timestamp() <= action.timestamp())
                .unwrap_or(true),
            "action log must stay time-ordered"
        );
        self.actions.push(action);
    }

    fn flush_text(&mut self) {
        self.text_deadline = None;
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let action = DesktopAction::KeyType {
            timestamp: self.text_started_ms,
            text,
        };
        debug_assert!(
            self.actions
                .last()
                .map(|a| a.timestamp() <= action.timestamp())
                .unwrap_or(true),
            "action log must stay time-ordered"
        );
        self.actions.push(action);
    }
}

fn run_consumer(
    rx: Receiver<RawSignal>,
    stop: Arc<AtomicBool>,
    started: Instant,
    config: RecorderConfig,
) -> SessionState {
    let mut state = SessionState::default();
    let tick = Duration::from_millis(25);

    loop {
        let timeout = match state.text_deadline {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(tick)
                .max(Duration::from_millis(1)),
            None => tick,
        };

        match rx.recv_timeout(timeout) {
            Ok(signal) => handle_signal(&mut state, signal, &stop, started, &config),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(deadline) = state.text_deadline {
            if !state.paused && Instant::now() >= deadline {
                state.flush_text();
            }
        }

        if stop.load(Ordering::Relaxed) {
            // Drain whatever the sources managed to queue before detaching.
            while let Ok(signal) = rx.try_recv() {
                handle_signal(&mut state, signal, &stop, started, &config);
            }
            break;
        }
    }

    state.flush_text();
    state
}

fn handle_signal(
    state: &mut SessionState,
    signal: RawSignal,
    stop: &AtomicBool,
    started: Instant,
    config: &RecorderConfig,
) {
    let now_ms = started.elapsed().as_millis() as u64;

    match signal {
        RawSignal::Control(action) => apply_control(state, action, stop),

        RawSignal::KeyDown { key, mods } => {
            if let Some(chord) = config
                .reserved_chords
                .iter()
                .find(|c| c.key == key && c.mods == mods)
            {
                // Host control chords are consumed, never logged.
                apply_control(state, chord.action, stop);
                return;
            }
            if state.paused {
                return;
            }
            if mods.any_chord_modifier() {
                if key.is_modifier() {
                    return;
                }
                let mut keys = mods.names();
                keys.push(key.name());
                state.push(DesktopAction::KeyCombo {
                    timestamp: now_ms,
                    keys,
                });
            } else if let Some(c) = key.literal_char() {
                if state.text.is_empty() {
                    state.text_started_ms = now_ms;
                }
                state.text.push(c);
                state.text_deadline =
                    Some(Instant::now() + Duration::from_millis(config.text_debounce_ms));
            } else if key.is_modifier() {
                // Bare modifier press; a chord is classified on the primary key.
            } else {
                state.push(DesktopAction::KeyCombo {
                    timestamp: now_ms,
                    keys: vec![key.name()],
                });
            }
        }

        RawSignal::KeyUp { .. } => {}

        RawSignal::MouseDown {
            x,
            y,
            button,
            clicks,
        } => {
            if state.paused {
                state.pending_down = None;
                return;
            }
            state.flush_text();
            state.pending_down = Some(PendingClick {
                x,
                y,
                button,
                clicks,
            });
        }

        RawSignal::MouseUp { x, y, button } => {
            if state.paused {
                state.pending_down = None;
                return;
            }
            let Some(down) = state.pending_down.take() else {
                return;
            };
            if down.button != button {
                return;
            }

            if let (Some(host), Some(front)) = (&config.host_app, &state.last_app) {
                if host == front {
                    debug!(x = down.x, y = down.y, "dropping press on the host application");
                    return;
                }
            }

            // Click and drag actions are stamped at release time; keystrokes
            // buffered while the button was held keep earlier timestamps.
            let travel = (x - down.x).abs().max((y - down.y).abs());
            if travel > config.drag_threshold_px {
                state.push(DesktopAction::MouseDrag {
                    timestamp: now_ms,
                    from_x: down.x,
                    from_y: down.y,
                    to_x: x,
                    to_y: y,
                    button,
                });
                return;
            }

            let action = match (button, down.clicks) {
                (MouseButton::Right, _) => DesktopAction::MouseRightClick {
                    timestamp: now_ms,
                    x: down.x,
                    y: down.y,
                },
                (MouseButton::Left, n) if n >= 2 => DesktopAction::MouseDoubleClick {
                    timestamp: now_ms,
                    x: down.x,
                    y: down.y,
                },
                _ => DesktopAction::MouseClick {
                    timestamp: now_ms,
                    x: down.x,
                    y: down.y,
                    button,
                    is_app_launch_click: false,
                    launched_app: None,
                },
            };
            state.push(action);
        }

        RawSignal::MouseMove { x, y } => {
            if state.paused || !config.record_mouse_moves {
                return;
            }
            state.push(DesktopAction::MouseMove {
                timestamp: now_ms,
                x,
                y,
            });
        }

        RawSignal::Foreground { app, window } => {
            handle_foreground(state, now_ms, app, window, config);
        }

        RawSignal::Clipboard { text } => {
            if !state.clipboard_primed {
                // First observation is the pre-session clipboard, not a copy.
                state.clipboard_primed = true;
                state.last_clipboard = Some(text);
                return;
            }
            if state.last_clipboard.as_deref() == Some(text.as_str()) {
                return;
            }
            state.last_clipboard = Some(text.clone());
            if state.paused {
                return;
            }
            state.push(DesktopAction::ClipboardCopy {
                timestamp: now_ms,
                text,
            });
        }
    }
}

fn apply_control(state: &mut SessionState, action: ControlAction, stop: &AtomicBool) {
    match action {
        ControlAction::Pause => {
            if !state.paused {
                state.flush_text();
                state.paused = true;
                info!("recording paused");
            }
        }
        ControlAction::Resume => {
            if state.paused {
                state.paused = false;
                info!("recording resumed");
            }
        }
        ControlAction::TogglePause => {
            let next = if state.paused {
                ControlAction::Resume
            } else {
                ControlAction::Pause
            };
            apply_control(state, next, stop);
        }
        ControlAction::Stop => {
            stop.store(true, Ordering::SeqCst);
        }
    }
}

fn handle_foreground(
    state: &mut SessionState,
    now_ms: u64,
    app: String,
    window: Option<String>,
    config: &RecorderConfig,
) {
    if state.last_app.as_deref() == Some(app.as_str()) {
        return;
    }

    let previous = state.last_app.replace(app.clone());
    let was_browser = previous
        .as_deref()
        .map(|a| is_browser(config, a))
        .unwrap_or(false);
    let now_browser = is_browser(config, &app);
    let first_time = state.seen_apps.insert(app.clone());

    if state.paused {
        return;
    }

    if was_browser {
        state.push(DesktopAction::BrowserInteractionEnd {
            timestamp: now_ms,
            app: previous.unwrap_or_default(),
        });
    }

    if first_time {
        state.push(DesktopAction::AppLaunch {
            timestamp: now_ms,
            app: app.clone(),
            window,
        });
    } else {
        state.push(DesktopAction::AppSwitch {
            timestamp: now_ms,
            app: app.clone(),
        });
    }

    if now_browser {
        state.push(DesktopAction::BrowserInteractionStart {
            timestamp: now_ms,
            app,
        });
    }
}

fn is_browser(config: &RecorderConfig, app: &str) -> bool {
    config.browsers.iter().any(|b| b == app)
}
