//! Sequential replay with reconstructed timing
//!
//! Best-effort by design: one failed injection is logged and counted, never
//! fatal, because a stalled sequence is worse than a partially-correct one.

use crate::action::{DesktopAction, RecordingFile};
use crate::driver::{AppLifecycle, InputInjector, ProgressOverlay};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pause after a launch or focus so the target app can settle.
pub const DEFAULT_SETTLE_MS: u64 = 1500;

#[derive(Debug, Default, Clone)]
pub struct ReplayStats {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// True when the external stop signal ended the run early.
    pub stopped: bool,
    pub elapsed_ms: u64,
}

/// Replays one recording at a time. A second `play` while one is running is
/// rejected, not queued.
pub struct ReplayEngine {
    speed: f64,
    settle_ms: u64,
    active: AtomicBool,
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self {
            speed: 1.0,
            settle_ms: DEFAULT_SETTLE_MS,
            active: AtomicBool::new(false),
        }
    }

    /// Playback speed factor; 2.0 halves every reconstructed delay.
    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = if speed > 0.0 { speed } else { 1.0 };
        self
    }

    pub fn settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    /// Execute every action in order. `stop` is checked between actions.
    pub fn play(
        &self,
        file: &RecordingFile,
        injector: &mut dyn InputInjector,
        apps: &mut dyn AppLifecycle,
        overlay: &mut dyn ProgressOverlay,
        stop: &AtomicBool,
    ) -> Result<ReplayStats> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(Error::replay_failed("a replay is already running"));
        }
        let _guard = ActiveGuard(&self.active);

        if !injector.initialize() {
            return Err(Error::replay_failed("input injector failed to initialize"));
        }
        injector.reset_rate_limits();
        overlay.create();

        info!(
            script = %file.metadata.script_name,
            actions = file.actions.len(),
            speed = self.speed,
            "replay started"
        );

        let started = Instant::now();
        let total = file.actions.len();
        let mut stats = ReplayStats::default();
        let mut last_ts = 0u64;

        for (i, action) in file.actions.iter().enumerate() {
            if stop.load(Ordering::Relaxed) {
                stats.stopped = true;
                info!(step = i, "replay stopped by external signal");
                break;
            }

            let gap = action.timestamp().saturating_sub(last_ts);
            last_ts = action.timestamp();
            let wait = Duration::from_millis((gap as f64 / self.speed) as u64);
            if !wait.is_zero() {
                thread::sleep(wait);
            }

            overlay.update_progress(i + 1, total, &action.describe());

            if let DesktopAction::MouseClick {
                is_app_launch_click: true,
                ..
            } = action
            {
                // The corresponding appLaunch supersedes this click.
                stats.skipped += 1;
                continue;
            }

            match self.dispatch(action, injector, apps, overlay) {
                Ok(()) => stats.executed += 1,
                Err(e) => {
                    warn!(step = i + 1, action = %action.describe(), error = %e, "replay action failed, continuing");
                    stats.failed += 1;
                }
            }
        }

        overlay.close();
        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            executed = stats.executed,
            skipped = stats.skipped,
            failed = stats.failed,
            elapsed_ms = stats.elapsed_ms,
            "replay finished"
        );
        Ok(stats)
    }

    fn dispatch(
        &self,
        action: &DesktopAction,
        injector: &mut dyn InputInjector,
        apps: &mut dyn AppLifecycle,
        overlay: &mut dyn ProgressOverlay,
    ) -> Result<()> {
        match action {
            DesktopAction::MouseClick { x, y, button, .. } => {
                overlay.show_mouse_indicator(*x, *y);
                injector.move_mouse(*x, *y)?;
                injector.click_mouse(*x, *y, *button)
            }
            DesktopAction::MouseDoubleClick { x, y, .. } => {
                overlay.show_mouse_indicator(*x, *y);
                injector.move_mouse(*x, *y)?;
                injector.double_click_mouse(*x, *y)
            }
            DesktopAction::MouseRightClick { x, y, .. } => {
                overlay.show_mouse_indicator(*x, *y);
                injector.move_mouse(*x, *y)?;
                injector.right_click_mouse(*x, *y)
            }
            DesktopAction::MouseDrag {
                from_x,
                from_y,
                to_x,
                to_y,
                ..
            } => {
                // The injection contract has no drag primitive; approximate
                // with a move to each endpoint.
                injector.move_mouse(*from_x, *from_y)?;
                injector.move_mouse(*to_x, *to_y)
            }
            DesktopAction::MouseMove { x, y, .. } => injector.move_mouse(*x, *y),
            DesktopAction::KeyType { text, .. } => injector.type_text(text),
            DesktopAction::KeyCombo { keys, .. } => injector.press_key_combo(keys),
            DesktopAction::ClipboardCopy { .. } => {
                // Observation only; nothing to inject.
                debug!("skipping clipboard observation during replay");
                Ok(())
            }
            DesktopAction::AppLaunch { app, window, .. } => {
                apps.launch_app(app, window.as_deref())?;
                self.settle();
                Ok(())
            }
            DesktopAction::AppSwitch { app, .. } => {
                apps.focus_app(app)?;
                self.settle();
                Ok(())
            }
            DesktopAction::BrowserInteractionStart { app, .. } => {
                debug!(app, "browser interaction start; browser replay is owned elsewhere");
                Ok(())
            }
            DesktopAction::BrowserInteractionEnd { app, .. } => {
                debug!(app, "browser interaction end");
                Ok(())
            }
        }
    }

    fn settle(&self) {
        if self.settle_ms > 0 {
            thread::sleep(Duration::from_millis(self.settle_ms));
        }
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}

struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{
        MouseButton, RecordingMetadata, ScreenSize, FILE_VERSION,
    };
    use crate::driver::{NullAppLifecycle, NullOverlay};
    use crate::error::ErrorCode;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn file_with(actions: Vec<DesktopAction>) -> RecordingFile {
        let duration = actions.last().map(|a| a.timestamp()).unwrap_or(0);
        RecordingFile {
            version: FILE_VERSION.into(),
            recorded_at: "2026-01-01T00:00:00Z".into(),
            duration,
            platform: "test".into(),
            screen_size: ScreenSize {
                width: 1920,
                height: 1080,
            },
            metadata: RecordingMetadata {
                script_name: "test".into(),
                action_count: actions.len(),
            },
            actions,
        }
    }

    fn click(ts: u64, x: i32, y: i32) -> DesktopAction {
        DesktopAction::MouseClick {
            timestamp: ts,
            x,
            y,
            button: MouseButton::Left,
            is_app_launch_click: false,
            launched_app: None,
        }
    }

    /// Records every injection call; can be told to fail one primitive.
    #[derive(Default)]
    struct ScriptedInjector {
        calls: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
        refuse_init: bool,
    }

    impl ScriptedInjector {
        fn call(&self, name: &str) -> Result<()> {
            self.calls.lock().push(name.to_string());
            if self.fail_on == Some(name) {
                Err(Error::replay_failed(format!("{} forced to fail", name)))
            } else {
                Ok(())
            }
        }
    }

    impl InputInjector for ScriptedInjector {
        fn initialize(&mut self) -> bool {
            !self.refuse_init
        }
        fn check_accessibility_permissions(&self) -> bool {
            true
        }
        fn move_mouse(&mut self, _x: i32, _y: i32) -> Result<()> {
            self.call("move_mouse")
        }
        fn click_mouse(&mut self, _x: i32, _y: i32, _button: MouseButton) -> Result<()> {
            self.call("click_mouse")
        }
        fn double_click_mouse(&mut self, _x: i32, _y: i32) -> Result<()> {
            self.call("double_click_mouse")
        }
        fn right_click_mouse(&mut self, _x: i32, _y: i32) -> Result<()> {
            self.call("right_click_mouse")
        }
        fn press_key_combo(&mut self, _keys: &[String]) -> Result<()> {
            self.call("press_key_combo")
        }
        fn type_text(&mut self, _text: &str) -> Result<()> {
            self.call("type_text")
        }
        fn get_mouse_position(&mut self) -> Result<(i32, i32)> {
            Ok((0, 0))
        }
        fn get_screen_size(&mut self) -> Result<ScreenSize> {
            Ok(ScreenSize {
                width: 1920,
                height: 1080,
            })
        }
        fn reset_rate_limits(&mut self) {}
    }

    fn play(
        engine: &ReplayEngine,
        file: &RecordingFile,
        injector: &mut ScriptedInjector,
    ) -> ReplayStats {
        let stop = AtomicBool::new(false);
        engine
            .play(
                file,
                injector,
                &mut NullAppLifecycle,
                &mut NullOverlay,
                &stop,
            )
            .unwrap()
    }

    #[test]
    fn speed_factor_shrinks_reconstructed_delays() {
        let file = file_with(vec![
            click(0, 1, 1),
            click(100, 2, 2),
            click(200, 3, 3),
            click(300, 4, 4),
        ]);
        let engine = ReplayEngine::new().speed(3.0).settle_ms(0);
        let mut injector = ScriptedInjector::default();
        let stats = play(&engine, &file, &mut injector);
        assert_eq!(stats.executed, 4);
        // 300 ms of recorded gaps at 3x is ~100 ms of waiting.
        assert!(stats.elapsed_ms >= 80, "too fast: {}", stats.elapsed_ms);
        assert!(stats.elapsed_ms <= 280, "too slow: {}", stats.elapsed_ms);
    }

    #[test]
    fn one_failing_injection_does_not_abort_the_run() {
        let file = file_with(vec![
            click(0, 1, 1),
            DesktopAction::KeyType {
                timestamp: 10,
                text: "hello".into(),
            },
            click(20, 2, 2),
        ]);
        let engine = ReplayEngine::new().speed(10.0).settle_ms(0);
        let mut injector = ScriptedInjector {
            fail_on: Some("type_text"),
            ..ScriptedInjector::default()
        };
        let stats = play(&engine, &file, &mut injector);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.executed, 2);
        // The click after the failure still ran.
        assert_eq!(
            injector.calls.lock().iter().filter(|c| *c == "click_mouse").count(),
            2
        );
    }

    #[test]
    fn launch_tagged_clicks_are_skipped() {
        let file = file_with(vec![
            DesktopAction::MouseClick {
                timestamp: 0,
                x: 100,
                y: 200,
                button: MouseButton::Left,
                is_app_launch_click: true,
                launched_app: Some("Notepad".into()),
            },
            DesktopAction::AppLaunch {
                timestamp: 10,
                app: "Notepad".into(),
                window: None,
            },
        ]);
        let engine = ReplayEngine::new().speed(10.0).settle_ms(0);
        let mut injector = ScriptedInjector::default();
        let stats = play(&engine, &file, &mut injector);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.executed, 1);
        assert!(injector.calls.lock().is_empty(), "tagged click must not inject");
    }

    #[test]
    fn every_variant_dispatches() {
        let file = file_with(vec![
            click(0, 1, 1),
            DesktopAction::MouseDoubleClick {
                timestamp: 1,
                x: 1,
                y: 1,
            },
            DesktopAction::MouseRightClick {
                timestamp: 2,
                x: 1,
                y: 1,
            },
            DesktopAction::MouseDrag {
                timestamp: 3,
                from_x: 0,
                from_y: 0,
                to_x: 9,
                to_y: 9,
                button: MouseButton::Left,
            },
            DesktopAction::MouseMove {
                timestamp: 4,
                x: 5,
                y: 5,
            },
            DesktopAction::KeyType {
                timestamp: 5,
                text: "x".into(),
            },
            DesktopAction::KeyCombo {
                timestamp: 6,
                keys: vec!["Meta".into(), "C".into()],
            },
            DesktopAction::ClipboardCopy {
                timestamp: 7,
                text: "c".into(),
            },
            DesktopAction::AppSwitch {
                timestamp: 8,
                app: "Finder".into(),
            },
            DesktopAction::BrowserInteractionStart {
                timestamp: 9,
                app: "Safari".into(),
            },
            DesktopAction::BrowserInteractionEnd {
                timestamp: 10,
                app: "Safari".into(),
            },
        ]);
        let engine = ReplayEngine::new().speed(100.0).settle_ms(0);
        let mut injector = ScriptedInjector::default();
        let stats = play(&engine, &file, &mut injector);
        assert_eq!(stats.executed, file.actions.len());
        assert_eq!(stats.failed, 0);
        let calls = injector.calls.lock();
        assert!(calls.contains(&"double_click_mouse".to_string()));
        assert!(calls.contains(&"right_click_mouse".to_string()));
        assert!(calls.contains(&"press_key_combo".to_string()));
    }

    #[test]
    fn preset_stop_signal_executes_nothing() {
        let file = file_with(vec![click(0, 1, 1), click(10, 2, 2)]);
        let engine = ReplayEngine::new().settle_ms(0);
        let mut injector = ScriptedInjector::default();
        let stop = AtomicBool::new(true);
        let stats = engine
            .play(
                &file,
                &mut injector,
                &mut NullAppLifecycle,
                &mut NullOverlay,
                &stop,
            )
            .unwrap();
        assert!(stats.stopped);
        assert_eq!(stats.executed, 0);
    }

    #[test]
    fn injector_initialization_failure_is_fatal_up_front() {
        let file = file_with(vec![click(0, 1, 1)]);
        let engine = ReplayEngine::new().settle_ms(0);
        let mut injector = ScriptedInjector {
            refuse_init: true,
            ..ScriptedInjector::default()
        };
        let stop = AtomicBool::new(false);
        let err = engine
            .play(
                &file,
                &mut injector,
                &mut NullAppLifecycle,
                &mut NullOverlay,
                &stop,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ReplayFailed);
    }

    #[test]
    fn concurrent_play_is_rejected() {
        let file = file_with(vec![click(0, 1, 1), click(400, 2, 2)]);
        let engine = Arc::new(ReplayEngine::new().settle_ms(0));

        let bg = {
            let engine = engine.clone();
            let file = file.clone();
            thread::spawn(move || {
                let stop = AtomicBool::new(false);
                let mut injector = ScriptedInjector::default();
                engine
                    .play(
                        &file,
                        &mut injector,
                        &mut NullAppLifecycle,
                        &mut NullOverlay,
                        &stop,
                    )
                    .unwrap()
            })
        };

        thread::sleep(Duration::from_millis(100));
        let stop = AtomicBool::new(false);
        let mut injector = ScriptedInjector::default();
        let err = engine
            .play(
                &file,
                &mut injector,
                &mut NullAppLifecycle,
                &mut NullOverlay,
                &stop,
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ReplayFailed);
        let first = bg.join().unwrap();
        assert_eq!(first.executed, 2);
    }
}
