//! Collaborator contracts consumed by the replay engine
//!
//! Injection, app lifecycle, isolation and overlay are owned elsewhere; the
//! engine only talks to these traits. No-op implementations let the engine
//! run headless (dry runs, tests, CI).

use crate::action::{MouseButton, ScreenSize};
use crate::error::Result;
use tracing::{debug, info};

/// Virtual-desktop isolation for sandboxed replays.
pub trait DesktopIsolation {
    /// Returns false when the platform cannot isolate; replay proceeds on
    /// the current desktop.
    fn create_and_switch_to_new_desktop(&mut self) -> bool;
    fn switch_back_and_cleanup(&mut self);
}

/// Low-level input injection primitives.
pub trait InputInjector {
    fn initialize(&mut self) -> bool;
    fn check_accessibility_permissions(&self) -> bool;
    fn move_mouse(&mut self, x: i32, y: i32) -> Result<()>;
    fn click_mouse(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()>;
    fn double_click_mouse(&mut self, x: i32, y: i32) -> Result<()>;
    fn right_click_mouse(&mut self, x: i32, y: i32) -> Result<()>;
    fn press_key_combo(&mut self, keys: &[String]) -> Result<()>;
    fn type_text(&mut self, text: &str) -> Result<()>;
    fn get_mouse_position(&mut self) -> Result<(i32, i32)>;
    fn get_screen_size(&mut self) -> Result<ScreenSize>;
    fn reset_rate_limits(&mut self);
}

/// Platform-specific application launch/focus. Failures are logged by the
/// replay loop and never abort it.
pub trait AppLifecycle {
    fn launch_app(&mut self, name: &str, hint: Option<&str>) -> Result<()>;
    fn focus_app(&mut self, name: &str) -> Result<()>;
}

/// Replay progress reporting surface.
pub trait ProgressOverlay {
    fn create(&mut self);
    fn update_progress(&mut self, step: usize, total: usize, label: &str);
    fn show_mouse_indicator(&mut self, x: i32, y: i32);
    fn close(&mut self);
}

/// Injector that performs nothing and succeeds. Useful for dry runs where
/// only timing and dispatch order matter.
#[derive(Debug, Default)]
pub struct NullInjector;

impl InputInjector for NullInjector {
    fn initialize(&mut self) -> bool {
        true
    }
    fn check_accessibility_permissions(&self) -> bool {
        true
    }
    fn move_mouse(&mut self, x: i32, y: i32) -> Result<()> {
        debug!(x, y, "move_mouse (noop)");
        Ok(())
    }
    fn click_mouse(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        debug!(x, y, ?button, "click_mouse (noop)");
        Ok(())
    }
    fn double_click_mouse(&mut self, x: i32, y: i32) -> Result<()> {
        debug!(x, y, "double_click_mouse (noop)");
        Ok(())
    }
    fn right_click_mouse(&mut self, x: i32, y: i32) -> Result<()> {
        debug!(x, y, "right_click_mouse (noop)");
        Ok(())
    }
    fn press_key_combo(&mut self, keys: &[String]) -> Result<()> {
        debug!(keys = %keys.join("+"), "press_key_combo (noop)");
        Ok(())
    }
    fn type_text(&mut self, text: &str) -> Result<()> {
        debug!(len = text.len(), "type_text (noop)");
        Ok(())
    }
    fn get_mouse_position(&mut self) -> Result<(i32, i32)> {
        Ok((0, 0))
    }
    fn get_screen_size(&mut self) -> Result<ScreenSize> {
        Ok(ScreenSize {
            width: 0,
            height: 0,
        })
    }
    fn reset_rate_limits(&mut self) {}
}

/// Launch/focus collaborator that only logs.
#[derive(Debug, Default)]
pub struct NullAppLifecycle;

impl AppLifecycle for NullAppLifecycle {
    fn launch_app(&mut self, name: &str, hint: Option<&str>) -> Result<()> {
        info!(name, ?hint, "launch_app (noop)");
        Ok(())
    }
    fn focus_app(&mut self, name: &str) -> Result<()> {
        info!(name, "focus_app (noop)");
        Ok(())
    }
}

/// Overlay that reports progress to the log instead of a UI.
#[derive(Debug, Default)]
pub struct NullOverlay;

impl ProgressOverlay for NullOverlay {
    fn create(&mut self) {}
    fn update_progress(&mut self, step: usize, total: usize, label: &str) {
        info!(step, total, label, "replay progress");
    }
    fn show_mouse_indicator(&mut self, _x: i32, _y: i32) {}
    fn close(&mut self) {}
}

/// Isolation collaborator that never isolates.
#[derive(Debug, Default)]
pub struct NullIsolation;

impl DesktopIsolation for NullIsolation {
    fn create_and_switch_to_new_desktop(&mut self) -> bool {
        false
    }
    fn switch_back_and_cleanup(&mut self) {}
}
