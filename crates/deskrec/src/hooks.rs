//! Raw signal sources: input hook, window poller, clipboard poller
//!
//! Sources never touch session state. They push [`RawSignal`]s into a bounded
//! channel and return immediately; one consumer thread owns all mutation.

use crate::error::Result;
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

/// A raw, low-level event as delivered by a hook or poller.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSignal {
    MouseDown {
        x: i32,
        y: i32,
        button: crate::action::MouseButton,
        /// Click count from the OS (1 = single, 2 = double).
        clicks: u8,
    },
    MouseUp {
        x: i32,
        y: i32,
        button: crate::action::MouseButton,
    },
    MouseMove {
        x: i32,
        y: i32,
    },
    KeyDown {
        key: RawKey,
        /// Modifier snapshot at the moment of the event.
        mods: Modifiers,
    },
    KeyUp {
        key: RawKey,
    },
    /// Foreground application changed (or first observation).
    Foreground {
        app: String,
        window: Option<String>,
    },
    /// Current clipboard text as observed by the poller.
    Clipboard {
        text: String,
    },
    /// Host control, consumed by the state machine and never recorded.
    Control(ControlAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Resume,
    TogglePause,
    Stop,
}

/// A key as seen by the hook layer, already mapped from platform keycodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKey {
    /// A printable character (layout-resolved, shift already applied).
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Function(u8),
    Meta,
    Ctrl,
    Alt,
    Shift,
}

impl RawKey {
    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::Meta | Self::Ctrl | Self::Alt | Self::Shift)
    }

    /// The character this key contributes to debounced text, if any.
    /// Only printable characters and space are literal; everything else
    /// interrupts a typing run.
    pub fn literal_char(&self) -> Option<char> {
        match self {
            Self::Char(c) if !c.is_control() => Some(*c),
            _ => None,
        }
    }

    /// Canonical name used in `keyCombo` key lists.
    pub fn name(&self) -> String {
        match self {
            Self::Char(' ') => "Space".to_string(),
            Self::Char(c) => c.to_uppercase().to_string(),
            Self::Enter => "Enter".to_string(),
            Self::Tab => "Tab".to_string(),
            Self::Backspace => "Backspace".to_string(),
            Self::Escape => "Escape".to_string(),
            Self::ArrowUp => "ArrowUp".to_string(),
            Self::ArrowDown => "ArrowDown".to_string(),
            Self::ArrowLeft => "ArrowLeft".to_string(),
            Self::ArrowRight => "ArrowRight".to_string(),
            Self::Function(n) => format!("F{}", n),
            Self::Meta => "Meta".to_string(),
            Self::Ctrl => "Ctrl".to_string(),
            Self::Alt => "Alt".to_string(),
            Self::Shift => "Shift".to_string(),
        }
    }
}

/// Modifier flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const SHIFT: u8 = 1 << 0;
    pub const CTRL: u8 = 1 << 1;
    pub const ALT: u8 = 1 << 2;
    pub const META: u8 = 1 << 3;

    pub const NONE: Modifiers = Modifiers(0);

    pub fn meta() -> Self {
        Self(Self::META)
    }

    pub fn ctrl() -> Self {
        Self(Self::CTRL)
    }

    pub fn any_chord_modifier(&self) -> bool {
        self.0 & (Self::META | Self::CTRL | Self::ALT | Self::SHIFT) != 0
    }

    /// Modifier names in canonical order, for `keyCombo` key lists.
    pub fn names(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.0 & Self::META != 0 {
            out.push("Meta".to_string());
        }
        if self.0 & Self::CTRL != 0 {
            out.push("Ctrl".to_string());
        }
        if self.0 & Self::ALT != 0 {
            out.push("Alt".to_string());
        }
        if self.0 & Self::SHIFT != 0 {
            out.push("Shift".to_string());
        }
        out
    }
}

/// Live pressed-key tracker for hook implementations. Feed every key
/// transition through it and snapshot `modifiers()` per `KeyDown`.
#[derive(Debug, Default)]
pub struct PressedKeys {
    down: HashSet<RawKey>,
}

impl PressedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: RawKey) {
        self.down.insert(key);
    }

    pub fn key_up(&mut self, key: RawKey) {
        self.down.remove(&key);
    }

    pub fn is_pressed(&self, key: RawKey) -> bool {
        self.down.contains(&key)
    }

    pub fn modifiers(&self) -> Modifiers {
        let mut m = 0u8;
        if self.down.contains(&RawKey::Shift) {
            m |= Modifiers::SHIFT;
        }
        if self.down.contains(&RawKey::Ctrl) {
            m |= Modifiers::CTRL;
        }
        if self.down.contains(&RawKey::Alt) {
            m |= Modifiers::ALT;
        }
        if self.down.contains(&RawKey::Meta) {
            m |= Modifiers::META;
        }
        Modifiers(m)
    }
}

/// OS permission state checked before any listener is attached.
#[derive(Debug, Clone, Copy)]
pub struct PermissionStatus {
    pub accessibility: bool,
    pub input_monitoring: bool,
}

impl PermissionStatus {
    pub fn granted() -> Self {
        Self {
            accessibility: true,
            input_monitoring: true,
        }
    }

    pub fn all_granted(&self) -> bool {
        self.accessibility && self.input_monitoring
    }
}

/// Low-level input hook. `attach` spawns the delivery thread and returns its
/// handle; the implementation pushes signals on `tx` until `stop` is set.
/// Returns `HookUnavailable` when the hook cannot initialize in this runtime.
pub trait InputEventSource: Send + 'static {
    fn check_permissions(&self) -> PermissionStatus;

    fn attach(
        self: Box<Self>,
        tx: Sender<RawSignal>,
        stop: Arc<AtomicBool>,
    ) -> Result<thread::JoinHandle<()>>;
}

/// Identity of the frontmost application.
#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundWindow {
    pub app: String,
    pub window: Option<String>,
}

/// Polled foreground-window identity source.
pub trait WindowProbe: Send + 'static {
    fn foreground(&mut self) -> Result<ForegroundWindow>;
}

/// Polled clipboard text source. `Ok(None)` means no text on the clipboard.
pub trait ClipboardProbe: Send + 'static {
    fn read_text(&mut self) -> Result<Option<String>>;
}

/// The observer set a session records from. Any source may be absent;
/// the recorder degrades accordingly instead of failing.
#[derive(Default)]
pub struct SignalSources {
    pub hook: Option<Box<dyn InputEventSource>>,
    pub window: Option<Box<dyn WindowProbe>>,
    pub clipboard: Option<Box<dyn ClipboardProbe>>,
}

impl SignalSources {
    /// Whatever this platform can provide: the system clipboard probe plus,
    /// on macOS, an `osascript`-based window probe. No input hook backend is
    /// bundled; hosts supply one via [`InputEventSource`].
    pub fn system() -> Self {
        Self {
            hook: None,
            window: system_window_probe(),
            clipboard: SystemClipboardProbe::new()
                .map(|p| Box::new(p) as Box<dyn ClipboardProbe>),
        }
    }
}

/// System clipboard probe backed by `arboard`.
pub struct SystemClipboardProbe {
    clipboard: arboard::Clipboard,
}

impl SystemClipboardProbe {
    pub fn new() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(clipboard) => Some(Self { clipboard }),
            Err(e) => {
                tracing::warn!(error = %e, "system clipboard unavailable");
                None
            }
        }
    }
}

impl ClipboardProbe for SystemClipboardProbe {
    fn read_text(&mut self) -> Result<Option<String>> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(crate::error::Error::new(
                crate::error::ErrorCode::Unknown,
                format!("clipboard read failed: {}", e),
            )),
        }
    }
}

#[cfg(target_os = "macos")]
fn system_window_probe() -> Option<Box<dyn WindowProbe>> {
    Some(Box::new(macos::OsascriptWindowProbe))
}

#[cfg(not(target_os = "macos"))]
fn system_window_probe() -> Option<Box<dyn WindowProbe>> {
    None
}

#[cfg(target_os = "macos")]
mod macos {
    use super::{ForegroundWindow, WindowProbe};
    use crate::error::{Error, ErrorCode, Result};
    use std::process::Command;

    /// Frontmost-app probe via System Events scripting.
    pub struct OsascriptWindowProbe;

    impl WindowProbe for OsascriptWindowProbe {
        fn foreground(&mut self) -> Result<ForegroundWindow> {
            let script = r#"tell application "System Events"
    set frontApp to first application process whose frontmost is true
    set appName to name of frontApp
    set windowTitle to ""
    try
        set windowTitle to name of front window of frontApp
    end try
    return appName & linefeed & windowTitle
end tell"#;

            let output = Command::new("osascript")
                .arg("-e")
                .arg(script)
                .output()
                .map_err(|e| {
                    Error::new(ErrorCode::Unknown, format!("osascript failed: {}", e))
                })?;

            if !output.status.success() {
                return Err(Error::new(
                    ErrorCode::Unknown,
                    "osascript returned non-zero status",
                ));
            }

            let text = String::from_utf8_lossy(&output.stdout);
            let mut lines = text.lines();
            let app = lines
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| Error::new(ErrorCode::Unknown, "empty osascript output"))?
                .to_string();
            let window = lines
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from);

            Ok(ForegroundWindow { app, window })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_keys_snapshot_reflects_live_modifiers() {
        let mut pressed = PressedKeys::new();
        pressed.key_down(RawKey::Meta);
        pressed.key_down(RawKey::Char('c'));
        assert!(pressed.modifiers().any_chord_modifier());
        assert_eq!(pressed.modifiers().names(), vec!["Meta"]);

        pressed.key_up(RawKey::Meta);
        pressed.key_up(RawKey::Char('c'));
        assert_eq!(pressed.modifiers(), Modifiers::NONE);
    }

    #[test]
    fn modifier_names_keep_canonical_order() {
        let m = Modifiers(Modifiers::SHIFT | Modifiers::META | Modifiers::CTRL);
        assert_eq!(m.names(), vec!["Meta", "Ctrl", "Shift"]);
    }

    #[test]
    fn literal_chars_exclude_control_keys() {
        assert_eq!(RawKey::Char('a').literal_char(), Some('a'));
        assert_eq!(RawKey::Char(' ').literal_char(), Some(' '));
        assert_eq!(RawKey::Enter.literal_char(), None);
        assert_eq!(RawKey::Backspace.literal_char(), None);
        assert_eq!(RawKey::Meta.literal_char(), None);
    }

    #[test]
    fn key_names_match_combo_conventions() {
        assert_eq!(RawKey::Char('c').name(), "C");
        assert_eq!(RawKey::Char(' ').name(), "Space");
        assert_eq!(RawKey::Function(5).name(), "F5");
        assert_eq!(RawKey::ArrowLeft.name(), "ArrowLeft");
    }
}
