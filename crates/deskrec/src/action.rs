//! Semantic action types and the persisted recording document
//!
//! Actions serialize with a `type` discriminant and only the fields the
//! variant actually uses; absent fields are omitted, never null.

use serde::{Deserialize, Serialize};

/// Document format version written into every recording file.
pub const FILE_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// One replayable unit derived from one or more raw input events.
///
/// `timestamp` is milliseconds since the recording session started,
/// taken from a monotonic clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DesktopAction {
    #[serde(rename_all = "camelCase")]
    MouseClick {
        timestamp: u64,
        x: i32,
        y: i32,
        button: MouseButton,
        /// Set once by launch correlation when this click triggered an app launch.
        #[serde(default, skip_serializing_if = "is_false")]
        is_app_launch_click: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        launched_app: Option<String>,
    },
    MouseDoubleClick {
        timestamp: u64,
        x: i32,
        y: i32,
    },
    MouseRightClick {
        timestamp: u64,
        x: i32,
        y: i32,
    },
    #[serde(rename_all = "camelCase")]
    MouseDrag {
        timestamp: u64,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        button: MouseButton,
    },
    MouseMove {
        timestamp: u64,
        x: i32,
        y: i32,
    },
    KeyType {
        timestamp: u64,
        text: String,
    },
    /// Modifier chord, modifiers first then the primary key, e.g. ["Meta", "C"].
    KeyCombo {
        timestamp: u64,
        keys: Vec<String>,
    },
    ClipboardCopy {
        timestamp: u64,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    AppLaunch {
        timestamp: u64,
        app: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<String>,
    },
    AppSwitch {
        timestamp: u64,
        app: String,
    },
    BrowserInteractionStart {
        timestamp: u64,
        app: String,
    },
    BrowserInteractionEnd {
        timestamp: u64,
        app: String,
    },
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl DesktopAction {
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::MouseClick { timestamp, .. }
            | Self::MouseDoubleClick { timestamp, .. }
            | Self::MouseRightClick { timestamp, .. }
            | Self::MouseDrag { timestamp, .. }
            | Self::MouseMove { timestamp, .. }
            | Self::KeyType { timestamp, .. }
            | Self::KeyCombo { timestamp, .. }
            | Self::ClipboardCopy { timestamp, .. }
            | Self::AppLaunch { timestamp, .. }
            | Self::AppSwitch { timestamp, .. }
            | Self::BrowserInteractionStart { timestamp, .. }
            | Self::BrowserInteractionEnd { timestamp, .. } => *timestamp,
        }
    }

    /// Short human-readable label, used for overlay progress and script comments.
    pub fn describe(&self) -> String {
        match self {
            Self::MouseClick {
                x,
                y,
                is_app_launch_click,
                launched_app,
                ..
            } => {
                if *is_app_launch_click {
                    format!(
                        "click ({}, {}) launching {}",
                        x,
                        y,
                        launched_app.as_deref().unwrap_or("?")
                    )
                } else {
                    format!("click ({}, {})", x, y)
                }
            }
            Self::MouseDoubleClick { x, y, .. } => format!("double-click ({}, {})", x, y),
            Self::MouseRightClick { x, y, .. } => format!("right-click ({}, {})", x, y),
            Self::MouseDrag {
                from_x,
                from_y,
                to_x,
                to_y,
                ..
            } => format!("drag ({}, {}) -> ({}, {})", from_x, from_y, to_x, to_y),
            Self::MouseMove { x, y, .. } => format!("move ({}, {})", x, y),
            Self::KeyType { text, .. } => format!("type {:?}", text),
            Self::KeyCombo { keys, .. } => format!("press {}", keys.join("+")),
            Self::ClipboardCopy { text, .. } => {
                format!("clipboard {:?}", truncate(text, 40))
            }
            Self::AppLaunch { app, .. } => format!("launch {}", app),
            Self::AppSwitch { app, .. } => format!("switch to {}", app),
            Self::BrowserInteractionStart { app, .. } => {
                format!("browser interaction start ({})", app)
            }
            Self::BrowserInteractionEnd { app, .. } => {
                format!("browser interaction end ({})", app)
            }
        }
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub script_name: String,
    pub action_count: usize,
}

/// The persisted artifact. Replay correctness depends only on this document;
/// generated script text is a secondary export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingFile {
    pub version: String,
    /// ISO-8601 wall-clock time the recording was made.
    pub recorded_at: String,
    /// Total session length in milliseconds.
    pub duration: u64,
    pub platform: String,
    pub screen_size: ScreenSize,
    pub actions: Vec<DesktopAction>,
    pub metadata: RecordingMetadata,
}
