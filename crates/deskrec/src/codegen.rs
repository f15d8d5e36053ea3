//! Rendering a finished log into the persisted document and script text
//!
//! Both renderings are pure: the same action list always produces the same
//! artifacts. The structured document is what replay consumes; the script is
//! a human-inspectable export.

use crate::action::{
    DesktopAction, MouseButton, RecordingFile, RecordingMetadata, ScreenSize, FILE_VERSION,
};
use crate::recorder::FinishedRecording;
use chrono::{DateTime, SecondsFormat, Utc};

/// Inter-action gaps below this are dropped from the script for readability.
/// The structured document keeps every timestamp verbatim.
pub const SCRIPT_WAIT_THRESHOLD_MS: u64 = 100;

/// Environment facts stamped into the document. Supplied by the caller so
/// rendering stays deterministic.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub recorded_at: DateTime<Utc>,
    pub platform: String,
    pub screen_size: ScreenSize,
}

impl SessionInfo {
    /// Snapshot of the current environment, with the screen size reported by
    /// the injection collaborator (or zero when none is attached).
    pub fn capture(screen_size: ScreenSize) -> Self {
        Self {
            recorded_at: Utc::now(),
            platform: std::env::consts::OS.to_string(),
            screen_size,
        }
    }
}

/// Build the persisted document from a finished recording.
pub fn document(recording: &FinishedRecording, info: &SessionInfo) -> RecordingFile {
    RecordingFile {
        version: FILE_VERSION.to_string(),
        recorded_at: info
            .recorded_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        duration: recording.duration_ms,
        platform: info.platform.clone(),
        screen_size: info.screen_size,
        actions: recording.actions.clone(),
        metadata: RecordingMetadata {
            script_name: recording.name.clone(),
            action_count: recording.actions.len(),
        },
    }
}

/// Render procedural script text. Launch-tagged clicks become comments since
/// the corresponding `launch` line supersedes them.
pub fn script(file: &RecordingFile) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# {} - recorded {}, {} actions, {:.1}s\n",
        file.metadata.script_name,
        file.recorded_at,
        file.metadata.action_count,
        file.duration as f64 / 1000.0
    ));

    let mut last_ts = 0u64;
    for action in &file.actions {
        let gap = action.timestamp().saturating_sub(last_ts);
        if gap >= SCRIPT_WAIT_THRESHOLD_MS {
            out.push_str(&format!("wait {:.2}\n", gap as f64 / 1000.0));
        }
        last_ts = action.timestamp();
        out.push_str(&render_line(action));
        out.push('\n');
    }
    out
}

fn render_line(action: &DesktopAction) -> String {
    match action {
        DesktopAction::MouseClick {
            x,
            y,
            button,
            is_app_launch_click,
            launched_app,
            ..
        } => {
            if *is_app_launch_click {
                format!(
                    "# click ({}, {}) replaced by launch {:?}",
                    x,
                    y,
                    launched_app.as_deref().unwrap_or("?")
                )
            } else {
                format!("click ({}, {}) {}", x, y, button_name(*button))
            }
        }
        DesktopAction::MouseDoubleClick { x, y, .. } => format!("doubleclick ({}, {})", x, y),
        DesktopAction::MouseRightClick { x, y, .. } => format!("rightclick ({}, {})", x, y),
        DesktopAction::MouseDrag {
            from_x,
            from_y,
            to_x,
            to_y,
            ..
        } => format!("drag ({}, {}) -> ({}, {})", from_x, from_y, to_x, to_y),
        DesktopAction::MouseMove { x, y, .. } => format!("move ({}, {})", x, y),
        DesktopAction::KeyType { text, .. } => format!("type {:?}", text),
        DesktopAction::KeyCombo { keys, .. } => format!("press {}", keys.join("+")),
        DesktopAction::ClipboardCopy { text, .. } => {
            format!("# clipboard {:?}", crate::action::truncate(text, 60))
        }
        DesktopAction::AppLaunch { app, .. } => format!("launch {:?}", app),
        DesktopAction::AppSwitch { app, .. } => format!("switch {:?}", app),
        DesktopAction::BrowserInteractionStart { app, .. } => {
            format!("# browser interaction start ({})", app)
        }
        DesktopAction::BrowserInteractionEnd { app, .. } => {
            format!("# browser interaction end ({})", app)
        }
    }
}

fn button_name(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "left",
        MouseButton::Right => "right",
        MouseButton::Middle => "middle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recording() -> FinishedRecording {
        FinishedRecording {
            name: "demo".into(),
            actions: vec![
                DesktopAction::AppLaunch {
                    timestamp: 0,
                    app: "Notepad".into(),
                    window: None,
                },
                DesktopAction::MouseClick {
                    timestamp: 50,
                    x: 100,
                    y: 200,
                    button: MouseButton::Left,
                    is_app_launch_click: false,
                    launched_app: None,
                },
                DesktopAction::KeyType {
                    timestamp: 1500,
                    text: "hello".into(),
                },
            ],
            duration_ms: 2000,
        }
    }

    fn info() -> SessionInfo {
        SessionInfo {
            recorded_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            platform: "macos".into(),
            screen_size: ScreenSize {
                width: 1920,
                height: 1080,
            },
        }
    }

    #[test]
    fn document_preserves_every_action_and_timestamp() {
        let rec = sample_recording();
        let doc = document(&rec, &info());
        assert_eq!(doc.version, FILE_VERSION);
        assert_eq!(doc.duration, 2000);
        assert_eq!(doc.actions, rec.actions);
        assert_eq!(doc.metadata.action_count, 3);
        assert_eq!(doc.metadata.script_name, "demo");
        assert!(doc.recorded_at.starts_with("2026-01-02T03:04:05"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let rec = sample_recording();
        let a = script(&document(&rec, &info()));
        let b = script(&document(&rec, &info()));
        assert_eq!(a, b);
    }

    #[test]
    fn short_gaps_are_omitted_long_gaps_become_waits() {
        let doc = document(&sample_recording(), &info());
        let text = script(&doc);
        // 50 ms gap before the click is below threshold; 1450 ms before typing is not.
        let waits: Vec<&str> = text.lines().filter(|l| l.starts_with("wait")).collect();
        assert_eq!(waits, vec!["wait 1.45"]);
    }

    #[test]
    fn launch_tagged_clicks_render_as_comments() {
        let mut rec = sample_recording();
        rec.actions[1] = DesktopAction::MouseClick {
            timestamp: 50,
            x: 100,
            y: 200,
            button: MouseButton::Left,
            is_app_launch_click: true,
            launched_app: Some("Notepad".into()),
        };
        let text = script(&document(&rec, &info()));
        assert!(text.contains("# click (100, 200) replaced by launch \"Notepad\""));
        assert!(!text.contains("\nclick (100, 200)"));
    }

    #[test]
    fn every_variant_renders_without_panicking() {
        let actions = vec![
            DesktopAction::MouseDoubleClick {
                timestamp: 0,
                x: 1,
                y: 2,
            },
            DesktopAction::MouseRightClick {
                timestamp: 0,
                x: 1,
                y: 2,
            },
            DesktopAction::MouseDrag {
                timestamp: 0,
                from_x: 1,
                from_y: 2,
                to_x: 3,
                to_y: 4,
                button: MouseButton::Left,
            },
            DesktopAction::MouseMove {
                timestamp: 0,
                x: 9,
                y: 9,
            },
            DesktopAction::KeyCombo {
                timestamp: 0,
                keys: vec!["Meta".into(), "C".into()],
            },
            DesktopAction::ClipboardCopy {
                timestamp: 0,
                text: "snippet".into(),
            },
            DesktopAction::AppSwitch {
                timestamp: 0,
                app: "Finder".into(),
            },
            DesktopAction::BrowserInteractionStart {
                timestamp: 0,
                app: "Safari".into(),
            },
            DesktopAction::BrowserInteractionEnd {
                timestamp: 0,
                app: "Safari".into(),
            },
        ];
        let rec = FinishedRecording {
            name: "all".into(),
            actions,
            duration_ms: 0,
        };
        let text = script(&document(&rec, &info()));
        assert!(text.contains("press Meta+C"));
        assert!(text.contains("# clipboard \"snippet\""));
        assert!(text.contains("drag (1, 2) -> (3, 4)"));
    }
}
