//! deskrec - desktop action recording and replay
//!
//! Captures raw OS input signals, distills them into a time-ordered log of
//! semantic actions, and replays that log with timing fidelity or renders it
//! as inspectable script text.
//!
//! Platform hooks and injection backends are collaborators behind narrow
//! traits; the engine itself is platform-neutral.

pub mod action;
pub mod codegen;
pub mod correlate;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod recorder;
pub mod replay;
pub mod storage;

pub use action::{DesktopAction, MouseButton, RecordingFile, ScreenSize};
pub use error::{Error, ErrorCode, Result};
pub use hooks::{RawSignal, SignalSources};
pub use recorder::{ActionRecorder, FinishedRecording, RecorderConfig};
pub use replay::{ReplayEngine, ReplayStats};
pub use storage::RecordingStore;

pub mod prelude {
    pub use crate::action::{DesktopAction, MouseButton, RecordingFile, ScreenSize};
    pub use crate::codegen;
    pub use crate::driver::{
        AppLifecycle, DesktopIsolation, InputInjector, NullAppLifecycle, NullInjector,
        NullIsolation, NullOverlay, ProgressOverlay,
    };
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::hooks::{
        ClipboardProbe, ControlAction, InputEventSource, Modifiers, PressedKeys, RawKey,
        RawSignal, SignalSources, WindowProbe,
    };
    pub use crate::recorder::{
        ActionRecorder, FinishedRecording, RecorderConfig, ReservedChord,
    };
    pub use crate::replay::{ReplayEngine, ReplayStats};
    pub use crate::storage::RecordingStore;
}
