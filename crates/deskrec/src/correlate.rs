//! Launch correlation: tag clicks that causally preceded an app launch
//!
//! Post-processing over the finished, time-ordered log. For each `appLaunch`
//! the scan walks strictly backward while the elapsed time stays inside the
//! window and stops at the first `mouseClick` or at an earlier `appLaunch`.
//! First match wins; a click is tagged at most once and never retagged.

use crate::action::DesktopAction;

pub fn tag_launch_clicks(actions: &mut [DesktopAction], window_ms: u64) {
    for i in 0..actions.len() {
        let (launch_ts, launched) = match &actions[i] {
            DesktopAction::AppLaunch { timestamp, app, .. } => (*timestamp, app.clone()),
            _ => continue,
        };

        for j in (0..i).rev() {
            if launch_ts.saturating_sub(actions[j].timestamp()) > window_ms {
                break;
            }
            match &mut actions[j] {
                // Never attribute a click across an earlier launch.
                DesktopAction::AppLaunch { .. } => break,
                DesktopAction::MouseClick {
                    is_app_launch_click,
                    launched_app,
                    ..
                } => {
                    if !*is_app_launch_click {
                        *is_app_launch_click = true;
                        *launched_app = Some(launched);
                    }
                    break;
                }
                _ => {}
            }
        }
    }
}
