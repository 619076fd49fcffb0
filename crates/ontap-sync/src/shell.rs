//! Outbound signals to the surrounding shell.
//!
//! The sync engine never renders anything itself. It tells the shell to
//! update the window title, show a toast, or go back to the home route.
//! All three are fire-and-forget.

use parking_lot::Mutex;
use tracing::{info, warn};

/// Receiver of the engine's outbound notifications.
pub trait ShellNotifier: Send + Sync {
    /// Replace the shell's title.
    fn set_title(&self, title: &str);

    /// Show a transient error message.
    fn toast(&self, message: &str);

    /// Leave the dashboard for the home route.
    fn navigate_home(&self);
}

/// Shell that only logs. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingShell;

impl ShellNotifier for LoggingShell {
    fn set_title(&self, title: &str) {
        info!(title, "Dashboard title updated");
    }

    fn toast(&self, message: &str) {
        warn!(message, "Dashboard toast");
    }

    fn navigate_home(&self) {
        warn!("Dashboard requested navigation home");
    }
}

/// A notification as recorded by [`RecordingShell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Title(String),
    Toast(String),
    NavigateHome,
}

/// Shell that records every notification, for tests.
#[derive(Debug, Default)]
pub struct RecordingShell {
    events: Mutex<Vec<ShellEvent>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ShellEvent> {
        self.events.lock().clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ShellEvent::Toast(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ShellEvent::Title(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn navigations(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, ShellEvent::NavigateHome))
            .count()
    }
}

impl ShellNotifier for RecordingShell {
    fn set_title(&self, title: &str) {
        self.events.lock().push(ShellEvent::Title(title.to_string()));
    }

    fn toast(&self, message: &str) {
        self.events.lock().push(ShellEvent::Toast(message.to_string()));
    }

    fn navigate_home(&self) {
        self.events.lock().push(ShellEvent::NavigateHome);
    }
}
