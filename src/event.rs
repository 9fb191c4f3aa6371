use crate::host::ThemeColors;

/// Messages on the single inbound update channel. The timer, the host
/// watcher, and failed background commands all funnel through here so state
/// mutations stay serialized on the UI thread.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Recurring five-second refresh tick.
    Tick,
    /// The host reported new theme parameters.
    ThemeChanged(ThemeColors),
    /// The host reported new viewport geometry.
    ViewportChanged {
        height: Option<f64>,
        stable_height: Option<f64>,
    },
    /// A background host command failed.
    HostError(String),
}
