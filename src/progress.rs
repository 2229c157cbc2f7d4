//! Progress reporting hooks.
//!
//! Reporting is purely observational: implementations must not block the caller
//! for long, and nothing they do feeds back into the conversion.

/// Receives progress updates for a named phase.
pub trait Progress: Send + Sync {
    /// `total` is 0 when the phase length is not known up front.
    fn update(&self, current: usize, total: usize, label: &str);
}

/// Forwards progress to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn update(&self, current: usize, total: usize, label: &str) {
        if total > 0 {
            log::debug!("{}: {}/{}", label, current, total);
        } else {
            log::debug!("{}: {}", label, current);
        }
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&self, _current: usize, _total: usize, _label: &str) {}
}
