//! Wall-clock timer for running-time and ETA reports

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time divided by `progress`, formatted
    ///
    /// With `progress = done / total` this is the projected total run time.
    pub fn measure(&self, progress: f64) -> String {
        let secs = self.elapsed().as_secs_f64();
        let scaled = if progress > 0.0 { secs / progress } else { secs };
        format_duration(scaled)
    }
}

/// `1.5h`, `12m` or `42s`
pub fn format_duration(secs: f64) -> String {
    let whole = secs.max(0.0).floor() as u64;
    if whole >= 3600 {
        format!("{:.1}h", whole as f64 / 3600.0)
    } else if whole >= 60 {
        format!("{}m", (whole as f64 / 60.0).round() as u64)
    } else {
        format!("{whole}s")
    }
}
