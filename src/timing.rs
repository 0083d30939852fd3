use std::time::{Duration, Instant};
use tracing::debug;

/// Measures one named unit of work and logs how long it took
#[derive(Debug)]
pub struct Stopwatch {
    label: &'static str,
    start: Instant,
}

impl Stopwatch {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the watch, log the elapsed time and return it
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        debug!("Load Time: {} took {}", self.label, format_duration(elapsed));
        elapsed
    }
}

pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
