//! Timestamped diagnostic stream shared by both searcher threads

use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

/// Mutex-serialized writer of `M:SS.mmm message` lines to stderr.
///
/// This is the per-search diagnostic channel; ambient logging goes through
/// the `log` facade instead.
pub struct SearchLog {
    start: Instant,
    sink: Mutex<std::io::Stderr>,
}

impl SearchLog {
    pub fn new() -> SearchLog {
        SearchLog {
            start: Instant::now(),
            sink: Mutex::new(std::io::stderr()),
        }
    }

    /// Writes one line stamped with the time since construction.
    pub fn log(&self, message: &str) {
        let elapsed = self.start.elapsed();
        let seconds = elapsed.as_secs();
        let millis = elapsed.subsec_millis();
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(
            sink,
            "{}:{:02}.{:03} {}",
            seconds / 60,
            seconds % 60,
            millis,
            message
        );
    }
}

impl Default for SearchLog {
    fn default() -> Self {
        Self::new()
    }
}
