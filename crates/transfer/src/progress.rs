use std::time::{Duration, Instant};

use vidingest_protocol::constants::THROUGHPUT_SAMPLE_INTERVAL;

/// `done / total` as a rounded percentage. An empty total counts as done.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}

/// Renders a byte count with binary multiples (`B`, `KB`, `MB`, `GB`).
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

// ---------------------------------------------------------------------------
// TransferPercent
// ---------------------------------------------------------------------------

/// Turns bytes-sent observations into a monotonic percentage.
///
/// While bytes are still streaming the value is capped at 99; 100 is
/// reported once, by [`finish`](Self::finish), when the store has accepted
/// the object.
#[derive(Debug, Clone)]
pub struct TransferPercent {
    total: u64,
    last: u8,
    finished: bool,
}

impl TransferPercent {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            last: 0,
            finished: false,
        }
    }

    /// Returns the new percentage if it moved forward.
    pub fn observe(&mut self, bytes_sent: u64) -> Option<u8> {
        if self.finished {
            return None;
        }
        let pct = percent_of(bytes_sent, self.total).min(99);
        if pct > self.last {
            self.last = pct;
            Some(pct)
        } else {
            None
        }
    }

    /// Returns 100 the first time, `None` afterwards.
    pub fn finish(&mut self) -> Option<u8> {
        if self.finished {
            return None;
        }
        self.finished = true;
        self.last = 100;
        Some(100)
    }

    pub fn current(&self) -> u8 {
        self.last
    }
}

// ---------------------------------------------------------------------------
// ThroughputSampler
// ---------------------------------------------------------------------------

/// Throughput estimate evaluated on each progress event.
///
/// A new estimate is produced only when at least `interval` has passed since
/// the previous one, from the bytes moved over that window. No timer runs;
/// the caller supplies the clock.
#[derive(Debug, Clone)]
pub struct ThroughputSampler {
    interval: Duration,
    last_bytes: u64,
    last_at: Instant,
    rate: f64,
}

impl ThroughputSampler {
    /// Creates a sampler whose first window starts at `start`.
    ///
    /// If `interval` is `None`, defaults to 500 ms.
    pub fn new(interval: Option<Duration>, start: Instant) -> Self {
        Self {
            interval: interval.unwrap_or(THROUGHPUT_SAMPLE_INTERVAL),
            last_bytes: 0,
            last_at: start,
            rate: 0.0,
        }
    }

    /// Feeds the cumulative byte count observed at `now`.
    ///
    /// Returns the new rate when the window closed, `None` when throttled.
    pub fn sample(&mut self, bytes_so_far: u64, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_at);
        if elapsed < self.interval || elapsed.is_zero() {
            return None;
        }

        let delta = bytes_so_far.saturating_sub(self.last_bytes);
        self.rate = delta as f64 / elapsed.as_secs_f64();
        self.last_bytes = bytes_so_far;
        self.last_at = now;
        Some(self.rate)
    }

    /// Latest estimate in bytes/second (0.0 before the first window closes).
    pub fn bytes_per_second(&self) -> f64 {
        self.rate
    }

    /// Estimates time remaining to transfer `remaining_bytes`.
    ///
    /// Returns `None` if speed is zero.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        if self.rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes as f64 / self.rate))
    }

    /// Human-readable rate, e.g. `1.5 MB/s`.
    pub fn label(&self) -> String {
        format!("{}/s", format_bytes(self.rate as u64))
    }
}
