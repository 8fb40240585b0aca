//! Replay bus for captured transfers
//!
//! Capture files hold one transfer per line as hex bytes. Whitespace between bytes is
//! ignored, and blank lines and `#` comments are skipped:
//!
//! ```text
//! # home, then move
//! 01 01 47 32 38 00 00 ...
//! 0101473120583130000000...
//! ```

use std::collections::VecDeque;
use std::path::Path;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use super::BusAdapter;
use crate::{BridgeError, Result};

/// Bus adapter that replays transfers from a capture.
#[derive(Debug)]
pub struct ReplayBus {
    frames: VecDeque<Vec<u8>>,
    total: usize,
    /// Pacing rate; unpaced when None
    rate_hz: Option<f64>,
    interval: Option<Interval>,
}

impl ReplayBus {
    /// Replay the given transfers.
    pub fn from_frames(frames: Vec<Vec<u8>>) -> Self {
        let total = frames.len();
        Self { frames: frames.into(), total, rate_hz: None, interval: None }
    }

    /// Load a capture file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::file_error(path.to_path_buf(), e))?;
        let frames = parse_capture(&text)?;

        info!("Opened capture {}: {} transfers", path.display(), frames.len());
        Ok(Self::from_frames(frames))
    }

    /// Deliver at most `rate_hz` transfers per second.
    pub fn with_rate(mut self, rate_hz: Option<f64>) -> Self {
        self.rate_hz = rate_hz.filter(|hz| hz.is_finite() && *hz > 0.0);
        self.interval = None;
        self
    }

    /// Transfers not yet delivered.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    /// Transfers in the capture.
    pub fn total(&self) -> usize {
        self.total
    }
}

#[async_trait::async_trait]
impl BusAdapter for ReplayBus {
    async fn configure(&mut self) -> Result<()> {
        if let Some(hz) = self.rate_hz {
            let period = pacing_period(hz)
                .ok_or_else(|| BridgeError::config(format!("replay rate {}Hz has no usable period", hz)))?;
            let mut pacing = interval(period);
            pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.interval = Some(pacing);
            debug!("Replay paced at {}Hz", hz);
        }
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.frames.is_empty() {
            debug!("Reached end of capture");
            return Ok(None);
        }

        if let Some(pacing) = self.interval.as_mut() {
            pacing.tick().await;
        }

        let frame = self.frames.pop_front();
        trace!("Transfer {}/{}", self.total - self.frames.len(), self.total);
        Ok(frame)
    }

    async fn stop(&mut self) -> Result<()> {
        self.frames.clear();
        self.interval = None;
        Ok(())
    }
}

/// Tick period for a pacing rate; None when the period is zero or overflows.
pub fn pacing_period(rate_hz: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(1.0 / rate_hz).ok().filter(|period| !period.is_zero())
}

/// Parse a capture into raw transfers.
pub fn parse_capture(text: &str) -> Result<Vec<Vec<u8>>> {
    let mut frames = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let digits: Vec<u8> = line.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
        if digits.len() % 2 != 0 {
            return Err(capture_error(index, "odd number of hex digits"));
        }

        let frame = digits
            .chunks(2)
            .map(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| capture_error(index, "invalid hex byte"))
            })
            .collect::<Result<Vec<u8>>>()?;

        frames.push(frame);
    }

    Ok(frames)
}

/// Render transfers in capture format, one per line.
pub fn format_capture(frames: &[Vec<u8>]) -> String {
    let mut text = String::new();
    for frame in frames {
        let line: Vec<String> = frame.iter().map(|b| format!("{:02x}", b)).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }
    text
}

fn capture_error(index: usize, details: &str) -> BridgeError {
    BridgeError::bus_failed(format!("capture line {}: {}", index + 1, details))
}
