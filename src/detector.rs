//! Detector source: decode landmark frames from the external hand tracker.
//!
//! The detector is a separate process (typically a MediaPipe script) that
//! writes one JSON object per line:
//!
//! ```text
//! {"t": 12.345, "hand": [[x0,y0], [x1,y1], ...]}
//! {"t": 12.378, "hand": null}
//! ```
//!
//! `t` is a monotonic timestamp in seconds and may be omitted, in which
//! case frames are stamped from a process-local clock.  `hand` is null or
//! absent when no hand was found.  A reader thread does the blocking line
//! I/O and forwards decoded frames into the event loop over a channel;
//! malformed lines are logged and skipped.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use calloop::channel::{channel, Channel, Sender};
use serde::Deserialize;
use tracing::{info, warn};

use crate::gesture::Point;

// ── Wire format ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(default)]
    t: Option<f64>,
    #[serde(default)]
    hand: Option<Vec<[f32; 2]>>,
}

/// One decoded frame, ready for the engine.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic timestamp in seconds.
    pub t: f64,
    /// Landmark coordinates, or `None` when the detector saw no hand.
    pub hand: Option<Vec<Point>>,
}

// ── Source ─────────────────────────────────────────────────

/// Handle to a running detector.  Dropping it kills a spawned subprocess.
pub struct DetectorHandle {
    child: Option<Child>,
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        if let Some(child) = &mut self.child {
            child.kill().ok();
            child.wait().ok();
        }
    }
}

/// Spawn `cmd` through the shell and stream frames from its stdout.
pub fn spawn(cmd: &str) -> Result<(DetectorHandle, Channel<Frame>)> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("failed to start detector: {cmd}"))?;
    let stdout = child.stdout.take().context("detector stdout unavailable")?;

    let (tx, rx) = channel();
    thread::spawn(move || read_frames(BufReader::new(stdout), tx));

    info!(cmd, "detector started");
    Ok((DetectorHandle { child: Some(child) }, rx))
}

/// Stream frames from stdin (detector piped in by the caller).
pub fn from_stdin() -> (DetectorHandle, Channel<Frame>) {
    let (tx, rx) = channel();
    thread::spawn(move || read_frames(BufReader::new(std::io::stdin()), tx));
    (DetectorHandle { child: None }, rx)
}

/// Reader-thread body: decode lines until EOF or channel close.
fn read_frames<R: BufRead>(reader: R, tx: Sender<Frame>) {
    let clock = Instant::now();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("detector read error: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let wire: WireFrame = match serde_json::from_str(&line) {
            Ok(w) => w,
            Err(e) => {
                warn!("skipping malformed detector line: {e}");
                continue;
            }
        };

        let frame = Frame {
            t: wire.t.unwrap_or_else(|| clock.elapsed().as_secs_f64()),
            hand: wire
                .hand
                .map(|pts| pts.iter().map(|p| Point::new(p[0], p[1])).collect()),
        };

        if tx.send(frame).is_err() {
            break; // event loop gone
        }
    }
    // Dropping the sender signals EOF to the event loop.
}

// ── Tests ──────────────────────────────────────────────────
